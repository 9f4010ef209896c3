use thiserror::Error;

/// Errors raised while decoding or encoding IPC command buffers.
#[derive(Debug, Error)]
pub enum Error {
    /// The command buffer does not hold the words its header declares.
    #[error("command buffer too short: {actual} words, header needs {required}")]
    CommandBufferTooShort { required: usize, actual: usize },

    /// The incoming header does not match the handler's declared layout.
    #[error("header mismatch: expected 0x{expected:08X}, got 0x{actual:08X}")]
    HeaderMismatch { expected: u32, actual: u32 },

    /// A handler popped more normal parameters than the header declares.
    #[error("normal parameters exhausted for command 0x{command_id:04X} at word {index}")]
    NormalParamsExhausted { command_id: u16, index: usize },

    /// A handler popped more translate parameters than the header declares.
    #[error("translate parameters exhausted for command 0x{command_id:04X} at word {index}")]
    TranslateParamsExhausted { command_id: u16, index: usize },

    /// A translate parameter was read before all normal parameters were consumed.
    #[error("translate parameter popped at word {index} while normal parameters remain")]
    NormalParamsPending { index: usize },

    /// The translate descriptor does not have the expected kind.
    #[error("expected {expected} descriptor, found 0x{word:08X}")]
    UnexpectedDescriptor { expected: &'static str, word: u32 },

    /// An enumeration word is outside its value set.
    #[error("invalid {name} value: {value}")]
    InvalidEnum { name: &'static str, value: u32 },

    /// Guest memory access touches an unmapped address range.
    #[error("unmapped guest memory at 0x{address:08X} (+{len} bytes)")]
    UnmappedMemory { address: u32, len: usize },

    /// Guest memory regions may not overlap.
    #[error("guest memory region at 0x{address:08X} overlaps an existing mapping")]
    OverlappingRegion { address: u32 },

    /// A mapped buffer was accessed against its permissions.
    #[error("mapped buffer at 0x{address:08X} is not {required}")]
    BufferPermission {
        address: u32,
        required: &'static str,
    },

    /// A mapped buffer access runs past the buffer's end.
    #[error("buffer access out of range: offset {offset} + {len} bytes exceeds size {size}")]
    BufferOverflow { offset: usize, len: usize, size: usize },
}

/// Result type for ctr-ipc operations.
pub type Result<T> = std::result::Result<T, Error>;
