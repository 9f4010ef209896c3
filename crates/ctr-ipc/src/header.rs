//! Command header and translate descriptor encoding.
//!
//! ```text
//!  31             16 15    12 11        6 5          0
//! ┌────────────────┬────────┬───────────┬────────────┐
//! │   command id   │ unused │  normal   │ translate  │
//! └────────────────┴────────┴───────────┴────────────┘
//! ```

use crate::{Error, Result};

/// Decoded command header (word 0 of every command buffer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    /// Command identifier in the upper half-word.
    pub command_id: u16,
    /// Number of plain parameter words.
    pub normal_params: u8,
    /// Number of translate parameter words (descriptors included).
    pub translate_params: u8,
}

impl Header {
    /// Build a header from its parts.
    pub const fn new(command_id: u16, normal_params: u8, translate_params: u8) -> Self {
        Self {
            command_id,
            normal_params: normal_params & 0x3F,
            translate_params: translate_params & 0x3F,
        }
    }

    /// Decode a raw header word.
    pub const fn from_raw(raw: u32) -> Self {
        Self {
            command_id: (raw >> 16) as u16,
            normal_params: ((raw >> 6) & 0x3F) as u8,
            translate_params: (raw & 0x3F) as u8,
        }
    }

    /// Encode the header word.
    pub const fn raw(&self) -> u32 {
        ((self.command_id as u32) << 16)
            | ((self.normal_params as u32) << 6)
            | (self.translate_params as u32)
    }

    /// Total words in a frame with this header, the header word included.
    pub const fn frame_len(&self) -> usize {
        1 + self.normal_params as usize + self.translate_params as usize
    }
}

/// Kind of a handle list descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    /// Handles are duplicated into the receiver.
    Copy,
    /// Handles are moved and closed in the sender.
    Move,
    /// Placeholder the kernel fills with the caller's process id.
    CallingPid,
}

impl HandleKind {
    const fn bits(self) -> u32 {
        match self {
            HandleKind::Copy => 0x00,
            HandleKind::Move => 0x10,
            HandleKind::CallingPid => 0x20,
        }
    }
}

/// Access a guest grants on a mapped buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappedBufferPermissions {
    Read,
    Write,
    ReadWrite,
}

impl MappedBufferPermissions {
    const fn bits(self) -> u32 {
        match self {
            MappedBufferPermissions::Read => 1,
            MappedBufferPermissions::Write => 2,
            MappedBufferPermissions::ReadWrite => 3,
        }
    }

    fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            1 => Some(MappedBufferPermissions::Read),
            2 => Some(MappedBufferPermissions::Write),
            3 => Some(MappedBufferPermissions::ReadWrite),
            _ => None,
        }
    }

    /// Whether the service may read from the buffer.
    pub fn readable(self) -> bool {
        matches!(
            self,
            MappedBufferPermissions::Read | MappedBufferPermissions::ReadWrite
        )
    }

    /// Whether the service may write into the buffer.
    pub fn writable(self) -> bool {
        matches!(
            self,
            MappedBufferPermissions::Write | MappedBufferPermissions::ReadWrite
        )
    }
}

/// A decoded translate descriptor word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Descriptor {
    /// `count` handle words follow.
    Handles { kind: HandleKind, count: usize },
    /// One address word follows; `size` bytes are copied from it.
    StaticBuffer { buffer_id: u8, size: u32 },
    /// One address word follows; the range is mapped into the service.
    MappedBuffer {
        permissions: MappedBufferPermissions,
        size: u32,
    },
}

impl Descriptor {
    /// Decode a translate descriptor word.
    pub fn decode(word: u32) -> Result<Self> {
        if word & 0x8 != 0 {
            let permissions = MappedBufferPermissions::from_bits((word >> 1) & 0x3).ok_or(
                Error::UnexpectedDescriptor {
                    expected: "mapped buffer",
                    word,
                },
            )?;
            return Ok(Descriptor::MappedBuffer {
                permissions,
                size: word >> 4,
            });
        }

        match word & 0xF {
            0x2 => Ok(Descriptor::StaticBuffer {
                buffer_id: ((word >> 10) & 0xF) as u8,
                size: word >> 14,
            }),
            0x0 => {
                let kind = match word & 0x30 {
                    0x00 => HandleKind::Copy,
                    0x10 => HandleKind::Move,
                    0x20 => HandleKind::CallingPid,
                    _ => {
                        return Err(Error::UnexpectedDescriptor {
                            expected: "handle list",
                            word,
                        })
                    }
                };
                Ok(Descriptor::Handles {
                    kind,
                    count: (word >> 26) as usize + 1,
                })
            }
            _ => Err(Error::UnexpectedDescriptor {
                expected: "translate",
                word,
            }),
        }
    }

    /// Encode the descriptor word.
    pub fn encode(&self) -> u32 {
        match *self {
            Descriptor::Handles { kind, count } => {
                ((count.max(1) as u32 - 1) << 26) | kind.bits()
            }
            Descriptor::StaticBuffer { buffer_id, size } => {
                (size << 14) | (((buffer_id & 0xF) as u32) << 10) | 0x2
            }
            Descriptor::MappedBuffer { permissions, size } => {
                (size << 4) | 0x8 | (permissions.bits() << 1)
            }
        }
    }
}
