use crate::header::{Descriptor, HandleKind, Header, MappedBufferPermissions};
use crate::kernel::Handle;
use crate::memory::VAddr;
use crate::result::ResultCode;

/// A complete IPC frame: header plus parameter words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    header: Header,
    params: Vec<u32>,
}

impl Message {
    pub fn header(&self) -> Header {
        self.header
    }

    /// Parameter words after the header.
    pub fn params(&self) -> &[u32] {
        &self.params
    }

    /// Leading result word of a response frame.
    pub fn result(&self) -> Option<ResultCode> {
        self.params.first().copied().map(ResultCode)
    }

    /// Frame as a command buffer, header first.
    pub fn encode(&self) -> Vec<u32> {
        let mut words = Vec::with_capacity(self.params.len() + 1);
        words.push(self.header.raw());
        words.extend_from_slice(&self.params);
        words
    }
}

/// Builds IPC frames in either direction.
///
/// Services use it for replies; guest-side tooling and tests use it to
/// assemble command buffers.
///
/// ```
/// use ctr_ipc::{Header, MessageBuilder, ResultCode};
///
/// let reply = MessageBuilder::new(Header::new(0x2, 2, 0))
///     .push_result(ResultCode::SUCCESS)
///     .push_u32(1)
///     .build();
/// assert_eq!(reply.encode(), vec![0x00020080, 0, 1]);
/// ```
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    header: Header,
    params: Vec<u32>,
}

impl MessageBuilder {
    pub fn new(header: Header) -> Self {
        Self {
            header,
            params: Vec::with_capacity(header.frame_len() - 1),
        }
    }

    pub fn push_u32(mut self, value: u32) -> Self {
        self.params.push(value);
        self
    }

    /// Two words, low word first.
    pub fn push_u64(self, value: u64) -> Self {
        self.push_u32(value as u32).push_u32((value >> 32) as u32)
    }

    pub fn push_u8(self, value: u8) -> Self {
        self.push_u32(value as u32)
    }

    pub fn push_bool(self, value: bool) -> Self {
        self.push_u32(value as u32)
    }

    pub fn push_result(self, result: ResultCode) -> Self {
        self.push_u32(result.raw())
    }

    /// Handle descriptor followed by `handles`; the sender keeps its copies.
    pub fn push_copy_handles(self, handles: &[Handle]) -> Self {
        self.push_handles(HandleKind::Copy, handles)
    }

    /// Handle descriptor followed by `handles`, closed in the sender.
    pub fn push_move_handles(self, handles: &[Handle]) -> Self {
        self.push_handles(HandleKind::Move, handles)
    }

    fn push_handles(self, kind: HandleKind, handles: &[Handle]) -> Self {
        let descriptor = Descriptor::Handles {
            kind,
            count: handles.len(),
        };
        handles
            .iter()
            .fold(self.push_u32(descriptor.encode()), |builder, handle| {
                builder.push_u32(handle.0)
            })
    }

    /// Calling-process-id placeholder, filled by the kernel in transit.
    pub fn push_calling_pid(self, pid: u32) -> Self {
        let descriptor = Descriptor::Handles {
            kind: HandleKind::CallingPid,
            count: 1,
        };
        self.push_u32(descriptor.encode()).push_u32(pid)
    }

    /// Static buffer descriptor and address.
    pub fn push_static_buffer(self, buffer_id: u8, size: u32, address: VAddr) -> Self {
        let descriptor = Descriptor::StaticBuffer { buffer_id, size };
        self.push_u32(descriptor.encode()).push_u32(address)
    }

    /// Mapped buffer descriptor and address.
    pub fn push_mapped_buffer(
        self,
        permissions: MappedBufferPermissions,
        size: u32,
        address: VAddr,
    ) -> Self {
        let descriptor = Descriptor::MappedBuffer { permissions, size };
        self.push_u32(descriptor.encode()).push_u32(address)
    }

    /// Finish the frame. Debug builds check it against the header counts.
    pub fn build(self) -> Message {
        debug_assert_eq!(
            self.params.len() + 1,
            self.header.frame_len(),
            "frame for command 0x{:04X} does not match its header",
            self.header.command_id
        );
        Message {
            header: self.header,
            params: self.params,
        }
    }
}
