use crate::builder::Message;
use crate::header::Header;
use crate::kernel::HandleTable;
use crate::memory::GuestMemory;
use crate::{Error, Result};

/// One synchronous request as seen by an HLE service.
///
/// Holds the incoming command words, the caller's memory and handle table,
/// and the reply once a handler has produced it.
pub struct HleRequestContext<'a> {
    command: Vec<u32>,
    memory: &'a mut GuestMemory,
    handles: &'a mut HandleTable,
    response: Option<Message>,
}

impl<'a> HleRequestContext<'a> {
    /// Wrap a command buffer. The buffer must hold at least the header word.
    pub fn new(
        command: impl Into<Vec<u32>>,
        memory: &'a mut GuestMemory,
        handles: &'a mut HandleTable,
    ) -> Result<Self> {
        let command = command.into();
        if command.is_empty() {
            return Err(Error::CommandBufferTooShort {
                required: 1,
                actual: 0,
            });
        }
        Ok(Self {
            command,
            memory,
            handles,
            response: None,
        })
    }

    /// Header of the incoming command.
    pub fn header(&self) -> Header {
        Header::from_raw(self.command[0])
    }

    /// All incoming command words, header included.
    pub fn command(&self) -> &[u32] {
        &self.command
    }

    pub fn memory(&self) -> &GuestMemory {
        &*self.memory
    }

    pub fn memory_mut(&mut self) -> &mut GuestMemory {
        &mut *self.memory
    }

    pub fn handles(&self) -> &HandleTable {
        &*self.handles
    }

    pub fn handles_mut(&mut self) -> &mut HandleTable {
        &mut *self.handles
    }

    /// Store the reply frame, replacing any earlier one.
    pub fn reply(&mut self, response: Message) {
        self.response = Some(response);
    }

    /// Reply frame, if a handler produced one.
    pub fn response(&self) -> Option<&Message> {
        self.response.as_ref()
    }

    /// Remove the reply, leaving the context without one.
    pub fn take_response(&mut self) -> Option<Message> {
        self.response.take()
    }
}
