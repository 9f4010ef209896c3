use ctr_ipc::SharedMemory;
use std::sync::Arc;

/// Holds a guest-provided shared memory block for as long as a service lives.
#[derive(Debug, Default)]
pub struct SharedMemoryLatch {
    block: Option<Arc<SharedMemory>>,
}

impl SharedMemoryLatch {
    /// Latch holding nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retain `block`, tagging it with `name`. A previously latched block is
    /// released. Passing `None` only releases.
    pub fn latch(&mut self, block: Option<Arc<SharedMemory>>, name: &str) {
        if let Some(block) = &block {
            block.set_name(name);
        }
        self.block = block;
    }

    /// Give up the latched block, returning it.
    pub fn release(&mut self) -> Option<Arc<SharedMemory>> {
        self.block.take()
    }

    /// Latched block, if any.
    pub fn get(&self) -> Option<&Arc<SharedMemory>> {
        self.block.as_ref()
    }

    /// Whether a block is held.
    pub fn is_latched(&self) -> bool {
        self.block.is_some()
    }
}
