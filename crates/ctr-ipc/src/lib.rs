//! # ctr-ipc
//!
//! Command buffer codec for high-level-emulated system services.
//!
//! This crate provides:
//! - Command header and translate descriptor encoding
//! - A typed request parser that enforces the header's parameter counts
//! - A message builder for replies and guest-side command frames
//! - Result codes as returned to guest software
//! - Guest memory with mapped and static buffer access
//! - Kernel objects (shared memory, events) behind a handle table
//!
//! ## Example
//!
//! ```
//! use ctr_ipc::{
//!     GuestMemory, HandleTable, Header, HleRequestContext, MessageBuilder, RequestParser,
//! };
//!
//! let close_context = Header::new(0x3, 1, 0);
//! let command = MessageBuilder::new(close_context).push_u32(7).build().encode();
//!
//! let mut memory = GuestMemory::new();
//! let mut handles = HandleTable::new();
//! let ctx = HleRequestContext::new(command, &mut memory, &mut handles)?;
//!
//! let mut rp = RequestParser::new(&ctx, close_context)?;
//! assert_eq!(rp.pop_u32()?, 7);
//! assert!(rp.pop_u32().is_err());
//! # Ok::<(), ctr_ipc::Error>(())
//! ```

mod builder;
mod context;
mod error;
mod header;
pub mod kernel;
mod memory;
mod parser;
mod result;

pub use builder::{Message, MessageBuilder};
pub use context::HleRequestContext;
pub use error::{Error, Result};
pub use header::{Descriptor, HandleKind, Header, MappedBufferPermissions};
pub use kernel::{Event, Handle, HandleTable, KernelObject, ResetType, SharedMemory};
pub use memory::{GuestMemory, MappedBuffer, VAddr};
pub use parser::RequestParser;
pub use result::ResultCode;
