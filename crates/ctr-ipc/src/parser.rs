use crate::context::HleRequestContext;
use crate::header::{Descriptor, HandleKind, Header};
use crate::kernel::{Handle, KernelObjectKind};
use crate::memory::MappedBuffer;
use crate::{Error, Result};
use std::sync::Arc;

/// Typed cursor over an incoming command buffer.
///
/// The parser is created against the header a handler expects and refuses
/// to read past the parameter counts that header declares. Normal parameters
/// are consumed first, translate parameters after them.
pub struct RequestParser<'c, 'a> {
    ctx: &'c HleRequestContext<'a>,
    header: Header,
    index: usize,
}

impl<'c, 'a> RequestParser<'c, 'a> {
    /// Start parsing `ctx`, checking its header against `expected`.
    pub fn new(ctx: &'c HleRequestContext<'a>, expected: Header) -> Result<Self> {
        let actual = ctx.header();
        if actual != expected {
            return Err(Error::HeaderMismatch {
                expected: expected.raw(),
                actual: actual.raw(),
            });
        }
        if ctx.command().len() < expected.frame_len() {
            return Err(Error::CommandBufferTooShort {
                required: expected.frame_len(),
                actual: ctx.command().len(),
            });
        }
        Ok(Self {
            ctx,
            header: expected,
            index: 1,
        })
    }

    pub fn header(&self) -> Header {
        self.header
    }

    fn normal_end(&self) -> usize {
        1 + self.header.normal_params as usize
    }

    fn next_normal(&mut self) -> Result<u32> {
        if self.index >= self.normal_end() {
            return Err(Error::NormalParamsExhausted {
                command_id: self.header.command_id,
                index: self.index,
            });
        }
        let word = self.ctx.command()[self.index];
        self.index += 1;
        Ok(word)
    }

    fn next_translate(&mut self) -> Result<u32> {
        if self.index < self.normal_end() {
            return Err(Error::NormalParamsPending { index: self.index });
        }
        if self.index >= self.header.frame_len() {
            return Err(Error::TranslateParamsExhausted {
                command_id: self.header.command_id,
                index: self.index,
            });
        }
        let word = self.ctx.command()[self.index];
        self.index += 1;
        Ok(word)
    }

    pub fn pop_u32(&mut self) -> Result<u32> {
        self.next_normal()
    }

    /// Two words, low word first.
    pub fn pop_u64(&mut self) -> Result<u64> {
        let low = self.next_normal()? as u64;
        let high = self.next_normal()? as u64;
        Ok(low | (high << 32))
    }

    /// A full word truncated to its low byte.
    pub fn pop_u8(&mut self) -> Result<u8> {
        self.next_normal().map(|word| word as u8)
    }

    /// Any non-zero low byte reads as `true`.
    pub fn pop_bool(&mut self) -> Result<bool> {
        self.pop_u8().map(|byte| byte != 0)
    }

    /// One word converted into an enumeration.
    pub fn pop_enum<T: TryFrom<u32>>(&mut self, name: &'static str) -> Result<T> {
        let value = self.next_normal()?;
        T::try_from(value).map_err(|_| Error::InvalidEnum { name, value })
    }

    /// One word truncated to its low byte, then converted into an
    /// enumeration. Upper bytes are ignored.
    pub fn pop_enum_u8<T: TryFrom<u8>>(&mut self, name: &'static str) -> Result<T> {
        let byte = self.pop_u8()?;
        T::try_from(byte).map_err(|_| Error::InvalidEnum {
            name,
            value: u32::from(byte),
        })
    }

    /// Skip `count` normal words.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            self.next_normal()?;
        }
        Ok(())
    }

    /// Calling-process-id descriptor and the id the kernel filled in.
    pub fn pop_pid(&mut self) -> Result<u32> {
        let word = self.next_translate()?;
        match Descriptor::decode(word)? {
            Descriptor::Handles {
                kind: HandleKind::CallingPid,
                ..
            } => self.next_translate(),
            _ => Err(Error::UnexpectedDescriptor {
                expected: "calling pid",
                word,
            }),
        }
    }

    /// A copy or move handle list.
    pub fn pop_handles(&mut self) -> Result<Vec<Handle>> {
        let word = self.next_translate()?;
        match Descriptor::decode(word)? {
            Descriptor::Handles {
                kind: HandleKind::Copy | HandleKind::Move,
                count,
            } => (0..count)
                .map(|_| self.next_translate().map(Handle))
                .collect(),
            _ => Err(Error::UnexpectedDescriptor {
                expected: "handle list",
                word,
            }),
        }
    }

    /// A single handle resolved through the caller's handle table.
    ///
    /// Unknown handles and handles of another object kind resolve to `None`.
    pub fn pop_object<T: KernelObjectKind>(&mut self) -> Result<Option<Arc<T>>> {
        let handles = self.pop_handles()?;
        Ok(handles
            .first()
            .and_then(|&handle| self.ctx.handles().get::<T>(handle)))
    }

    /// A static buffer, copied out of guest memory.
    pub fn pop_static_buffer(&mut self) -> Result<Vec<u8>> {
        let word = self.next_translate()?;
        match Descriptor::decode(word)? {
            Descriptor::StaticBuffer { size, .. } => {
                let address = self.next_translate()?;
                self.ctx.memory().read(address, size as usize)
            }
            _ => Err(Error::UnexpectedDescriptor {
                expected: "static buffer",
                word,
            }),
        }
    }

    /// A mapped buffer descriptor. Contents are accessed later through
    /// [`MappedBuffer::read`] and [`MappedBuffer::write`].
    pub fn pop_mapped_buffer(&mut self) -> Result<MappedBuffer> {
        let word = self.next_translate()?;
        match Descriptor::decode(word)? {
            Descriptor::MappedBuffer { permissions, size } => {
                let address = self.next_translate()?;
                Ok(MappedBuffer::new(address, size as usize, permissions))
            }
            _ => Err(Error::UnexpectedDescriptor {
                expected: "mapped buffer",
                word,
            }),
        }
    }
}
