use crate::header::MappedBufferPermissions;
use crate::{Error, Result};
use std::collections::BTreeMap;

/// Guest virtual address.
pub type VAddr = u32;

/// Sparse guest address space made of non-overlapping regions.
#[derive(Debug, Default, Clone)]
pub struct GuestMemory {
    regions: BTreeMap<VAddr, Vec<u8>>,
}

impl GuestMemory {
    /// Create an empty address space.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `data` at `address`.
    pub fn map(&mut self, address: VAddr, data: Vec<u8>) -> Result<()> {
        let end = address as u64 + data.len() as u64;
        if let Some((&start, region)) = self.regions.range(..=address).next_back() {
            if start as u64 + region.len() as u64 > address as u64 {
                return Err(Error::OverlappingRegion { address });
            }
        }
        if let Some((&next, _)) = self.regions.range(address..).next() {
            if (next as u64) < end {
                return Err(Error::OverlappingRegion { address });
            }
        }
        self.regions.insert(address, data);
        Ok(())
    }

    /// Map `len` zeroed bytes at `address`.
    pub fn map_zeroed(&mut self, address: VAddr, len: usize) -> Result<()> {
        self.map(address, vec![0u8; len])
    }

    /// Remove the region starting at `address`, returning its contents.
    pub fn unmap(&mut self, address: VAddr) -> Option<Vec<u8>> {
        self.regions.remove(&address)
    }

    /// Borrow `len` bytes at `address`.
    pub fn slice(&self, address: VAddr, len: usize) -> Result<&[u8]> {
        let (start, region) = self.region_for(address, len)?;
        let offset = (address - start) as usize;
        Ok(&region[offset..offset + len])
    }

    /// Copy `len` bytes at `address`.
    pub fn read(&self, address: VAddr, len: usize) -> Result<Vec<u8>> {
        self.slice(address, len).map(<[u8]>::to_vec)
    }

    /// Write `data` at `address`.
    pub fn write(&mut self, address: VAddr, data: &[u8]) -> Result<()> {
        let (start, _) = self.region_for(address, data.len())?;
        let offset = (address - start) as usize;
        if let Some(region) = self.regions.get_mut(&start) {
            region[offset..offset + data.len()].copy_from_slice(data);
        }
        Ok(())
    }

    fn region_for(&self, address: VAddr, len: usize) -> Result<(VAddr, &Vec<u8>)> {
        let unmapped = Error::UnmappedMemory { address, len };
        let (&start, region) = self.regions.range(..=address).next_back().ok_or(unmapped)?;
        let offset = (address - start) as u64;
        if offset + len as u64 > region.len() as u64 {
            return Err(Error::UnmappedMemory { address, len });
        }
        Ok((start, region))
    }
}

/// A guest range handed to a service through a mapped-buffer descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedBuffer {
    address: VAddr,
    size: usize,
    permissions: MappedBufferPermissions,
}

impl MappedBuffer {
    pub fn new(address: VAddr, size: usize, permissions: MappedBufferPermissions) -> Self {
        Self {
            address,
            size,
            permissions,
        }
    }

    pub fn address(&self) -> VAddr {
        self.address
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn permissions(&self) -> MappedBufferPermissions {
        self.permissions
    }

    /// Read `len` bytes starting `offset` bytes into the buffer.
    pub fn read(&self, memory: &GuestMemory, offset: usize, len: usize) -> Result<Vec<u8>> {
        if !self.permissions.readable() {
            return Err(Error::BufferPermission {
                address: self.address,
                required: "readable",
            });
        }
        self.check_range(offset, len)?;
        memory.read(self.address + offset as u32, len)
    }

    /// Write `data` starting `offset` bytes into the buffer.
    pub fn write(&self, memory: &mut GuestMemory, data: &[u8], offset: usize) -> Result<()> {
        if !self.permissions.writable() {
            return Err(Error::BufferPermission {
                address: self.address,
                required: "writable",
            });
        }
        self.check_range(offset, data.len())?;
        memory.write(self.address + offset as u32, data)
    }

    fn check_range(&self, offset: usize, len: usize) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.size => Ok(()),
            _ => Err(Error::BufferOverflow {
                offset,
                len,
                size: self.size,
            }),
        }
    }
}
