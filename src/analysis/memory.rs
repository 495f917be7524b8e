//! MemoryView: safe, bounded reads by virtual address.
//!
//! Containers implement this over their sections (see
//! `formats::ContainerMemory`); decoders that chase pointers, such as the
//! stack-map reader in `functab`, only see the trait.

use crate::core::arch::Endianness;

/// Errors that can occur during memory reads.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum MemoryError {
    #[error("address {addr:#x} is not mapped")]
    Unmapped { addr: u64 },
    #[error("read of {len} bytes at {addr:#x} runs past the end of its region")]
    OutOfRange { addr: u64, len: usize },
    #[error("unsupported pointer size {0}")]
    PointerSize(u8),
}

/// Bounded memory reads by virtual address.
pub trait MemoryView {
    /// Read exactly `len` bytes starting at `addr`.
    fn read_bytes(&self, addr: u64, len: usize) -> Result<Vec<u8>, MemoryError>;

    /// Number of bytes readable from `addr` to the end of its region.
    fn available(&self, addr: u64) -> Result<u64, MemoryError>;

    fn read_u16(&self, addr: u64, endian: Endianness) -> Result<u16, MemoryError> {
        let b = self.read_bytes(addr, 2)?;
        Ok(endian.u16([b[0], b[1]]))
    }

    fn read_u32(&self, addr: u64, endian: Endianness) -> Result<u32, MemoryError> {
        let b = self.read_bytes(addr, 4)?;
        Ok(endian.u32([b[0], b[1], b[2], b[3]]))
    }

    fn read_u64(&self, addr: u64, endian: Endianness) -> Result<u64, MemoryError> {
        let b = self.read_bytes(addr, 8)?;
        Ok(endian.u64([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }

    /// Read a pointer-sized unsigned value.
    fn read_ptr(&self, addr: u64, ptr_size: u8, endian: Endianness) -> Result<u64, MemoryError> {
        match ptr_size {
            4 => self.read_u32(addr, endian).map(u64::from),
            8 => self.read_u64(addr, endian),
            other => Err(MemoryError::PointerSize(other)),
        }
    }
}

/// A memory view over a byte slice loaded at `base`.
pub struct SliceMemoryView<'a> {
    base: u64,
    data: &'a [u8],
}

impl<'a> SliceMemoryView<'a> {
    pub fn new(base: u64, data: &'a [u8]) -> Self {
        Self { base, data }
    }
}

impl MemoryView for SliceMemoryView<'_> {
    fn read_bytes(&self, addr: u64, len: usize) -> Result<Vec<u8>, MemoryError> {
        let start = addr
            .checked_sub(self.base)
            .filter(|off| *off < self.data.len() as u64)
            .ok_or(MemoryError::Unmapped { addr })? as usize;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(MemoryError::OutOfRange { addr, len })?;
        Ok(self.data[start..end].to_vec())
    }

    fn available(&self, addr: u64) -> Result<u64, MemoryError> {
        addr.checked_sub(self.base)
            .filter(|off| *off < self.data.len() as u64)
            .map(|off| self.data.len() as u64 - off)
            .ok_or(MemoryError::Unmapped { addr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_memory_reads() {
        let data = (0u8..=255u8).collect::<Vec<_>>();
        let mv = SliceMemoryView::new(0x400000, &data);
        assert_eq!(mv.read_bytes(0x40000a, 4).unwrap(), vec![10, 11, 12, 13]);
        assert_eq!(mv.read_u16(0x400001, Endianness::Little).unwrap(), 0x0201);
        assert_eq!(mv.read_u32(0x400000, Endianness::Big).unwrap(), 0x00010203);
        assert_eq!(mv.read_ptr(0x400000, 4, Endianness::Little).unwrap(), 0x03020100);
    }

    #[test]
    fn slice_memory_bounds() {
        let data = [0u8; 16];
        let mv = SliceMemoryView::new(0x1000, &data);
        assert_eq!(
            mv.read_bytes(0xfff, 1),
            Err(MemoryError::Unmapped { addr: 0xfff })
        );
        assert_eq!(
            mv.read_bytes(0x100c, 8),
            Err(MemoryError::OutOfRange { addr: 0x100c, len: 8 })
        );
        assert_eq!(
            mv.read_ptr(0x1000, 2, Endianness::Little),
            Err(MemoryError::PointerSize(2))
        );
        assert!(mv.read_bytes(0x100f, 1).is_ok());
        assert_eq!(mv.available(0x1000), Ok(16));
        assert_eq!(mv.available(0x100f), Ok(1));
        assert_eq!(mv.available(0x1010), Err(MemoryError::Unmapped { addr: 0x1010 }));
    }
}
