//! Utility functions for PE parsing

use crate::formats::pe::types::{PeError, Result};

/// Extension trait for reading little-endian primitives from byte slices
pub trait ReadExt {
    fn read_u8_at(&self, offset: usize) -> Result<u8>;
    fn read_u16_le_at(&self, offset: usize) -> Result<u16>;
    fn read_u32_le_at(&self, offset: usize) -> Result<u32>;
    fn read_u64_le_at(&self, offset: usize) -> Result<u64>;
    fn read_slice_at(&self, offset: usize, len: usize) -> Result<&[u8]>;
}

impl ReadExt for [u8] {
    #[inline(always)]
    fn read_u8_at(&self, offset: usize) -> Result<u8> {
        self.get(offset)
            .copied()
            .ok_or(PeError::Truncated { offset, needed: 1 })
    }

    #[inline(always)]
    fn read_u16_le_at(&self, offset: usize) -> Result<u16> {
        self.read_slice_at(offset, 2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
    }

    #[inline(always)]
    fn read_u32_le_at(&self, offset: usize) -> Result<u32> {
        self.read_slice_at(offset, 4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    #[inline(always)]
    fn read_u64_le_at(&self, offset: usize) -> Result<u64> {
        let lo = self.read_u32_le_at(offset)?;
        let hi = self.read_u32_le_at(offset + 4)?;
        Ok(u64::from(lo) | (u64::from(hi) << 32))
    }

    #[inline(always)]
    fn read_slice_at(&self, offset: usize, len: usize) -> Result<&[u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.get(offset..end))
            .ok_or(PeError::Truncated {
                offset,
                needed: len,
            })
    }
}

/// Decodes a NUL-padded name field, replacing invalid UTF-8.
pub fn padded_name(raw: &[u8]) -> String {
    let end = memchr::memchr(0, raw).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_ext() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        assert_eq!(data.read_u8_at(0).unwrap(), 0x01);
        assert_eq!(data.read_u16_le_at(0).unwrap(), 0x0201);
        assert_eq!(data.read_u32_le_at(0).unwrap(), 0x04030201);
        assert_eq!(data.read_u64_le_at(0).unwrap(), 0x0807060504030201);
        assert_eq!(
            data.read_u32_le_at(6),
            Err(PeError::Truncated { offset: 6, needed: 4 })
        );
        assert!(data.read_slice_at(usize::MAX, 2).is_err());
    }

    #[test]
    fn test_padded_name() {
        assert_eq!(padded_name(b".text\0\0\0"), ".text");
        assert_eq!(padded_name(b".textbss"), ".textbss");
    }
}
