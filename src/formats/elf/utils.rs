//! Utility functions for ELF parsing

use crate::formats::elf::types::{ElfClass, ElfData, ElfError, Result};

/// Trait for reading values with endianness support
pub trait EndianRead {
    fn read_u16(&self, offset: usize, data: ElfData) -> Result<u16>;
    fn read_u32(&self, offset: usize, data: ElfData) -> Result<u32>;
    fn read_u64(&self, offset: usize, data: ElfData) -> Result<u64>;
}

fn take<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N]> {
    offset
        .checked_add(N)
        .and_then(|end| buf.get(offset..end))
        .and_then(|s| s.try_into().ok())
        .ok_or(ElfError::Truncated { offset, needed: N })
}

impl EndianRead for [u8] {
    fn read_u16(&self, offset: usize, data: ElfData) -> Result<u16> {
        let bytes = take::<2>(self, offset)?;
        Ok(match data {
            ElfData::Little => u16::from_le_bytes(bytes),
            ElfData::Big => u16::from_be_bytes(bytes),
        })
    }

    fn read_u32(&self, offset: usize, data: ElfData) -> Result<u32> {
        let bytes = take::<4>(self, offset)?;
        Ok(match data {
            ElfData::Little => u32::from_le_bytes(bytes),
            ElfData::Big => u32::from_be_bytes(bytes),
        })
    }

    fn read_u64(&self, offset: usize, data: ElfData) -> Result<u64> {
        let bytes = take::<8>(self, offset)?;
        Ok(match data {
            ElfData::Little => u64::from_le_bytes(bytes),
            ElfData::Big => u64::from_be_bytes(bytes),
        })
    }
}

/// Read an address or size field based on ELF class
pub fn read_addr(data: &[u8], offset: usize, class: ElfClass, endian: ElfData) -> Result<u64> {
    match class {
        ElfClass::Elf32 => data.read_u32(offset, endian).map(u64::from),
        ElfClass::Elf64 => data.read_u64(offset, endian),
    }
}

/// Read a null-terminated string from data
pub fn read_cstring(data: &[u8], offset: usize) -> Result<&str> {
    let slice = data.get(offset..).ok_or(ElfError::InvalidOffset {
        offset: offset as u64,
    })?;
    let end = memchr::memchr(0, slice).unwrap_or(slice.len());
    std::str::from_utf8(&slice[..end]).map_err(|_| ElfError::InvalidString { offset })
}

/// Returns the `size` bytes at `offset`, checking both for overflow and bounds.
pub fn file_range(data: &[u8], offset: u64, size: u64) -> Result<std::ops::Range<usize>> {
    let start = usize::try_from(offset).map_err(|_| ElfError::InvalidOffset { offset })?;
    let len = usize::try_from(size).map_err(|_| ElfError::InvalidOffset { offset })?;
    let end = start
        .checked_add(len)
        .filter(|end| *end <= data.len())
        .ok_or(ElfError::Truncated {
            offset: start,
            needed: len,
        })?;
    Ok(start..end)
}
