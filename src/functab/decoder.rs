//! Bounds-checked cursor over function-table bytes.

use crate::core::arch::Endianness;
use crate::functab::{FunctabError, Result};

/// Little cursor that reads fixed-size and variable-length integers.
///
/// Every read checks the remaining length and reports the offset it failed
/// at; nothing here can index out of bounds.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    endian: Endianness,
    ptr_size: u8,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8], endian: Endianness, ptr_size: u8) -> Self {
        Self {
            data,
            pos: 0,
            endian,
            ptr_size,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(FunctabError::Truncated {
                offset: pos,
                needed: 0,
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.bytes(n).map(|_| ())
    }

    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or(FunctabError::Truncated {
                offset: self.pos,
                needed: n,
            })?;
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u16(&mut self) -> Result<u16> {
        let b = self.array()?;
        Ok(self.endian.u16(b))
    }

    pub fn u32(&mut self) -> Result<u32> {
        let b = self.array()?;
        Ok(self.endian.u32(b))
    }

    pub fn i32(&mut self) -> Result<i32> {
        self.u32().map(|v| v as i32)
    }

    pub fn u64(&mut self) -> Result<u64> {
        let b = self.array()?;
        Ok(self.endian.u64(b))
    }

    /// Pointer-sized unsigned value.
    pub fn ptr(&mut self) -> Result<u64> {
        match self.ptr_size {
            4 => self.u32().map(u64::from),
            8 => self.u64(),
            other => Err(FunctabError::PointerSize(other)),
        }
    }

    /// NUL-terminated string; invalid UTF-8 is replaced.
    pub fn cstring(&mut self) -> Result<String> {
        let rest = &self.data[self.pos..];
        let len = memchr::memchr(0, rest).ok_or(FunctabError::Truncated {
            offset: self.pos,
            needed: rest.len() + 1,
        })?;
        let s = String::from_utf8_lossy(&rest[..len]).into_owned();
        self.pos += len + 1;
        Ok(s)
    }

    /// LEB128 unsigned varint, at most 10 bytes.
    pub fn uvarint(&mut self) -> Result<u64> {
        let start = self.pos;
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.u8().map_err(|_| FunctabError::Varint { offset: start })?;
            if shift == 63 && byte > 1 {
                return Err(FunctabError::Varint { offset: start });
            }
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift > 63 {
                return Err(FunctabError::Varint { offset: start });
            }
        }
    }

    /// Zig-zag signed varint.
    pub fn varint(&mut self) -> Result<i64> {
        let ux = self.uvarint()?;
        let x = (ux >> 1) as i64;
        Ok(if ux & 1 != 0 { !x } else { x })
    }
}
