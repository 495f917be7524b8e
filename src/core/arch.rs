//! Container format, byte order and the per-architecture frame constants
//! used to lay out stack frames.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Container format of a loaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    #[serde(rename = "elf")]
    Elf,
    #[serde(rename = "pe")]
    Pe,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Elf => write!(f, "ELF"),
            Format::Pe => write!(f, "PE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    pub fn u16(self, bytes: [u8; 2]) -> u16 {
        match self {
            Endianness::Little => u16::from_le_bytes(bytes),
            Endianness::Big => u16::from_be_bytes(bytes),
        }
    }

    pub fn u32(self, bytes: [u8; 4]) -> u32 {
        match self {
            Endianness::Little => u32::from_le_bytes(bytes),
            Endianness::Big => u32::from_be_bytes(bytes),
        }
    }

    pub fn u64(self, bytes: [u8; 8]) -> u64 {
        match self {
            Endianness::Little => u64::from_le_bytes(bytes),
            Endianness::Big => u64::from_be_bytes(bytes),
        }
    }
}

/// Architecture constants needed for frame layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ArchInfo {
    /// Runtime name (`GOARCH`).
    pub name: &'static str,
    /// Pointer size in bytes.
    pub ptr_size: u8,
    /// Size of the fixed area at the bottom of each frame.
    pub min_frame_size: u8,
    /// Whether `CALL` pushes the return address onto the stack.
    pub pushes_return_addr: bool,
}

pub const AMD64: ArchInfo = ArchInfo {
    name: "amd64",
    ptr_size: 8,
    min_frame_size: 0,
    pushes_return_addr: true,
};

pub const I386: ArchInfo = ArchInfo {
    name: "386",
    ptr_size: 4,
    min_frame_size: 0,
    pushes_return_addr: true,
};

impl ArchInfo {
    /// Offset of the locals area from the frame pointer.
    pub fn varp_delta(&self) -> i64 {
        -i64::from(self.ptr_size)
    }

    /// Offset of the arguments area from the frame pointer.
    pub fn argp_delta(&self) -> i64 {
        i64::from(self.min_frame_size)
    }

    /// Distance from SP to the frame pointer given the SP offset at a PC.
    pub fn frame_size(&self, sp_offset: i64) -> i64 {
        if self.pushes_return_addr {
            sp_offset + i64::from(self.ptr_size)
        } else {
            sp_offset
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_deltas() {
        assert_eq!(AMD64.varp_delta(), -8);
        assert_eq!(AMD64.argp_delta(), 0);
        assert_eq!(I386.varp_delta(), -4);
        assert_eq!(AMD64.frame_size(0x18), 0x20);
    }

    #[test]
    fn endian_decoding() {
        assert_eq!(Endianness::Little.u32([1, 0, 0, 0]), 1);
        assert_eq!(Endianness::Big.u32([0, 0, 0, 1]), 1);
        assert_eq!(Endianness::Big.u16([0x12, 0x34]), 0x1234);
    }
}
