//! ELF header parsing

use crate::formats::elf::types::*;
use crate::formats::elf::utils::{read_addr, EndianRead};

/// Parse the ELF file header.
///
/// Returns `InvalidMagic` only when the first four bytes are not `\x7fELF`;
/// every later failure means the file is an ELF file with a corrupt header.
pub fn parse_header(data: &[u8]) -> Result<ElfHeader> {
    if data.len() < 4 || &data[0..4] != ELF_MAGIC {
        return Err(ElfError::InvalidMagic);
    }
    if data.len() < 16 {
        return Err(ElfError::Truncated {
            offset: 0,
            needed: 16,
        });
    }

    let class = ElfClass::from_u8(data[4])?;
    let endian = ElfData::from_u8(data[5])?;

    let header_size = match class {
        ElfClass::Elf32 => 52,
        ElfClass::Elf64 => 64,
    };
    if data.len() < header_size {
        return Err(ElfError::Truncated {
            offset: 0,
            needed: header_size,
        });
    }

    let e_type = data.read_u16(16, endian)?;
    let e_machine = data.read_u16(18, endian)?;

    // Offsets of e_shoff and of the trailing u16 block differ by class.
    let (shoff_at, tail_at) = match class {
        ElfClass::Elf32 => (32, 46),
        ElfClass::Elf64 => (40, 58),
    };
    let e_shoff = read_addr(data, shoff_at, class, endian)?;
    let e_shentsize = data.read_u16(tail_at, endian)?;
    let e_shnum = data.read_u16(tail_at + 2, endian)?;
    let e_shstrndx = data.read_u16(tail_at + 4, endian)?;

    if e_shoff != 0 && usize::from(e_shentsize) < class.section_header_size() {
        return Err(ElfError::MalformedHeader(format!(
            "section header entry size {} too small",
            e_shentsize
        )));
    }

    Ok(ElfHeader {
        class,
        data: endian,
        e_type,
        e_machine,
        e_shoff,
        e_shentsize,
        e_shnum,
        e_shstrndx,
    })
}
