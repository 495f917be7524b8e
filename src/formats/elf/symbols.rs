//! Symbol table parsing

use crate::core::symbol::{Symbol, SymbolKind};
use crate::formats::elf::sections::SectionTable;
use crate::formats::elf::types::*;
use crate::formats::elf::utils::{file_range, read_addr, EndianRead};
use std::borrow::Cow;

/// Parse the symbol table in section `index`, skipping the null entry.
pub fn parse_symbol_table(
    data: &[u8],
    sections: &SectionTable,
    index: usize,
    class: ElfClass,
    endian: ElfData,
) -> Result<Vec<Symbol>> {
    let sh = sections
        .get(index)
        .ok_or(ElfError::InvalidSectionIndex(index as u32))?;
    let strtab_sh = sections
        .get(sh.sh_link as usize)
        .filter(|_| sh.sh_link != 0)
        .ok_or(ElfError::InvalidSectionIndex(sh.sh_link))?;

    let syms = &data[file_range(data, sh.sh_offset, sh.file_size())?];
    let strings = &data[file_range(data, strtab_sh.sh_offset, strtab_sh.file_size())?];

    let entsize = class.sym_size();
    let count = syms.len() / entsize;
    let mut out = Vec::with_capacity(count.saturating_sub(1));
    for i in 1..count {
        let raw = parse_raw_symbol(syms, i * entsize, class, endian)?;
        out.push(to_symbol(&raw, symbol_name(strings, raw.st_name), sections));
    }
    Ok(out)
}

fn parse_raw_symbol(data: &[u8], offset: usize, class: ElfClass, endian: ElfData) -> Result<RawSymbol> {
    match class {
        ElfClass::Elf32 => Ok(RawSymbol {
            st_name: data.read_u32(offset, endian)?,
            st_value: read_addr(data, offset + 4, class, endian)?,
            st_size: u64::from(data.read_u32(offset + 8, endian)?),
            st_info: *data.get(offset + 12).ok_or(ElfError::Truncated {
                offset: offset + 12,
                needed: 1,
            })?,
            st_shndx: data.read_u16(offset + 14, endian)?,
        }),
        ElfClass::Elf64 => Ok(RawSymbol {
            st_name: data.read_u32(offset, endian)?,
            st_info: *data.get(offset + 4).ok_or(ElfError::Truncated {
                offset: offset + 4,
                needed: 1,
            })?,
            st_shndx: data.read_u16(offset + 6, endian)?,
            st_value: data.read_u64(offset + 8, endian)?,
            st_size: data.read_u64(offset + 16, endian)?,
        }),
    }
}

/// Names are not required to be UTF-8; out-of-range offsets yield "".
fn symbol_name(strings: &[u8], offset: u32) -> Cow<'_, str> {
    let Some(slice) = strings.get(offset as usize..) else {
        return Cow::Borrowed("");
    };
    let end = memchr::memchr(0, slice).unwrap_or(slice.len());
    String::from_utf8_lossy(&slice[..end])
}

fn to_symbol(raw: &RawSymbol, name: Cow<'_, str>, sections: &SectionTable) -> Symbol {
    let shndx = raw.st_shndx;
    let section = (shndx != SHN_UNDEF && shndx < SHN_LORESERVE)
        .then_some(usize::from(shndx))
        .filter(|i| *i < sections.count());

    let kind = match shndx {
        SHN_UNDEF => SymbolKind::Undefined,
        SHN_COMMON => SymbolKind::Bss,
        SHN_ABS => SymbolKind::Absolute,
        _ => section
            .and_then(|i| sections.get(i))
            .map_or(SymbolKind::Unknown, section_kind),
    };

    let has_addr = !matches!(shndx, SHN_UNDEF | SHN_ABS)
        && !matches!(raw.sym_type(), STT_FILE | STT_TLS);

    Symbol {
        name: name.into_owned(),
        address: raw.st_value,
        size: raw.st_size,
        kind,
        local: raw.bind() == STB_LOCAL,
        has_addr,
        section,
    }
}

fn section_kind(sh: &SectionHeader) -> SymbolKind {
    let mask = u64::from(SHF_ALLOC | SHF_WRITE | SHF_EXECINSTR);
    let alloc = u64::from(SHF_ALLOC);
    let write = u64::from(SHF_WRITE);
    let exec = u64::from(SHF_EXECINSTR);
    match sh.sh_flags & mask {
        f if f == alloc | exec => SymbolKind::Text,
        f if f == alloc => SymbolKind::ROData,
        f if f == alloc | write && sh.sh_type == SHT_NOBITS => SymbolKind::Bss,
        f if f == alloc | write => SymbolKind::Data,
        _ => SymbolKind::Unknown,
    }
}
