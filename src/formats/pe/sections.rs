//! Section table parsing

use crate::core::section::{Section, SectionFlags};
use crate::formats::pe::types::*;
use crate::formats::pe::utils::{padded_name, ReadExt};
use crate::formats::pe::symbols::string_at;

/// Parse every section header. Long names of the form `/N` are resolved
/// through the COFF string table.
pub fn parse_sections(data: &[u8], headers: &PeHeaders, strings: &[u8]) -> Result<Vec<SectionHeader>> {
    let count = usize::from(headers.number_of_sections);
    data.read_slice_at(headers.section_table_offset, count * SECTION_HEADER_SIZE)?;

    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let off = headers.section_table_offset + i * SECTION_HEADER_SIZE;
        let raw_name = data.read_slice_at(off, 8)?;
        let name = match raw_name.strip_prefix(b"/") {
            Some(digits) if !strings.is_empty() => {
                let digits = padded_name(digits);
                let offset: usize = digits
                    .parse()
                    .map_err(|_| PeError::InvalidSectionName(format!("/{}", digits)))?;
                string_at(strings, offset)?
            }
            _ => padded_name(raw_name),
        };
        let sh = SectionHeader {
            name,
            virtual_size: data.read_u32_le_at(off + 8)?,
            virtual_address: data.read_u32_le_at(off + 12)?,
            size_of_raw_data: data.read_u32_le_at(off + 16)?,
            pointer_to_raw_data: data.read_u32_le_at(off + 20)?,
            characteristics: data.read_u32_le_at(off + 36)?,
        };
        if sh.file_size() > 0 {
            data.read_slice_at(sh.pointer_to_raw_data as usize, sh.file_size() as usize)?;
        }
        out.push(sh);
    }
    Ok(out)
}

/// Converts section headers into the format-neutral model.
///
/// Discardable sections (`.reloc`, DWARF sections of MinGW images) are not
/// treated as allocated.
pub fn to_sections(headers: &[SectionHeader], image_base: u64) -> Vec<Section> {
    headers
        .iter()
        .enumerate()
        .map(|(index, sh)| {
            let c = sh.characteristics;
            let mut flags = SectionFlags::empty();
            if c & IMAGE_SCN_MEM_DISCARDABLE == 0 {
                flags |= SectionFlags::ALLOC;
            }
            if c & IMAGE_SCN_MEM_WRITE != 0 {
                flags |= SectionFlags::WRITE;
            }
            if c & (IMAGE_SCN_MEM_EXECUTE | IMAGE_SCN_CNT_CODE) != 0 {
                flags |= SectionFlags::EXEC;
            }
            Section {
                index,
                name: sh.name.clone(),
                addr: image_base.wrapping_add(u64::from(sh.virtual_address)),
                size: u64::from(sh.mem_size()),
                file_offset: u64::from(sh.pointer_to_raw_data),
                file_size: u64::from(sh.file_size()),
                flags,
            }
        })
        .collect()
}
