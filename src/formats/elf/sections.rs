//! Section header table

use crate::core::section::{Section, SectionFlags};
use crate::formats::elf::types::*;
use crate::formats::elf::utils::{file_range, read_addr, read_cstring, EndianRead};
use std::collections::HashMap;

/// `e_shstrndx` escape meaning "the real index is in section 0's `sh_link`".
const SHN_XINDEX: u16 = 0xffff;

/// Parsed section headers with resolved names.
#[derive(Debug, Clone, Default)]
pub struct SectionTable {
    headers: Vec<SectionHeader>,
    names: Vec<String>,
    by_name: HashMap<String, usize>,
}

impl SectionTable {
    /// Parse the section header table and validate every section's file range.
    pub fn parse(data: &[u8], header: &ElfHeader) -> Result<Self> {
        if header.e_shoff == 0 {
            return Ok(Self::default());
        }
        let class = header.class;
        let endian = header.data;
        let entsize = usize::from(header.e_shentsize);
        let shoff = usize::try_from(header.e_shoff).map_err(|_| ElfError::InvalidOffset {
            offset: header.e_shoff,
        })?;

        // Section 0 carries the real count and string table index when they overflow.
        let first = parse_section_header(data, shoff, class, endian)?;
        let count = match header.e_shnum {
            0 => usize::try_from(first.sh_size).map_err(|_| {
                ElfError::MalformedHeader(format!("section count {}", first.sh_size))
            })?,
            n => usize::from(n),
        };
        let shstrndx = match header.e_shstrndx {
            SHN_XINDEX => first.sh_link as usize,
            n => usize::from(n),
        };

        let table_size = count.checked_mul(entsize).ok_or(ElfError::Truncated {
            offset: shoff,
            needed: usize::MAX,
        })?;
        file_range(data, header.e_shoff, table_size as u64)?;

        let mut headers = Vec::with_capacity(count);
        for i in 0..count {
            let sh = parse_section_header(data, shoff + i * entsize, class, endian)?;
            if sh.file_size() > 0 {
                file_range(data, sh.sh_offset, sh.sh_size)?;
            }
            headers.push(sh);
        }

        let strings: &[u8] = match headers.get(shstrndx) {
            Some(sh) if shstrndx != 0 => {
                let range = file_range(data, sh.sh_offset, sh.file_size())?;
                &data[range]
            }
            _ => &[],
        };

        let mut names = Vec::with_capacity(count);
        let mut by_name = HashMap::new();
        for (i, sh) in headers.iter().enumerate() {
            let name = if strings.is_empty() {
                String::new()
            } else {
                read_cstring(strings, sh.sh_name as usize)?.to_string()
            };
            if !name.is_empty() {
                by_name.entry(name.clone()).or_insert(i);
            }
            names.push(name);
        }

        Ok(Self {
            headers,
            names,
            by_name,
        })
    }

    pub fn headers(&self) -> &[SectionHeader] {
        &self.headers
    }

    pub fn get(&self, index: usize) -> Option<&SectionHeader> {
        self.headers.get(index)
    }

    pub fn name(&self, index: usize) -> &str {
        self.names.get(index).map_or("", String::as_str)
    }

    /// Index of the first section with this name.
    pub fn by_name(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn count(&self) -> usize {
        self.headers.len()
    }

    /// Index of the first section of the given type.
    pub fn by_type(&self, sh_type: u32) -> Option<usize> {
        self.headers.iter().position(|sh| sh.sh_type == sh_type)
    }

    /// Converts to format-neutral sections, index-aligned with the headers.
    pub fn to_sections(&self) -> Vec<Section> {
        self.headers
            .iter()
            .enumerate()
            .map(|(index, sh)| {
                let mut flags = SectionFlags::empty();
                flags.set(SectionFlags::ALLOC, sh.has_flag(SHF_ALLOC));
                flags.set(SectionFlags::WRITE, sh.has_flag(SHF_WRITE));
                flags.set(SectionFlags::EXEC, sh.has_flag(SHF_EXECINSTR));
                Section {
                    index,
                    name: self.name(index).to_string(),
                    addr: sh.sh_addr,
                    size: sh.sh_size,
                    file_offset: sh.sh_offset,
                    file_size: sh.file_size(),
                    flags,
                }
            })
            .collect()
    }
}

/// Parse a single section header
fn parse_section_header(
    data: &[u8],
    offset: usize,
    class: ElfClass,
    endian: ElfData,
) -> Result<SectionHeader> {
    match class {
        ElfClass::Elf32 => Ok(SectionHeader {
            sh_name: data.read_u32(offset, endian)?,
            sh_type: data.read_u32(offset + 4, endian)?,
            sh_flags: u64::from(data.read_u32(offset + 8, endian)?),
            sh_addr: u64::from(data.read_u32(offset + 12, endian)?),
            sh_offset: u64::from(data.read_u32(offset + 16, endian)?),
            sh_size: u64::from(data.read_u32(offset + 20, endian)?),
            sh_link: data.read_u32(offset + 24, endian)?,
            sh_info: data.read_u32(offset + 28, endian)?,
            sh_entsize: u64::from(data.read_u32(offset + 36, endian)?),
        }),
        ElfClass::Elf64 => Ok(SectionHeader {
            sh_name: data.read_u32(offset, endian)?,
            sh_type: data.read_u32(offset + 4, endian)?,
            sh_flags: data.read_u64(offset + 8, endian)?,
            sh_addr: read_addr(data, offset + 16, class, endian)?,
            sh_offset: data.read_u64(offset + 24, endian)?,
            sh_size: data.read_u64(offset + 32, endian)?,
            sh_link: data.read_u32(offset + 40, endian)?,
            sh_info: data.read_u32(offset + 44, endian)?,
            sh_entsize: data.read_u64(offset + 56, endian)?,
        }),
    }
}
