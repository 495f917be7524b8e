//! REL/RELA table decoding and per-machine relocation type tables

use crate::analysis::relocations::{RawReloc, RelocDecoder, RelocError, RelocKind, RelocKindFn};
use crate::formats::elf::types::*;
use crate::formats::elf::utils::EndianRead;
use bytes::Bytes;
use object::elf as abi;

/// Widest relocation in any supported machine table.
pub const MAX_RELOC_WIDTH: u8 = 16;

/// One `SHT_REL` or `SHT_RELA` section, decoded on first use.
pub struct ElfRelSection {
    name: String,
    data: Bytes,
    class: ElfClass,
    endian: ElfData,
    rela: bool,
}

impl ElfRelSection {
    pub fn new(name: String, data: Bytes, class: ElfClass, endian: ElfData, rela: bool) -> Self {
        Self {
            name,
            data,
            class,
            endian,
            rela,
        }
    }

    fn parse_entry(&self, offset: usize) -> Result<RawReloc> {
        let d: &[u8] = &self.data;
        let e = self.endian;
        Ok(match self.class {
            ElfClass::Elf32 => {
                let info = d.read_u32(offset + 4, e)?;
                RawReloc {
                    offset: u64::from(d.read_u32(offset, e)?),
                    r_type: info & 0xff,
                    sym: info >> 8,
                    addend: if self.rela {
                        i64::from(d.read_u32(offset + 8, e)? as i32)
                    } else {
                        0
                    },
                }
            }
            ElfClass::Elf64 => {
                let info = d.read_u64(offset + 8, e)?;
                RawReloc {
                    offset: d.read_u64(offset, e)?,
                    r_type: (info & 0xffff_ffff) as u32,
                    sym: (info >> 32) as u32,
                    addend: if self.rela {
                        d.read_u64(offset + 16, e)? as i64
                    } else {
                        0
                    },
                }
            }
        })
    }
}

impl RelocDecoder for ElfRelSection {
    fn name(&self) -> &str {
        &self.name
    }

    fn decode(&self) -> std::result::Result<Vec<RawReloc>, RelocError> {
        let entsize = self.class.rel_size(self.rela);
        // A trailing partial entry is ignored.
        let count = self.data.len() / entsize;
        (0..count)
            .map(|i| self.parse_entry(i * entsize))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| RelocError::Table {
                table: self.name.clone(),
                message: e.to_string(),
            })
    }
}

/// Relocation type table for a machine, if it is supported.
pub fn reloc_kinds(machine: u16) -> Option<RelocKindFn> {
    match machine {
        EM_X86_64 => Some(x86_64_kind),
        EM_386 => Some(i386_kind),
        _ => None,
    }
}

const fn kind(name: &'static str, width: u8) -> Option<RelocKind> {
    Some(RelocKind { name, width })
}

fn x86_64_kind(r_type: u32) -> Option<RelocKind> {
    match r_type {
        abi::R_X86_64_NONE => kind("R_X86_64_NONE", 0),
        abi::R_X86_64_64 => kind("R_X86_64_64", 8),
        abi::R_X86_64_PC32 => kind("R_X86_64_PC32", 4),
        abi::R_X86_64_GOT32 => kind("R_X86_64_GOT32", 4),
        abi::R_X86_64_PLT32 => kind("R_X86_64_PLT32", 4),
        abi::R_X86_64_COPY => kind("R_X86_64_COPY", 0),
        abi::R_X86_64_GLOB_DAT => kind("R_X86_64_GLOB_DAT", 8),
        abi::R_X86_64_JUMP_SLOT => kind("R_X86_64_JUMP_SLOT", 8),
        abi::R_X86_64_RELATIVE => kind("R_X86_64_RELATIVE", 8),
        abi::R_X86_64_GOTPCREL => kind("R_X86_64_GOTPCREL", 4),
        abi::R_X86_64_32 => kind("R_X86_64_32", 4),
        abi::R_X86_64_32S => kind("R_X86_64_32S", 4),
        abi::R_X86_64_16 => kind("R_X86_64_16", 2),
        abi::R_X86_64_PC16 => kind("R_X86_64_PC16", 2),
        abi::R_X86_64_8 => kind("R_X86_64_8", 1),
        abi::R_X86_64_PC8 => kind("R_X86_64_PC8", 1),
        abi::R_X86_64_DTPMOD64 => kind("R_X86_64_DTPMOD64", 8),
        abi::R_X86_64_DTPOFF64 => kind("R_X86_64_DTPOFF64", 8),
        abi::R_X86_64_TPOFF64 => kind("R_X86_64_TPOFF64", 8),
        abi::R_X86_64_TLSGD => kind("R_X86_64_TLSGD", 4),
        abi::R_X86_64_TLSLD => kind("R_X86_64_TLSLD", 4),
        abi::R_X86_64_DTPOFF32 => kind("R_X86_64_DTPOFF32", 4),
        abi::R_X86_64_GOTTPOFF => kind("R_X86_64_GOTTPOFF", 4),
        abi::R_X86_64_TPOFF32 => kind("R_X86_64_TPOFF32", 4),
        abi::R_X86_64_PC64 => kind("R_X86_64_PC64", 8),
        abi::R_X86_64_GOTOFF64 => kind("R_X86_64_GOTOFF64", 8),
        abi::R_X86_64_GOTPC32 => kind("R_X86_64_GOTPC32", 4),
        abi::R_X86_64_GOT64 => kind("R_X86_64_GOT64", 8),
        abi::R_X86_64_GOTPCREL64 => kind("R_X86_64_GOTPCREL64", 8),
        abi::R_X86_64_GOTPC64 => kind("R_X86_64_GOTPC64", 8),
        abi::R_X86_64_GOTPLT64 => kind("R_X86_64_GOTPLT64", 8),
        abi::R_X86_64_PLTOFF64 => kind("R_X86_64_PLTOFF64", 8),
        abi::R_X86_64_SIZE32 => kind("R_X86_64_SIZE32", 4),
        abi::R_X86_64_SIZE64 => kind("R_X86_64_SIZE64", 8),
        abi::R_X86_64_GOTPC32_TLSDESC => kind("R_X86_64_GOTPC32_TLSDESC", 4),
        abi::R_X86_64_TLSDESC_CALL => kind("R_X86_64_TLSDESC_CALL", 0),
        abi::R_X86_64_TLSDESC => kind("R_X86_64_TLSDESC", 16),
        abi::R_X86_64_IRELATIVE => kind("R_X86_64_IRELATIVE", 8),
        abi::R_X86_64_RELATIVE64 => kind("R_X86_64_RELATIVE64", 8),
        // Deprecated MPX types, absent from current headers.
        39 => kind("R_X86_64_PC32_BND", 4),
        40 => kind("R_X86_64_PLT32_BND", 4),
        abi::R_X86_64_GOTPCRELX => kind("R_X86_64_GOTPCRELX", 4),
        abi::R_X86_64_REX_GOTPCRELX => kind("R_X86_64_REX_GOTPCRELX", 4),
        _ => None,
    }
}

fn i386_kind(r_type: u32) -> Option<RelocKind> {
    match r_type {
        abi::R_386_NONE => kind("R_386_NONE", 0),
        abi::R_386_32 => kind("R_386_32", 4),
        abi::R_386_PC32 => kind("R_386_PC32", 4),
        abi::R_386_GOT32 => kind("R_386_GOT32", 4),
        abi::R_386_PLT32 => kind("R_386_PLT32", 4),
        abi::R_386_COPY => kind("R_386_COPY", 0),
        abi::R_386_GLOB_DAT => kind("R_386_GLOB_DAT", 4),
        abi::R_386_JMP_SLOT => kind("R_386_JMP_SLOT", 4),
        abi::R_386_RELATIVE => kind("R_386_RELATIVE", 4),
        abi::R_386_GOTOFF => kind("R_386_GOTOFF", 4),
        abi::R_386_GOTPC => kind("R_386_GOTPC", 4),
        abi::R_386_TLS_TPOFF => kind("R_386_TLS_TPOFF", 4),
        abi::R_386_TLS_IE => kind("R_386_TLS_IE", 4),
        abi::R_386_TLS_GOTIE => kind("R_386_TLS_GOTIE", 4),
        abi::R_386_TLS_LE => kind("R_386_TLS_LE", 4),
        abi::R_386_TLS_GD => kind("R_386_TLS_GD", 4),
        abi::R_386_TLS_LDM => kind("R_386_TLS_LDM", 4),
        abi::R_386_16 => kind("R_386_16", 2),
        abi::R_386_PC16 => kind("R_386_PC16", 2),
        abi::R_386_8 => kind("R_386_8", 1),
        abi::R_386_PC8 => kind("R_386_PC8", 1),
        abi::R_386_TLS_GD_32 => kind("R_386_TLS_GD_32", 4),
        abi::R_386_TLS_GD_PUSH => kind("R_386_TLS_GD_PUSH", 4),
        abi::R_386_TLS_GD_CALL => kind("R_386_TLS_GD_CALL", 4),
        abi::R_386_TLS_GD_POP => kind("R_386_TLS_GD_POP", 4),
        abi::R_386_TLS_LDM_32 => kind("R_386_TLS_LDM_32", 4),
        abi::R_386_TLS_LDM_PUSH => kind("R_386_TLS_LDM_PUSH", 4),
        abi::R_386_TLS_LDM_CALL => kind("R_386_TLS_LDM_CALL", 4),
        abi::R_386_TLS_LDM_POP => kind("R_386_TLS_LDM_POP", 4),
        abi::R_386_TLS_LDO_32 => kind("R_386_TLS_LDO_32", 4),
        abi::R_386_TLS_IE_32 => kind("R_386_TLS_IE_32", 4),
        abi::R_386_TLS_LE_32 => kind("R_386_TLS_LE_32", 4),
        abi::R_386_TLS_DTPMOD32 => kind("R_386_TLS_DTPMOD32", 4),
        abi::R_386_TLS_DTPOFF32 => kind("R_386_TLS_DTPOFF32", 4),
        abi::R_386_TLS_TPOFF32 => kind("R_386_TLS_TPOFF32", 4),
        abi::R_386_SIZE32 => kind("R_386_SIZE32", 4),
        abi::R_386_TLS_GOTDESC => kind("R_386_TLS_GOTDESC", 4),
        abi::R_386_TLS_DESC_CALL => kind("R_386_TLS_DESC_CALL", 0),
        abi::R_386_TLS_DESC => kind("R_386_TLS_DESC", 4),
        abi::R_386_IRELATIVE => kind("R_386_IRELATIVE", 4),
        abi::R_386_GOT32X => kind("R_386_GOT32X", 4),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_rela64() {
        let mut data = Vec::new();
        for (off, sym, ty, add) in [(0x1010u64, 3u64, 2u64, -4i64), (0x1000, 0, 8, 0x2000)] {
            data.extend_from_slice(&off.to_le_bytes());
            data.extend_from_slice(&((sym << 32) | ty).to_le_bytes());
            data.extend_from_slice(&add.to_le_bytes());
        }
        data.extend_from_slice(&[0u8; 5]);
        let sec = ElfRelSection::new(
            ".rela.text".into(),
            Bytes::from(data),
            ElfClass::Elf64,
            ElfData::Little,
            true,
        );
        let relocs = sec.decode().unwrap();
        assert_eq!(relocs.len(), 2);
        assert_eq!(
            relocs[0],
            RawReloc {
                offset: 0x1010,
                r_type: 2,
                sym: 3,
                addend: -4
            }
        );
        assert_eq!(relocs[1].addend, 0x2000);
    }

    #[test]
    fn decodes_rel32_big_endian() {
        let mut data = Vec::new();
        data.extend_from_slice(&0x8000u32.to_be_bytes());
        data.extend_from_slice(&((5u32 << 8) | 1).to_be_bytes());
        let sec = ElfRelSection::new(
            ".rel.text".into(),
            Bytes::from(data),
            ElfClass::Elf32,
            ElfData::Big,
            false,
        );
        let relocs = sec.decode().unwrap();
        assert_eq!(
            relocs,
            vec![RawReloc {
                offset: 0x8000,
                r_type: 1,
                sym: 5,
                addend: 0
            }]
        );
    }

    #[test]
    fn machine_tables() {
        let x86_64 = reloc_kinds(EM_X86_64).unwrap();
        assert_eq!(x86_64(abi::R_X86_64_PC32).map(|k| k.width), Some(4));
        assert_eq!(x86_64(abi::R_X86_64_TLSDESC).map(|k| k.width), Some(MAX_RELOC_WIDTH));
        assert_eq!(x86_64(40).map(|k| k.name), Some("R_X86_64_PLT32_BND"));
        assert!(x86_64(1000).is_none());

        let i386 = reloc_kinds(EM_386).unwrap();
        assert_eq!(i386(abi::R_386_32).map(|k| k.width), Some(4));
        assert_eq!(i386(abi::R_386_8).map(|k| k.name), Some("R_386_8"));

        assert!(reloc_kinds(abi::EM_AARCH64).is_none());
    }
}
