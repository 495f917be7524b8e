//! Core ELF types and errors.
//!
//! Numeric constants (`SHT_*`, `SHF_*`, `SHN_*`, `STT_*`, `EM_*`) come from
//! `object::elf` so they are spelled the same as everywhere else.

use crate::core::arch::Endianness;
use thiserror::Error;

pub use object::elf::{
    EM_386, EM_X86_64, SHF_ALLOC, SHF_EXECINSTR, SHF_WRITE, SHN_ABS, SHN_COMMON, SHN_LORESERVE,
    SHN_UNDEF, SHT_DYNSYM, SHT_NOBITS, SHT_REL, SHT_RELA, SHT_SYMTAB, STB_LOCAL, STT_FILE,
    STT_TLS,
};

/// ELF parsing errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ElfError {
    #[error("invalid ELF magic")]
    InvalidMagic,
    #[error("unsupported ELF class: {0}")]
    UnsupportedClass(u8),
    #[error("unsupported ELF data encoding: {0}")]
    UnsupportedData(u8),
    #[error("invalid offset: {offset:#x}")]
    InvalidOffset { offset: u64 },
    #[error("truncated at {offset:#x}, needed {needed} bytes")]
    Truncated { offset: usize, needed: usize },
    #[error("invalid section index: {0}")]
    InvalidSectionIndex(u32),
    #[error("malformed header: {0}")]
    MalformedHeader(String),
    #[error("string not UTF-8 at {offset:#x}")]
    InvalidString { offset: usize },
}

pub type Result<T> = std::result::Result<T, ElfError>;

/// ELF magic number
pub const ELF_MAGIC: &[u8; 4] = b"\x7fELF";

/// ELF class (32-bit or 64-bit)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfClass {
    Elf32 = 1,
    Elf64 = 2,
}

impl ElfClass {
    pub fn from_u8(val: u8) -> Result<Self> {
        match val {
            1 => Ok(ElfClass::Elf32),
            2 => Ok(ElfClass::Elf64),
            _ => Err(ElfError::UnsupportedClass(val)),
        }
    }

    /// Size of a symbol table entry.
    pub fn sym_size(self) -> usize {
        match self {
            ElfClass::Elf32 => 16,
            ElfClass::Elf64 => 24,
        }
    }

    /// Size of a relocation entry, with or without explicit addend.
    pub fn rel_size(self, rela: bool) -> usize {
        match (self, rela) {
            (ElfClass::Elf32, false) => 8,
            (ElfClass::Elf32, true) => 12,
            (ElfClass::Elf64, false) => 16,
            (ElfClass::Elf64, true) => 24,
        }
    }

    pub fn section_header_size(self) -> usize {
        match self {
            ElfClass::Elf32 => 40,
            ElfClass::Elf64 => 64,
        }
    }
}

/// ELF data encoding (endianness)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfData {
    Little = 1,
    Big = 2,
}

impl ElfData {
    pub fn from_u8(val: u8) -> Result<Self> {
        match val {
            1 => Ok(ElfData::Little),
            2 => Ok(ElfData::Big),
            _ => Err(ElfError::UnsupportedData(val)),
        }
    }
}

impl From<ElfData> for Endianness {
    fn from(data: ElfData) -> Self {
        match data {
            ElfData::Little => Endianness::Little,
            ElfData::Big => Endianness::Big,
        }
    }
}

/// The parts of the file header this crate needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElfHeader {
    pub class: ElfClass,
    pub data: ElfData,
    pub e_type: u16,
    pub e_machine: u16,
    pub e_shoff: u64,
    pub e_shentsize: u16,
    pub e_shnum: u16,
    pub e_shstrndx: u16,
}

/// Section header table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionHeader {
    pub sh_name: u32,
    pub sh_type: u32,
    pub sh_flags: u64,
    pub sh_addr: u64,
    pub sh_offset: u64,
    pub sh_size: u64,
    pub sh_link: u32,
    pub sh_info: u32,
    pub sh_entsize: u64,
}

impl SectionHeader {
    /// Bytes the section occupies in the file.
    pub fn file_size(&self) -> u64 {
        if self.sh_type == SHT_NOBITS {
            0
        } else {
            self.sh_size
        }
    }

    pub fn has_flag(&self, flag: u32) -> bool {
        self.sh_flags & u64::from(flag) != 0
    }
}

/// Symbol table entry as stored in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawSymbol {
    pub st_name: u32,
    pub st_info: u8,
    pub st_shndx: u16,
    pub st_value: u64,
    pub st_size: u64,
}

impl RawSymbol {
    pub fn bind(&self) -> u8 {
        self.st_info >> 4
    }

    pub fn sym_type(&self) -> u8 {
        self.st_info & 0xf
    }
}
