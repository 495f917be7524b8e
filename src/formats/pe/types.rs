//! Core PE/COFF types and errors.

use thiserror::Error;

pub use object::pe::{
    IMAGE_DOS_SIGNATURE, IMAGE_FILE_MACHINE_AMD64, IMAGE_FILE_MACHINE_I386,
    IMAGE_NT_OPTIONAL_HDR32_MAGIC, IMAGE_NT_OPTIONAL_HDR64_MAGIC, IMAGE_NT_SIGNATURE,
    IMAGE_SCN_CNT_CODE, IMAGE_SCN_CNT_INITIALIZED_DATA, IMAGE_SCN_CNT_UNINITIALIZED_DATA,
    IMAGE_SCN_MEM_DISCARDABLE, IMAGE_SCN_MEM_EXECUTE, IMAGE_SCN_MEM_WRITE,
    IMAGE_SYM_CLASS_STATIC,
};

/// Special COFF section numbers.
pub const SYM_UNDEFINED: i16 = 0;
pub const SYM_ABSOLUTE: i16 = -1;
pub const SYM_DEBUG: i16 = -2;

/// Size of one COFF symbol table record.
pub const SYMBOL_SIZE: usize = 18;
/// Size of one section table entry.
pub const SECTION_HEADER_SIZE: usize = 40;

/// PE parsing errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PeError {
    #[error("invalid DOS signature")]
    InvalidMagic,
    #[error("invalid PE signature")]
    InvalidPeSignature,
    #[error("invalid optional header magic: {0:#06x}")]
    InvalidOptionalMagic(u16),
    #[error("truncated at {offset:#x}, needed {needed} bytes")]
    Truncated { offset: usize, needed: usize },
    #[error("invalid section name {0:?}")]
    InvalidSectionName(String),
    #[error("malformed symbol table: {0}")]
    MalformedSymbolTable(String),
}

pub type Result<T> = std::result::Result<T, PeError>;

/// The parts of the COFF and optional headers this crate needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeHeaders {
    pub machine: u16,
    pub number_of_sections: u16,
    pub pointer_to_symbol_table: u32,
    pub number_of_symbols: u32,
    /// File offset of the first section header.
    pub section_table_offset: usize,
    pub pe32_plus: bool,
    pub image_base: u64,
}

/// Section table entry with its name resolved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SectionHeader {
    pub name: String,
    pub virtual_size: u32,
    pub virtual_address: u32,
    pub size_of_raw_data: u32,
    pub pointer_to_raw_data: u32,
    pub characteristics: u32,
}

impl SectionHeader {
    /// Size in memory; some linkers leave `VirtualSize` zero.
    pub fn mem_size(&self) -> u32 {
        if self.virtual_size == 0 {
            self.size_of_raw_data
        } else {
            self.virtual_size
        }
    }

    /// Bytes backed by file data.
    pub fn file_size(&self) -> u32 {
        if self.characteristics & IMAGE_SCN_CNT_UNINITIALIZED_DATA != 0 {
            0
        } else {
            self.size_of_raw_data.min(self.mem_size())
        }
    }
}

/// A primary COFF symbol record (auxiliary records already skipped).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoffSymbol {
    pub name: String,
    pub value: u32,
    pub section_number: i16,
    pub storage_class: u8,
}
