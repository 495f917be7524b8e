//! PE (Portable Executable) container reader
//!
//! Reads PE32 and PE32+ images for i386 and x86-64. Symbols come from the
//! COFF symbol table (MinGW and Go toolchains keep it in linked images).
//! Base relocations are not decoded, so every relocation query is empty.

pub mod headers;
pub mod sections;
pub mod symbols;
pub mod types;
pub mod utils;

use crate::analysis::relocations::{RelocError, RelocationView};
use crate::core::arch::{self, ArchInfo, Endianness, Format};
use crate::core::relocation::Relocations;
use crate::core::section::Section;
use crate::core::symbol::Symbol;
use crate::formats::sizes::synthesize_sizes;
use crate::formats::Container;
use bytes::Bytes;
use headers::parse_headers;
use sections::{parse_sections, to_sections};
use symbols::{parse_coff_symbols, string_table, to_symbols};
use tracing::debug;
pub use types::*;

/// A parsed PE image.
pub struct PeFile {
    data: Bytes,
    headers: PeHeaders,
    section_headers: Vec<SectionHeader>,
    sections: Vec<Section>,
    symbols: Vec<Symbol>,
    relocs: RelocationView,
}

impl PeFile {
    /// Parse PE from raw data
    pub fn parse(data: Bytes) -> Result<Self> {
        let headers = parse_headers(&data)?;
        let strings = string_table(&data, &headers)?;
        let section_headers = parse_sections(&data, &headers, strings)?;
        let sections = to_sections(&section_headers, headers.image_base);

        let coff = parse_coff_symbols(&data, &headers, strings)?;
        let mut symbols = to_symbols(&coff, &section_headers, headers.image_base);
        synthesize_sizes(&mut symbols, &sections);

        debug!(
            machine = headers.machine,
            pe32_plus = headers.pe32_plus,
            image_base = headers.image_base,
            sections = sections.len(),
            symbols = symbols.len(),
            "Parsed PE file"
        );

        Ok(Self {
            data,
            headers,
            section_headers,
            sections,
            symbols,
            relocs: RelocationView::empty(),
        })
    }

    pub fn headers(&self) -> &PeHeaders {
        &self.headers
    }

    pub fn image_base(&self) -> u64 {
        self.headers.image_base
    }

    fn bytes_of(&self, index: usize) -> &[u8] {
        let Some(sh) = self.section_headers.get(index) else {
            return &[];
        };
        let start = sh.pointer_to_raw_data as usize;
        let end = start + sh.file_size() as usize;
        self.data.get(start..end).unwrap_or(&[])
    }
}

impl Container for PeFile {
    fn format(&self) -> Format {
        Format::Pe
    }

    fn arch(&self) -> Option<&'static ArchInfo> {
        match self.headers.machine {
            IMAGE_FILE_MACHINE_AMD64 => Some(&arch::AMD64),
            IMAGE_FILE_MACHINE_I386 => Some(&arch::I386),
            _ => None,
        }
    }

    fn endianness(&self) -> Endianness {
        Endianness::Little
    }

    fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    fn sections(&self) -> &[Section] {
        &self.sections
    }

    fn section_bytes(&self, index: usize) -> &[u8] {
        self.bytes_of(index)
    }

    fn relocations(
        &self,
        section: usize,
        addr: u64,
        size: u64,
    ) -> std::result::Result<Relocations, RelocError> {
        self.relocs.relocations_in(section, addr, size)
    }

    fn debug_section(&self, name: &str) -> Option<&[u8]> {
        self.section_headers
            .iter()
            .position(|sh| sh.name == name)
            .map(|i| self.bytes_of(i))
    }
}
