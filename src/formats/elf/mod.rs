//! ELF (Executable and Linkable Format) container reader
//!
//! Supports 32- and 64-bit files in either byte order. The static (`.symtab`)
//! and dynamic (`.dynsym`) symbol tables are concatenated into one
//! `SymbolId` space, static symbols first. Relocation sections are attached
//! to the sections they patch and decoded lazily through
//! `analysis::relocations`.

pub mod headers;
pub mod relocations;
pub mod sections;
pub mod symbols;
pub mod types;
pub mod utils;

use crate::analysis::relocations::{RelocError, RelocSource, RelocationView};
use crate::core::arch::{self, ArchInfo, Endianness, Format};
use crate::core::relocation::Relocations;
use crate::core::section::Section;
use crate::core::symbol::Symbol;
use crate::formats::sizes::synthesize_sizes;
use crate::formats::Container;
use bytes::Bytes;
use headers::parse_header;
use relocations::{reloc_kinds, ElfRelSection, MAX_RELOC_WIDTH};
use sections::SectionTable;
use std::sync::Arc;
use symbols::parse_symbol_table;
use tracing::{debug, warn};
pub use types::*;
use utils::file_range;

/// A parsed ELF file.
pub struct ElfFile {
    data: Bytes,
    header: ElfHeader,
    table: SectionTable,
    sections: Vec<Section>,
    symbols: Vec<Symbol>,
    /// `SymbolId` of the first dynamic symbol.
    dyn_start: u32,
    relocs: RelocationView,
}

impl ElfFile {
    /// Parse ELF from raw data
    pub fn parse(data: Bytes) -> Result<Self> {
        let header = parse_header(&data)?;
        let table = SectionTable::parse(&data, &header)?;
        let sections = table.to_sections();
        let (class, endian) = (header.class, header.data);

        let symtab = table.by_type(SHT_SYMTAB);
        let dynsym = table.by_type(SHT_DYNSYM);

        let mut symbols = match symtab {
            Some(i) => parse_symbol_table(&data, &table, i, class, endian)?,
            None => Vec::new(),
        };
        let dyn_start = symbol_id_base(symbols.len())?;
        if let Some(i) = dynsym {
            symbols.extend(parse_symbol_table(&data, &table, i, class, endian)?);
        }
        synthesize_sizes(&mut symbols, &sections);
        let symbol_count = symbol_id_base(symbols.len())?;

        let relocs = match reloc_kinds(header.e_machine) {
            Some(kinds) => {
                let mut view = RelocationView::new(
                    kinds,
                    MAX_RELOC_WIDTH,
                    symbol_count,
                    sections.iter().map(Section::range),
                );
                attach_relocations(&mut view, &data, &header, &table, &sections, symtab, dynsym, dyn_start)?;
                view
            }
            None => {
                warn!(machine = header.e_machine, "Unsupported ELF machine; relocations not decoded");
                RelocationView::empty()
            }
        };

        debug!(
            class = ?class,
            machine = header.e_machine,
            sections = sections.len(),
            symbols = symbols.len(),
            dyn_start,
            "Parsed ELF file"
        );

        Ok(Self {
            data,
            header,
            table,
            sections,
            symbols,
            dyn_start,
            relocs,
        })
    }

    pub fn header(&self) -> &ElfHeader {
        &self.header
    }

    /// `SymbolId` of the first `.dynsym` entry.
    pub fn dyn_start(&self) -> u32 {
        self.dyn_start
    }

    fn bytes_of(&self, index: usize) -> &[u8] {
        let Some(sh) = self.table.get(index) else {
            return &[];
        };
        // Ranges were validated when the section table was parsed.
        match file_range(&self.data, sh.sh_offset, sh.file_size()) {
            Ok(range) => &self.data[range],
            Err(_) => &[],
        }
    }
}

fn symbol_id_base(count: usize) -> Result<u32> {
    u32::try_from(count).map_err(|_| ElfError::MalformedHeader(format!("{} symbols", count)))
}

/// Maps each REL/RELA section to the sections it patches.
///
/// Sections with out-of-range `sh_info`/`sh_link`, or linked to a symbol
/// table other than the first `.symtab`/`.dynsym`, are skipped.
#[allow(clippy::too_many_arguments)]
fn attach_relocations(
    view: &mut RelocationView,
    data: &Bytes,
    header: &ElfHeader,
    table: &SectionTable,
    sections: &[Section],
    symtab: Option<usize>,
    dynsym: Option<usize>,
    dyn_start: u32,
) -> Result<()> {
    for (index, sh) in table.headers().iter().enumerate().skip(1) {
        let rela = match sh.sh_type {
            SHT_RELA => true,
            SHT_REL => false,
            _ => continue,
        };
        let info = sh.sh_info as usize;
        let link = sh.sh_link as usize;
        if info >= table.count() || link == 0 || link >= table.count() {
            debug!(section = table.name(index), "Skipping malformed relocation section");
            continue;
        }
        let base = if Some(link) == symtab {
            0
        } else if Some(link) == dynsym {
            dyn_start
        } else {
            debug!(section = table.name(index), link, "Relocations against an unindexed symbol table");
            continue;
        };

        let range = file_range(data, sh.sh_offset, sh.file_size())?;
        let decoder = ElfRelSection::new(
            table.name(index).to_string(),
            data.slice(range),
            header.class,
            header.data,
            rela,
        );
        let source = Arc::new(RelocSource::new(base, Box::new(decoder)));

        if info != 0 {
            view.add_source(info, source);
        } else {
            // Applies to every allocated section, as `.rela.dyn` does.
            for target in sections.iter().filter(|s| s.is_alloc()) {
                view.add_source(target.index, source.clone());
            }
        }
    }
    Ok(())
}

impl Container for ElfFile {
    fn format(&self) -> Format {
        Format::Elf
    }

    fn arch(&self) -> Option<&'static ArchInfo> {
        match self.header.e_machine {
            EM_X86_64 => Some(&arch::AMD64),
            EM_386 => Some(&arch::I386),
            _ => None,
        }
    }

    fn endianness(&self) -> Endianness {
        self.header.data.into()
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
        self.table.by_name(name).map(|i| self.bytes_of(i))
    }
}
