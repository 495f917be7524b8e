//! Object file container readers.
//!
//! Each format module decodes its container into the uniform model in
//! `core` and exposes it through the [`Container`] trait. Behaviour that is
//! the same for every format (size synthesis, clipped memory reads, symbol
//! data) lives here as free functions over `&dyn Container`.

pub mod dwarf;
pub mod elf;
pub mod pe;
pub mod sizes;

use crate::analysis::memory::{MemoryError, MemoryView};
use crate::analysis::relocations::RelocError;
use crate::core::arch::{ArchInfo, Endianness, Format};
use crate::core::relocation::Relocations;
use crate::core::section::Section;
use crate::core::symbol::{Symbol, SymbolId};
use crate::error::{ObjError, Result};
use bytes::Bytes;
use tracing::debug;

pub use sizes::synthesize_sizes;

/// A decoded object file.
pub trait Container: Send + Sync {
    fn format(&self) -> Format;

    /// Architecture constants, or `None` for unsupported machines.
    fn arch(&self) -> Option<&'static ArchInfo>;

    fn endianness(&self) -> Endianness;

    /// All symbols, indexed by `SymbolId`. Sizes are already synthesized.
    fn symbols(&self) -> &[Symbol];

    fn sections(&self) -> &[Section];

    /// Backing bytes of a section; empty for sections without file data.
    fn section_bytes(&self, index: usize) -> &[u8];

    /// Relocations of `section` overlapping `[addr, addr + size)`.
    fn relocations(&self, section: usize, addr: u64, size: u64)
        -> std::result::Result<Relocations, RelocError>;

    /// Raw bytes of a DWARF section such as `.debug_info`.
    fn debug_section(&self, name: &str) -> Option<&[u8]>;
}

/// Opens `data` with the first reader that recognizes it.
///
/// A reader that recognizes the magic but fails later ends the search with
/// a `MalformedContainer` error.
pub fn open(data: Bytes) -> Result<Box<dyn Container>> {
    match elf::ElfFile::parse(data.clone()) {
        Ok(file) => {
            debug!(format = "ELF", "Recognized container");
            return Ok(Box::new(file));
        }
        Err(elf::ElfError::InvalidMagic) => {}
        Err(err) => return Err(err.into()),
    }
    match pe::PeFile::parse(data) {
        Ok(file) => {
            debug!(format = "PE", "Recognized container");
            Ok(Box::new(file))
        }
        Err(pe::PeError::InvalidMagic) => Err(ObjError::UnrecognizedFormat),
        Err(err) => Err(err.into()),
    }
}

/// Bytes at an address together with the relocations that patch them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Data {
    pub addr: u64,
    pub bytes: Vec<u8>,
    pub relocs: Relocations,
}

/// First allocated section containing `addr`.
pub fn section_at(container: &dyn Container, addr: u64) -> Option<&Section> {
    container
        .sections()
        .iter()
        .find(|s| s.is_alloc() && s.contains(addr))
}

/// Reads up to `size` bytes at `addr`, clipped to the owning section.
///
/// Returns `None` when no allocated section contains `addr`.
pub fn read_memory(container: &dyn Container, addr: u64, size: u64) -> Result<Option<Data>> {
    let Some(section) = section_at(container, addr) else {
        return Ok(None);
    };
    let size = size.min(section.end() - addr);
    section_data(container, section, addr, size).map(Some)
}

/// Bytes and relocations of a symbol, clipped to its section.
pub fn symbol_data(container: &dyn Container, id: SymbolId) -> Result<Data> {
    let sym = container
        .symbols()
        .get(id.index())
        .ok_or_else(|| ObjError::NotFound(format!("symbol {}", id)))?;
    let section = sym
        .section
        .and_then(|i| container.sections().get(i))
        .ok_or_else(|| ObjError::NotFound(format!("section of symbol {:?}", sym.name)))?;
    if sym.address < section.addr {
        return Err(ObjError::decode(
            format!("symbol {:?}", sym.name),
            format!("starts before section {:?}", section.name),
        ));
    }
    let size = sym.size.min(section.end().saturating_sub(sym.address));
    section_data(container, section, sym.address, size)
}

fn section_data(container: &dyn Container, section: &Section, addr: u64, size: u64) -> Result<Data> {
    let len = usize::try_from(size).map_err(|_| MemoryError::OutOfRange {
        addr,
        len: usize::MAX,
    })?;
    let mut bytes = vec![0u8; len];
    copy_backing(container, section, addr, &mut bytes);
    let relocs = container.relocations(section.index, addr, size)?;
    Ok(Data {
        addr,
        bytes,
        relocs,
    })
}

/// Copies backing bytes for `[addr, addr + out.len())`; the rest stays zero.
fn copy_backing(container: &dyn Container, section: &Section, addr: u64, out: &mut [u8]) {
    let backing = container.section_bytes(section.index);
    let pos = (addr - section.addr) as usize;
    if let Some(avail) = backing.get(pos..) {
        let n = avail.len().min(out.len());
        out[..n].copy_from_slice(&avail[..n]);
    }
}

/// A [`MemoryView`] over a container's allocated sections.
pub struct ContainerMemory<'a>(pub &'a dyn Container);

impl MemoryView for ContainerMemory<'_> {
    fn read_bytes(&self, addr: u64, len: usize) -> std::result::Result<Vec<u8>, MemoryError> {
        let section = section_at(self.0, addr).ok_or(MemoryError::Unmapped { addr })?;
        if (len as u64) > section.end() - addr {
            return Err(MemoryError::OutOfRange { addr, len });
        }
        let mut out = vec![0u8; len];
        copy_backing(self.0, section, addr, &mut out);
        Ok(out)
    }

    fn available(&self, addr: u64) -> std::result::Result<u64, MemoryError> {
        let section = section_at(self.0, addr).ok_or(MemoryError::Unmapped { addr })?;
        Ok(section.end() - addr)
    }
}
