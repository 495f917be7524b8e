//! Lazily merged, per-section relocation view.
//!
//! A section may receive relocations from several tables (`.rela.text` and
//! `.rela.dyn`, say), each resolving symbols against a different symbol
//! table. On first query for a section every contributing table is decoded,
//! filtered to the section's address range and merged into one
//! offset-sorted array that remembers each entry's symbol-table base. The
//! merged array is computed once per section and shared; decode errors are
//! cached with it.

use crate::core::range::Range;
use crate::core::relocation::{RelocType, Relocation, Relocations};
use crate::core::symbol::SymbolId;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RelocError {
    #[error("relocation table {table}: {message}")]
    Table { table: String, message: String },
}

/// One relocation entry as stored in its table, before symbol remapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReloc {
    pub offset: u64,
    pub r_type: u32,
    /// Index into the owning symbol table; 0 means no symbol.
    pub sym: u32,
    pub addend: i64,
}

/// Name and patch width of a relocation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocKind {
    pub name: &'static str,
    pub width: u8,
}

/// Per-machine relocation type table.
pub type RelocKindFn = fn(u32) -> Option<RelocKind>;

fn no_kinds(_: u32) -> Option<RelocKind> {
    None
}

/// Decodes one relocation table on demand.
pub trait RelocDecoder: Send + Sync {
    fn name(&self) -> &str;
    fn decode(&self) -> Result<Vec<RawReloc>, RelocError>;
}

/// A relocation table plus the base that maps its symbol indexes into
/// `SymbolId` space. Shared by every section it applies to.
pub struct RelocSource {
    scope_base: u32,
    decoder: Box<dyn RelocDecoder>,
    decoded: OnceLock<Result<Arc<[RawReloc]>, RelocError>>,
}

impl RelocSource {
    pub fn new(scope_base: u32, decoder: Box<dyn RelocDecoder>) -> Self {
        Self {
            scope_base,
            decoder,
            decoded: OnceLock::new(),
        }
    }

    fn entries(&self) -> Result<Arc<[RawReloc]>, RelocError> {
        self.decoded
            .get_or_init(|| {
                let mut entries = self.decoder.decode()?;
                entries.sort_by_key(|r| r.offset);
                debug!(table = self.decoder.name(), count = entries.len(), "Decoded relocation table");
                Ok(entries.into())
            })
            .clone()
    }
}

#[derive(Debug, Clone, Copy)]
struct ScopedReloc {
    raw: RawReloc,
    base: u32,
}

struct SectionRelocs {
    range: Option<Range>,
    sources: Vec<Arc<RelocSource>>,
    merged: OnceLock<Result<Arc<[ScopedReloc]>, RelocError>>,
}

/// Relocations of every section of one container.
pub struct RelocationView {
    kinds: RelocKindFn,
    max_width: u64,
    symbol_count: u32,
    sections: Vec<SectionRelocs>,
}

impl RelocationView {
    /// Creates a view with no sources for sections at the given address ranges.
    pub fn new(
        kinds: RelocKindFn,
        max_width: u8,
        symbol_count: u32,
        section_ranges: impl IntoIterator<Item = Option<Range>>,
    ) -> Self {
        Self {
            kinds,
            max_width: u64::from(max_width),
            symbol_count,
            sections: section_ranges
                .into_iter()
                .map(|range| SectionRelocs {
                    range,
                    sources: Vec::new(),
                    merged: OnceLock::new(),
                })
                .collect(),
        }
    }

    /// A view for containers without symbol-bearing relocations.
    pub fn empty() -> Self {
        Self::new(no_kinds, 0, 0, std::iter::empty())
    }

    /// Registers `source` as contributing to `section`. Out-of-range sections are ignored.
    pub fn add_source(&mut self, section: usize, source: Arc<RelocSource>) {
        if let Some(sect) = self.sections.get_mut(section) {
            sect.sources.push(source);
        }
    }

    pub fn has_sources(&self, section: usize) -> bool {
        self.sections
            .get(section)
            .is_some_and(|s| !s.sources.is_empty())
    }

    pub fn kind(&self, r_type: u32) -> Option<RelocKind> {
        (self.kinds)(r_type)
    }

    fn merged(&self, sect: &SectionRelocs) -> Result<Arc<[ScopedReloc]>, RelocError> {
        sect.merged
            .get_or_init(|| {
                let Some(range) = sect.range else {
                    return Ok(Arc::from(Vec::new()));
                };
                let mut merged = Vec::new();
                for source in &sect.sources {
                    let entries = source.entries()?;
                    let lo = entries.partition_point(|r| r.offset < range.start);
                    let hi = entries.partition_point(|r| r.offset < range.end);
                    merged.extend(entries[lo..hi].iter().map(|raw| ScopedReloc {
                        raw: *raw,
                        base: source.scope_base,
                    }));
                }
                // Stable sort keeps table order for entries at the same offset.
                merged.sort_by_key(|r| r.raw.offset);
                Ok(merged.into())
            })
            .clone()
    }

    /// Returns the relocations of `section` overlapping `[addr, addr + size)`.
    pub fn relocations_in(
        &self,
        section: usize,
        addr: u64,
        size: u64,
    ) -> Result<Relocations, RelocError> {
        let Some(sect) = self.sections.get(section) else {
            return Ok(Relocations::empty());
        };
        if sect.sources.is_empty() {
            return Ok(Relocations::empty());
        }
        let merged = self.merged(sect)?;
        let end = addr.saturating_add(size);

        // Conservative by the widest relocation; trimmed exactly below.
        let lo = merged.partition_point(|r| r.raw.offset.saturating_add(self.max_width) <= addr);
        let hi = merged.partition_point(|r| r.raw.offset < end);

        let relocs = merged[lo..hi.max(lo)]
            .iter()
            .map(|r| self.resolve(r))
            .filter(|r| r.offset >= addr || r.end() > addr)
            .collect();
        Ok(Relocations::new(relocs))
    }

    fn resolve(&self, scoped: &ScopedReloc) -> Relocation {
        let kind = self.kind(scoped.raw.r_type);
        let symbol = match scoped.raw.sym {
            0 => None,
            k => scoped
                .base
                .checked_add(k - 1)
                .filter(|id| *id < self.symbol_count)
                .map(SymbolId),
        };
        Relocation {
            offset: scoped.raw.offset,
            width: kind.map_or(0, |k| k.width),
            rtype: RelocType {
                raw: scoped.raw.r_type,
                name: kind.map(|k| k.name),
            },
            symbol,
            addend: scoped.raw.addend,
        }
    }
}
