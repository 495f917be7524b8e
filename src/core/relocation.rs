//! Relocations resolved into the loaded file's symbol space.

use crate::core::symbol::SymbolId;
use std::fmt;
use std::ops::Deref;

/// Machine-specific relocation type: the raw number plus its name when known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelocType {
    pub raw: u32,
    pub name: Option<&'static str>,
}

impl fmt::Display for RelocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name {
            Some(name) => f.write_str(name),
            None => write!(f, "unknown({})", self.raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    /// Absolute address of the first patched byte.
    pub offset: u64,
    /// Number of bytes patched; 0 when the type is unknown.
    pub width: u8,
    pub rtype: RelocType,
    /// Target symbol; `None` for relocations against symbol 0.
    pub symbol: Option<SymbolId>,
    /// Explicit addend (RELA) or 0 (REL).
    pub addend: i64,
}

impl Relocation {
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(u64::from(self.width))
    }
}

/// Offset-sorted relocations overlapping a queried byte range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relocations(Vec<Relocation>);

impl Relocations {
    pub fn new(relocs: Vec<Relocation>) -> Self {
        debug_assert!(relocs.windows(2).all(|w| w[0].offset <= w[1].offset));
        Relocations(relocs)
    }

    pub fn empty() -> Self {
        Relocations(Vec::new())
    }
}

impl Deref for Relocations {
    type Target = [Relocation];

    fn deref(&self) -> &[Relocation] {
        &self.0
    }
}

impl IntoIterator for Relocations {
    type Item = Relocation;
    type IntoIter = std::vec::IntoIter<Relocation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
