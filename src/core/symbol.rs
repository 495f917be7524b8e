//! Symbols in format-neutral form.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense zero-based identifier of a symbol within one loaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse classification, rendered as the `nm`-style letters `T D R B U A ?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Text,
    Data,
    ROData,
    Bss,
    Undefined,
    Absolute,
    Unknown,
}

impl SymbolKind {
    pub fn as_char(self) -> char {
        match self {
            SymbolKind::Text => 'T',
            SymbolKind::Data => 'D',
            SymbolKind::ROData => 'R',
            SymbolKind::Bss => 'B',
            SymbolKind::Undefined => 'U',
            SymbolKind::Absolute => 'A',
            SymbolKind::Unknown => '?',
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl Serialize for SymbolKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_char(self.as_char())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub address: u64,
    pub size: u64,
    pub kind: SymbolKind,
    /// Not visible outside its object file.
    pub local: bool,
    /// False for symbols with no meaningful address (undefined, absolute,
    /// thread-local, file markers). Such symbols are never address-resolved.
    pub has_addr: bool,
    /// Index of the owning section, when there is one.
    pub section: Option<usize>,
}

impl Symbol {
    pub fn end(&self) -> u64 {
        self.address.saturating_add(self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_letters() {
        let letters: String = [
            SymbolKind::Text,
            SymbolKind::Data,
            SymbolKind::ROData,
            SymbolKind::Bss,
            SymbolKind::Undefined,
            SymbolKind::Absolute,
            SymbolKind::Unknown,
        ]
        .iter()
        .map(|k| k.as_char())
        .collect();
        assert_eq!(letters, "TDRBUA?");
        assert_eq!(serde_json::to_string(&SymbolKind::Bss).unwrap(), "\"B\"");
    }
}
