//! The symbol list.

use crate::core::address::HexAddr;
use crate::core::symbol::{Symbol, SymbolKind};
use crate::symtab::SymbolIndex;
use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};

/// One symbol, serialized compactly as `[name, addr, size, kind]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRow {
    pub name: String,
    pub addr: HexAddr,
    pub size: u64,
    pub kind: SymbolKind,
}

impl From<&Symbol> for SymbolRow {
    fn from(sym: &Symbol) -> Self {
        Self {
            name: sym.name.clone(),
            addr: HexAddr(sym.address),
            size: sym.size,
            kind: sym.kind,
        }
    }
}

impl Serialize for SymbolRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(4)?;
        tup.serialize_element(&self.name)?;
        tup.serialize_element(&self.addr)?;
        tup.serialize_element(&self.size)?;
        tup.serialize_element(&self.kind)?;
        tup.end()
    }
}

/// All symbols; row `i` is `SymbolId(i)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SymbolsView {
    pub symbols: Vec<SymbolRow>,
}

pub fn symbols_view(index: &SymbolIndex) -> SymbolsView {
    SymbolsView {
        symbols: index.symbols().iter().map(SymbolRow::from).collect(),
    }
}
