//! Symbol index: name and address lookup over a container's symbols.

use crate::core::symbol::{Symbol, SymbolId, SymbolKind};
use serde::Serialize;
use std::collections::HashMap;

/// A resolved address: the owning symbol and the offset into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolRef {
    pub id: SymbolId,
    pub name: String,
    pub base: u64,
    pub offset: u64,
}

/// Address-sorted, binary-searchable index over one file's symbols.
#[derive(Debug, Clone, Default)]
pub struct SymbolIndex {
    symbols: Vec<Symbol>,
    /// Ids of addressable symbols, ordered by `(address, name)`.
    sorted: Vec<SymbolId>,
    names: HashMap<String, SymbolId>,
}

impl SymbolIndex {
    /// Builds the index. `symbols` is indexed by `SymbolId`.
    pub fn new(symbols: Vec<Symbol>) -> Self {
        let mut sorted: Vec<SymbolId> = symbols
            .iter()
            .enumerate()
            .filter(|(_, s)| s.has_addr)
            .map(|(i, _)| SymbolId(i as u32))
            .collect();
        sorted.sort_by(|a, b| {
            let (sa, sb) = (&symbols[a.index()], &symbols[b.index()]);
            sa.address.cmp(&sb.address).then_with(|| sa.name.cmp(&sb.name))
        });

        let mut names = HashMap::with_capacity(symbols.len());
        for (i, sym) in symbols.iter().enumerate() {
            if sym.kind != SymbolKind::Undefined {
                names.insert(sym.name.clone(), SymbolId(i as u32));
            }
        }

        Self {
            symbols,
            sorted,
            names,
        }
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.index())
    }

    /// Every symbol, in `SymbolId` order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Addressable symbols in address order.
    pub fn sorted(&self) -> &[SymbolId] {
        &self.sorted
    }

    /// Exact name lookup. With duplicate names the highest id wins.
    pub fn by_name(&self, name: &str) -> Option<SymbolId> {
        self.names.get(name).copied()
    }

    /// The symbol containing `addr`.
    ///
    /// Among the symbols sharing the greatest start address `<= addr`, the
    /// first whose extent covers `addr` wins. Failing that, the first
    /// zero-sized one is taken, unless it is the last symbol of the index.
    /// A forward scan from the last tied symbol would prefer later names
    /// instead; this index always starts at the first of the tie run.
    pub fn by_address(&self, addr: u64) -> Option<SymbolId> {
        let addr_of = |i: usize| self.symbols[self.sorted[i].index()].address;

        let upper = self.sorted.partition_point(|id| self.symbols[id.index()].address <= addr);
        let mut start = upper.checked_sub(1)?;
        let run_addr = addr_of(start);
        while start > 0 && addr_of(start - 1) == run_addr {
            start -= 1;
        }

        let mut zero_sized = None;
        for i in start..upper {
            let sym = &self.symbols[self.sorted[i].index()];
            if addr < sym.end() {
                return Some(self.sorted[i]);
            }
            if zero_sized.is_none() && sym.size == 0 {
                zero_sized = Some(i);
            }
        }
        zero_sized
            .filter(|&i| i + 1 != self.sorted.len())
            .map(|i| self.sorted[i])
    }

    /// Resolves `addr` to a symbol name plus offset.
    pub fn symbolize(&self, addr: u64) -> Option<SymbolRef> {
        let id = self.by_address(addr)?;
        let sym = self.get(id)?;
        Some(SymbolRef {
            id,
            name: sym.name.clone(),
            base: sym.address,
            offset: addr - sym.address,
        })
    }
}
