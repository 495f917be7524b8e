//! PC-value tables.
//!
//! A table maps consecutive PC ranges to `i32` values. The encoding is a
//! sequence of `(value delta, pc delta)` pairs: a zig-zag varint added to the
//! running value (which starts at -1), then an unsigned varint PC advance in
//! units of the PC quantum. A zero value delta after the first pair ends the
//! table.

use crate::analysis::interval::IntervalMap;
use crate::core::arch::Endianness;
use crate::core::range::Range;
use crate::functab::decoder::Decoder;
use crate::functab::{FunctabError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PcTable {
    /// Row boundaries; one longer than `values`.
    pub pcs: Vec<u64>,
    pub values: Vec<i32>,
    /// Rows whose value is meaningless, when any are.
    pub missing: Option<Vec<bool>>,
}

impl PcTable {
    /// Decodes the table at the start of `data` for a function at `entry`.
    pub fn decode(data: &[u8], entry: u64, quantum: u8) -> Result<Self> {
        let mut d = Decoder::new(data, Endianness::Little, 8);
        let mut pc = entry;
        let mut value: i32 = -1;
        let mut table = PcTable::default();
        loop {
            let delta = d.varint()?;
            if delta == 0 && !table.values.is_empty() {
                break;
            }
            value = value.wrapping_add(delta as i32);
            table.pcs.push(pc);
            table.values.push(value);

            let advance = d.uvarint()?.checked_mul(u64::from(quantum));
            pc = advance
                .and_then(|a| pc.checked_add(a))
                .ok_or(FunctabError::PcOverflow { entry })?;
        }
        table.pcs.push(pc);
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn is_missing(&self, row: usize) -> bool {
        self.missing
            .as_ref()
            .and_then(|m| m.get(row).copied())
            .unwrap_or(false)
    }

    /// Value at `pc`, or `None` outside the table or in a missing row.
    pub fn lookup(&self, pc: u64) -> Option<i32> {
        let first = *self.pcs.first()?;
        let last = *self.pcs.last()?;
        if pc < first || pc >= last {
            return None;
        }
        let row = self.pcs.partition_point(|&p| p <= pc) - 1;
        if self.is_missing(row) {
            return None;
        }
        self.values.get(row).copied()
    }

    /// Non-empty, non-missing rows as an interval map.
    pub fn to_interval_map(&self) -> IntervalMap<i32> {
        let rows = self
            .values
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.is_missing(*i))
            .filter_map(|(i, &v)| Range::new(self.pcs[i], self.pcs[i + 1]).map(|r| (r, v)))
            .collect();
        IntervalMap::from_sorted(rows)
    }
}
