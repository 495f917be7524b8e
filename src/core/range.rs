//! Half-open address ranges.

use crate::core::address::HexAddr;
use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};
use std::fmt;

/// `[start, end)` over `u64`. Ordered by `(start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Range {
    pub start: u64,
    pub end: u64,
}

impl Range {
    /// Returns `None` for empty or inverted ranges.
    pub fn new(start: u64, end: u64) -> Option<Self> {
        (start < end).then_some(Range { start, end })
    }

    /// Range of `len` bytes at `start`, saturating at the top of the address space.
    pub fn with_len(start: u64, len: u64) -> Option<Self> {
        Range::new(start, start.saturating_add(len))
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, addr: u64) -> bool {
        self.start <= addr && addr < self.end
    }

    pub fn overlaps(&self, other: &Range) -> bool {
        self.end > other.start && self.start < other.end
    }

    pub fn intersect(&self, other: &Range) -> Option<Range> {
        Range::new(self.start.max(other.start), self.end.min(other.end))
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x})", self.start, self.end)
    }
}

/// Serialized as a `[lo, hi]` pair of hex addresses.
impl Serialize for Range {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&HexAddr(self.start))?;
        tup.serialize_element(&HexAddr(self.end))?;
        tup.end()
    }
}
