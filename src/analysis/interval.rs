//! Sorted interval maps over `u64` PCs.
//!
//! An `IntervalMap<T>` holds non-overlapping `[start, end)` ranges, each with
//! a payload. It answers point lookups by binary search and correlates with
//! other maps or query sets by two-pointer sweeps, which is how independently
//! indexed PC data (instruction extents, SP offsets, stack-map indexes,
//! source lines) get lined up against each other.

use crate::core::range::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalMap<T> {
    rows: Vec<(Range, T)>,
}

impl<T> Default for IntervalMap<T> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<T> IntervalMap<T> {
    /// Builds a map from rows in any order. Rows must not overlap.
    pub fn new(mut rows: Vec<(Range, T)>) -> Self {
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        debug_assert!(Self::is_disjoint(&rows));
        Self { rows }
    }

    /// Builds a map from rows already sorted by start.
    pub fn from_sorted(rows: Vec<(Range, T)>) -> Self {
        debug_assert!(rows.windows(2).all(|w| w[0].0.start <= w[1].0.start));
        debug_assert!(Self::is_disjoint(&rows));
        Self { rows }
    }

    fn is_disjoint(rows: &[(Range, T)]) -> bool {
        rows.windows(2).all(|w| w[0].0.end <= w[1].0.start)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[(Range, T)] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (Range, T)> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> Vec<(Range, T)> {
        self.rows
    }

    /// Returns the row containing `point`, if any.
    pub fn find(&self, point: u64) -> Option<&(Range, T)> {
        let i = self.rows.partition_point(|(r, _)| r.end <= point);
        self.rows.get(i).filter(|(r, _)| r.start <= point)
    }

    /// Reports whether any row overlaps any of `queries`.
    pub fn intersects(&self, queries: &[Range]) -> bool {
        let queries = coalesce(queries);
        let (mut i, mut j) = (0, 0);
        while i < self.rows.len() && j < queries.len() {
            let row = &self.rows[i].0;
            if row.overlaps(&queries[j]) {
                return true;
            }
            if row.end <= queries[j].start {
                i += 1;
            } else {
                j += 1;
            }
        }
        false
    }

    /// Returns every row overlapping at least one of `queries`, in map order.
    ///
    /// Queries may overlap each other; each row is reported once.
    pub fn intersecting(&self, queries: &[Range]) -> Vec<&(Range, T)> {
        let queries = coalesce(queries);
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.rows.len() && j < queries.len() {
            let row = &self.rows[i];
            if row.0.overlaps(&queries[j]) {
                out.push(row);
                i += 1;
            } else if row.0.end <= queries[j].start {
                i += 1;
            } else {
                j += 1;
            }
        }
        out
    }

    /// Merges two maps, producing one row per non-empty overlap.
    pub fn join<U, V, F>(&self, other: &IntervalMap<U>, mut combine: F) -> IntervalMap<V>
    where
        F: FnMut(Range, &T, &U) -> V,
    {
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.rows.len() && j < other.rows.len() {
            let (a, av) = &self.rows[i];
            let (b, bv) = &other.rows[j];
            if let Some(overlap) = a.intersect(b) {
                out.push((overlap, combine(overlap, av, bv)));
            }
            if a.end < b.end {
                i += 1;
            } else if b.end < a.end {
                j += 1;
            } else {
                i += 1;
                j += 1;
            }
        }
        IntervalMap { rows: out }
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> IntervalMap<U> {
        IntervalMap {
            rows: self.rows.into_iter().map(|(r, v)| (r, f(v))).collect(),
        }
    }
}

impl<T> FromIterator<(Range, T)> for IntervalMap<T> {
    fn from_iter<I: IntoIterator<Item = (Range, T)>>(iter: I) -> Self {
        IntervalMap::new(iter.into_iter().collect())
    }
}

/// Sorts query ranges and merges overlapping or touching ones.
fn coalesce(queries: &[Range]) -> Vec<Range> {
    let mut sorted = queries.to_vec();
    sorted.sort();
    let mut out: Vec<Range> = Vec::with_capacity(sorted.len());
    for q in sorted {
        match out.last_mut() {
            Some(last) if q.start <= last.end => last.end = last.end.max(q.end),
            _ => out.push(q),
        }
    }
    out
}
