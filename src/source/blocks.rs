//! Grouping line-table rows into padded, merged source blocks.

use crate::core::range::Range;
use crate::formats::dwarf::LineRow;
use std::collections::HashMap;

/// A contiguous run of lines `[start, end)` of one file, with the PC
/// ranges attributed to each line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPlan {
    pub path: String,
    pub start: u64,
    pub end: u64,
    /// One entry per line of the block.
    pub pcs: Vec<Vec<Range>>,
}

/// Builds source blocks from line rows.
///
/// Every row contributes a window of `context` lines on each side of its
/// line. Windows of the same file are merged when the gap between them is
/// at most `slack` lines. Blocks come out ordered by path, then line.
pub fn plan_blocks(rows: &[LineRow], context: u64, slack: u64) -> Vec<BlockPlan> {
    let mut windows: Vec<(&str, u64, u64)> = rows
        .iter()
        .map(|r| {
            (
                r.path.as_str(),
                r.line.saturating_sub(context).max(1),
                r.line.saturating_add(context + 1),
            )
        })
        .collect();
    windows.sort();

    let mut merged: Vec<(&str, u64, u64)> = Vec::new();
    for (path, from, to) in windows {
        match merged.last_mut() {
            Some(prev) if prev.0 == path && prev.2.saturating_add(slack) >= from => {
                prev.2 = prev.2.max(to);
            }
            _ => merged.push((path, from, to)),
        }
    }

    let mut by_line: HashMap<(&str, u64), Vec<Range>> = HashMap::new();
    for r in rows {
        by_line.entry((r.path.as_str(), r.line)).or_default().push(r.pcs);
    }
    for ranges in by_line.values_mut() {
        *ranges = merge_ranges(std::mem::take(ranges));
    }

    merged
        .into_iter()
        .map(|(path, start, end)| BlockPlan {
            path: path.to_string(),
            start,
            end,
            pcs: (start..end)
                .map(|line| by_line.get(&(path, line)).cloned().unwrap_or_default())
                .collect(),
        })
        .collect()
}

/// Sorts ranges and merges those that touch or overlap.
pub fn merge_ranges(mut ranges: Vec<Range>) -> Vec<Range> {
    ranges.sort();
    let mut out: Vec<Range> = Vec::with_capacity(ranges.len());
    for r in ranges {
        match out.last_mut() {
            Some(prev) if prev.end >= r.start => prev.end = prev.end.max(r.end),
            _ => out.push(r),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(path: &str, line: u64, lo: u64, hi: u64) -> LineRow {
        LineRow {
            path: path.into(),
            line,
            pcs: Range::new(lo, hi).unwrap(),
        }
    }

    #[test]
    fn merges_nearby_windows() {
        let rows = vec![
            row("/src/a.go", 10, 0x100, 0x104),
            row("/src/a.go", 11, 0x104, 0x108),
            row("/src/a.go", 10, 0x108, 0x10c),
            row("/src/a.go", 24, 0x10c, 0x110),
            row("/src/a.go", 60, 0x110, 0x114),
        ];
        let blocks = plan_blocks(&rows, 5, 5);
        assert_eq!(blocks.len(), 2);

        // [5, 17) and [19, 30) are 2 lines apart.
        assert_eq!((blocks[0].start, blocks[0].end), (5, 30));
        assert_eq!(blocks[0].pcs.len(), 25);
        assert_eq!(blocks[0].pcs[5], vec![Range::new(0x100, 0x104).unwrap(), Range::new(0x108, 0x10c).unwrap()]);
        assert_eq!(blocks[0].pcs[6], vec![Range::new(0x104, 0x108).unwrap()]);
        assert!(blocks[0].pcs[0].is_empty());

        assert_eq!((blocks[1].start, blocks[1].end), (55, 66));
    }

    #[test]
    fn clamps_and_separates_files() {
        let rows = vec![row("/b.go", 2, 0x10, 0x20), row("/a.go", 2, 0x20, 0x30)];
        let blocks = plan_blocks(&rows, 5, 5);
        assert_eq!(blocks[0].path, "/a.go");
        assert_eq!((blocks[0].start, blocks[0].end), (1, 8));
        assert_eq!(blocks[0].pcs[1], vec![Range::new(0x20, 0x30).unwrap()]);
        assert_eq!(blocks[1].path, "/b.go");
    }

    #[test]
    fn merge_adjacent_ranges() {
        let merged = merge_ranges(vec![
            Range::new(8, 12).unwrap(),
            Range::new(0, 4).unwrap(),
            Range::new(4, 6).unwrap(),
        ]);
        assert_eq!(merged, vec![Range::new(0, 6).unwrap(), Range::new(8, 12).unwrap()]);
    }
}
