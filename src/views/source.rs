//! Source listings interleaved with the PCs each line produced.

use crate::core::range::Range;
use crate::source::{BlockPlan, LineCache, SourceError};
use crate::views::asm::{instruction_map, Instruction};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceBlockView {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    /// 1-based number of the first line.
    pub start: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,
    /// PC ranges per line of the block.
    pub pcs: Vec<Vec<Range>>,
    /// Why `text` is absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Instructions produced by one source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineXref {
    pub block: usize,
    pub line: u64,
    pub instructions: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceView {
    pub blocks: Vec<SourceBlockView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xrefs: Option<Vec<LineXref>>,
}

fn resolve(path: &str, root: Option<&Path>) -> Result<PathBuf, SourceError> {
    let p = Path::new(path);
    if p.is_absolute() {
        return Ok(p.to_path_buf());
    }
    root.map(|r| r.join(p))
        .ok_or_else(|| SourceError::RelativePath(path.to_string()))
}

fn block_text(plan: &BlockPlan, lines: &LineCache, root: Option<&Path>) -> Result<Vec<String>, SourceError> {
    let path = resolve(&plan.path, root)?;
    let n = plan.end.saturating_sub(plan.start);
    let bytes = lines.get(&path, plan.start as i64, n as i64)?;
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    let text = String::from_utf8_lossy(&bytes);
    let text = text.strip_suffix('\n').unwrap_or(&text);
    Ok(text.split('\n').map(str::to_string).collect())
}

/// Fills block plans with source text.
///
/// Blocks whose file cannot be read keep their PCs and carry the error.
/// When `insts` is given, every line with code is cross-referenced to the
/// instructions overlapping its PC ranges.
pub fn source_view(
    plans: Vec<BlockPlan>,
    lines: &LineCache,
    root: Option<&Path>,
    function: Option<&str>,
    insts: Option<&[Instruction]>,
) -> SourceView {
    let blocks: Vec<SourceBlockView> = plans
        .into_iter()
        .map(|plan| match block_text(&plan, lines, root) {
            Ok(text) => {
                let mut pcs = plan.pcs;
                pcs.truncate(text.len());
                SourceBlockView {
                    path: plan.path,
                    function: function.map(str::to_string),
                    start: plan.start,
                    text: Some(text),
                    pcs,
                    error: None,
                }
            }
            Err(err) => {
                debug!(path = %plan.path, error = %err, "Source block unavailable");
                SourceBlockView {
                    path: plan.path,
                    function: function.map(str::to_string),
                    start: plan.start,
                    text: None,
                    pcs: plan.pcs,
                    error: Some(err.to_string()),
                }
            }
        })
        .collect();

    let xrefs = insts.map(|insts| {
        let map = instruction_map(insts);
        let mut out = Vec::new();
        for (b, block) in blocks.iter().enumerate() {
            for (k, ranges) in block.pcs.iter().enumerate() {
                if ranges.is_empty() {
                    continue;
                }
                let hits: Vec<usize> = map.intersecting(ranges).into_iter().map(|(_, i)| *i).collect();
                if !hits.is_empty() {
                    out.push(LineXref {
                        block: b,
                        line: block.start + k as u64,
                        instructions: hits,
                    });
                }
            }
        }
        out
    });

    SourceView { blocks, xrefs }
}
