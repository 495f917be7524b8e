//! Source text for the source view.

pub mod blocks;
pub mod linecache;

use std::path::PathBuf;
use thiserror::Error;

pub use blocks::{merge_ranges, plan_blocks, BlockPlan};
pub use linecache::LineCache;

/// Errors reading source text. Cloneable so failures can be cached.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("{}: {message}", path.display())]
    Read { path: PathBuf, message: String },
    #[error("relative path: {0}")]
    RelativePath(String),
}
