//! Engine configuration.
//!
//! Nested structs with serde and `Default`, loadable from a JSON file. Every
//! field has a default, so a partial file only overrides what it names.

use crate::error::{ObjError, Result};
use crate::io::IOLimits;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Master configuration for a loaded file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Limits applied when opening files.
    pub io: IOLimits,
    /// Source view layout.
    pub source: SourceConfig,
    /// Runtime function table lookup and index defaults.
    pub functab: FunctabConfig,
}

impl EngineConfig {
    /// Loads a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ObjError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Source view configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Lines of context shown before and after each line with code.
    pub context_lines: u32,
    /// Blocks whose windows come within this many lines are merged.
    pub merge_slack: u32,
    /// Directory that relative source paths are resolved against.
    pub root: Option<PathBuf>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            context_lines: 5,
            merge_slack: 5,
            root: None,
        }
    }
}

/// Runtime function table configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctabConfig {
    /// Section names searched for the table, in order.
    pub section_names: Vec<String>,
    /// Symbol whose bytes hold the table when no section matches.
    pub symbol_name: String,
    /// Index defaults used when DWARF does not supply them.
    pub indices: RuntimeIndices,
}

impl Default for FunctabConfig {
    fn default() -> Self {
        Self {
            section_names: vec![".gopclntab".to_string()],
            symbol_name: "runtime.pclntab".to_string(),
            indices: RuntimeIndices::default(),
        }
    }
}

/// Indexes into a function's PCData and FuncData arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeIndices {
    /// `_PCDATA_StackMapIndex`
    pub stack_map: u32,
    /// `_FUNCDATA_ArgsPointerMaps`
    pub args_pointer_maps: u32,
    /// `_FUNCDATA_LocalsPointerMaps`
    pub locals_pointer_maps: u32,
}

impl Default for RuntimeIndices {
    fn default() -> Self {
        Self {
            stack_map: 1,
            args_pointer_maps: 0,
            locals_pointer_maps: 1,
        }
    }
}
