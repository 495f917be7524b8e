//! Error types for the objscope analysis engine.
//!
//! Each decoding layer has its own `thiserror` enum (`ElfError`, `PeError`,
//! `FunctabError`, `IoError`, `MemoryError`); they all convert into the
//! crate-level [`ObjError`] at the engine boundary.

use crate::analysis::memory::MemoryError;
use crate::analysis::relocations::RelocError;
use crate::formats::elf::ElfError;
use crate::formats::pe::PeError;
use crate::functab::FunctabError;
use crate::io::error::IoError;
use thiserror::Error;

/// Main error type for objscope operations.
#[derive(Debug, Error)]
pub enum ObjError {
    /// No container reader recognized the file.
    #[error("unrecognized object file format")]
    UnrecognizedFormat,

    /// A reader recognized the file but its structure is corrupt.
    #[error("malformed {format} file: {message}")]
    MalformedContainer {
        format: &'static str,
        message: String,
    },

    /// The file carries no usable DWARF.
    #[error("missing debug info: {0}")]
    MissingDebugInfo(String),

    /// Decoding failed for one item (a function, a section, a table).
    #[error("error decoding {scope}: {message}")]
    Decode { scope: String, message: String },

    /// A symbol, section or other named item does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ObjError {
    /// Short machine-readable name used in error responses.
    pub fn kind(&self) -> &'static str {
        match self {
            ObjError::UnrecognizedFormat => "unrecognized_format",
            ObjError::MalformedContainer { .. } => "malformed_container",
            ObjError::MissingDebugInfo(_) => "missing_debug_info",
            ObjError::Decode { .. } => "decode",
            ObjError::NotFound(_) => "not_found",
            ObjError::Io(_) => "io",
            ObjError::Config(_) => "config",
        }
    }

    pub(crate) fn decode(scope: impl Into<String>, err: impl std::fmt::Display) -> Self {
        ObjError::Decode {
            scope: scope.into(),
            message: err.to_string(),
        }
    }
}

impl From<ElfError> for ObjError {
    fn from(err: ElfError) -> Self {
        match err {
            ElfError::InvalidMagic => ObjError::UnrecognizedFormat,
            other => ObjError::MalformedContainer {
                format: "ELF",
                message: other.to_string(),
            },
        }
    }
}

impl From<PeError> for ObjError {
    fn from(err: PeError) -> Self {
        match err {
            PeError::InvalidMagic => ObjError::UnrecognizedFormat,
            other => ObjError::MalformedContainer {
                format: "PE",
                message: other.to_string(),
            },
        }
    }
}

impl From<FunctabError> for ObjError {
    fn from(err: FunctabError) -> Self {
        ObjError::decode("function table", err)
    }
}

impl From<MemoryError> for ObjError {
    fn from(err: MemoryError) -> Self {
        match err {
            MemoryError::Unmapped { addr } => ObjError::NotFound(format!("no data at {:#x}", addr)),
            other => ObjError::decode("memory", other),
        }
    }
}

impl From<RelocError> for ObjError {
    fn from(err: RelocError) -> Self {
        ObjError::decode("relocations", err)
    }
}

impl From<gimli::Error> for ObjError {
    fn from(err: gimli::Error) -> Self {
        ObjError::decode("DWARF", err)
    }
}

impl From<serde_json::Error> for ObjError {
    fn from(err: serde_json::Error) -> Self {
        ObjError::Config(err.to_string())
    }
}

/// Result type alias for objscope operations
pub type Result<T> = std::result::Result<T, ObjError>;
