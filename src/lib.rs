//! objscope: queryable, cross-referenced views of compiled program images.
//!
//! The crate reads ELF and PE containers into a uniform model of symbols,
//! sections and relocations, indexes symbols by address, decodes the Go
//! runtime function table (PC tables and stack liveness bitmaps) and joins
//! independently indexed PC-keyed data through sorted interval maps.
//!
//! The entry point is [`engine::LoadedFile`], which owns everything decoded
//! from one file and answers [`views::QueryRequest`]s with serializable
//! [`views::ViewResponse`]s.

pub mod analysis;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod formats;
pub mod functab;
pub mod io;
pub mod logging;
pub mod source;
pub mod symtab;
pub mod views;

pub use crate::engine::LoadedFile;
pub use crate::error::{ObjError, Result};
