//! Analysis-time data structures shared across views.
//!
//! `interval` is the range-query layer, `relocations` the lazily merged
//! per-section relocation view, and `memory` the bounded read interface
//! decoders use to chase pointers into a loaded image.

pub mod interval;
pub mod memory;
pub mod relocations;
