//! Core data types shared by every container reader and view.

pub mod address;
pub mod arch;
pub mod range;
pub mod relocation;
pub mod section;
pub mod symbol;

pub use address::HexAddr;
pub use arch::{ArchInfo, Endianness, Format};
pub use range::Range;
pub use relocation::{RelocType, Relocation, Relocations};
pub use section::{Section, SectionFlags};
pub use symbol::{Symbol, SymbolId, SymbolKind};
