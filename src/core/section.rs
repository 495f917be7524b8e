//! Sections: named, addressed regions of a loaded image.

use crate::core::range::Range;
use bitflags::bitflags;

bitflags! {
    /// Memory attributes of a section.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SectionFlags: u8 {
        /// Occupies memory at run time.
        const ALLOC = 1 << 0;
        const WRITE = 1 << 1;
        const EXEC = 1 << 2;
    }
}

/// A section in format-neutral form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Position in the container's section list.
    pub index: usize,
    pub name: String,
    /// Virtual address of the first byte.
    pub addr: u64,
    /// Size in memory.
    pub size: u64,
    /// Offset of the backing bytes in the file.
    pub file_offset: u64,
    /// Number of backing bytes; 0 for sections such as `.bss`.
    pub file_size: u64,
    pub flags: SectionFlags,
}

impl Section {
    pub fn range(&self) -> Option<Range> {
        Range::with_len(self.addr, self.size)
    }

    pub fn end(&self) -> u64 {
        self.addr.saturating_add(self.size)
    }

    pub fn contains(&self, addr: u64) -> bool {
        self.addr <= addr && addr < self.end()
    }

    pub fn is_alloc(&self) -> bool {
        self.flags.contains(SectionFlags::ALLOC)
    }

    pub fn has_bytes(&self) -> bool {
        self.file_size > 0
    }
}
