//! Stack maps and per-PC liveness.

use crate::analysis::interval::IntervalMap;
use crate::analysis::memory::MemoryView;
use crate::core::arch::Endianness;
use crate::core::range::Range;
use crate::functab::pctable::PcTable;
use crate::functab::{FunctabError, Result};
use serde::{Serialize, Serializer};
use std::fmt::{self, Write};

/// Stack-map index in effect at a PC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackSlot {
    Index(u32),
    /// The PC is not a safe point; no stack map applies.
    NoSafepoint,
}

impl StackSlot {
    pub fn index(self) -> Option<u32> {
        match self {
            StackSlot::Index(i) => Some(i),
            StackSlot::NoSafepoint => None,
        }
    }
}

/// A pointer bitmap; bit `i` is the LSB-first bit of byte `i / 8`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub n: u32,
    pub bytes: Vec<u8>,
}

impl Bitmap {
    pub fn bit(&self, i: u32) -> Option<bool> {
        if i >= self.n {
            return None;
        }
        let byte = self.bytes.get((i / 8) as usize)?;
        Some((byte >> (i % 8)) & 1 != 0)
    }

    /// `"<bits>:<hex>"` rendering.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(12 + self.bytes.len() * 2);
        let _ = write!(out, "{}:", self.n);
        out.push_str(&hex::encode(&self.bytes));
        out
    }
}

impl fmt::Display for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.n {
            f.write_char(if self.bit(i) == Some(true) { '1' } else { '0' })?;
        }
        Ok(())
    }
}

impl Serialize for Bitmap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Reads the stack map at `addr`: `n: u32`, `nbit: u32`, then `n` bitmaps
/// of `ceil(nbit / 8)` bytes each.
///
/// `n` may not exceed the bytes left in the region after the header, even
/// when the bitmaps are zero bits wide.
pub fn read_stack_map(mem: &dyn MemoryView, addr: u64, endian: Endianness) -> Result<Vec<Bitmap>> {
    let header_end = addr.checked_add(8).ok_or(FunctabError::StackMap { addr })?;
    let n = mem.read_u32(addr, endian)?;
    let nbit = mem.read_u32(addr + 4, endian)?;
    let stride = nbit.div_ceil(8) as usize;
    let room = mem.available(addr)?.saturating_sub(8);
    if u64::from(n) > room / stride.max(1) as u64 {
        return Err(FunctabError::StackMap { addr });
    }
    let total = (n as usize)
        .checked_mul(stride)
        .ok_or(FunctabError::StackMap { addr })?;
    let body = if total == 0 {
        Vec::new()
    } else {
        mem.read_bytes(header_end, total)?
    };
    Ok((0..n as usize)
        .map(|i| Bitmap {
            n: nbit,
            bytes: body[i * stride..(i + 1) * stride].to_vec(),
        })
        .collect())
}

/// Decoded liveness for one function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Liveness {
    /// Stack-map index by PC.
    pub index: IntervalMap<StackSlot>,
    pub args: Vec<Bitmap>,
    pub locals: Vec<Bitmap>,
}

impl Liveness {
    /// Applies the runtime's conventions to a raw stack-map index table.
    ///
    /// -1 means index 0, and index 0 also covers the PCs from `entry` to the
    /// first row. -2 marks PCs that are not safe points. Any other negative
    /// value, or an index past the end of either bitmap array, is an error.
    pub fn decode(entry: u64, raw: &PcTable, args: Vec<Bitmap>, locals: Vec<Bitmap>) -> Result<Self> {
        let mut pcs = raw.pcs.clone();
        let mut values = raw.values.clone();
        for v in values.iter_mut() {
            if *v == -1 {
                *v = 0;
            }
        }
        if let (Some(&first), Some(&v0)) = (pcs.first(), values.first()) {
            if first > entry {
                if v0 == 0 {
                    pcs[0] = entry;
                } else {
                    pcs.insert(0, entry);
                    values.insert(0, 0);
                }
            }
        }

        let mut rows = Vec::with_capacity(values.len());
        for (i, &v) in values.iter().enumerate() {
            let slot = match v {
                -2 => StackSlot::NoSafepoint,
                v if v >= 0 => {
                    let idx = v as u32;
                    for (what, maps) in [("args", &args), ("locals", &locals)] {
                        if idx as usize >= maps.len() {
                            return Err(FunctabError::BadStackIndex {
                                value: v,
                                what,
                                count: maps.len(),
                            });
                        }
                    }
                    StackSlot::Index(idx)
                }
                v => {
                    return Err(FunctabError::BadStackIndex {
                        value: v,
                        what: "stack map",
                        count: 0,
                    })
                }
            };
            if let Some(range) = Range::new(pcs[i], pcs[i + 1]) {
                rows.push((range, slot));
            }
        }

        Ok(Self {
            index: IntervalMap::from_sorted(rows),
            args,
            locals,
        })
    }

    pub fn slot_at(&self, pc: u64) -> Option<StackSlot> {
        self.index.find(pc).map(|(_, s)| *s)
    }
}
