//! Runtime function table (`.gopclntab`) decoding.
//!
//! Understands the table layout identified by the magic word `0xfffffffb`:
//! a header, a sorted `(entry PC, record offset)` index, and one function
//! record per entry carrying offsets of its PC-value tables and the
//! addresses of its FuncData blobs. PC-value tables are decoded on demand.

pub mod decoder;
pub mod liveness;
pub mod pctable;

use crate::analysis::memory::{MemoryError, MemoryView};
use crate::config::RuntimeIndices;
use crate::core::arch::Endianness;
use bytes::Bytes;
use decoder::Decoder;
use thiserror::Error;
use tracing::debug;

pub use liveness::{read_stack_map, Bitmap, Liveness, StackSlot};
pub use pctable::PcTable;

const MAGIC: u32 = 0xffff_fffb;

/// Function table decoding errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FunctabError {
    #[error("bad magic word {0:#x} in function table header")]
    BadMagic(u32),
    #[error("unsupported pointer size {0}")]
    PointerSize(u8),
    #[error("truncated at offset {offset:#x}, needed {needed} bytes")]
    Truncated { offset: usize, needed: usize },
    #[error("malformed varint at offset {offset:#x}")]
    Varint { offset: usize },
    #[error("offset {offset:#x} is outside the table")]
    BadOffset { offset: u64 },
    #[error("PC overflow in table of function at {entry:#x}")]
    PcOverflow { entry: u64 },
    #[error("stack map index {value} out of range for {count} {what} bitmaps")]
    BadStackIndex {
        value: i32,
        what: &'static str,
        count: usize,
    },
    #[error("malformed stack map at {addr:#x}")]
    StackMap { addr: u64 },
    #[error(transparent)]
    Memory(#[from] MemoryError),
}

pub type Result<T> = std::result::Result<T, FunctabError>;

/// One function record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Func {
    pub entry: u64,
    pub name: String,
    /// Size of the argument area in bytes.
    pub args: i32,
    pcsp: u32,
    /// PCData table offsets; 0 means absent.
    pcdata: Vec<u32>,
    /// FuncData addresses; 0 means absent.
    funcdata: Vec<u64>,
}

impl Func {
    pub fn pcdata_count(&self) -> usize {
        self.pcdata.len()
    }

    pub fn funcdata(&self, index: u32) -> Option<u64> {
        self.funcdata.get(index as usize).copied().filter(|&a| a != 0)
    }
}

/// A decoded function table.
#[derive(Debug, Clone)]
pub struct FuncTab {
    data: Bytes,
    endian: Endianness,
    ptr_size: u8,
    quantum: u8,
    funcs: Vec<Func>,
    end_pc: u64,
    indices: RuntimeIndices,
}

impl FuncTab {
    /// Decodes the header, the function index and every function record.
    pub fn parse(data: Bytes, indices: RuntimeIndices) -> Result<Self> {
        let magic = data.get(..4).ok_or(FunctabError::Truncated {
            offset: 0,
            needed: 8,
        })?;
        let magic = [magic[0], magic[1], magic[2], magic[3]];
        let endian = if u32::from_le_bytes(magic) == MAGIC {
            Endianness::Little
        } else if u32::from_be_bytes(magic) == MAGIC {
            Endianness::Big
        } else {
            return Err(FunctabError::BadMagic(u32::from_le_bytes(magic)));
        };

        let mut d = Decoder::new(&data, endian, 8);
        d.skip(6)?;
        let quantum = d.u8()?;
        let ptr_size = d.u8()?;
        if ptr_size != 4 && ptr_size != 8 {
            return Err(FunctabError::PointerSize(ptr_size));
        }
        let mut d = Decoder::new(&data, endian, ptr_size);
        d.seek(8)?;

        let nfunc = d.ptr()?;
        let index_size = nfunc
            .checked_mul(2 * u64::from(ptr_size))
            .filter(|&n| n <= data.len() as u64)
            .ok_or(FunctabError::Truncated {
                offset: d.pos(),
                needed: usize::MAX,
            })?;
        let mut offsets = Vec::with_capacity((index_size / (2 * u64::from(ptr_size))) as usize);
        for _ in 0..nfunc {
            d.ptr()?;
            offsets.push(d.ptr()?);
        }
        let end_pc = d.ptr()?;
        d.u32()?; // file table offset

        let mut funcs = Vec::with_capacity(offsets.len());
        for off in offsets {
            funcs.push(parse_func(&data, endian, ptr_size, off)?);
        }

        debug!(
            funcs = funcs.len(),
            ptr_size,
            quantum,
            end_pc,
            "Decoded function table"
        );

        Ok(Self {
            data,
            endian,
            ptr_size,
            quantum,
            funcs,
            end_pc,
            indices,
        })
    }

    pub fn funcs(&self) -> &[Func] {
        &self.funcs
    }

    pub fn end_pc(&self) -> u64 {
        self.end_pc
    }

    pub fn ptr_size(&self) -> u8 {
        self.ptr_size
    }

    pub fn quantum(&self) -> u8 {
        self.quantum
    }

    pub fn endian(&self) -> Endianness {
        self.endian
    }

    pub fn indices(&self) -> RuntimeIndices {
        self.indices
    }

    /// The function whose entry PC is exactly `pc`.
    pub fn func_at_entry(&self, pc: u64) -> Option<&Func> {
        self.funcs
            .binary_search_by_key(&pc, |f| f.entry)
            .ok()
            .map(|i| &self.funcs[i])
    }

    /// The function whose code contains `pc`.
    pub fn func_containing(&self, pc: u64) -> Option<&Func> {
        if pc >= self.end_pc {
            return None;
        }
        let i = self.funcs.partition_point(|f| f.entry <= pc);
        self.funcs.get(i.checked_sub(1)?)
    }

    fn table_at(&self, offset: u32, entry: u64) -> Result<PcTable> {
        let raw = self.data.get(offset as usize..).ok_or(FunctabError::BadOffset {
            offset: u64::from(offset),
        })?;
        PcTable::decode(raw, entry, self.quantum)
    }

    /// SP offset by PC.
    pub fn pcsp(&self, func: &Func) -> Result<PcTable> {
        if func.pcsp == 0 {
            return Ok(PcTable::default());
        }
        self.table_at(func.pcsp, func.entry)
    }

    /// The `index`th PCData table, if the function has one.
    pub fn pcdata(&self, func: &Func, index: u32) -> Result<Option<PcTable>> {
        match func.pcdata.get(index as usize) {
            Some(&off) if off != 0 => self.table_at(off, func.entry).map(Some),
            _ => Ok(None),
        }
    }

    /// Decodes a function's liveness. `Ok(None)` when it has no stack maps
    /// or its locals map holds no bitmaps.
    pub fn liveness(&self, func: &Func, mem: &dyn MemoryView) -> Result<Option<Liveness>> {
        let Some(index) = self.pcdata(func, self.indices.stack_map)? else {
            return Ok(None);
        };
        let (Some(args_at), Some(locals_at)) = (
            func.funcdata(self.indices.args_pointer_maps),
            func.funcdata(self.indices.locals_pointer_maps),
        ) else {
            return Ok(None);
        };
        let args = read_stack_map(mem, args_at, self.endian)?;
        let locals = read_stack_map(mem, locals_at, self.endian)?;
        if locals.is_empty() {
            return Ok(None);
        }
        Liveness::decode(func.entry, &index, args, locals).map(Some)
    }
}

fn parse_func(data: &[u8], endian: Endianness, ptr_size: u8, offset: u64) -> Result<Func> {
    let mut d = Decoder::new(data, endian, ptr_size);
    let start = usize::try_from(offset).map_err(|_| FunctabError::BadOffset { offset })?;
    d.seek(start).map_err(|_| FunctabError::BadOffset { offset })?;

    let entry = d.ptr()?;
    let name_off = d.i32()?;
    let args = d.i32()?;
    d.u32()?; // deferreturn
    let pcsp = d.u32()?;
    d.u32()?; // pcfile
    d.u32()?; // pcln
    let npcdata = d.u32()? as usize;
    d.u8()?; // funcID
    d.skip(2)?;
    let nfuncdata = usize::from(d.u8()?);

    let mut pcdata = Vec::new();
    for _ in 0..npcdata {
        pcdata.push(d.u32()?);
    }
    if ptr_size == 8 && d.pos() & 4 != 0 {
        d.skip(4)?;
    }
    let mut funcdata = Vec::with_capacity(nfuncdata);
    for _ in 0..nfuncdata {
        funcdata.push(d.ptr()?);
    }

    let name_pos = usize::try_from(name_off).map_err(|_| FunctabError::BadOffset {
        offset: name_off as u64,
    })?;
    d.seek(name_pos).map_err(|_| FunctabError::BadOffset {
        offset: name_pos as u64,
    })?;
    let name = d.cstring()?;

    Ok(Func {
        entry,
        name,
        args,
        pcsp,
        pcdata,
        funcdata,
    })
}
