//! Disassembly annotation and highlighting.
//!
//! Instructions come from an external decoder; this module attaches symbol
//! names to control-flow targets, liveness, and PC-range highlights.

use crate::analysis::interval::IntervalMap;
use crate::core::address::HexAddr;
use crate::core::range::Range;
use crate::core::symbol::SymbolId;
use crate::symtab::SymbolIndex;
use crate::views::liveness::LivenessView;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlKind {
    #[default]
    None,
    Jump,
    Call,
    Return,
    DynamicJump,
    Exit,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    pub kind: ControlKind,
    #[serde(default)]
    pub conditional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<HexAddr>,
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub pc: HexAddr,
    pub len: u32,
    pub mnemonic: String,
    #[serde(default)]
    pub operands: Vec<String>,
    #[serde(default)]
    pub control: Control,
}

impl Instruction {
    pub fn range(&self) -> Option<Range> {
        Range::with_len(self.pc.0, u64::from(self.len))
    }
}

/// Instruction extents keyed to their position in the stream.
///
/// Empty instructions, and any overlapping an earlier one, are left out.
pub fn instruction_map(insts: &[Instruction]) -> IntervalMap<usize> {
    let mut rows: Vec<(Range, usize)> = insts
        .iter()
        .enumerate()
        .filter_map(|(i, inst)| inst.range().map(|r| (r, i)))
        .collect();
    rows.sort();
    let mut end = 0;
    rows.retain(|(r, _)| {
        let keep = r.start >= end;
        if keep {
            end = r.end;
        }
        keep
    });
    IntervalMap::from_sorted(rows)
}

/// A control-flow target resolved to a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetRef {
    /// Index of the referring instruction.
    pub inst: usize,
    pub id: SymbolId,
    pub name: String,
    pub addr: HexAddr,
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AsmView {
    pub instructions: Vec<Instruction>,
    pub last_pc: HexAddr,
    pub refs: Vec<TargetRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liveness: Option<LivenessView>,
}

pub fn asm_view(insts: Vec<Instruction>, index: &SymbolIndex, liveness: Option<LivenessView>) -> AsmView {
    let refs = insts
        .iter()
        .enumerate()
        .filter_map(|(i, inst)| {
            let target = inst.control.target?;
            let r = index.symbolize(target.0)?;
            Some(TargetRef {
                inst: i,
                id: r.id,
                name: r.name,
                addr: target,
                offset: r.offset,
            })
        })
        .collect();
    let last_pc = insts
        .last()
        .map(|i| HexAddr(i.pc.0.saturating_add(u64::from(i.len))))
        .unwrap_or_default();
    AsmView {
        instructions: insts,
        last_pc,
        refs,
        liveness,
    }
}

/// Indices of the instructions overlapping any selected range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightView {
    pub instructions: Vec<usize>,
}

pub fn highlight(insts: &[Instruction], ranges: &[Range]) -> HighlightView {
    let map = instruction_map(insts);
    HighlightView {
        instructions: map.intersecting(ranges).into_iter().map(|(_, i)| *i).collect(),
    }
}
