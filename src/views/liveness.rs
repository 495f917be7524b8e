//! Per-instruction stack liveness.

use crate::core::address::HexAddr;
use crate::core::arch::ArchInfo;
use crate::functab::{Bitmap, Liveness, PcTable, StackSlot};
use crate::views::asm::Instruction;
use serde::Serialize;

/// Frame layout over a PC range where both the SP offset and the stack map
/// index are constant. Offsets are relative to SP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameRow {
    pub start: HexAddr,
    pub end: HexAddr,
    pub sp_offset: i64,
    pub index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locals_offset: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args_offset: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LivenessView {
    pub ptr_size: u8,
    pub varp_delta: i64,
    pub argp_delta: i64,
    /// SP offset at each instruction.
    pub sp_offsets: Vec<Option<i64>>,
    /// Stack map index at each instruction; `None` at non-safe points.
    pub indexes: Vec<Option<u32>>,
    pub locals: Vec<Bitmap>,
    pub args: Vec<Bitmap>,
    pub frames: Vec<FrameRow>,
}

pub fn liveness_view(arch: &ArchInfo, liveness: &Liveness, pcsp: &PcTable, insts: &[Instruction]) -> LivenessView {
    let sp_offsets = insts.iter().map(|i| pcsp.lookup(i.pc.0).map(i64::from)).collect();
    let indexes = insts
        .iter()
        .map(|i| liveness.slot_at(i.pc.0).and_then(StackSlot::index))
        .collect();

    let frames = pcsp
        .to_interval_map()
        .join(&liveness.index, |range, &sp, &slot| {
            let sp_offset = i64::from(sp);
            let index = slot.index();
            let frame = arch.frame_size(sp_offset);
            FrameRow {
                start: HexAddr(range.start),
                end: HexAddr(range.end),
                sp_offset,
                index,
                locals_offset: index.map(|_| frame + arch.varp_delta()),
                args_offset: index.map(|_| frame + arch.argp_delta()),
            }
        })
        .into_rows()
        .into_iter()
        .map(|(_, row)| row)
        .collect();

    LivenessView {
        ptr_size: arch.ptr_size,
        varp_delta: arch.varp_delta(),
        argp_delta: arch.argp_delta(),
        sp_offsets,
        indexes,
        locals: liveness.locals.clone(),
        args: liveness.args.clone(),
        frames,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::interval::IntervalMap;
    use crate::core::arch::AMD64;
    use crate::core::range::Range;
    use crate::views::asm::tests::inst;

    #[test]
    fn joins_sp_and_index_tables() {
        let pcsp = PcTable {
            pcs: vec![0x1000, 0x1004, 0x1020],
            values: vec![0, 24],
            missing: None,
        };
        let r = |a, b| Range::new(a, b).unwrap();
        let liveness = Liveness {
            index: IntervalMap::from_sorted(vec![
                (r(0x1000, 0x1010), StackSlot::Index(0)),
                (r(0x1010, 0x1018), StackSlot::NoSafepoint),
                (r(0x1018, 0x1020), StackSlot::Index(1)),
            ]),
            args: vec![Bitmap { n: 1, bytes: vec![1] }; 2],
            locals: vec![Bitmap { n: 2, bytes: vec![2] }; 2],
        };
        let insts = vec![inst(0x1000, 4, "SUBQ"), inst(0x1010, 4, "CALL"), inst(0x1020, 1, "RET")];
        let view = liveness_view(&AMD64, &liveness, &pcsp, &insts);

        assert_eq!(view.sp_offsets, vec![Some(0), Some(24), None]);
        assert_eq!(view.indexes, vec![Some(0), None, None]);
        assert_eq!(view.varp_delta, -8);

        let spans: Vec<(u64, u64)> = view.frames.iter().map(|f| (f.start.0, f.end.0)).collect();
        assert_eq!(spans, vec![(0x1000, 0x1004), (0x1004, 0x1010), (0x1010, 0x1018), (0x1018, 0x1020)]);
        assert_eq!(view.frames[1].locals_offset, Some(24));
        assert_eq!(view.frames[1].args_offset, Some(32));
        assert_eq!(view.frames[2].index, None);
        assert_eq!(view.frames[2].locals_offset, None);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["locals"][0], "2:02");
        assert_eq!(json["indexes"][1], serde_json::Value::Null);
    }
}
