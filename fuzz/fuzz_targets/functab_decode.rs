#![no_main]
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use objscope::analysis::memory::SliceMemoryView;
use objscope::config::RuntimeIndices;
use objscope::core::arch::Endianness;
use objscope::functab::{read_stack_map, FuncTab, PcTable};

fuzz_target!(|data: &[u8]| {
    let _ = PcTable::decode(data, 0x1000, 1);
    let mem = SliceMemoryView::new(0x5000, data);
    let _ = read_stack_map(&mem, 0x5000, Endianness::Little);
    if let Ok(tab) = FuncTab::parse(Bytes::copy_from_slice(data), RuntimeIndices::default()) {
        for func in tab.funcs().iter().take(16) {
            let _ = tab.liveness(func, &mem);
        }
    }
});
