#![no_main]
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use objscope::config::EngineConfig;
use objscope::core::symbol::SymbolId;
use objscope::views::{QueryRequest, SymbolSelector};

fuzz_target!(|data: &[u8]| {
    let data = Bytes::copy_from_slice(data);
    let _ = objscope::formats::open(data.clone());
    if let Ok(file) = objscope::LoadedFile::from_bytes(data, EngineConfig::default()) {
        let _ = file.query(&QueryRequest::Symbols);
        for id in 0..file.index().symbols().len().min(16) as u32 {
            let symbol = SymbolSelector::Id(SymbolId(id));
            let _ = file.query(&QueryRequest::Hex { symbol: symbol.clone() });
            let _ = file.query(&QueryRequest::Liveness {
                symbol,
                instructions: Vec::new(),
            });
        }
    }
});
