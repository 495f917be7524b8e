//! PE container reading: COFF symbols, section characteristics and
//! memory layout.

mod common;

use bytes::Bytes;
use common::pe::{sample_pe, IMAGE_BASE};
use objscope::core::{Format, SymbolId};
use objscope::formats::{self, read_memory, symbol_data};
use objscope::symtab::SymbolIndex;

fn open_sample() -> Box<dyn formats::Container> {
    formats::open(Bytes::from(sample_pe())).unwrap()
}

#[test]
fn coff_symbols() {
    let c = open_sample();
    assert_eq!(c.format(), Format::Pe);
    assert_eq!(c.arch().map(|a| a.ptr_size), Some(8));

    let summary: Vec<(&str, u64, u64, char, bool)> = c
        .symbols()
        .iter()
        .map(|s| (s.name.as_str(), s.address, s.size, s.kind.as_char(), s.local))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("main", IMAGE_BASE + 0x1010, 0x10, 'T', false),
            ("helper_function_long", IMAGE_BASE + 0x1020, 0x20, 'T', true),
            ("counter", IMAGE_BASE + 0x2000, 0x20, 'D', false),
            ("buffer", IMAGE_BASE + 0x3000, 0x80, 'B', false),
            ("table", IMAGE_BASE + 0x4000, 0x10, 'R', false),
            ("ExitProcess", 0, 0, 'U', false),
            ("abs", 7, 0, 'A', false),
        ]
    );
    assert!(!c.symbols()[5].has_addr);
    assert!(!c.symbols()[6].has_addr);
}

#[test]
fn sections() {
    let c = open_sample();
    let s = c.sections();
    assert_eq!(s.len(), 5);
    assert_eq!(s[0].addr, IMAGE_BASE + 0x1000);
    assert_eq!(s[4].name, ".debug_line_str");
    assert!(!s[4].is_alloc());
    assert!(s[2].is_alloc());
    assert!(!s[2].has_bytes());
    assert_eq!(c.debug_section(".debug_line_str"), Some(&b"a.c\0"[..]));
}

#[test]
fn data_past_raw_size_is_zero() {
    let c = open_sample();
    let d = symbol_data(c.as_ref(), SymbolId(2)).unwrap();
    let mut expected = vec![0x11; 0x10];
    expected.resize(0x20, 0);
    assert_eq!(d.bytes, expected);
    assert!(d.relocs.is_empty());

    // Discardable sections are not mapped.
    assert!(read_memory(c.as_ref(), IMAGE_BASE + 0x5000, 4).unwrap().is_none());
}

#[test]
fn address_lookup() {
    let c = open_sample();
    let index = SymbolIndex::new(c.symbols().to_vec());
    assert_eq!(index.by_address(IMAGE_BASE + 0x1000), None);
    assert_eq!(index.by_address(IMAGE_BASE + 0x1018), Some(SymbolId(0)));
    assert_eq!(index.by_address(IMAGE_BASE + 0x103f), Some(SymbolId(1)));
    assert_eq!(index.by_name("helper_function_long"), Some(SymbolId(1)));
    let r = index.symbolize(IMAGE_BASE + 0x4004).unwrap();
    assert_eq!((r.name.as_str(), r.offset), ("table", 4));
}

#[test]
fn truncated_image_is_malformed() {
    let mut image = sample_pe();
    image.truncate(0x100);
    let err = formats::open(Bytes::from(image)).err().unwrap();
    assert_eq!(err.kind(), "malformed_container");
    assert!(err.to_string().contains("PE"));
}
