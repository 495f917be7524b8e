//! PE32+ images with a COFF symbol table.

use super::{align, put_u16, put_u32, put_u64};
use object::pe::*;

pub struct PeSection {
    pub name: &'static str,
    pub va: u32,
    pub vsize: u32,
    pub data: Vec<u8>,
    pub characteristics: u32,
}

pub struct PeSym {
    pub name: &'static str,
    pub value: u32,
    pub section: i16,
    pub class: u8,
    pub aux: u8,
}

pub fn sym(name: &'static str, value: u32, section: i16) -> PeSym {
    PeSym {
        name,
        value,
        section,
        class: IMAGE_SYM_CLASS_EXTERNAL,
        aux: 0,
    }
}

/// Builds the image: headers, raw section data, symbols, string table.
/// Names longer than 8 bytes go through the string table.
pub fn build_pe(image_base: u64, sections: &[PeSection], syms: &[PeSym]) -> Vec<u8> {
    let mut strings = vec![0u8; 4];
    let mut long_name = |name: &str| {
        let off = strings.len() as u32;
        strings.extend(name.as_bytes());
        strings.push(0);
        off
    };

    let opt_size = 0xf0usize;
    let table_at = 0x58 + opt_size;
    let mut out = vec![0u8; table_at + sections.len() * 40];
    out[0..2].copy_from_slice(b"MZ");
    put_u32(&mut out, 0x3c, 0x40);
    out[0x40..0x44].copy_from_slice(b"PE\0\0");
    put_u16(&mut out, 0x44, IMAGE_FILE_MACHINE_AMD64);
    put_u16(&mut out, 0x46, sections.len() as u16);
    put_u16(&mut out, 0x54, opt_size as u16);
    put_u16(&mut out, 0x58, IMAGE_NT_OPTIONAL_HDR64_MAGIC);
    put_u64(&mut out, 0x58 + 24, image_base);

    for (i, s) in sections.iter().enumerate() {
        align(&mut out, 0x200);
        let raw_at = if s.data.is_empty() { 0 } else { out.len() as u32 };
        out.extend(&s.data);

        let h = table_at + i * 40;
        if s.name.len() > 8 {
            let name = format!("/{}", long_name(s.name));
            out[h..h + name.len()].copy_from_slice(name.as_bytes());
        } else {
            out[h..h + s.name.len()].copy_from_slice(s.name.as_bytes());
        }
        put_u32(&mut out, h + 8, s.vsize);
        put_u32(&mut out, h + 12, s.va);
        put_u32(&mut out, h + 16, s.data.len() as u32);
        put_u32(&mut out, h + 20, raw_at);
        put_u32(&mut out, h + 36, s.characteristics);
    }

    align(&mut out, 4);
    let symtab_at = out.len() as u32;
    let mut count = 0u32;
    for s in syms {
        let mut rec = [0u8; 18];
        if s.name.len() > 8 {
            rec[4..8].copy_from_slice(&long_name(s.name).to_le_bytes());
        } else {
            rec[..s.name.len()].copy_from_slice(s.name.as_bytes());
        }
        rec[8..12].copy_from_slice(&s.value.to_le_bytes());
        rec[12..14].copy_from_slice(&s.section.to_le_bytes());
        rec[16] = s.class;
        rec[17] = s.aux;
        out.extend(rec);
        out.extend(std::iter::repeat(0u8).take(18 * usize::from(s.aux)));
        count += 1 + u32::from(s.aux);
    }
    let size = strings.len() as u32;
    strings[0..4].copy_from_slice(&size.to_le_bytes());
    out.extend(&strings);

    put_u32(&mut out, 0x4c, symtab_at);
    put_u32(&mut out, 0x50, count);
    out
}

pub const IMAGE_BASE: u64 = 0x1_4000_0000;

/// A PE32+ image:
///
/// | id | symbol               | address         | size | kind |
/// |----|----------------------|-----------------|------|------|
/// | 0  | main                 | base + 0x1010   | 0x10 | T    |
/// | 1  | helper_function_long | base + 0x1020   | 0x20 | T, local |
/// | 2  | counter              | base + 0x2000   | 0x20 | D    |
/// | 3  | buffer               | base + 0x3000   | 0x80 | B    |
/// | 4  | table                | base + 0x4000   | 0x10 | R    |
/// | 5  | ExitProcess          | 0               | 0    | U    |
/// | 6  | abs                  | 7               | 0    | A    |
///
/// `.data` has 16 bytes of file data and 32 in memory. The fifth section,
/// `.debug_line_str`, is discardable and named through the string table.
pub fn sample_pe() -> Vec<u8> {
    let read = IMAGE_SCN_MEM_READ;
    let sections = [
        PeSection {
            name: ".text",
            va: 0x1000,
            vsize: 0x40,
            data: vec![0xcc; 0x40],
            characteristics: IMAGE_SCN_CNT_CODE | IMAGE_SCN_MEM_EXECUTE | read,
        },
        PeSection {
            name: ".data",
            va: 0x2000,
            vsize: 0x20,
            data: vec![0x11; 0x10],
            characteristics: IMAGE_SCN_CNT_INITIALIZED_DATA | IMAGE_SCN_MEM_WRITE | read,
        },
        PeSection {
            name: ".bss",
            va: 0x3000,
            vsize: 0x80,
            data: Vec::new(),
            characteristics: IMAGE_SCN_CNT_UNINITIALIZED_DATA | IMAGE_SCN_MEM_WRITE | read,
        },
        PeSection {
            name: ".rdata",
            va: 0x4000,
            vsize: 0x10,
            data: vec![0x22; 0x10],
            characteristics: IMAGE_SCN_CNT_INITIALIZED_DATA | read,
        },
        PeSection {
            name: ".debug_line_str",
            va: 0x5000,
            vsize: 4,
            data: b"a.c\0".to_vec(),
            characteristics: IMAGE_SCN_CNT_INITIALIZED_DATA | IMAGE_SCN_MEM_DISCARDABLE | read,
        },
    ];
    let syms = [
        sym("main", 0x10, 1),
        PeSym {
            class: IMAGE_SYM_CLASS_STATIC,
            aux: 1,
            ..sym("helper_function_long", 0x20, 1)
        },
        sym("counter", 0, 2),
        sym("buffer", 0, 3),
        sym("table", 0, 4),
        sym("ExitProcess", 0, 0),
        sym("abs", 7, -1),
    ];
    build_pe(IMAGE_BASE, &sections, &syms)
}
