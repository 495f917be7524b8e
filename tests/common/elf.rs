//! Little-endian ELF64 images.

use super::{align, put_u16, put_u32, put_u64};
use object::elf::*;

#[derive(Debug, Clone, Default)]
pub struct ElfSection {
    pub name: String,
    pub sh_type: u32,
    pub flags: u32,
    pub addr: u64,
    pub data: Vec<u8>,
    /// Size in memory when it differs from `data` (NOBITS).
    pub size: Option<u64>,
    pub link: u32,
    pub info: u32,
    pub entsize: u64,
}

impl ElfSection {
    pub fn progbits(name: &str, flags: u32, addr: u64, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            sh_type: SHT_PROGBITS,
            flags,
            addr,
            data,
            ..Default::default()
        }
    }

    pub fn nobits(name: &str, flags: u32, addr: u64, size: u64) -> Self {
        Self {
            name: name.into(),
            sh_type: SHT_NOBITS,
            flags,
            addr,
            size: Some(size),
            ..Default::default()
        }
    }

    pub fn table(name: &str, sh_type: u32, data: Vec<u8>, link: u32, info: u32, entsize: u64) -> Self {
        Self {
            name: name.into(),
            sh_type,
            data,
            link,
            info,
            entsize,
            ..Default::default()
        }
    }
}

pub struct ElfBuilder {
    machine: u16,
    sections: Vec<ElfSection>,
}

impl ElfBuilder {
    pub fn new(machine: u16) -> Self {
        Self {
            machine,
            sections: Vec::new(),
        }
    }

    /// Adds a section and returns its index; index 0 is the null section.
    pub fn add(&mut self, section: ElfSection) -> u32 {
        self.sections.push(section);
        self.sections.len() as u32
    }

    /// Lays out data, then `.shstrtab`, then the section header table.
    pub fn build(&self) -> Vec<u8> {
        let mut shstrtab = vec![0u8];
        let mut names = Vec::new();
        for s in &self.sections {
            names.push(shstrtab.len() as u32);
            shstrtab.extend(s.name.as_bytes());
            shstrtab.push(0);
        }
        let shstrtab_name = shstrtab.len() as u32;
        shstrtab.extend(b".shstrtab\0");

        let mut out = vec![0u8; 64];
        let mut offsets = Vec::new();
        for s in &self.sections {
            align(&mut out, 8);
            offsets.push(out.len() as u64);
            if s.sh_type != SHT_NOBITS {
                out.extend(&s.data);
            }
        }
        align(&mut out, 8);
        let shstrtab_off = out.len() as u64;
        out.extend(&shstrtab);
        align(&mut out, 8);

        let shoff = out.len() as u64;
        let shnum = self.sections.len() + 2;
        out.extend([0u8; 64]);
        for (i, s) in self.sections.iter().enumerate() {
            let size = s.size.unwrap_or(s.data.len() as u64);
            push_shdr(&mut out, names[i], s, offsets[i], size);
        }
        let strtab = ElfSection {
            sh_type: SHT_STRTAB,
            ..Default::default()
        };
        push_shdr(&mut out, shstrtab_name, &strtab, shstrtab_off, shstrtab.len() as u64);

        out[0..4].copy_from_slice(b"\x7fELF");
        out[4] = ELFCLASS64;
        out[5] = ELFDATA2LSB;
        out[6] = EV_CURRENT;
        put_u16(&mut out, 16, ET_EXEC);
        put_u16(&mut out, 18, self.machine);
        put_u32(&mut out, 20, 1);
        put_u64(&mut out, 40, shoff);
        put_u16(&mut out, 52, 64);
        put_u16(&mut out, 58, 64);
        put_u16(&mut out, 60, shnum as u16);
        put_u16(&mut out, 62, (shnum - 1) as u16);
        out
    }
}

fn push_shdr(out: &mut Vec<u8>, name: u32, s: &ElfSection, offset: u64, size: u64) {
    out.extend(name.to_le_bytes());
    out.extend(s.sh_type.to_le_bytes());
    out.extend(u64::from(s.flags).to_le_bytes());
    out.extend(s.addr.to_le_bytes());
    out.extend(offset.to_le_bytes());
    out.extend(size.to_le_bytes());
    out.extend(s.link.to_le_bytes());
    out.extend(s.info.to_le_bytes());
    out.extend(8u64.to_le_bytes());
    out.extend(s.entsize.to_le_bytes());
}

pub struct ElfSym {
    pub name: &'static str,
    pub value: u64,
    pub size: u64,
    pub shndx: u16,
    pub bind: u8,
    pub kind: u8,
}

pub fn func(name: &'static str, value: u64, size: u64, shndx: u16) -> ElfSym {
    ElfSym {
        name,
        value,
        size,
        shndx,
        bind: STB_GLOBAL,
        kind: STT_FUNC,
    }
}

pub fn object(name: &'static str, value: u64, size: u64, shndx: u16) -> ElfSym {
    ElfSym {
        kind: STT_OBJECT,
        ..func(name, value, size, shndx)
    }
}

/// Encodes a symbol table (null entry first) and its string table.
pub fn symtab(syms: &[ElfSym]) -> (Vec<u8>, Vec<u8>) {
    let mut strings = vec![0u8];
    let mut table = vec![0u8; 24];
    for s in syms {
        let name = strings.len() as u32;
        strings.extend(s.name.as_bytes());
        strings.push(0);
        table.extend(name.to_le_bytes());
        table.push((s.bind << 4) | (s.kind & 0xf));
        table.push(0);
        table.extend(s.shndx.to_le_bytes());
        table.extend(s.value.to_le_bytes());
        table.extend(s.size.to_le_bytes());
    }
    (table, strings)
}

/// Encodes `(offset, symbol index, type, addend)` RELA entries.
pub fn rela(entries: &[(u64, u32, u32, i64)]) -> Vec<u8> {
    let mut out = Vec::new();
    for &(offset, sym, r_type, addend) in entries {
        out.extend(offset.to_le_bytes());
        out.extend(((u64::from(sym) << 32) | u64::from(r_type)).to_le_bytes());
        out.extend(addend.to_le_bytes());
    }
    out
}

/// An x86-64 executable with static and dynamic symbols and relocations.
///
/// | id | symbol      | address  | size | kind |
/// |----|-------------|----------|------|------|
/// | 0  | main.main   | 0x401000 | 0x20 | T    |
/// | 1  | main.helper | 0x401020 | 0 -> 0x10 | T |
/// | 2  | data.var    | 0x402000 | 0x10 | D    |
/// | 3  | bss.buf     | 0x403000 | 0x100| B    |
/// | 4  | abs.sym     | 0x1234   | 0    | A    |
/// | 5  | file.c      | 0        | 0    | A    |
/// | 6  | puts        | 0        | 0    | U    |
/// | 7  | dynfunc     | 0x401030 | 0x10 | T    |
///
/// `.rela.data` patches 0x402008 with `main.main + 4`; `.rela.dyn` patches
/// 0x402000 with `puts`.
pub fn sample_elf() -> Vec<u8> {
    let mut b = ElfBuilder::new(EM_X86_64);
    b.add(ElfSection::progbits(".text", SHF_ALLOC | SHF_EXECINSTR, 0x401000, (0..0x40).collect()));
    b.add(ElfSection::progbits(".data", SHF_ALLOC | SHF_WRITE, 0x402000, vec![0xaa; 16]));
    b.add(ElfSection::nobits(".bss", SHF_ALLOC | SHF_WRITE, 0x403000, 0x100));

    let (syms, strs) = symtab(&[
        func("main.main", 0x401000, 0x20, 1),
        ElfSym {
            bind: STB_LOCAL,
            ..func("main.helper", 0x401020, 0, 1)
        },
        object("data.var", 0x402000, 16, 2),
        object("bss.buf", 0x403000, 0x100, 3),
        ElfSym {
            kind: STT_NOTYPE,
            ..func("abs.sym", 0x1234, 0, SHN_ABS)
        },
        ElfSym {
            bind: STB_LOCAL,
            kind: STT_FILE,
            ..func("file.c", 0, 0, SHN_ABS)
        },
    ]);
    let (dynsyms, dynstrs) = symtab(&[func("puts", 0, 0, SHN_UNDEF), func("dynfunc", 0x401030, 0x10, 1)]);

    // Indices: 4 .rela.data, 5 .symtab, 6 .strtab, 7 .dynsym, 8 .dynstr, 9 .rela.dyn
    b.add(ElfSection::table(".rela.data", SHT_RELA, rela(&[(0x402008, 1, R_X86_64_64, 4)]), 5, 2, 24));
    b.add(ElfSection::table(".symtab", SHT_SYMTAB, syms, 6, 3, 24));
    b.add(ElfSection::table(".strtab", SHT_STRTAB, strs, 0, 0, 0));
    b.add(ElfSection::table(".dynsym", SHT_DYNSYM, dynsyms, 8, 1, 24));
    b.add(ElfSection::table(".dynstr", SHT_STRTAB, dynstrs, 0, 0, 0));
    b.add(ElfSection::table(".rela.dyn", SHT_RELA, rela(&[(0x402000, 1, R_X86_64_GLOB_DAT, 0)]), 7, 0, 24));
    b.build()
}

/// An x86-64 executable carrying a runtime function table for `main.f`
/// (0x401000..0x401010) with stack maps in `.rodata`, plus `main.g`, which
/// has no table entry.
pub fn go_elf() -> Vec<u8> {
    let maps_at = 0x480000;
    let mut b = ElfBuilder::new(EM_X86_64);
    b.add(ElfSection::progbits(".text", SHF_ALLOC | SHF_EXECINSTR, 0x401000, vec![0x90; 0x20]));
    b.add(ElfSection::progbits(".rodata", SHF_ALLOC, maps_at, super::functab::stack_maps()));
    b.add(ElfSection::progbits(
        ".gopclntab",
        SHF_ALLOC,
        0x4a0000,
        super::functab::pclntab(0x401000, 0x401010, "main.f", maps_at),
    ));
    let (syms, strs) = symtab(&[func("main.f", 0x401000, 0x10, 1), func("main.g", 0x401010, 0x10, 1)]);
    b.add(ElfSection::table(".symtab", SHT_SYMTAB, syms, 5, 1, 24));
    b.add(ElfSection::table(".strtab", SHT_STRTAB, strs, 0, 0, 0));
    b.build()
}
