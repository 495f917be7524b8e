//! Runtime function tables (`0xfffffffb` layout, 8-byte pointers).

fn put_uvarint(out: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        out.push((v as u8) | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
}

/// Encodes `(value, pc advance)` rows as a PC-value table.
pub fn encode(rows: &[(i32, u64)], quantum: u8) -> Vec<u8> {
    let mut out = Vec::new();
    let mut prev = -1i32;
    for &(value, advance) in rows {
        let delta = i64::from(value - prev);
        put_uvarint(&mut out, ((delta << 1) ^ (delta >> 63)) as u64);
        put_uvarint(&mut out, advance / u64::from(quantum));
        prev = value;
    }
    out.push(0);
    out
}

/// SP offset rows used for every generated function: 0 for 4 bytes, then 8.
pub const PCSP: &[(i32, u64)] = &[(0, 4), (8, 12)];
/// Stack map index rows: index 0 (written as -1) for 8 bytes, then 1.
pub const STACK_INDEX: &[(i32, u64)] = &[(-1, 8), (1, 8)];

/// A table with a single function `name` at `entry`, ending at `end_pc`.
///
/// PCData 1 is the stack map index table; FuncData 0 and 1 point at the
/// args and locals maps of [`stack_maps`] placed at `maps_at`.
pub fn pclntab(entry: u64, end_pc: u64, name: &str, maps_at: u64) -> Vec<u8> {
    let mut t = Vec::new();
    t.extend(0xffff_fffbu32.to_le_bytes());
    t.extend([0, 0, 1, 8]);
    t.extend(1u64.to_le_bytes());
    t.extend(entry.to_le_bytes());
    t.extend(48u64.to_le_bytes());
    t.extend(end_pc.to_le_bytes());
    t.extend(0u32.to_le_bytes());
    t.resize(48, 0);

    let mut name_bytes = name.as_bytes().to_vec();
    name_bytes.push(0);
    while name_bytes.len() % 8 != 0 {
        name_bytes.push(0);
    }
    let name_at = 112u32;
    let pcsp_at = name_at + name_bytes.len() as u32;
    let pcsp = encode(PCSP, 1);
    let stack_at = pcsp_at + pcsp.len() as u32;
    let stack = encode(STACK_INDEX, 1);

    t.extend(entry.to_le_bytes());
    t.extend((name_at as i32).to_le_bytes());
    t.extend(16i32.to_le_bytes()); // args
    t.extend(0u32.to_le_bytes()); // deferreturn
    t.extend(pcsp_at.to_le_bytes());
    t.extend(0u32.to_le_bytes()); // pcfile
    t.extend(0u32.to_le_bytes()); // pcln
    t.extend(2u32.to_le_bytes()); // npcdata
    t.extend([0, 0, 0, 2]); // funcID, unused, nfuncdata
    t.extend(0u32.to_le_bytes());
    t.extend(stack_at.to_le_bytes());
    t.extend(maps_at.to_le_bytes());
    t.extend((maps_at + 16).to_le_bytes());
    t.extend(name_bytes);
    t.extend(pcsp);
    t.extend(stack);
    t
}

/// Args maps (2 x 2 bits: `01`, `02`) then, 16 bytes in, locals maps
/// (2 x 4 bits: `03`, `0c`).
pub fn stack_maps() -> Vec<u8> {
    let mut m = Vec::new();
    m.extend(2u32.to_le_bytes());
    m.extend(2u32.to_le_bytes());
    m.extend([0x01, 0x02]);
    m.resize(16, 0);
    m.extend(2u32.to_le_bytes());
    m.extend(4u32.to_le_bytes());
    m.extend([0x03, 0x0c]);
    m.resize(32, 0);
    m
}
