//! COFF symbol table parsing

use crate::core::symbol::{Symbol, SymbolKind};
use crate::formats::pe::types::*;
use crate::formats::pe::utils::{padded_name, ReadExt};

/// Locates the COFF string table, which directly follows the symbol table.
///
/// Returns an empty slice for images without a symbol table.
pub fn string_table<'a>(data: &'a [u8], headers: &PeHeaders) -> Result<&'a [u8]> {
    if headers.pointer_to_symbol_table == 0 {
        return Ok(&[]);
    }
    let start = (headers.number_of_symbols as usize)
        .checked_mul(SYMBOL_SIZE)
        .and_then(|n| n.checked_add(headers.pointer_to_symbol_table as usize))
        .ok_or_else(|| PeError::MalformedSymbolTable("symbol count overflows".into()))?;
    if start == data.len() {
        return Ok(&[]);
    }
    let size = data.read_u32_le_at(start)? as usize;
    if size < 4 {
        return Ok(&[]);
    }
    data.read_slice_at(start, size)
}

/// NUL-terminated string at `offset` of the string table.
pub fn string_at(strings: &[u8], offset: usize) -> Result<String> {
    if offset < 4 || offset >= strings.len() {
        return Err(PeError::MalformedSymbolTable(format!(
            "string offset {} outside table",
            offset
        )));
    }
    Ok(padded_name(&strings[offset..]))
}

/// Parse the primary symbol records, skipping auxiliary entries.
pub fn parse_coff_symbols(data: &[u8], headers: &PeHeaders, strings: &[u8]) -> Result<Vec<CoffSymbol>> {
    if headers.pointer_to_symbol_table == 0 || headers.number_of_symbols == 0 {
        return Ok(Vec::new());
    }
    let base = headers.pointer_to_symbol_table as usize;
    let count = headers.number_of_symbols as usize;
    data.read_slice_at(base, count.saturating_mul(SYMBOL_SIZE))?;

    let mut out = Vec::new();
    let mut i = 0;
    while i < count {
        let rec = data.read_slice_at(base + i * SYMBOL_SIZE, SYMBOL_SIZE)?;
        let name = if rec[..4] == [0, 0, 0, 0] {
            string_at(strings, rec.read_u32_le_at(4)? as usize)?
        } else {
            padded_name(&rec[..8])
        };
        let aux = usize::from(rec.read_u8_at(17)?);
        out.push(CoffSymbol {
            name,
            value: rec.read_u32_le_at(8)?,
            section_number: rec.read_u16_le_at(12)? as i16,
            storage_class: rec.read_u8_at(16)?,
        });
        i += 1 + aux;
    }
    Ok(out)
}

/// Converts COFF symbols into the format-neutral model.
///
/// Addresses are absolute: image base plus section RVA plus value.
pub fn to_symbols(coff: &[CoffSymbol], headers: &[SectionHeader], image_base: u64) -> Vec<Symbol> {
    coff.iter()
        .map(|cs| {
            let (kind, address, section) = match cs.section_number {
                SYM_UNDEFINED => (SymbolKind::Undefined, u64::from(cs.value), None),
                SYM_ABSOLUTE => (SymbolKind::Absolute, u64::from(cs.value), None),
                n if n > 0 && (n as usize) <= headers.len() => {
                    let index = n as usize - 1;
                    let sh = &headers[index];
                    let address = image_base
                        .wrapping_add(u64::from(sh.virtual_address))
                        .wrapping_add(u64::from(cs.value));
                    (section_kind(sh.characteristics), address, Some(index))
                }
                _ => (SymbolKind::Unknown, u64::from(cs.value), None),
            };
            Symbol {
                name: cs.name.clone(),
                address,
                size: 0,
                kind,
                local: cs.storage_class == IMAGE_SYM_CLASS_STATIC,
                has_addr: section.is_some(),
                section,
            }
        })
        .collect()
}

fn section_kind(characteristics: u32) -> SymbolKind {
    if characteristics & IMAGE_SCN_CNT_CODE != 0 {
        SymbolKind::Text
    } else if characteristics & IMAGE_SCN_CNT_INITIALIZED_DATA != 0 {
        if characteristics & IMAGE_SCN_MEM_WRITE != 0 {
            SymbolKind::Data
        } else {
            SymbolKind::ROData
        }
    } else if characteristics & IMAGE_SCN_CNT_UNINITIALIZED_DATA != 0 {
        SymbolKind::Bss
    } else {
        SymbolKind::Unknown
    }
}
