//! PE header parsing

use crate::formats::pe::types::*;
use crate::formats::pe::utils::ReadExt;

/// Parse the DOS stub, PE signature, COFF header and optional header.
///
/// Only a missing `MZ` signature yields `InvalidMagic`.
pub fn parse_headers(data: &[u8]) -> Result<PeHeaders> {
    match data.read_u16_le_at(0) {
        Ok(IMAGE_DOS_SIGNATURE) => {}
        _ => return Err(PeError::InvalidMagic),
    }
    let e_lfanew = data.read_u32_le_at(0x3c)? as usize;
    if data.read_u32_le_at(e_lfanew)? != IMAGE_NT_SIGNATURE {
        return Err(PeError::InvalidPeSignature);
    }

    let coff = e_lfanew + 4;
    let machine = data.read_u16_le_at(coff)?;
    let number_of_sections = data.read_u16_le_at(coff + 2)?;
    let pointer_to_symbol_table = data.read_u32_le_at(coff + 8)?;
    let number_of_symbols = data.read_u32_le_at(coff + 12)?;
    let size_of_optional_header = usize::from(data.read_u16_le_at(coff + 16)?);

    let opt = coff + 20;
    data.read_slice_at(opt, size_of_optional_header)?;
    let magic = data.read_u16_le_at(opt)?;
    let (pe32_plus, image_base) = match magic {
        IMAGE_NT_OPTIONAL_HDR32_MAGIC => (false, u64::from(data.read_u32_le_at(opt + 28)?)),
        IMAGE_NT_OPTIONAL_HDR64_MAGIC => (true, data.read_u64_le_at(opt + 24)?),
        other => return Err(PeError::InvalidOptionalMagic(other)),
    };

    Ok(PeHeaders {
        machine,
        number_of_sections,
        pointer_to_symbol_table,
        number_of_symbols,
        section_table_offset: opt + size_of_optional_header,
        pe32_plus,
        image_base,
    })
}
