//! Raw bytes with the relocations that patch them.

use crate::core::address::HexAddr;
use crate::formats::Data;
use crate::symtab::SymbolIndex;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HexReloc {
    /// Offset within `data`; negative when the relocation starts before it.
    pub offset: i64,
    pub width: u8,
    #[serde(rename = "type")]
    pub rtype: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addend: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HexView {
    pub addr: HexAddr,
    /// Lowercase hex of the bytes.
    pub data: String,
    pub relocs: Vec<HexReloc>,
}

pub fn hex_view(data: &Data, index: &SymbolIndex) -> HexView {
    let relocs = data
        .relocs
        .iter()
        .map(|r| HexReloc {
            offset: r.offset.wrapping_sub(data.addr) as i64,
            width: r.width,
            rtype: r.rtype.to_string(),
            symbol: r.symbol.and_then(|id| index.get(id)).map(|s| s.name.clone()),
            addend: (r.addend != 0).then_some(r.addend),
        })
        .collect();
    HexView {
        addr: HexAddr(data.addr),
        data: hex::encode(&data.bytes),
        relocs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::relocation::{RelocType, Relocation, Relocations};
    use crate::core::symbol::{Symbol, SymbolId, SymbolKind};

    #[test]
    fn relative_offsets() {
        let index = SymbolIndex::new(vec![Symbol {
            name: "target".into(),
            address: 0x2000,
            size: 8,
            kind: SymbolKind::Data,
            local: false,
            has_addr: true,
            section: Some(2),
        }]);
        let rtype = RelocType {
            raw: 1,
            name: Some("R_X86_64_64"),
        };
        let data = Data {
            addr: 0x1000,
            bytes: vec![0xde, 0xad, 0xbe, 0xef],
            relocs: Relocations::new(vec![
                Relocation {
                    offset: 0xffd,
                    width: 8,
                    rtype,
                    symbol: Some(SymbolId(0)),
                    addend: 0,
                },
                Relocation {
                    offset: 0x1002,
                    width: 8,
                    rtype,
                    symbol: None,
                    addend: -4,
                },
            ]),
        };
        let view = hex_view(&data, &index);
        assert_eq!(view.data, "deadbeef");
        assert_eq!(view.relocs[0].offset, -3);
        assert_eq!(view.relocs[0].symbol.as_deref(), Some("target"));
        assert_eq!(view.relocs[0].addend, None);
        assert_eq!(view.relocs[1].offset, 2);
        assert_eq!(view.relocs[1].addend, Some(-4));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["addr"], "1000");
        assert_eq!(json["relocs"][0]["type"], "R_X86_64_64");
        assert!(json["relocs"][1].get("symbol").is_none());
    }
}
