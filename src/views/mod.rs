//! Query requests and the serializable views returned for them.
//!
//! Every response is a [`ViewResponse`], serialized as
//! `{"view": "<name>", "data": ...}`. Addresses are [`HexAddr`] strings.

pub mod asm;
pub mod hex;
pub mod liveness;
pub mod source;
pub mod symbols;

use crate::core::address::HexAddr;
use crate::core::range::Range;
use crate::core::symbol::SymbolId;
use crate::error::ObjError;
use serde::{Deserialize, Serialize};

pub use self::asm::{AsmView, Control, ControlKind, HighlightView, Instruction, TargetRef};
pub use self::hex::{HexReloc, HexView};
pub use self::liveness::{FrameRow, LivenessView};
pub use self::source::{LineXref, SourceBlockView, SourceView};
pub use self::symbols::{SymbolRow, SymbolsView};

/// Selects a symbol by id or by exact name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SymbolSelector {
    Id(SymbolId),
    Name(String),
}

/// A query against one loaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum QueryRequest {
    Symbols,
    Hex {
        symbol: SymbolSelector,
    },
    Asm {
        symbol: SymbolSelector,
        instructions: Vec<Instruction>,
    },
    Liveness {
        symbol: SymbolSelector,
        instructions: Vec<Instruction>,
    },
    Source {
        symbol: SymbolSelector,
        #[serde(default)]
        instructions: Option<Vec<Instruction>>,
    },
    Highlight {
        instructions: Vec<Instruction>,
        ranges: Vec<(HexAddr, HexAddr)>,
    },
}

impl QueryRequest {
    pub fn name(&self) -> &'static str {
        match self {
            QueryRequest::Symbols => "symbols",
            QueryRequest::Hex { .. } => "hex",
            QueryRequest::Asm { .. } => "asm",
            QueryRequest::Liveness { .. } => "liveness",
            QueryRequest::Source { .. } => "source",
            QueryRequest::Highlight { .. } => "highlight",
        }
    }
}

/// Converts `[lo, hi]` pairs into ranges, dropping empty ones.
pub fn ranges_from_pairs(pairs: &[(HexAddr, HexAddr)]) -> Vec<Range> {
    pairs.iter().filter_map(|(lo, hi)| Range::new(lo.0, hi.0)).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorView {
    pub kind: String,
    pub message: String,
}

impl From<&ObjError> for ErrorView {
    fn from(err: &ObjError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", content = "data", rename_all = "snake_case")]
pub enum ViewResponse {
    Symbols(SymbolsView),
    Hex(HexView),
    Asm(AsmView),
    /// `null` data when the function carries no liveness information.
    Liveness(Option<LivenessView>),
    Source(SourceView),
    Highlight(HighlightView),
    Error(ErrorView),
}

impl ViewResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, ViewResponse::Error(_))
    }
}

impl From<ObjError> for ViewResponse {
    fn from(err: ObjError) -> Self {
        ViewResponse::Error(ErrorView::from(&err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_json() {
        let req: QueryRequest = serde_json::from_str(r#"{"view": "hex", "symbol": "main.main"}"#).unwrap();
        assert_eq!(
            req,
            QueryRequest::Hex {
                symbol: SymbolSelector::Name("main.main".into())
            }
        );
        let req: QueryRequest = serde_json::from_str(r#"{"view": "hex", "symbol": 7}"#).unwrap();
        assert_eq!(req.name(), "hex");
        assert!(matches!(req, QueryRequest::Hex { symbol: SymbolSelector::Id(SymbolId(7)) }));

        let req: QueryRequest = serde_json::from_str(
            r#"{"view": "highlight", "instructions": [], "ranges": [["10", "20"], ["30", "30"]]}"#,
        )
        .unwrap();
        let QueryRequest::Highlight { ranges, .. } = req else {
            panic!("wrong request");
        };
        assert_eq!(ranges_from_pairs(&ranges), vec![Range::new(0x10, 0x20).unwrap()]);
    }

    #[test]
    fn error_response_json() {
        let resp = ViewResponse::from(ObjError::NotFound("symbol foo".into()));
        assert!(resp.is_error());
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["view"], "error");
        assert_eq!(json["data"]["kind"], "not_found");
        assert_eq!(json["data"]["message"], "not found: symbol foo");
    }
}
