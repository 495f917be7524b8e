//! Addresses as they cross the query boundary.
//!
//! `HexAddr` serializes as lowercase hex without a `0x` prefix. Parsing
//! accepts an optional prefix and either case.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HexAddr(pub u64);

impl HexAddr {
    pub fn parse(text: &str) -> Option<Self> {
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);
        if digits.is_empty() {
            return None;
        }
        u64::from_str_radix(digits, 16).ok().map(HexAddr)
    }
}

impl fmt::Display for HexAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

impl From<u64> for HexAddr {
    fn from(value: u64) -> Self {
        HexAddr(value)
    }
}

impl From<HexAddr> for u64 {
    fn from(value: HexAddr) -> Self {
        value.0
    }
}

impl Serialize for HexAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HexAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        HexAddr::parse(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid hex address {:?}", text)))
    }
}
