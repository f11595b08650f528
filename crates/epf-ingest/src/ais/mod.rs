//! AIS (Address Information System) product family support
//!
//! The City State National file (CS215N) ships fixed-width 129-byte records.
//! The first byte of each line tags its record type; the remaining bytes are
//! decoded through a [`RecordLayout`] looked up in the registry below.

pub mod layout;
pub mod parser;
pub mod record;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};

pub use layout::{FieldSpec, RecordLayout, ALIAS_LAYOUT, CS215N_LINE_WIDTH, DETAIL_LAYOUT};
pub use parser::{FixedWidthRecordParser, ParseOutcome};
pub use record::{AliasRecord, DetailRecord, Record};

/// Product families with a known record layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductFamily {
    /// AIS City State National
    Cs215n,
}

impl ProductFamily {
    pub fn product_code(&self) -> &'static str {
        match self {
            Self::Cs215n => "AIS",
        }
    }

    pub fn product_id(&self) -> &'static str {
        match self {
            Self::Cs215n => "CS215N",
        }
    }

    pub fn line_width(&self) -> usize {
        match self {
            Self::Cs215n => CS215N_LINE_WIDTH,
        }
    }
}

impl fmt::Display for ProductFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.product_code(), self.product_id())
    }
}

/// Record type tag found in the first byte of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// Street alias record, tag `A`
    Alias,
    /// City/state detail record, tag `D`
    Detail,
}

impl RecordType {
    pub fn tag(&self) -> char {
        match self {
            Self::Alias => 'A',
            Self::Detail => 'D',
        }
    }

    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            'A' => Some(Self::Alias),
            'D' => Some(Self::Detail),
            _ => None,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "alias" => Ok(Self::Alias),
            "d" | "detail" => Ok(Self::Detail),
            other => Err(format!(
                "unknown record type '{}' (expected A/alias or D/detail)",
                other
            )),
        }
    }
}

/// Look up the layout for a record tag within a product family
pub fn layout_for(family: ProductFamily, tag: char) -> Result<&'static RecordLayout> {
    match (family, RecordType::from_tag(tag)) {
        (ProductFamily::Cs215n, Some(RecordType::Alias)) => Ok(&ALIAS_LAYOUT),
        (ProductFamily::Cs215n, Some(RecordType::Detail)) => Ok(&DETAIL_LAYOUT),
        (family, None) => Err(IngestError::UnknownRecordType { family, tag }),
    }
}

/// Layout for a record type already known to be valid
pub fn layout_of(family: ProductFamily, record_type: RecordType) -> &'static RecordLayout {
    match (family, record_type) {
        (ProductFamily::Cs215n, RecordType::Alias) => &ALIAS_LAYOUT,
        (ProductFamily::Cs215n, RecordType::Detail) => &DETAIL_LAYOUT,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_for_known_tags() {
        let alias = layout_for(ProductFamily::Cs215n, 'A').unwrap();
        assert_eq!(alias.record_type, RecordType::Alias);
        assert_eq!(alias.table, "ref_AIS_CS215N_A");

        let detail = layout_for(ProductFamily::Cs215n, 'D').unwrap();
        assert_eq!(detail.record_type, RecordType::Detail);
        assert_eq!(detail.table, "ref_AIS_CS215N_D");
    }

    #[test]
    fn test_layout_for_unknown_tag() {
        let err = layout_for(ProductFamily::Cs215n, 'Z').unwrap_err();
        assert!(matches!(
            err,
            IngestError::UnknownRecordType { tag: 'Z', .. }
        ));
        // Tags are case sensitive
        assert!(layout_for(ProductFamily::Cs215n, 'd').is_err());
    }

    #[test]
    fn test_record_type_from_str() {
        assert_eq!("D".parse::<RecordType>().unwrap(), RecordType::Detail);
        assert_eq!("alias".parse::<RecordType>().unwrap(), RecordType::Alias);
        assert!("X".parse::<RecordType>().is_err());
    }

    #[test]
    fn test_family_display() {
        assert_eq!(ProductFamily::Cs215n.to_string(), "AIS-CS215N");
        assert_eq!(ProductFamily::Cs215n.line_width(), 129);
    }
}
