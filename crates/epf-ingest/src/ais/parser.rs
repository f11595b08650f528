//! Decode single fixed-width lines into typed records

use tracing::trace;

use super::record::{AliasRecord, DetailRecord, Record};
use super::{layout_for, ProductFamily, RecordType};

/// Result of parsing one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// The line was decoded (possibly as [`Record::Unknown`])
    Parsed(Record),
    /// A record type filter was given and this line carries another tag
    NotMatched { tag: char },
}

impl ParseOutcome {
    pub fn into_record(self) -> Option<Record> {
        match self {
            Self::Parsed(record) => Some(record),
            Self::NotMatched { .. } => None,
        }
    }
}

/// Stateless decoder for one product family
#[derive(Debug, Clone, Copy)]
pub struct FixedWidthRecordParser {
    family: ProductFamily,
}

impl FixedWidthRecordParser {
    pub fn new(family: ProductFamily) -> Self {
        Self { family }
    }

    pub fn family(&self) -> ProductFamily {
        self.family
    }

    pub fn line_width(&self) -> usize {
        self.family.line_width()
    }

    /// Parse one line, optionally keeping only records of `seeking` type
    ///
    /// Fields past the end of a short line come back empty. A tag with no
    /// layout yields `Record::Unknown` when no filter is set.
    pub fn parse_line(&self, line: &[u8], seeking: Option<RecordType>) -> ParseOutcome {
        let tag = line.first().map(|b| *b as char).unwrap_or('\0');

        if let Some(wanted) = seeking {
            if wanted.tag() != tag {
                return ParseOutcome::NotMatched { tag };
            }
        }

        match layout_for(self.family, tag) {
            Ok(layout) => ParseOutcome::Parsed(match layout.record_type {
                RecordType::Alias => Record::Alias(AliasRecord::from_line(line)),
                RecordType::Detail => Record::Detail(DetailRecord::from_line(line)),
            }),
            Err(err) => {
                trace!(error = %err, "No layout for line");
                ParseOutcome::Parsed(Record::Unknown { tag })
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn parser() -> FixedWidthRecordParser {
        FixedWidthRecordParser::new(ProductFamily::Cs215n)
    }

    fn padded(prefix: &str) -> Vec<u8> {
        format!("{:<129}", prefix).into_bytes()
    }

    #[test]
    fn test_parse_detail_without_filter() {
        let outcome = parser().parse_line(&padded("D12345"), None);
        match outcome {
            ParseOutcome::Parsed(Record::Detail(d)) => assert_eq!(d.zip, "12345"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_filter_mismatch() {
        let outcome = parser().parse_line(&padded("A12345"), Some(RecordType::Detail));
        assert_eq!(outcome, ParseOutcome::NotMatched { tag: 'A' });
        assert!(outcome.into_record().is_none());
    }

    #[test]
    fn test_unknown_tag() {
        let outcome = parser().parse_line(&padded("Z99999"), None);
        assert_eq!(outcome, ParseOutcome::Parsed(Record::Unknown { tag: 'Z' }));

        let filtered = parser().parse_line(&padded("Z99999"), Some(RecordType::Detail));
        assert_eq!(filtered, ParseOutcome::NotMatched { tag: 'Z' });
    }

    #[test]
    fn test_short_line_fields_are_empty() {
        let outcome = parser().parse_line(b"D123", Some(RecordType::Detail));
        match outcome {
            ParseOutcome::Parsed(Record::Detail(d)) => {
                assert_eq!(d.zip, "123");
                assert_eq!(d.county_name, "");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_empty_line() {
        assert_eq!(
            parser().parse_line(b"", None),
            ParseOutcome::Parsed(Record::Unknown { tag: '\0' })
        );
    }
}
