//! CS215N fixed-width record layouts
//!
//! Offsets are zero-based byte positions within a 129-byte line. Byte 0 holds
//! the record type tag; every layout covers bytes 1..129 with no gaps.

use super::RecordType;

/// Width of every line in a CS215N data file
pub const CS215N_LINE_WIDTH: usize = 129;

/// Column holding the record type tag in generated SQL
pub const TAG_COLUMN: &str = "CopyrightCode";

/// One named field of a fixed-width record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
}

impl FieldSpec {
    const fn new(name: &'static str, offset: usize, width: usize) -> Self {
        Self {
            name,
            offset,
            width,
        }
    }

    pub const fn end(&self) -> usize {
        self.offset + self.width
    }

    /// Cut this field out of `line` and trim it
    ///
    /// A line too short for the field yields the part that is present, or an
    /// empty string when the field starts past the end.
    pub fn extract(&self, line: &[u8]) -> String {
        if self.offset >= line.len() {
            return String::new();
        }
        let end = self.end().min(line.len());
        String::from_utf8_lossy(&line[self.offset..end])
            .trim_matches(|c: char| c.is_whitespace() || c == '\0')
            .to_string()
    }
}

/// Schema of one record type within a product family
#[derive(Debug, PartialEq, Eq)]
pub struct RecordLayout {
    pub record_type: RecordType,
    /// Destination table for generated inserts
    pub table: &'static str,
    pub fields: &'static [FieldSpec],
}

impl RecordLayout {
    /// Byte position just past the last field
    pub fn span(&self) -> usize {
        self.fields.iter().map(FieldSpec::end).max().unwrap_or(1)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    /// Column list for inserts: the tag column followed by every field
    pub fn columns(&self) -> Vec<&'static str> {
        std::iter::once(TAG_COLUMN).chain(self.field_names()).collect()
    }
}

pub static ALIAS_FIELDS: [FieldSpec; 18] = [
    FieldSpec::new("Zip", 1, 5),
    FieldSpec::new("AliasStreetAbbreviation", 6, 2),
    FieldSpec::new("AliasStreetName", 8, 28),
    FieldSpec::new("AliasStreetSuffixAbbreviation", 36, 4),
    FieldSpec::new("AliasStreetPostDirectionalAbbreviation", 40, 2),
    FieldSpec::new("StreetPreDirectionalAbbreviation", 42, 2),
    FieldSpec::new("StreetName", 44, 28),
    FieldSpec::new("StreetSuffixAbbreviation", 72, 4),
    FieldSpec::new("StreetPostDirectionalAbbreviation", 76, 2),
    FieldSpec::new("AliasTypeCode", 78, 1),
    FieldSpec::new("AliasCentury", 79, 2),
    FieldSpec::new("AliasYear", 81, 2),
    FieldSpec::new("AliasMonth", 83, 2),
    FieldSpec::new("AliasDay", 85, 2),
    FieldSpec::new("AliasDeliveryAddressLow", 87, 10),
    FieldSpec::new("AliasDeliveryAddressHigh", 97, 10),
    FieldSpec::new("AliasRangeCode", 107, 1),
    FieldSpec::new("Filler", 108, 21),
];

pub static DETAIL_FIELDS: [FieldSpec; 16] = [
    FieldSpec::new("Zip", 1, 5),
    FieldSpec::new("CityStateKey", 6, 6),
    FieldSpec::new("ZipClassificationCode", 12, 1),
    FieldSpec::new("CityStateName", 13, 28),
    FieldSpec::new("CityStateNameAbbreviation", 41, 13),
    FieldSpec::new("CityStateNameFacilityCode", 54, 1),
    FieldSpec::new("CityStateNameMailingNameIndicator", 55, 1),
    FieldSpec::new("PreferredLastLineCityStateKey", 56, 6),
    FieldSpec::new("PreferredLastLineCityStateName", 62, 28),
    FieldSpec::new("CityDeliveryIndicator", 90, 1),
    FieldSpec::new("CarrierRouteRateSortation", 91, 1),
    FieldSpec::new("ZipNameIndicator", 92, 1),
    FieldSpec::new("FinanceNumber", 93, 6),
    FieldSpec::new("StateAbbreviation", 99, 2),
    FieldSpec::new("CountyNumber", 101, 3),
    FieldSpec::new("CountyName", 104, 25),
];

pub static ALIAS_LAYOUT: RecordLayout = RecordLayout {
    record_type: RecordType::Alias,
    table: "ref_AIS_CS215N_A",
    fields: &ALIAS_FIELDS,
};

pub static DETAIL_LAYOUT: RecordLayout = RecordLayout {
    record_type: RecordType::Detail,
    table: "ref_AIS_CS215N_D",
    fields: &DETAIL_FIELDS,
};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_contiguous(layout: &RecordLayout) {
        let mut expected_offset = 1;
        for field in layout.fields {
            assert_eq!(
                field.offset, expected_offset,
                "{} in {} does not start where the previous field ends",
                field.name, layout.table
            );
            assert!(field.width > 0);
            expected_offset = field.end();
        }
    }

    #[test]
    fn test_layouts_cover_line_without_gaps() {
        assert_contiguous(&ALIAS_LAYOUT);
        assert_contiguous(&DETAIL_LAYOUT);
        assert_eq!(ALIAS_LAYOUT.span(), CS215N_LINE_WIDTH);
        assert_eq!(DETAIL_LAYOUT.span(), CS215N_LINE_WIDTH);
    }

    #[test]
    fn test_columns_lead_with_tag() {
        let columns = DETAIL_LAYOUT.columns();
        assert_eq!(columns.len(), 17);
        assert_eq!(columns[0], TAG_COLUMN);
        assert_eq!(columns[1], "Zip");
        assert_eq!(columns[16], "CountyName");
        assert_eq!(ALIAS_LAYOUT.columns().len(), 19);
    }

    #[test]
    fn test_extract_trims() {
        let field = FieldSpec::new("Name", 2, 6);
        assert_eq!(field.extract(b"XX  ab  YY"), "ab");
    }

    #[test]
    fn test_extract_short_line() {
        let field = FieldSpec::new("Name", 4, 6);
        assert_eq!(field.extract(b"0123"), "");
        assert_eq!(field.extract(b"012345"), "45");
        assert_eq!(field.extract(b""), "");
    }

    proptest! {
        #[test]
        fn prop_extract_matches_declared_slice(
            line in proptest::collection::vec(0x20u8..0x7f, CS215N_LINE_WIDTH),
        ) {
            for layout in [&ALIAS_LAYOUT, &DETAIL_LAYOUT] {
                for field in layout.fields {
                    let expected = std::str::from_utf8(&line[field.offset..field.end()])
                        .unwrap()
                        .trim()
                        .to_string();
                    prop_assert_eq!(field.extract(&line), expected);
                }
            }
        }
    }
}
