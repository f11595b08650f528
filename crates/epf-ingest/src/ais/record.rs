//! Typed CS215N records

use serde::Serialize;

use super::layout::{RecordLayout, ALIAS_LAYOUT, DETAIL_LAYOUT};
use super::RecordType;

/// Street alias record (`A`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AliasRecord {
    pub zip: String,
    pub alias_street_abbreviation: String,
    pub alias_street_name: String,
    pub alias_street_suffix_abbreviation: String,
    pub alias_street_post_directional_abbreviation: String,
    pub street_pre_directional_abbreviation: String,
    pub street_name: String,
    pub street_suffix_abbreviation: String,
    pub street_post_directional_abbreviation: String,
    pub alias_type_code: String,
    pub alias_century: String,
    pub alias_year: String,
    pub alias_month: String,
    pub alias_day: String,
    pub alias_delivery_address_low: String,
    pub alias_delivery_address_high: String,
    pub alias_range_code: String,
    pub filler: String,
}

/// City/state detail record (`D`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetailRecord {
    pub zip: String,
    pub city_state_key: String,
    pub zip_classification_code: String,
    pub city_state_name: String,
    pub city_state_name_abbreviation: String,
    pub city_state_name_facility_code: String,
    pub city_state_name_mailing_name_indicator: String,
    pub preferred_last_line_city_state_key: String,
    pub preferred_last_line_city_state_name: String,
    pub city_delivery_indicator: String,
    pub carrier_route_rate_sortation: String,
    pub zip_name_indicator: String,
    pub finance_number: String,
    pub state_abbreviation: String,
    pub county_number: String,
    pub county_name: String,
}

/// Values of a line cut by a layout, consumed in field order
struct FieldValues(std::vec::IntoIter<String>);

impl FieldValues {
    fn cut(layout: &RecordLayout, line: &[u8]) -> Self {
        let values: Vec<String> = layout.fields.iter().map(|f| f.extract(line)).collect();
        Self(values.into_iter())
    }

    fn next(&mut self) -> String {
        self.0.next().unwrap_or_default()
    }
}

impl AliasRecord {
    pub fn from_line(line: &[u8]) -> Self {
        let mut v = FieldValues::cut(&ALIAS_LAYOUT, line);
        Self {
            zip: v.next(),
            alias_street_abbreviation: v.next(),
            alias_street_name: v.next(),
            alias_street_suffix_abbreviation: v.next(),
            alias_street_post_directional_abbreviation: v.next(),
            street_pre_directional_abbreviation: v.next(),
            street_name: v.next(),
            street_suffix_abbreviation: v.next(),
            street_post_directional_abbreviation: v.next(),
            alias_type_code: v.next(),
            alias_century: v.next(),
            alias_year: v.next(),
            alias_month: v.next(),
            alias_day: v.next(),
            alias_delivery_address_low: v.next(),
            alias_delivery_address_high: v.next(),
            alias_range_code: v.next(),
            filler: v.next(),
        }
    }

    /// Field values in layout order
    pub fn values(&self) -> [&str; 18] {
        [
            &self.zip,
            &self.alias_street_abbreviation,
            &self.alias_street_name,
            &self.alias_street_suffix_abbreviation,
            &self.alias_street_post_directional_abbreviation,
            &self.street_pre_directional_abbreviation,
            &self.street_name,
            &self.street_suffix_abbreviation,
            &self.street_post_directional_abbreviation,
            &self.alias_type_code,
            &self.alias_century,
            &self.alias_year,
            &self.alias_month,
            &self.alias_day,
            &self.alias_delivery_address_low,
            &self.alias_delivery_address_high,
            &self.alias_range_code,
            &self.filler,
        ]
    }
}

impl DetailRecord {
    pub fn from_line(line: &[u8]) -> Self {
        let mut v = FieldValues::cut(&DETAIL_LAYOUT, line);
        Self {
            zip: v.next(),
            city_state_key: v.next(),
            zip_classification_code: v.next(),
            city_state_name: v.next(),
            city_state_name_abbreviation: v.next(),
            city_state_name_facility_code: v.next(),
            city_state_name_mailing_name_indicator: v.next(),
            preferred_last_line_city_state_key: v.next(),
            preferred_last_line_city_state_name: v.next(),
            city_delivery_indicator: v.next(),
            carrier_route_rate_sortation: v.next(),
            zip_name_indicator: v.next(),
            finance_number: v.next(),
            state_abbreviation: v.next(),
            county_number: v.next(),
            county_name: v.next(),
        }
    }

    /// Field values in layout order
    pub fn values(&self) -> [&str; 16] {
        [
            &self.zip,
            &self.city_state_key,
            &self.zip_classification_code,
            &self.city_state_name,
            &self.city_state_name_abbreviation,
            &self.city_state_name_facility_code,
            &self.city_state_name_mailing_name_indicator,
            &self.preferred_last_line_city_state_key,
            &self.preferred_last_line_city_state_name,
            &self.city_delivery_indicator,
            &self.carrier_route_rate_sortation,
            &self.zip_name_indicator,
            &self.finance_number,
            &self.state_abbreviation,
            &self.county_number,
            &self.county_name,
        ]
    }
}

/// One decoded line
///
/// `Unknown` carries only the tag of a line no layout matched; it is never
/// counted as a found record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "CopyrightCode")]
pub enum Record {
    #[serde(rename = "A")]
    Alias(AliasRecord),
    #[serde(rename = "D")]
    Detail(DetailRecord),
    #[serde(skip)]
    Unknown { tag: char },
}

impl Record {
    pub fn tag(&self) -> char {
        match self {
            Self::Alias(_) => RecordType::Alias.tag(),
            Self::Detail(_) => RecordType::Detail.tag(),
            Self::Unknown { tag } => *tag,
        }
    }

    pub fn record_type(&self) -> Option<RecordType> {
        match self {
            Self::Alias(_) => Some(RecordType::Alias),
            Self::Detail(_) => Some(RecordType::Detail),
            Self::Unknown { .. } => None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.record_type().is_some()
    }

    /// Field values in layout order, without the tag
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Alias(r) => r.values().to_vec(),
            Self::Detail(r) => r.values().to_vec(),
            Self::Unknown { .. } => Vec::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ais::layout::CS215N_LINE_WIDTH;

    fn detail_line() -> Vec<u8> {
        let mut line = vec![b' '; CS215N_LINE_WIDTH];
        line[0] = b'D';
        line[1..6].copy_from_slice(b"00501");
        line[6..12].copy_from_slice(b"X12345");
        line[12] = b'U';
        line[13..22].copy_from_slice(b"HOLTSVILL");
        line[98..100].copy_from_slice(b"NY");
        line[104..111].copy_from_slice(b"SUFFOLK");
        line
    }

    #[test]
    fn test_detail_from_line() {
        let record = DetailRecord::from_line(&detail_line());
        assert_eq!(record.zip, "00501");
        assert_eq!(record.city_state_key, "X12345");
        assert_eq!(record.zip_classification_code, "U");
        assert_eq!(record.city_state_name, "HOLTSVILL");
        assert_eq!(record.state_abbreviation, "NY");
        assert_eq!(record.county_name, "SUFFOLK");
        assert_eq!(record.county_number, "");
    }

    #[test]
    fn test_values_follow_layout_order() {
        let record = Record::Detail(DetailRecord::from_line(&detail_line()));
        let values = record.values();
        assert_eq!(values.len(), DETAIL_LAYOUT.fields.len());
        for (field, value) in DETAIL_LAYOUT.fields.iter().zip(&values) {
            assert_eq!(field.extract(&detail_line()), *value, "{}", field.name);
        }
    }

    #[test]
    fn test_serialized_keys_match_layout_names() {
        let record = Record::Alias(AliasRecord::from_line(b"A12345"));
        let json = serde_json::to_value(&record).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object["CopyrightCode"], "A");
        for name in ALIAS_LAYOUT.field_names() {
            assert!(object.contains_key(name), "missing {}", name);
        }
        assert_eq!(object.len(), ALIAS_LAYOUT.fields.len() + 1);
    }

    #[test]
    fn test_unknown_record() {
        let record = Record::Unknown { tag: 'Z' };
        assert!(!record.is_known());
        assert_eq!(record.tag(), 'Z');
        assert!(record.values().is_empty());
    }
}
