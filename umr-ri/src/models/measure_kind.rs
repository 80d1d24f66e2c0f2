//! Measurement kind: the category of utility being read

use serde::{Deserialize, Serialize};

/// Kind of utility measurement a reading belongs to.
///
/// Stored in the database and sent over the wire as `WATER` / `GAS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasureKind {
    #[serde(rename = "WATER")]
    Water,
    #[serde(rename = "GAS")]
    Gas,
}

impl MeasureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasureKind::Water => "WATER",
            MeasureKind::Gas => "GAS",
        }
    }

    /// Parse an upload-submission kind. Exact match only: the upload contract
    /// takes the uppercase wire form as-is.
    pub fn parse_exact(raw: &str) -> Option<Self> {
        match raw {
            "WATER" => Some(MeasureKind::Water),
            "GAS" => Some(MeasureKind::Gas),
            _ => None,
        }
    }

    /// Parse a listing filter value. Case-insensitive per the listing
    /// contract (`?measure_type=water` is valid).
    pub fn parse_filter(raw: &str) -> Option<Self> {
        Self::parse_exact(&raw.to_ascii_uppercase())
    }
}

impl std::fmt::Display for MeasureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact_accepts_wire_forms() {
        assert_eq!(MeasureKind::parse_exact("WATER"), Some(MeasureKind::Water));
        assert_eq!(MeasureKind::parse_exact("GAS"), Some(MeasureKind::Gas));
    }

    #[test]
    fn test_parse_exact_rejects_case_variants_and_unknowns() {
        assert_eq!(MeasureKind::parse_exact("water"), None);
        assert_eq!(MeasureKind::parse_exact("Gas"), None);
        assert_eq!(MeasureKind::parse_exact("ELECTRICITY"), None);
        assert_eq!(MeasureKind::parse_exact(""), None);
    }

    #[test]
    fn test_parse_filter_is_case_insensitive() {
        assert_eq!(MeasureKind::parse_filter("water"), Some(MeasureKind::Water));
        assert_eq!(MeasureKind::parse_filter("gAs"), Some(MeasureKind::Gas));
        assert_eq!(MeasureKind::parse_filter("WATER"), Some(MeasureKind::Water));
        assert_eq!(MeasureKind::parse_filter("steam"), None);
    }

    #[test]
    fn test_wire_form_round_trip() {
        for kind in [MeasureKind::Water, MeasureKind::Gas] {
            assert_eq!(MeasureKind::parse_exact(kind.as_str()), Some(kind));
        }
    }
}
