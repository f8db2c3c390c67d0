use crate::error::{ParcelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shortest accepted barcode, in characters.
pub const MIN_LEN: usize = 8;
/// Longest accepted barcode, in characters.
pub const MAX_LEN: usize = 20;

/// Returns true when `raw`, once surrounding whitespace is trimmed, is between
/// [`MIN_LEN`] and [`MAX_LEN`] characters long.
///
/// Length only: no charset, case or checksum rules.
pub fn is_valid(raw: &str) -> bool {
    let len = raw.trim().chars().count();
    (MIN_LEN..=MAX_LEN).contains(&len)
}

/// A package-tracking barcode that passed [`is_valid`].
///
/// Holds the trimmed form of the submitted text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub fn parse(raw: &str) -> Result<Self> {
        if is_valid(raw) {
            Ok(Self(raw.trim().to_string()))
        } else {
            Err(ParcelError::ValidationError(format!(
                "Barcode must be {MIN_LEN} to {MAX_LEN} characters long"
            )))
        }
    }

    /// Rebuilds an identifier read back from storage, skipping validation.
    pub(crate) fn from_stored(raw: String) -> Self {
        Self(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Identifier {
    type Error = ParcelError;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_bounds() {
        assert!(!is_valid("1234567"));
        assert!(is_valid("12345678"));
        assert!(is_valid("12345678901234567890"));
        assert!(!is_valid("123456789012345678901"));
        assert!(!is_valid(""));
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        assert!(is_valid("   AB1234567 \n"));
        assert!(!is_valid("  short  "));

        let id = Identifier::parse("  AB1234567\t").unwrap();
        assert_eq!(id.as_str(), "AB1234567");
    }

    #[test]
    fn test_no_charset_rules() {
        // Lowercase, punctuation and inner spaces are all accepted.
        assert!(is_valid("ab-12 34.x"));
        assert!(is_valid("!!!!!!!!"));
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // 8 Cyrillic letters, 16 bytes in UTF-8.
        assert!(is_valid("ШКШКШКШК"));
        // 11 Cyrillic letters would be 22 bytes, still valid by character count.
        assert!(is_valid("ПОСИЛКА0001"));
    }

    #[test]
    fn test_parse_rejects_short_identifier() {
        assert!(matches!(
            Identifier::parse("short"),
            Err(ParcelError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validator_matches_definition() {
        for len in 0..30 {
            let padded = format!("  {}  ", "x".repeat(len));
            assert_eq!(is_valid(&padded), (8..=20).contains(&len), "len {len}");
        }
    }
}
