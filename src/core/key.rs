//! core::key
//!
//! Storage key codec.
//!
//! # Key Schema
//!
//! Every record lives under `<name>:<version>:<YYYYMMDD>`. The caller supplies
//! `name:version`; the date segment is appended by the store at write time
//! from its clock, so callers cannot choose it.
//!
//! Two writes for the same name and version on the same UTC day produce the
//! same key, so the second overwrites the first. Writes on different days
//! produce different keys and are both retained.
//!
//! # Prefixes
//!
//! Queries are pure byte-prefix scans. [`decode_prefix`] turns a user-facing
//! identifier into the prefix that selects it:
//!
//! ```
//! use gozer::core::key::decode_prefix;
//!
//! assert_eq!(decode_prefix("foo").unwrap(), "foo:");
//! assert_eq!(decode_prefix("foo:1.0.0").unwrap(), "foo:1.0.0:");
//! assert!(decode_prefix("foo:1:0:0").is_err());
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

/// Separator between key segments.
pub const KEY_SEPARATOR: char = ':';

/// Errors from key encoding and decoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The identifier is not `NAME:VERSION`.
    #[error(
        "invalid image name '{0}': must be formatted as NAME:VERSION and contain only the separating colon"
    )]
    InvalidName(String),

    /// A stored key does not follow `NAME:VERSION:YYYYMMDD`.
    #[error("malformed storage key '{0}'")]
    InvalidKey(String),
}

/// A validated `name:version` pair.
///
/// Neither segment may be empty or contain a colon.
///
/// # Example
///
/// ```
/// use gozer::core::key::ImageName;
///
/// let image = ImageName::parse("registry.local/web:20240101.abc1234").unwrap();
/// assert_eq!(image.name(), "registry.local/web");
/// assert_eq!(image.version(), "20240101.abc1234");
///
/// assert!(ImageName::parse("web").is_err());
/// assert!(ImageName::parse("web:1:0:0").is_err());
/// assert!(ImageName::parse(":1.0").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageName {
    name: String,
    version: String,
}

impl ImageName {
    /// Parse a `name:version` identifier.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidName`] unless the input splits into exactly
    /// two non-empty colon-separated segments.
    pub fn parse(full_name: &str) -> Result<Self, KeyError> {
        let mut segments = full_name.split(KEY_SEPARATOR);
        match (segments.next(), segments.next(), segments.next()) {
            (Some(name), Some(version), None) if !name.is_empty() && !version.is_empty() => {
                Ok(Self {
                    name: name.to_string(),
                    version: version.to_string(),
                })
            }
            _ => Err(KeyError::InvalidName(full_name.to_string())),
        }
    }

    /// The name segment.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The version segment.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Prefix selecting every dated record of this name and version.
    pub fn prefix(&self) -> String {
        format!("{}:{}:", self.name, self.version)
    }
}

impl fmt::Display for ImageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

impl FromStr for ImageName {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A fully dated storage key: `<name>:<version>:<YYYYMMDD>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey {
    image: ImageName,
    date: NaiveDate,
    encoded: String,
}

impl StorageKey {
    /// Build the key for an image written on `date`.
    pub fn new(image: ImageName, date: NaiveDate) -> Self {
        let encoded = format!("{}{}", image.prefix(), format_date(date));
        Self {
            image,
            date,
            encoded,
        }
    }

    /// Decompose a stored key.
    ///
    /// # Example
    ///
    /// ```
    /// use gozer::core::key::StorageKey;
    ///
    /// let key = StorageKey::parse("foo:1.0.0:20240131").unwrap();
    /// assert_eq!(key.image().name(), "foo");
    /// assert_eq!(key.date().to_string(), "2024-01-31");
    ///
    /// assert!(StorageKey::parse("foo:1.0.0").is_err());
    /// assert!(StorageKey::parse("foo:1.0.0:2024013").is_err());
    /// ```
    pub fn parse(key: &str) -> Result<Self, KeyError> {
        let invalid = || KeyError::InvalidKey(key.to_string());

        let (rest, date) = key.rsplit_once(KEY_SEPARATOR).ok_or_else(invalid)?;
        let image = ImageName::parse(rest).map_err(|_| invalid())?;
        let date = parse_date(date).ok_or_else(invalid)?;

        Ok(Self::new(image, date))
    }

    /// The `name:version` part of the key.
    pub fn image(&self) -> &ImageName {
        &self.image
    }

    /// The day bucket of the key.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// The encoded key.
    pub fn as_str(&self) -> &str {
        &self.encoded
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

/// Encode the storage key for `full_name` written on `date`.
///
/// # Errors
///
/// Returns [`KeyError::InvalidName`] if `full_name` is not `NAME:VERSION`.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use gozer::core::key::encode_key;
///
/// let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
/// let key = encode_key("foo:1.0.0", date).unwrap();
/// assert_eq!(key.as_str(), "foo:1.0.0:20240309");
/// ```
pub fn encode_key(full_name: &str, date: NaiveDate) -> Result<StorageKey, KeyError> {
    Ok(StorageKey::new(ImageName::parse(full_name)?, date))
}

/// Resolve a user-facing identifier into a query prefix.
///
/// A bare `name` selects all versions (`"name:"`); a `name:version` selects
/// every dated record of that version (`"name:version:"`).
///
/// # Errors
///
/// Returns [`KeyError::InvalidName`] for an empty identifier or one with more
/// than one colon.
pub fn decode_prefix(identifier: &str) -> Result<String, KeyError> {
    if identifier.contains(KEY_SEPARATOR) {
        return Ok(ImageName::parse(identifier)?.prefix());
    }
    if identifier.is_empty() {
        return Err(KeyError::InvalidName(identifier.to_string()));
    }
    Ok(format!("{}{}", identifier, KEY_SEPARATOR))
}

/// Format a date as the 8-digit key segment.
pub fn format_date(date: NaiveDate) -> String {
    format!("{:04}{:02}{:02}", date.year(), date.month(), date.day())
}

fn parse_date(segment: &str) -> Option<NaiveDate> {
    if segment.len() != 8 || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = segment[0..4].parse().ok()?;
    let month = segment[4..6].parse().ok()?;
    let day = segment[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    mod image_name {
        use super::*;

        #[test]
        fn accepts_name_and_version() {
            let image = ImageName::parse("foo:1.0.0").unwrap();
            assert_eq!(image.name(), "foo");
            assert_eq!(image.version(), "1.0.0");
            assert_eq!(image.to_string(), "foo:1.0.0");
        }

        #[test]
        fn rejects_missing_colon() {
            assert_eq!(
                ImageName::parse("foo"),
                Err(KeyError::InvalidName("foo".to_string()))
            );
        }

        #[test]
        fn rejects_extra_colons() {
            assert!(ImageName::parse("foo:1:0:0").is_err());
            assert!(ImageName::parse("registry:5000/foo:1.0").is_err());
        }

        #[test]
        fn rejects_empty_segments() {
            assert!(ImageName::parse(":").is_err());
            assert!(ImageName::parse("foo:").is_err());
            assert!(ImageName::parse(":1.0").is_err());
        }

        #[test]
        fn from_str_matches_parse() {
            let image: ImageName = "bar:2".parse().unwrap();
            assert_eq!(image.prefix(), "bar:2:");
        }
    }

    mod storage_key {
        use super::*;

        #[test]
        fn appends_eight_digit_date() {
            let key = encode_key("foo:1.0.0", date(2017, 6, 5)).unwrap();
            assert_eq!(key.as_str(), "foo:1.0.0:20170605");
            assert_eq!(key.to_string(), "foo:1.0.0:20170605");
        }

        #[test]
        fn same_day_same_key() {
            let a = encode_key("foo:1.0.0", date(2024, 1, 1)).unwrap();
            let b = encode_key("foo:1.0.0", date(2024, 1, 1)).unwrap();
            assert_eq!(a, b);
        }

        #[test]
        fn different_days_different_keys() {
            let a = encode_key("foo:1.0.0", date(2024, 1, 1)).unwrap();
            let b = encode_key("foo:1.0.0", date(2024, 1, 2)).unwrap();
            assert_ne!(a, b);
            assert!(a.as_str() < b.as_str());
        }

        #[test]
        fn parse_roundtrips_encoded_key() {
            let key = encode_key("web:abc", date(1999, 12, 31)).unwrap();
            let parsed = StorageKey::parse(key.as_str()).unwrap();
            assert_eq!(parsed, key);
        }

        #[test]
        fn parse_rejects_bad_dates() {
            assert!(StorageKey::parse("foo:1:2024130a").is_err());
            assert!(StorageKey::parse("foo:1:20241301").is_err());
            assert!(StorageKey::parse("foo:1:").is_err());
        }

        #[test]
        fn encode_rejects_invalid_names() {
            assert!(encode_key("foo", date(2024, 1, 1)).is_err());
            assert!(encode_key("foo:1:0:0", date(2024, 1, 1)).is_err());
        }
    }

    mod prefix {
        use super::*;

        #[test]
        fn bare_name_selects_all_versions() {
            assert_eq!(decode_prefix("foo").unwrap(), "foo:");
        }

        #[test]
        fn versioned_name_selects_one_version() {
            assert_eq!(decode_prefix("foo:1.0.0").unwrap(), "foo:1.0.0:");
        }

        #[test]
        fn rejects_empty_and_overlong() {
            assert!(decode_prefix("").is_err());
            assert!(decode_prefix("foo:1:2").is_err());
        }

        #[test]
        fn bare_prefix_does_not_match_longer_names() {
            let prefix = decode_prefix("foo").unwrap();
            assert!(!"foobar:1:20240101".starts_with(&prefix));
            assert!("foo:1:20240101".starts_with(&prefix));
        }
    }
}
