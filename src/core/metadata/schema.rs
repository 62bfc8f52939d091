//! core::metadata::schema
//!
//! Image metadata schema types.
//!
//! # Wire Format
//!
//! Metadata is persisted as JSON with kebab-case field names:
//!
//! ```json
//! {
//!   "git-commit": "abc1234",
//!   "git-tag": ["v1.2.0"],
//!   "git-annotation": ["Release 1.2.0"],
//!   "git-origin": "git@github.com:acme/web.git",
//!   "created-at": "2024-01-31T10:15:00Z"
//! }
//! ```
//!
//! Missing fields decode as empty, and `null` arrays (as older writers emit
//! for tagless commits) decode as empty arrays.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Errors from reading or parsing metadata documents.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("could not read metadata file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse metadata: {0} (check the data types in your image metadata JSON)")]
    ParseError(String),
}

/// Provenance facts about one built artifact.
///
/// `annotations` is index-aligned with `tags`. It is shorter than `tags`
/// when trailing tags carry no annotation, and an untagged annotation slot in
/// the middle is an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactMetadata {
    /// Commit the artifact was built from
    #[serde(rename = "git-commit")]
    pub commit: String,

    /// Tags pointing at the commit, in VCS order
    #[serde(rename = "git-tag", deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,

    /// Tag annotations, index-aligned with `tags`
    #[serde(rename = "git-annotation", deserialize_with = "null_as_empty")]
    pub annotations: Vec<String>,

    /// Remote origin URL
    #[serde(rename = "git-origin")]
    pub origin: String,

    /// RFC 3339 creation time, second precision
    #[serde(rename = "created-at")]
    pub created_at: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ArtifactMetadata {
    /// Parse a metadata document.
    ///
    /// # Example
    ///
    /// ```
    /// use gozer::core::metadata::ArtifactMetadata;
    ///
    /// let meta = ArtifactMetadata::from_json(r#"{"git-commit": "abc123", "git-tag": null}"#).unwrap();
    /// assert_eq!(meta.commit, "abc123");
    /// assert!(meta.tags.is_empty());
    /// ```
    pub fn from_json(json: &str) -> Result<Self, MetadataError> {
        serde_json::from_str(json).map_err(|e| MetadataError::ParseError(e.to_string()))
    }

    /// Read and parse a metadata document from disk.
    pub fn from_file(path: &Path) -> Result<Self, MetadataError> {
        let contents = fs::read_to_string(path).map_err(|e| MetadataError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&contents)
    }

    /// Parsed creation time, or `None` if `created_at` is not RFC 3339.
    pub fn created_at_time(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.created_at).ok()
    }

    /// Annotation for the tag at `index`, if it has one.
    pub fn annotation_for(&self, index: usize) -> Option<&str> {
        self.annotations
            .get(index)
            .map(String::as_str)
            .filter(|a| !a.is_empty())
    }
}

/// A stored record: the storage key paired with its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Full storage key (`name:version:YYYYMMDD`)
    pub name: String,

    /// Metadata stored under the key
    #[serde(rename = "metadata")]
    pub metadata: ArtifactMetadata,
}

impl ImageRecord {
    /// Pair a key with its metadata.
    pub fn new(name: impl Into<String>, metadata: ArtifactMetadata) -> Self {
        Self {
            name: name.into(),
            metadata,
        }
    }
}

impl fmt::Display for ImageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meta = &self.metadata;
        writeln!(f, "- name: {}", self.name)?;
        writeln!(f, "  -- git-commit: {}", meta.commit)?;
        writeln!(f, "  -- git-tag: [{}]", meta.tags.join(", "))?;
        writeln!(f, "  -- git-annotation: [{}]", meta.annotations.join(", "))?;
        writeln!(f, "  -- git-origin: {}", meta.origin)?;
        write!(f, "  -- created-at: {}", meta.created_at)
    }
}

/// Records in backend key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecordList {
    pub images: Vec<ImageRecord>,
}

impl ImageRecordList {
    /// Wrap records that are already in key order.
    pub fn new(images: Vec<ImageRecord>) -> Self {
        Self { images }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ImageRecord> {
        self.images.iter()
    }

    /// The record with the greatest creation time.
    ///
    /// Timestamps are compared as parsed instants, not strings. Records whose
    /// timestamp does not parse rank below every parsed one. On a tie the
    /// record later in key order wins.
    pub fn latest(&self) -> Option<&ImageRecord> {
        self.images
            .iter()
            .max_by_key(|record| record.metadata.created_at_time())
    }

    /// Consuming form of [`latest`](Self::latest).
    pub fn into_latest(self) -> Option<ImageRecord> {
        self.images
            .into_iter()
            .max_by_key(|record| record.metadata.created_at_time())
    }

    /// Consume the list, yielding the records.
    pub fn into_records(self) -> Vec<ImageRecord> {
        self.images
    }
}

impl IntoIterator for ImageRecordList {
    type Item = ImageRecord;
    type IntoIter = std::vec::IntoIter<ImageRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.into_iter()
    }
}

impl fmt::Display for ImageRecordList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Images")?;
        for record in &self.images {
            write!(f, "\n{}", record)?;
        }
        Ok(())
    }
}
