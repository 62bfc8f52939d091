//! core::metadata
//!
//! Image metadata model.
//!
//! # Modules
//!
//! - [`schema`] - Metadata, record, and record list types
//!
//! # Ownership
//!
//! Records are plain values. A list or single record returned by a store is
//! owned by the caller; nothing is shared with the backend after return.
//!
//! # Example
//!
//! ```
//! use gozer::core::metadata::{ArtifactMetadata, ImageRecord, ImageRecordList};
//!
//! let meta = ArtifactMetadata {
//!     commit: "abc123".to_string(),
//!     tags: vec!["v1".to_string()],
//!     origin: "git@host:team/x.git".to_string(),
//!     created_at: "2024-01-01T00:00:00Z".to_string(),
//!     ..Default::default()
//! };
//! let list = ImageRecordList::new(vec![ImageRecord::new("x:1:20240101", meta)]);
//! assert_eq!(list.latest().unwrap().metadata.commit, "abc123");
//! ```

pub mod schema;

pub use schema::{ArtifactMetadata, ImageRecord, ImageRecordList, MetadataError};
