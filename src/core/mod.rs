//! core
//!
//! Core domain types and schemas for gozer.
//!
//! # Modules
//!
//! - [`key`] - Storage key codec: `name:version:YYYYMMDD`
//! - [`metadata`] - Image metadata and record types
//! - [`config`] - Configuration schema and loading
//! - [`clock`] - Time source for key dating and timestamps
//!
//! # Design Principles
//!
//! - Identifiers are validated once, at the edge, into strong types
//! - Schemas are strict and self-describing
//! - Nothing here performs I/O except config loading

pub mod clock;
pub mod config;
pub mod key;
pub mod metadata;
