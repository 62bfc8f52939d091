//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. No other module should import
//! `git2`. Everything else asks for provenance through the [`VcsInspector`]
//! trait, which the build pipeline takes as a dependency so tests can swap
//! in a fixed description.
//!
//! # Responsibilities
//!
//! - Repository discovery and opening
//! - HEAD commit and the tags pointing at it
//! - Remote URL lookup and repository name derivation
//!
//! # Example
//!
//! ```no_run
//! use chrono::Utc;
//! use gozer::git::{GitInspector, VcsInspector};
//!
//! let inspector = GitInspector::new(".");
//! let meta = inspector.describe(Utc::now()).unwrap();
//! println!("{} built from {}", inspector.repo_name().unwrap(), meta.commit);
//! ```

mod inspector;
mod interface;

pub use inspector::{GitInspector, VcsInspector};
pub use interface::{Git, GitError, TagInfo};
