//! builder
//!
//! Abstraction over the tool that builds and publishes artifacts.
//!
//! # Modules
//!
//! - `traits`: `ArtifactBuilder` trait, `BuiltArtifact`, and `BuildError`
//! - [`docker`]: Implementation driving the `docker` CLI
//! - [`mock`]: Mock implementation for deterministic testing

pub mod docker;
pub mod mock;
mod traits;

pub use docker::DockerBuilder;
pub use traits::{ArtifactBuilder, BuildError, BuiltArtifact};
