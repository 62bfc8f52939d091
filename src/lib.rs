//! Gozer - provenance records for container images
//!
//! Gozer builds a container image, publishes it under a tag derived from the
//! repository's VCS state, and records that state in a metadata store. The
//! store can also be queried and edited directly.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to handlers)
//! - [`pipeline`] - Build, record, and publish as one unit
//! - [`store`] - Metadata store facade over embedded and distributed backends
//! - [`builder`] - Artifact builder over an external container CLI
//! - [`git`] - VCS facts for the working directory
//! - [`core`] - Keys, metadata schema, configuration, and clock
//! - [`telemetry`] - Diagnostic logging setup
//! - [`ui`] - User-facing output
//!
//! # Correctness Invariants
//!
//! 1. A record becomes visible only when its transaction commits
//! 2. The build pipeline commits a record only after its artifact is pushed
//! 3. At most one record exists per image name, version, and UTC day
//! 4. Every key read back from a store parses as `name:version:YYYYMMDD`

pub mod builder;
pub mod cli;
pub mod core;
pub mod git;
pub mod pipeline;
pub mod store;
pub mod telemetry;
pub mod ui;
