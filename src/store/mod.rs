//! store
//!
//! Persistent store for image metadata records.
//!
//! # Architecture
//!
//! The [`MetadataStore`] trait defines the backend interface. Commands use
//! the [`create_store`] factory, which selects a backend from configuration,
//! and wrap it in the [`Datastore`] facade when they need the
//! single-active-transaction surface.
//!
//! # Modules
//!
//! - `traits`: `MetadataStore`, `StoreTransaction`, and `StoreError`
//! - [`embedded`]: Single-file embedded backend (`redb`)
//! - [`distributed`]: Remote key-value backend (`etcd`)
//! - [`mock`]: In-memory backend for deterministic testing
//! - `facade`: Single-active-transaction wrapper
//! - `factory`: Backend selection and creation
//!
//! # Invariants
//!
//! - Keys are `name:version:YYYYMMDD`; the date comes from the store's clock
//! - Writes become visible only on commit, all at once
//! - Prefix queries return records in key order and never error on no match

pub mod distributed;
pub mod embedded;
mod facade;
mod factory;
pub mod mock;
mod traits;

pub use facade::Datastore;
pub use factory::{create_store, BackendKind};
pub use traits::{MetadataStore, StoreError, StoreTransaction};
