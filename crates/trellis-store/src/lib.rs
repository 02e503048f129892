//! IRI-addressed object storage for the Trellis federated object server.
//!
//! This crate is the persistence core: it resolves canonical IRIs to stored
//! records, maintains ordered membership of named collections, evaluates
//! filtered and paginated queries, dereferences activity participants one
//! level deep, survives deletion with protocol-correct tombstones, and
//! serves repeat lookups from a read-through cache.
//!
//! # Layers
//!
//! - [`Substrate`] -- the physical storage contract: an ordered keyspace
//!   with prefix scans and scoped transactions
//! - [`MemorySubstrate`] -- the in-memory backend
//! - [`Store`] -- the engine, written once against the substrate seam
//! - [`StoreConfig`] -- explicit per-instance configuration
//! - [`LookupCache`] -- IRI- and query-keyed read-through cache
//!
//! # Design Rules
//!
//! 1. The key for a record is a pure function of its IRI's host and path.
//! 2. Every logical operation runs in exactly one substrate transaction,
//!    acquired for its duration; no handle outlives the call.
//! 3. Collection membership is a set under IRI equality.
//! 4. Deletion tombstones; it never leaves an IRI dangling.
//! 5. Write-path errors surface to the caller; read-path decode failures of
//!    individual members are logged and skipped.
//! 6. The cache never participates in substrate transactions.

pub mod cache;
pub mod config;
pub mod deref;
pub mod error;
pub mod memory;
pub mod password;
pub mod path;
pub mod store;
pub mod traits;

pub use cache::LookupCache;
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use memory::MemorySubstrate;
pub use store::Store;
pub use traits::{Mode, Substrate, Transaction};
