//! Query and pagination for the Trellis object store.
//!
//! This crate defines the single query shape the store evaluates: a
//! [`Filter`] over a target IRI or collection with type, member-key, and
//! audience clauses, optional nested participant filters for activities,
//! and count-then-fetch pagination ordered by publish time.
//!
//! The store resolves the target and produces candidates; the filter
//! decides membership and cuts the page. [`Filter::fingerprint`] gives the
//! deterministic cache key for collection query results.

pub mod filter;

pub use filter::{Filter, Order, DEFAULT_MAX_ITEMS};
