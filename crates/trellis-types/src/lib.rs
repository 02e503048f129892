//! Foundation types for Trellis.
//!
//! This crate provides the identifier, type-tag, and record types shared by
//! every other Trellis crate. Trellis is the persistence core of a federated
//! social-graph object server: every resource is addressed by a canonical
//! IRI, and the store resolves IRIs to typed records and the collections
//! relating them.
//!
//! # Key Types
//!
//! - [`Iri`] -- canonical resource identifier, validated at construction
//! - [`Kind`] -- open type-tag vocabulary with actor/activity/object/collection
//!   classification
//! - [`Object`] -- a concrete typed record (actor, activity, object, tombstone)
//! - [`Item`] -- a bare link, a record, or a collection; the unit of storage
//! - [`Collection`] -- an ordered set of member items
//! - [`CollectionKind`] -- the recognized collection names and their ownership
//! - [`Metadata`] -- the private credential blob stored beside an item

pub mod collections;
pub mod error;
pub mod iri;
pub mod kind;
pub mod metadata;
pub mod object;

pub use collections::CollectionKind;
pub use error::TypeError;
pub use iri::Iri;
pub use kind::Kind;
pub use metadata::Metadata;
pub use object::{Collection, Item, Object};
