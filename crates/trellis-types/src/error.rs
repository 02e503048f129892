use thiserror::Error;

/// Errors produced by type construction and protocol codec operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    /// The value does not parse as an absolute IRI with a host.
    #[error("invalid IRI {iri:?}: {reason}")]
    InvalidIri { iri: String, reason: String },

    /// The item carries no identifier where one is required.
    #[error("item has no id")]
    MissingId,

    /// Failure encoding a record to its protocol JSON form.
    #[error("encode error: {0}")]
    Encode(String),

    /// Failure decoding a record from its protocol JSON form.
    #[error("decode error: {0}")]
    Decode(String),
}
