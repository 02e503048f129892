use trellis_types::TypeError;

/// The error taxonomy of the storage engine.
///
/// The boundary above this crate translates these kinds into
/// protocol-appropriate responses; the engine's job is only to classify
/// correctly. Messages carry the failing path or operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record exists at the resolved path or collection.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed IRI, non-local target, or undecodable payload.
    #[error("not valid: {0}")]
    NotValid(String),

    /// Credential verification failed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The operation conflicts with the store's state or the transaction's
    /// access mode.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Substrate I/O or codec failure unrelated to caller input.
    #[error("internal: {0}")]
    Internal(String),

    /// The backend does not provide this capability.
    #[error("not implemented: {0}")]
    NotImplemented(String),
}

impl StoreError {
    /// Whether this is the not-found kind.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// Whether this is the validity kind.
    pub fn is_not_valid(&self) -> bool {
        matches!(self, StoreError::NotValid(_))
    }

    /// Whether this is the unauthorized kind.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, StoreError::Unauthorized(_))
    }
}

impl From<TypeError> for StoreError {
    fn from(err: TypeError) -> Self {
        StoreError::NotValid(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Internal(format!("codec: {err}"))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
