//! Private per-item metadata.
//!
//! Metadata lives in its own key namespace next to the item payload and has
//! an independent lifecycle: it can exist before the item is first saved and
//! survives item updates untouched.

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The credential blob stored alongside an item.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// PHC-format password hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pw: Option<String>,
}

impl Metadata {
    /// A blob holding only a password hash.
    pub fn with_password_hash(hash: String) -> Self {
        Self { pw: Some(hash) }
    }

    /// Encode to the stored JSON form.
    pub fn to_json_vec(&self) -> Result<Vec<u8>, TypeError> {
        serde_json::to_vec(self).map_err(|e| TypeError::Encode(e.to_string()))
    }

    /// Decode from the stored JSON form.
    pub fn from_json_slice(raw: &[u8]) -> Result<Self, TypeError> {
        serde_json::from_slice(raw).map_err(|e| TypeError::Decode(e.to_string()))
    }
}
