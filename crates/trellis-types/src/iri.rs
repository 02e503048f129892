//! Canonical resource identifiers.
//!
//! Every resource the store knows about (actors, activities, objects, and
//! the collections relating them) is addressed by exactly one [`Iri`].
//! Construction validates that the value is an absolute URL with a host;
//! the storage key for a resource is a pure function of that host and path.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// The well-known public audience collection.
const PUBLIC_AUDIENCE: &str = "https://www.w3.org/ns/activitystreams#Public";

/// A canonical IRI addressing a stored resource.
///
/// Two items never share an IRI; equality and hashing use the string form
/// the IRI was constructed with.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Iri(String);

impl Iri {
    /// Parse and validate an IRI.
    ///
    /// Rejects values that do not parse as absolute URLs or that lack a
    /// host component (the host anchors the storage path).
    pub fn parse(value: impl Into<String>) -> Result<Self, TypeError> {
        let value = value.into();
        let parsed = url::Url::parse(&value).map_err(|e| TypeError::InvalidIri {
            iri: value.clone(),
            reason: e.to_string(),
        })?;
        if parsed.host_str().is_none() {
            return Err(TypeError::InvalidIri {
                iri: value,
                reason: "missing host".to_string(),
            });
        }
        Ok(Self(value))
    }

    /// The IRI of the public audience collection.
    pub fn public() -> Self {
        Self(PUBLIC_AUDIENCE.to_string())
    }

    /// The raw string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Host component.
    ///
    /// Guaranteed non-empty by construction; returns an empty string only
    /// for values smuggled in through unchecked deserialization paths.
    pub fn host(&self) -> String {
        url::Url::parse(&self.0)
            .ok()
            .and_then(|u| u.host_str().map(str::to_owned))
            .unwrap_or_default()
    }

    /// Path component, without query or fragment.
    pub fn path(&self) -> String {
        url::Url::parse(&self.0)
            .ok()
            .map(|u| u.path().to_string())
            .unwrap_or_default()
    }

    /// The final path segment, if any.
    pub fn last_segment(&self) -> Option<String> {
        let path = self.path();
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return None;
        }
        trimmed.rsplit('/').next().map(str::to_owned)
    }

    /// The IRI one path level up, or `None` at the host root.
    pub fn parent(&self) -> Option<Iri> {
        let trimmed = self.0.trim_end_matches('/');
        let (head, _) = trimmed.rsplit_once('/')?;
        if head.ends_with(':') || head.ends_with('/') {
            return None;
        }
        Iri::parse(head).ok()
    }

    /// Append a path segment.
    pub fn join(&self, segment: &str) -> Iri {
        Iri(format!(
            "{}/{}",
            self.0.trim_end_matches('/'),
            segment.trim_matches('/')
        ))
    }

    /// Whether this IRI lives under `base` (same instance).
    pub fn is_within(&self, base: &Iri) -> bool {
        let base = base.0.trim_end_matches('/');
        match self.0.strip_prefix(base) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || rest.starts_with('#'),
            None => false,
        }
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Iri({})", self.0)
    }
}

impl From<Iri> for String {
    fn from(iri: Iri) -> String {
        iri.0
    }
}

impl Serialize for Iri {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Iri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Iri::parse(value).map_err(serde::de::Error::custom)
    }
}
