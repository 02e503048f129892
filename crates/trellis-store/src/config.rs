//! Store construction parameters.
//!
//! The store never reads ambient global state; everything it needs to know
//! about the instance it serves arrives in this value at construction.

use trellis_types::Iri;

/// Configuration for a [`crate::Store`].
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Base URL of the local instance. Locality checks (which items may be
    /// saved, which collections may be mutated) compare against it.
    pub base_url: Iri,
    /// Whether the read-through cache is active. Disabled means every
    /// lookup goes to the substrate.
    pub cache: bool,
}

impl StoreConfig {
    /// Configuration for the instance at `base_url`, cache enabled.
    pub fn new(base_url: Iri) -> Self {
        Self {
            base_url,
            cache: true,
        }
    }

    /// Disable the read-through cache (test/development passthrough).
    pub fn without_cache(mut self) -> Self {
        self.cache = false;
        self
    }

    /// Whether `iri` belongs to this instance.
    pub fn is_local(&self, iri: &Iri) -> bool {
        iri.is_within(&self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locality() {
        let config = StoreConfig::new(Iri::parse("https://example.com").unwrap());
        assert!(config.is_local(&Iri::parse("https://example.com/users/a").unwrap()));
        assert!(!config.is_local(&Iri::parse("https://elsewhere.org/users/a").unwrap()));
    }

    #[test]
    fn cache_switch() {
        let config = StoreConfig::new(Iri::parse("https://example.com").unwrap()).without_cache();
        assert!(!config.cache);
    }
}
