//! The path codec: IRI to substrate key.
//!
//! The key for a resource is a pure function of its IRI's host and path
//! components, joined with `/`. Two leaf names hang off every resource
//! path: `~item` for the payload record and `~meta` for the credential
//! record. Classification of the resolved path bounds how deep a prefix
//! scan may look, which keeps nested records out of shallow listings.

use trellis_types::{CollectionKind, Iri};

use crate::error::{StoreError, StoreResult};

/// Leaf key of the payload record under a resource path.
pub const ITEM_LEAF: &[u8] = b"~item";

/// Leaf key of the credential record under a resource path.
pub const META_LEAF: &[u8] = b"~meta";

/// What a resolved path addresses, and how deep scans under it may look.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathKind {
    /// A plain object; only its own records qualify.
    Entity,
    /// An instance-level collection; direct members qualify.
    InstanceCollection(CollectionKind),
    /// A collection endpoint under an owner.
    OwnedCollection(CollectionKind),
}

impl PathKind {
    /// Maximum number of path segments a qualifying key may have below
    /// the resolved path.
    pub fn depth(&self) -> usize {
        match self {
            PathKind::Entity => 0,
            PathKind::InstanceCollection(_) => 1,
            PathKind::OwnedCollection(_) => 2,
        }
    }

    /// The collection name, when the path addresses one.
    pub fn collection(&self) -> Option<CollectionKind> {
        match self {
            PathKind::Entity => None,
            PathKind::InstanceCollection(kind) | PathKind::OwnedCollection(kind) => Some(*kind),
        }
    }
}

/// An IRI resolved to its substrate path and classification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPath {
    /// `host/path/segments`, no scheme, no trailing separator.
    pub path: Vec<u8>,
    /// Classification of what the path addresses.
    pub kind: PathKind,
}

impl ResolvedPath {
    /// The key of the payload record at this path.
    pub fn item_key(&self) -> Vec<u8> {
        join_leaf(&self.path, ITEM_LEAF)
    }

    /// The key of the credential record at this path.
    pub fn meta_key(&self) -> Vec<u8> {
        join_leaf(&self.path, META_LEAF)
    }

    /// The prefix under which this path's records and children live.
    pub fn scan_prefix(&self) -> Vec<u8> {
        let mut prefix = self.path.clone();
        prefix.push(b'/');
        prefix
    }
}

/// Map an IRI to its substrate path and classification.
pub fn resolve(iri: &Iri) -> StoreResult<ResolvedPath> {
    let host = iri.host();
    if host.is_empty() {
        return Err(StoreError::NotValid(format!("IRI without host: {iri}")));
    }
    let mut path = host;
    let segments = iri.path();
    let trimmed = segments.trim_matches('/');
    if !trimmed.is_empty() {
        path.push('/');
        path.push_str(trimmed);
    }

    let kind = match iri
        .last_segment()
        .and_then(|segment| CollectionKind::from_segment(&segment))
    {
        Some(collection) if collection.is_instance() => PathKind::InstanceCollection(collection),
        Some(collection) => PathKind::OwnedCollection(collection),
        None => PathKind::Entity,
    };

    Ok(ResolvedPath {
        path: path.into_bytes(),
        kind,
    })
}

/// Whether `key` is a payload record key.
pub fn is_item_key(key: &[u8]) -> bool {
    key.ends_with(ITEM_LEAF)
}

/// Whether `key` sits more than `depth` segments below `base`.
///
/// Used while scanning: keys past the permitted depth belong to unrelated
/// nested records and are skipped.
pub fn too_deep(base: &[u8], key: &[u8], depth: usize) -> bool {
    let rest = match key.strip_prefix(base) {
        Some(rest) => rest.strip_prefix(b"/").unwrap_or(rest),
        None => key,
    };
    let rest = rest.strip_suffix(ITEM_LEAF).unwrap_or(rest);
    rest.iter().filter(|byte| **byte == b'/').count() > depth
}

fn join_leaf(path: &[u8], leaf: &[u8]) -> Vec<u8> {
    let mut key = path.to_vec();
    key.push(b'/');
    key.extend_from_slice(leaf);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iri(s: &str) -> Iri {
        Iri::parse(s).unwrap()
    }

    #[test]
    fn entity_path() {
        let resolved = resolve(&iri("https://example.com/objects/42")).unwrap();
        assert_eq!(resolved.path, b"example.com/objects/42".to_vec());
        assert_eq!(resolved.kind, PathKind::Entity);
        assert_eq!(resolved.item_key(), b"example.com/objects/42/~item".to_vec());
        assert_eq!(resolved.meta_key(), b"example.com/objects/42/~meta".to_vec());
    }

    #[test]
    fn host_root_path() {
        let resolved = resolve(&iri("https://example.com")).unwrap();
        assert_eq!(resolved.path, b"example.com".to_vec());
        assert_eq!(resolved.kind, PathKind::Entity);
    }

    #[test]
    fn instance_collection_path() {
        let resolved = resolve(&iri("https://example.com/activities")).unwrap();
        assert_eq!(
            resolved.kind,
            PathKind::InstanceCollection(CollectionKind::Activities)
        );
        assert_eq!(resolved.kind.depth(), 1);
    }

    #[test]
    fn owned_collection_path() {
        let resolved = resolve(&iri("https://example.com/users/alice/followers")).unwrap();
        assert_eq!(
            resolved.kind,
            PathKind::OwnedCollection(CollectionKind::Followers)
        );
        assert_eq!(resolved.kind.depth(), 2);
    }

    #[test]
    fn query_and_fragment_do_not_leak_into_the_path() {
        let resolved = resolve(&iri("https://example.com/objects/42?page=2")).unwrap();
        assert_eq!(resolved.path, b"example.com/objects/42".to_vec());
    }

    #[test]
    fn depth_zero_sees_only_own_records() {
        let base = b"example.com/objects/1";
        assert!(!too_deep(base, b"example.com/objects/1/~item", 0));
        assert!(too_deep(base, b"example.com/objects/1/replies/~item", 0));
    }

    #[test]
    fn depth_one_sees_direct_members() {
        let base = b"example.com/activities";
        assert!(!too_deep(base, b"example.com/activities/~item", 1));
        assert!(!too_deep(base, b"example.com/activities/9/~item", 1));
        assert!(too_deep(base, b"example.com/activities/9/replies/~item", 1));
    }

    #[test]
    fn item_key_detection() {
        assert!(is_item_key(b"example.com/objects/1/~item"));
        assert!(!is_item_key(b"example.com/objects/1/~meta"));
    }
}
