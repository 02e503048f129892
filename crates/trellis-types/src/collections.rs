//! Named collections and their ownership rules.
//!
//! A collection is addressed as its owner's IRI plus a well-known suffix
//! (`.../followers`). Actors own their delivery and relationship streams,
//! objects own their reaction streams, and the instance root owns three
//! mandatory top-level collections that must always resolve, even empty.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::iri::Iri;

/// A recognized collection name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    // Actor-owned streams
    Inbox,
    Outbox,
    Followers,
    Following,
    Liked,
    // Object-owned streams
    Replies,
    Likes,
    Shares,
    // Instance-level collections
    Activities,
    Actors,
    Objects,
}

impl CollectionKind {
    /// Streams created on an actor at first save and cascade-deleted with it.
    pub const ACTOR_OWNED: [CollectionKind; 5] = [
        CollectionKind::Inbox,
        CollectionKind::Outbox,
        CollectionKind::Followers,
        CollectionKind::Following,
        CollectionKind::Liked,
    ];

    /// Streams created on an object at first save and cascade-deleted with it.
    pub const OBJECT_OWNED: [CollectionKind; 3] = [
        CollectionKind::Replies,
        CollectionKind::Likes,
        CollectionKind::Shares,
    ];

    /// Instance-level collections; these never resolve as missing.
    pub const INSTANCE: [CollectionKind; 3] = [
        CollectionKind::Activities,
        CollectionKind::Actors,
        CollectionKind::Objects,
    ];

    /// The path segment naming this collection.
    pub fn as_segment(&self) -> &'static str {
        match self {
            CollectionKind::Inbox => "inbox",
            CollectionKind::Outbox => "outbox",
            CollectionKind::Followers => "followers",
            CollectionKind::Following => "following",
            CollectionKind::Liked => "liked",
            CollectionKind::Replies => "replies",
            CollectionKind::Likes => "likes",
            CollectionKind::Shares => "shares",
            CollectionKind::Activities => "activities",
            CollectionKind::Actors => "actors",
            CollectionKind::Objects => "objects",
        }
    }

    /// Parse a path segment into a recognized collection name.
    pub fn from_segment(segment: &str) -> Option<CollectionKind> {
        match segment {
            "inbox" => Some(CollectionKind::Inbox),
            "outbox" => Some(CollectionKind::Outbox),
            "followers" => Some(CollectionKind::Followers),
            "following" => Some(CollectionKind::Following),
            "liked" => Some(CollectionKind::Liked),
            "replies" => Some(CollectionKind::Replies),
            "likes" => Some(CollectionKind::Likes),
            "shares" => Some(CollectionKind::Shares),
            "activities" => Some(CollectionKind::Activities),
            "actors" => Some(CollectionKind::Actors),
            "objects" => Some(CollectionKind::Objects),
            _ => None,
        }
    }

    /// The IRI of this collection under `owner`.
    pub fn iri_of(&self, owner: &Iri) -> Iri {
        owner.join(self.as_segment())
    }

    /// Whether actors carry this stream.
    pub fn owned_by_actor(&self) -> bool {
        Self::ACTOR_OWNED.contains(self)
    }

    /// Whether objects carry this stream.
    pub fn owned_by_object(&self) -> bool {
        Self::OBJECT_OWNED.contains(self)
    }

    /// Whether this is one of the mandatory instance-level collections.
    pub fn is_instance(&self) -> bool {
        Self::INSTANCE.contains(self)
    }

    /// Split a collection IRI into its owner and collection name.
    ///
    /// Returns `None` when the final path segment is not a recognized
    /// collection name or the IRI has no parent to own it.
    pub fn split(iri: &Iri) -> Option<(Iri, CollectionKind)> {
        let kind = CollectionKind::from_segment(&iri.last_segment()?)?;
        let owner = iri.parent()?;
        Some((owner, kind))
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_segment())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_roundtrip() {
        for kind in CollectionKind::ACTOR_OWNED
            .iter()
            .chain(CollectionKind::OBJECT_OWNED.iter())
            .chain(CollectionKind::INSTANCE.iter())
        {
            assert_eq!(CollectionKind::from_segment(kind.as_segment()), Some(*kind));
        }
        assert_eq!(CollectionKind::from_segment("bookmarks"), None);
    }

    #[test]
    fn split_recognizes_owner() {
        let iri = Iri::parse("https://example.com/users/alice/followers").unwrap();
        let (owner, kind) = CollectionKind::split(&iri).unwrap();
        assert_eq!(owner.as_str(), "https://example.com/users/alice");
        assert_eq!(kind, CollectionKind::Followers);
    }

    #[test]
    fn split_rejects_plain_objects() {
        let iri = Iri::parse("https://example.com/objects/42").unwrap();
        assert!(CollectionKind::split(&iri).is_none());
    }

    #[test]
    fn iri_of_appends_segment() {
        let owner = Iri::parse("https://example.com/users/alice").unwrap();
        let inbox = CollectionKind::Inbox.iri_of(&owner);
        assert_eq!(inbox.as_str(), "https://example.com/users/alice/inbox");
    }

    #[test]
    fn ownership_sets_are_disjoint() {
        for kind in CollectionKind::ACTOR_OWNED {
            assert!(!kind.owned_by_object());
            assert!(!kind.is_instance());
        }
        for kind in CollectionKind::OBJECT_OWNED {
            assert!(!kind.owned_by_actor());
        }
        assert!(CollectionKind::Activities.is_instance());
    }
}
