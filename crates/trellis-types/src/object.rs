//! The item model: objects, bare links, and collections.
//!
//! Stored payloads use the protocol's native JSON shapes. Three forms occur
//! on disk and on the wire:
//!
//! - a JSON string is a bare link to another resource;
//! - a JSON array is a collection membership record (links only);
//! - a JSON object is a typed record, dispatched on its `type` field into
//!   either a [`Collection`] or an [`Object`].
//!
//! [`Item`] is the sum of those forms and the unit the store traffics in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::collections::CollectionKind;
use crate::error::TypeError;
use crate::iri::Iri;
use crate::kind::Kind;

/// A concrete typed record: actor, activity, object, or tombstone.
///
/// Absent fields are omitted from the JSON form. The field set is the union
/// of what the supported record classes carry; classification via
/// [`Kind`] decides which ones are meaningful.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Object {
    /// Canonical identifier. Unique across the store.
    pub id: Iri,
    /// Type tag.
    #[serde(rename = "type")]
    pub kind: Kind,

    /// Publish timestamp; drives result ordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Iri>,
    /// Login/display handle; actors only. Survives on tombstones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,

    // Audience
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<Iri>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<Iri>,

    // Activity participants; bare links until dereferenced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Item>,

    // Actor-owned streams; flattened to links when stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inbox: Option<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbox: Option<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers: Option<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub following: Option<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liked: Option<Item>,

    // Object-owned streams; flattened to links when stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares: Option<Item>,

    // Tombstone record of a deleted item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub former_type: Option<Kind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<DateTime<Utc>>,
}

impl Object {
    /// Create an empty record with the given identity and type.
    pub fn new(id: Iri, kind: Kind) -> Self {
        Self {
            id,
            kind,
            published: None,
            name: None,
            summary: None,
            content: None,
            url: None,
            preferred_username: None,
            to: Vec::new(),
            cc: Vec::new(),
            actor: None,
            object: None,
            target: None,
            inbox: None,
            outbox: None,
            followers: None,
            following: None,
            liked: None,
            replies: None,
            likes: None,
            shares: None,
            former_type: None,
            deleted: None,
        }
    }

    /// Deduplicated union of `to` and `cc`.
    pub fn recipients(&self) -> Vec<Iri> {
        let mut all: Vec<Iri> = self.to.iter().chain(self.cc.iter()).cloned().collect();
        all.sort();
        all.dedup();
        all
    }

    /// Whether this record is addressed to `iri`.
    pub fn addressed_to(&self, iri: &Iri) -> bool {
        self.to.contains(iri) || self.cc.contains(iri)
    }

    /// The stream field for a collection name, if this record class has one.
    pub fn stream(&self, kind: CollectionKind) -> Option<&Item> {
        match kind {
            CollectionKind::Inbox => self.inbox.as_ref(),
            CollectionKind::Outbox => self.outbox.as_ref(),
            CollectionKind::Followers => self.followers.as_ref(),
            CollectionKind::Following => self.following.as_ref(),
            CollectionKind::Liked => self.liked.as_ref(),
            CollectionKind::Replies => self.replies.as_ref(),
            CollectionKind::Likes => self.likes.as_ref(),
            CollectionKind::Shares => self.shares.as_ref(),
            _ => None,
        }
    }

    /// Replace the stream field for a collection name.
    ///
    /// Instance-level names are not record fields; setting them is a no-op.
    pub fn set_stream(&mut self, kind: CollectionKind, value: Option<Item>) {
        match kind {
            CollectionKind::Inbox => self.inbox = value,
            CollectionKind::Outbox => self.outbox = value,
            CollectionKind::Followers => self.followers = value,
            CollectionKind::Following => self.following = value,
            CollectionKind::Liked => self.liked = value,
            CollectionKind::Replies => self.replies = value,
            CollectionKind::Likes => self.likes = value,
            CollectionKind::Shares => self.shares = value,
            _ => {}
        }
    }

    /// The stream names this record declares (non-absent fields).
    pub fn declared_streams(&self) -> Vec<CollectionKind> {
        CollectionKind::ACTOR_OWNED
            .iter()
            .chain(CollectionKind::OBJECT_OWNED.iter())
            .copied()
            .filter(|kind| self.stream(*kind).is_some())
            .collect()
    }
}

/// A collection record: an ordered set of member items.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    /// Collection IRI; membership records on disk carry none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Iri>,
    /// Type tag, one of the collection kinds.
    #[serde(rename = "type")]
    pub kind: Kind,
    /// Count of members matching the query, before pagination.
    #[serde(default)]
    pub total_items: u64,
    /// The page of members.
    #[serde(rename = "orderedItems", default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Item>,
}

impl Collection {
    /// An empty ordered collection at `id`.
    pub fn empty(id: Iri) -> Self {
        Self {
            id: Some(id),
            kind: Kind::OrderedCollection,
            total_items: 0,
            items: Vec::new(),
        }
    }

    /// A membership record over bare links, with no identity of its own.
    pub fn of_links(links: Vec<Iri>) -> Self {
        Self {
            id: None,
            kind: Kind::OrderedCollection,
            total_items: links.len() as u64,
            items: links.into_iter().map(Item::Link).collect(),
        }
    }

    /// Whether any member's identifier equals `iri`.
    pub fn contains(&self, iri: &Iri) -> bool {
        self.items.iter().any(|it| it.id() == Some(iri))
    }

    /// Number of members in this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether this page has no members.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Any addressable value: a bare link, a typed record, or a collection.
#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    /// A reference by IRI, not yet dereferenced.
    Link(Iri),
    /// A concrete typed record.
    Object(Box<Object>),
    /// A collection of members.
    Collection(Box<Collection>),
}

impl Item {
    /// The identifier of this item, if it has one.
    pub fn id(&self) -> Option<&Iri> {
        match self {
            Item::Link(iri) => Some(iri),
            Item::Object(object) => Some(&object.id),
            Item::Collection(collection) => collection.id.as_ref(),
        }
    }

    /// The type tag, when the item is a concrete record.
    pub fn kind(&self) -> Option<&Kind> {
        match self {
            Item::Link(_) => None,
            Item::Object(object) => Some(&object.kind),
            Item::Collection(collection) => Some(&collection.kind),
        }
    }

    /// Whether this is a bare link.
    pub fn is_link(&self) -> bool {
        matches!(self, Item::Link(_))
    }

    /// Whether this is a collection.
    pub fn is_collection(&self) -> bool {
        matches!(self, Item::Collection(_))
    }

    /// Borrow the concrete record, if this is one.
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Item::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Borrow the collection, if this is one.
    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Item::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    /// Reduce to a bare link, losing any payload.
    pub fn to_link(&self) -> Result<Item, TypeError> {
        match self.id() {
            Some(iri) => Ok(Item::Link(iri.clone())),
            None => Err(TypeError::MissingId),
        }
    }

    /// Encode to protocol JSON bytes.
    pub fn to_json_vec(&self) -> Result<Vec<u8>, TypeError> {
        serde_json::to_vec(self).map_err(|e| TypeError::Encode(e.to_string()))
    }

    /// Decode from protocol JSON bytes.
    pub fn from_json_slice(raw: &[u8]) -> Result<Item, TypeError> {
        let value: serde_json::Value =
            serde_json::from_slice(raw).map_err(|e| TypeError::Decode(e.to_string()))?;
        Item::from_value(value)
    }

    fn from_value(value: serde_json::Value) -> Result<Item, TypeError> {
        match value {
            serde_json::Value::String(link) => Ok(Item::Link(Iri::parse(link)?)),
            serde_json::Value::Array(members) => {
                let items = members
                    .into_iter()
                    .map(Item::from_value)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Item::Collection(Box::new(Collection {
                    id: None,
                    kind: Kind::OrderedCollection,
                    total_items: items.len() as u64,
                    items,
                })))
            }
            serde_json::Value::Object(map) => {
                let kind = map
                    .get("type")
                    .and_then(|v| v.as_str())
                    .map(Kind::from)
                    .ok_or_else(|| TypeError::Decode("record without a type tag".into()))?;
                let value = serde_json::Value::Object(map);
                if kind.is_collection() {
                    let collection: Collection = serde_json::from_value(value)
                        .map_err(|e| TypeError::Decode(e.to_string()))?;
                    Ok(Item::Collection(Box::new(collection)))
                } else {
                    let object: Object = serde_json::from_value(value)
                        .map_err(|e| TypeError::Decode(e.to_string()))?;
                    Ok(Item::Object(Box::new(object)))
                }
            }
            other => Err(TypeError::Decode(format!(
                "unsupported payload shape: {other}"
            ))),
        }
    }
}

impl From<Object> for Item {
    fn from(object: Object) -> Item {
        Item::Object(Box::new(object))
    }
}

impl From<Collection> for Item {
    fn from(collection: Collection) -> Item {
        Item::Collection(Box::new(collection))
    }
}

impl From<Iri> for Item {
    fn from(iri: Iri) -> Item {
        Item::Link(iri)
    }
}

impl Serialize for Item {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Item::Link(iri) => iri.serialize(serializer),
            Item::Object(object) => object.serialize(serializer),
            Item::Collection(collection) => collection.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Item {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Item::from_value(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iri(s: &str) -> Iri {
        Iri::parse(s).unwrap()
    }

    #[test]
    fn object_json_roundtrip() {
        let mut note = Object::new(iri("https://example.com/objects/1"), Kind::Note);
        note.content = Some("hello".into());
        note.to = vec![Iri::public()];
        let item = Item::from(note.clone());

        let raw = item.to_json_vec().unwrap();
        let back = Item::from_json_slice(&raw).unwrap();
        assert_eq!(back.as_object(), Some(&note));
    }

    #[test]
    fn link_decodes_from_string() {
        let raw = br#""https://example.com/objects/1""#;
        let item = Item::from_json_slice(raw).unwrap();
        assert!(item.is_link());
        assert_eq!(item.id().unwrap().as_str(), "https://example.com/objects/1");
    }

    #[test]
    fn membership_array_decodes_as_collection() {
        let raw = br#"["https://example.com/a", "https://example.com/b"]"#;
        let item = Item::from_json_slice(raw).unwrap();
        let collection = item.as_collection().unwrap();
        assert_eq!(collection.len(), 2);
        assert!(collection.items.iter().all(Item::is_link));
    }

    #[test]
    fn empty_membership_array_is_an_empty_collection() {
        let item = Item::from_json_slice(b"[]").unwrap();
        let collection = item.as_collection().unwrap();
        assert!(collection.is_empty());
    }

    #[test]
    fn typed_collection_decodes_as_collection() {
        let raw = br#"{"id": "https://example.com/users/a/outbox", "type": "OrderedCollection", "totalItems": 0}"#;
        let item = Item::from_json_slice(raw).unwrap();
        assert!(item.is_collection());
        assert_eq!(item.kind(), Some(&Kind::OrderedCollection));
    }

    #[test]
    fn record_without_type_is_rejected() {
        let raw = br#"{"id": "https://example.com/objects/1"}"#;
        let err = Item::from_json_slice(raw).unwrap_err();
        assert!(matches!(err, TypeError::Decode(_)));
    }

    #[test]
    fn activity_keeps_bare_participants() {
        let raw = br#"{
            "id": "https://example.com/activities/1",
            "type": "Create",
            "actor": "https://example.com/users/alice",
            "object": "https://example.com/objects/1"
        }"#;
        let item = Item::from_json_slice(raw).unwrap();
        let activity = item.as_object().unwrap();
        assert!(activity.actor.as_ref().unwrap().is_link());
        assert!(activity.object.as_ref().unwrap().is_link());
    }

    #[test]
    fn embedded_participant_decodes_as_object() {
        let raw = br#"{
            "id": "https://example.com/activities/1",
            "type": "Create",
            "object": {"id": "https://example.com/objects/1", "type": "Note", "content": "hi"}
        }"#;
        let item = Item::from_json_slice(raw).unwrap();
        let inner = item.as_object().unwrap().object.as_ref().unwrap();
        assert_eq!(inner.as_object().unwrap().content.as_deref(), Some("hi"));
    }

    #[test]
    fn recipients_deduplicate() {
        let mut note = Object::new(iri("https://example.com/objects/1"), Kind::Note);
        note.to = vec![iri("https://example.com/users/a"), Iri::public()];
        note.cc = vec![iri("https://example.com/users/a")];
        assert_eq!(note.recipients().len(), 2);
        assert!(note.addressed_to(&Iri::public()));
    }

    #[test]
    fn declared_streams_follow_fields() {
        let mut actor = Object::new(iri("https://example.com/users/alice"), Kind::Person);
        actor.inbox = Some(Item::Link(iri("https://example.com/users/alice/inbox")));
        actor.outbox = Some(Item::Link(iri("https://example.com/users/alice/outbox")));
        assert_eq!(
            actor.declared_streams(),
            vec![CollectionKind::Inbox, CollectionKind::Outbox]
        );
    }

    #[test]
    fn stream_accessors_cover_all_owned_kinds() {
        let mut object = Object::new(iri("https://example.com/objects/1"), Kind::Note);
        for kind in CollectionKind::OBJECT_OWNED {
            let stream = kind.iri_of(&object.id);
            object.set_stream(kind, Some(Item::Link(stream.clone())));
            assert_eq!(object.stream(kind).and_then(Item::id), Some(&stream));
        }
        // Instance-level names are not record fields.
        object.set_stream(CollectionKind::Actors, Some(Item::Link(object.id.clone())));
        assert!(object.stream(CollectionKind::Actors).is_none());
    }

    #[test]
    fn to_link_requires_an_id() {
        let collection = Collection::of_links(vec![]);
        let err = Item::from(collection).to_link().unwrap_err();
        assert_eq!(err, TypeError::MissingId);
    }

    #[test]
    fn serialized_object_omits_absent_fields() {
        let note = Object::new(iri("https://example.com/objects/1"), Kind::Note);
        let json = serde_json::to_string(&Item::from(note)).unwrap();
        assert!(!json.contains("formerType"));
        assert!(!json.contains("preferredUsername"));
        assert!(!json.contains("\"to\""));
    }
}
