//! Type tags for stored records.
//!
//! The protocol vocabulary is open: unrecognized tags round-trip through
//! [`Kind::Other`] untouched. Classification into actors, activities,
//! objects, and collections drives owned-collection handling, dereferencing,
//! and the delete cascade.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The type tag of an item.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    // Actors
    Application,
    Group,
    Organization,
    Person,
    Service,
    // Activities
    Accept,
    Add,
    Announce,
    Block,
    Create,
    Delete,
    Follow,
    Like,
    Reject,
    Remove,
    Undo,
    Update,
    // Objects
    Article,
    Audio,
    Document,
    Event,
    Image,
    Note,
    Page,
    Video,
    Tombstone,
    // Collections
    Collection,
    OrderedCollection,
    CollectionPage,
    OrderedCollectionPage,
    /// Any tag outside the known vocabulary.
    Other(String),
}

impl Kind {
    /// The wire name of this tag.
    pub fn as_str(&self) -> &str {
        match self {
            Kind::Application => "Application",
            Kind::Group => "Group",
            Kind::Organization => "Organization",
            Kind::Person => "Person",
            Kind::Service => "Service",
            Kind::Accept => "Accept",
            Kind::Add => "Add",
            Kind::Announce => "Announce",
            Kind::Block => "Block",
            Kind::Create => "Create",
            Kind::Delete => "Delete",
            Kind::Follow => "Follow",
            Kind::Like => "Like",
            Kind::Reject => "Reject",
            Kind::Remove => "Remove",
            Kind::Undo => "Undo",
            Kind::Update => "Update",
            Kind::Article => "Article",
            Kind::Audio => "Audio",
            Kind::Document => "Document",
            Kind::Event => "Event",
            Kind::Image => "Image",
            Kind::Note => "Note",
            Kind::Page => "Page",
            Kind::Video => "Video",
            Kind::Tombstone => "Tombstone",
            Kind::Collection => "Collection",
            Kind::OrderedCollection => "OrderedCollection",
            Kind::CollectionPage => "CollectionPage",
            Kind::OrderedCollectionPage => "OrderedCollectionPage",
            Kind::Other(name) => name,
        }
    }

    /// Whether this tag names an actor type.
    pub fn is_actor(&self) -> bool {
        matches!(
            self,
            Kind::Application | Kind::Group | Kind::Organization | Kind::Person | Kind::Service
        )
    }

    /// Whether this tag names an activity type.
    pub fn is_activity(&self) -> bool {
        matches!(
            self,
            Kind::Accept
                | Kind::Add
                | Kind::Announce
                | Kind::Block
                | Kind::Create
                | Kind::Delete
                | Kind::Follow
                | Kind::Like
                | Kind::Reject
                | Kind::Remove
                | Kind::Undo
                | Kind::Update
        )
    }

    /// Whether this tag names a collection type.
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            Kind::Collection
                | Kind::OrderedCollection
                | Kind::CollectionPage
                | Kind::OrderedCollectionPage
        )
    }

    /// Whether this tag names a plain object.
    ///
    /// Everything that is not an actor, an activity, or a collection is
    /// treated as an object, including unrecognized tags.
    pub fn is_object(&self) -> bool {
        !self.is_actor() && !self.is_activity() && !self.is_collection()
    }
}

impl From<&str> for Kind {
    fn from(name: &str) -> Self {
        match name {
            "Application" => Kind::Application,
            "Group" => Kind::Group,
            "Organization" => Kind::Organization,
            "Person" => Kind::Person,
            "Service" => Kind::Service,
            "Accept" => Kind::Accept,
            "Add" => Kind::Add,
            "Announce" => Kind::Announce,
            "Block" => Kind::Block,
            "Create" => Kind::Create,
            "Delete" => Kind::Delete,
            "Follow" => Kind::Follow,
            "Like" => Kind::Like,
            "Reject" => Kind::Reject,
            "Remove" => Kind::Remove,
            "Undo" => Kind::Undo,
            "Update" => Kind::Update,
            "Article" => Kind::Article,
            "Audio" => Kind::Audio,
            "Document" => Kind::Document,
            "Event" => Kind::Event,
            "Image" => Kind::Image,
            "Note" => Kind::Note,
            "Page" => Kind::Page,
            "Video" => Kind::Video,
            "Tombstone" => Kind::Tombstone,
            "Collection" => Kind::Collection,
            "OrderedCollection" => Kind::OrderedCollection,
            "CollectionPage" => Kind::CollectionPage,
            "OrderedCollectionPage" => Kind::OrderedCollectionPage,
            other => Kind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Kind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Kind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Kind::from(name.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(Kind::Person.is_actor());
        assert!(Kind::Create.is_activity());
        assert!(Kind::Note.is_object());
        assert!(Kind::OrderedCollection.is_collection());
        assert!(Kind::Tombstone.is_object());
        assert!(Kind::Other("Recipe".into()).is_object());
        assert!(!Kind::Person.is_object());
        assert!(!Kind::Create.is_object());
    }

    #[test]
    fn wire_name_roundtrip() {
        for name in ["Person", "Create", "Note", "OrderedCollection", "Recipe"] {
            let kind = Kind::from(name);
            assert_eq!(kind.as_str(), name);
        }
    }

    #[test]
    fn serde_as_string() {
        let json = serde_json::to_string(&Kind::Create).unwrap();
        assert_eq!(json, "\"Create\"");
        let back: Kind = serde_json::from_str("\"Recipe\"").unwrap();
        assert_eq!(back, Kind::Other("Recipe".into()));
    }
}
