//! The declarative query specification.
//!
//! A [`Filter`] narrows a candidate set by type, explicit member keys, and
//! audience, optionally constrains an activity through its participants, and
//! paginates the result. Evaluation is count-then-fetch: the total match
//! count is established before a page is cut.

use chrono::{DateTime, Utc};
use trellis_types::{CollectionKind, Iri, Item, Kind, Object};

/// Default page size when a query does not set one.
pub const DEFAULT_MAX_ITEMS: usize = 100;

/// Result ordering over the publish timestamp.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Order {
    /// Oldest first. The default.
    #[default]
    Ascending,
    /// Newest first.
    Descending,
}

/// A query against the store.
///
/// Clause semantics: empty clause lists do not constrain. The `iri` names
/// the load target (an object or a collection); it is resolved by the store,
/// not matched against candidates. Nested participant filters apply only to
/// activities and eliminate non-matching activities from the result
/// entirely.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    /// The object or collection IRI this query targets.
    pub iri: Option<Iri>,
    /// Recognized collection name of the target, when it is a collection.
    pub collection: Option<CollectionKind>,
    /// Match any of these type tags.
    pub kinds: Vec<Kind>,
    /// Match only these member identifiers ("load these N known members").
    pub item_keys: Vec<Iri>,
    /// Match records addressed to any of these recipients. A record
    /// addressed to the public collection matches any audience constraint.
    pub audience: Vec<Iri>,
    /// Constrain activities by their actor.
    pub actor: Option<Box<Filter>>,
    /// Constrain activities by their object.
    pub object: Option<Box<Filter>>,
    /// Constrain activities by their target.
    pub target: Option<Box<Filter>>,
    /// Page size; `0` disables the limit.
    pub max_items: usize,
    /// Number of ordered matches to skip before the page starts.
    pub offset: usize,
    /// Page ordering.
    pub order: Order,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            iri: None,
            collection: None,
            kinds: Vec::new(),
            item_keys: Vec::new(),
            audience: Vec::new(),
            actor: None,
            object: None,
            target: None,
            max_items: DEFAULT_MAX_ITEMS,
            offset: 0,
            order: Order::Ascending,
        }
    }
}

impl Filter {
    /// The filter produced by loading a bare IRI.
    ///
    /// A trailing recognized collection segment marks the target as that
    /// collection; anything else is a plain object load.
    pub fn from_iri(iri: &Iri) -> Self {
        let collection = iri
            .last_segment()
            .and_then(|segment| CollectionKind::from_segment(&segment));
        Self {
            iri: Some(iri.clone()),
            collection,
            ..Self::default()
        }
    }

    /// A filter that loads exactly the given members.
    pub fn by_keys(item_keys: Vec<Iri>) -> Self {
        Self {
            item_keys,
            ..Self::default()
        }
    }

    /// Whether this is an unconstrained single-item lookup.
    pub fn is_simple_lookup(&self) -> bool {
        self.collection.is_none()
            && self.kinds.is_empty()
            && self.item_keys.is_empty()
            && self.audience.is_empty()
            && self.actor.is_none()
            && self.object.is_none()
            && self.target.is_none()
            && self.offset == 0
    }

    /// Whether the query constrains activities by their actor.
    pub fn filters_on_actor(&self) -> bool {
        self.actor.is_some()
    }

    /// Whether the query constrains activities by their object.
    pub fn filters_on_object(&self) -> bool {
        self.object.is_some()
    }

    /// Whether the query constrains activities by their target.
    pub fn filters_on_target(&self) -> bool {
        self.target.is_some()
    }

    /// Evaluate the clause set against a concrete record.
    pub fn matches(&self, object: &Object) -> bool {
        if !self.kinds.is_empty() && !self.kinds.contains(&object.kind) {
            return false;
        }
        if !self.item_keys.is_empty() && !self.item_keys.contains(&object.id) {
            return false;
        }
        if !self.audience.is_empty() {
            let addressed = self.audience.iter().any(|iri| object.addressed_to(iri))
                || object.addressed_to(&Iri::public());
            if !addressed {
                return false;
            }
        }
        true
    }

    /// Evaluate this filter as a participant constraint.
    ///
    /// Used for the nested actor/object/target filters: the participant
    /// must carry the required identifier, and when record-level clauses
    /// are present the participant must be dereferenced and match them.
    pub fn participant_matches(&self, participant: &Item) -> bool {
        if let Some(want) = &self.iri {
            if participant.id() != Some(want) {
                return false;
            }
        }
        if self.kinds.is_empty() && self.item_keys.is_empty() && self.audience.is_empty() {
            return true;
        }
        match participant.as_object() {
            Some(object) => self.matches(object),
            None => false,
        }
    }

    /// Count all matches, then cut the requested page.
    ///
    /// Ordering is by publish timestamp (items without one sort first),
    /// with the identifier as a deterministic tie-break.
    pub fn page(&self, mut items: Vec<Item>) -> (u64, Vec<Item>) {
        let total = items.len() as u64;
        items.sort_by(|a, b| {
            let ka = (published_of(a), a.id().map(Iri::as_str).unwrap_or(""));
            let kb = (published_of(b), b.id().map(Iri::as_str).unwrap_or(""));
            match self.order {
                Order::Ascending => ka.cmp(&kb),
                Order::Descending => kb.cmp(&ka),
            }
        });
        let limit = if self.max_items == 0 {
            usize::MAX
        } else {
            self.max_items
        };
        let page = items.into_iter().skip(self.offset).take(limit).collect();
        (total, page)
    }

    /// Deterministic encoding of every clause, used as a cache key for
    /// collection query results.
    pub fn fingerprint(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(iri) = &self.iri {
            parts.push(format!("iri={iri}"));
        }
        if let Some(collection) = &self.collection {
            parts.push(format!("col={collection}"));
        }
        if !self.kinds.is_empty() {
            let mut kinds: Vec<&str> = self.kinds.iter().map(Kind::as_str).collect();
            kinds.sort_unstable();
            parts.push(format!("kind={}", kinds.join(",")));
        }
        if !self.item_keys.is_empty() {
            let mut keys: Vec<&str> = self.item_keys.iter().map(Iri::as_str).collect();
            keys.sort_unstable();
            parts.push(format!("key={}", keys.join(",")));
        }
        if !self.audience.is_empty() {
            let mut audience: Vec<&str> = self.audience.iter().map(Iri::as_str).collect();
            audience.sort_unstable();
            parts.push(format!("aud={}", audience.join(",")));
        }
        if let Some(actor) = &self.actor {
            parts.push(format!("actor=({})", actor.fingerprint()));
        }
        if let Some(object) = &self.object {
            parts.push(format!("object=({})", object.fingerprint()));
        }
        if let Some(target) = &self.target {
            parts.push(format!("target=({})", target.fingerprint()));
        }
        parts.push(format!("max={}", self.max_items));
        parts.push(format!("off={}", self.offset));
        parts.push(format!(
            "ord={}",
            match self.order {
                Order::Ascending => "asc",
                Order::Descending => "desc",
            }
        ));
        parts.join(";")
    }
}

fn published_of(item: &Item) -> Option<DateTime<Utc>> {
    item.as_object().and_then(|object| object.published)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn iri(s: &str) -> Iri {
        Iri::parse(s).unwrap()
    }

    fn note(id: &str, minute: u32) -> Item {
        let mut object = Object::new(iri(id), Kind::Note);
        object.published = Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap());
        Item::from(object)
    }

    #[test]
    fn from_iri_recognizes_collections() {
        let filter = Filter::from_iri(&iri("https://example.com/users/alice/outbox"));
        assert_eq!(filter.collection, Some(CollectionKind::Outbox));

        let filter = Filter::from_iri(&iri("https://example.com/objects/1"));
        assert_eq!(filter.collection, None);
        assert!(filter.is_simple_lookup());
    }

    #[test]
    fn kind_clause() {
        let mut filter = Filter::default();
        filter.kinds = vec![Kind::Note, Kind::Article];

        let matching = Object::new(iri("https://example.com/objects/1"), Kind::Note);
        let other = Object::new(iri("https://example.com/objects/2"), Kind::Video);
        assert!(filter.matches(&matching));
        assert!(!filter.matches(&other));
    }

    #[test]
    fn item_key_clause() {
        let filter = Filter::by_keys(vec![iri("https://example.com/objects/1")]);
        let yes = Object::new(iri("https://example.com/objects/1"), Kind::Note);
        let no = Object::new(iri("https://example.com/objects/2"), Kind::Note);
        assert!(filter.matches(&yes));
        assert!(!filter.matches(&no));
    }

    #[test]
    fn audience_clause_honors_public() {
        let mut filter = Filter::default();
        filter.audience = vec![iri("https://example.com/users/alice")];

        let mut direct = Object::new(iri("https://example.com/objects/1"), Kind::Note);
        direct.to = vec![iri("https://example.com/users/alice")];

        let mut public = Object::new(iri("https://example.com/objects/2"), Kind::Note);
        public.to = vec![Iri::public()];

        let mut private = Object::new(iri("https://example.com/objects/3"), Kind::Note);
        private.to = vec![iri("https://example.com/users/bob")];

        assert!(filter.matches(&direct));
        assert!(filter.matches(&public));
        assert!(!filter.matches(&private));
    }

    #[test]
    fn page_counts_before_cutting() {
        let items: Vec<Item> = (0..7)
            .map(|i| note(&format!("https://example.com/objects/{i}"), i))
            .collect();
        let mut filter = Filter::default();
        filter.max_items = 3;

        let (total, page) = filter.page(items);
        assert_eq!(total, 7);
        assert_eq!(page.len(), 3);
        assert_eq!(
            page[0].id().unwrap().as_str(),
            "https://example.com/objects/0"
        );
    }

    #[test]
    fn advancing_offset_covers_everything_once() {
        let items: Vec<Item> = (0..7)
            .map(|i| note(&format!("https://example.com/objects/{i}"), i))
            .collect();
        let mut filter = Filter::default();
        filter.max_items = 3;

        let mut seen = Vec::new();
        for offset in (0..7).step_by(3) {
            filter.offset = offset;
            let (_, page) = filter.page(items.clone());
            seen.extend(page.into_iter().map(|it| it.id().unwrap().clone()));
        }
        assert_eq!(seen.len(), 7);
        let mut dedup = seen.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), 7);
    }

    #[test]
    fn descending_order_reverses() {
        let items = vec![
            note("https://example.com/objects/old", 0),
            note("https://example.com/objects/new", 30),
        ];
        let mut filter = Filter::default();
        filter.order = Order::Descending;
        let (_, page) = filter.page(items);
        assert_eq!(
            page[0].id().unwrap().as_str(),
            "https://example.com/objects/new"
        );
    }

    #[test]
    fn zero_max_items_is_unlimited() {
        let items: Vec<Item> = (0..150)
            .map(|i| note(&format!("https://example.com/objects/{i}"), i % 60))
            .collect();
        let mut filter = Filter::default();
        filter.max_items = 0;
        let (total, page) = filter.page(items);
        assert_eq!(total, 150);
        assert_eq!(page.len(), 150);
    }

    #[test]
    fn participant_matching_by_link() {
        let mut sub = Filter::default();
        sub.iri = Some(iri("https://example.com/users/alice"));

        let link = Item::Link(iri("https://example.com/users/alice"));
        let other = Item::Link(iri("https://example.com/users/bob"));
        assert!(sub.participant_matches(&link));
        assert!(!sub.participant_matches(&other));
    }

    #[test]
    fn participant_matching_needs_payload_for_record_clauses() {
        let mut sub = Filter::default();
        sub.kinds = vec![Kind::Person];

        let link = Item::Link(iri("https://example.com/users/alice"));
        assert!(!sub.participant_matches(&link));

        let person = Object::new(iri("https://example.com/users/alice"), Kind::Person);
        assert!(sub.participant_matches(&Item::from(person)));
    }

    #[test]
    fn fingerprint_is_deterministic_and_discriminating() {
        let a = Filter::from_iri(&iri("https://example.com/users/alice/outbox"));
        let b = Filter::from_iri(&iri("https://example.com/users/alice/outbox"));
        assert_eq!(a.fingerprint(), b.fingerprint());

        let mut c = a.clone();
        c.max_items = 5;
        assert_ne!(a.fingerprint(), c.fingerprint());

        let mut d = a.clone();
        d.kinds = vec![Kind::Create];
        assert_ne!(a.fingerprint(), d.fingerprint());
    }
}
