//! When activity participants are expanded from links to full records.
//!
//! Participants are stored as bare links. Expansion happens in exactly two
//! situations: a creation activity always carries its object expanded, and
//! a query that constrains a participant needs that participant's record to
//! evaluate the constraint. Expansion is one level deep; the expanded
//! record's own references stay links, which keeps mutually referencing
//! records from recursing.

use trellis_filter::Filter;
use trellis_types::Kind;

/// Whether an activity's `object` should be expanded.
pub fn expand_object(kind: &Kind, filter: Option<&Filter>) -> bool {
    *kind == Kind::Create || filter.is_some_and(Filter::filters_on_object)
}

/// Whether an activity's `actor` should be expanded.
pub fn expand_actor(filter: Option<&Filter>) -> bool {
    filter.is_some_and(Filter::filters_on_actor)
}

/// Whether an activity's `target` should be expanded.
pub fn expand_target(filter: Option<&Filter>) -> bool {
    filter.is_some_and(Filter::filters_on_target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_types::Iri;

    #[test]
    fn create_always_expands_its_object() {
        assert!(expand_object(&Kind::Create, None));
        assert!(!expand_object(&Kind::Announce, None));
    }

    #[test]
    fn participant_filters_force_expansion() {
        let mut filter = Filter::default();
        filter.object = Some(Box::new(Filter::from_iri(
            &Iri::parse("https://example.com/objects/1").unwrap(),
        )));
        assert!(expand_object(&Kind::Announce, Some(&filter)));
        assert!(!expand_actor(Some(&filter)));

        let mut filter = Filter::default();
        filter.actor = Some(Box::new(Filter::default()));
        assert!(expand_actor(Some(&filter)));
        assert!(!expand_target(Some(&filter)));
    }
}
