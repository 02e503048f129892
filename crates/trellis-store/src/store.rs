//! The storage engine.
//!
//! One [`Store`] serves a single instance. It resolves IRIs through the
//! path codec, runs every logical operation inside exactly one substrate
//! transaction, keeps collection membership as ordered sets of links,
//! expands activity participants under the dereferencing policy, replaces
//! deleted items with tombstones, and answers repeat lookups from the
//! read-through cache.
//!
//! Mutating operations take a read-modify-write transaction; loads take a
//! read-only snapshot. There is no cross-key transaction: an object save
//! and its owner's collection update are separate atomic units, connected
//! only by ordering.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use trellis_filter::Filter;
use trellis_types::{Collection, CollectionKind, Iri, Item, Kind, Metadata, Object};

use crate::cache::LookupCache;
use crate::config::StoreConfig;
use crate::deref;
use crate::error::{StoreError, StoreResult};
use crate::memory::MemorySubstrate;
use crate::password;
use crate::path::{self, PathKind, ResolvedPath};
use crate::traits::{Mode, Substrate, Transaction};

/// How many link redirects a single load will follow.
const MAX_REDIRECTS: u8 = 1;

/// How deep member dereferencing may recurse through nested collections.
const MAX_DEREF_DEPTH: u8 = 2;

/// An empty membership record.
const EMPTY_MEMBERSHIP: &[u8] = b"[]";

/// The IRI-addressed object store.
pub struct Store {
    substrate: Arc<dyn Substrate>,
    config: StoreConfig,
    cache: LookupCache,
}

impl Store {
    /// Build a store over the given substrate.
    pub fn new(substrate: Arc<dyn Substrate>, config: StoreConfig) -> Self {
        let cache = if config.cache {
            LookupCache::new()
        } else {
            LookupCache::disabled()
        };
        Self {
            substrate,
            config,
            cache,
        }
    }

    /// A store over a fresh in-memory substrate.
    pub fn in_memory(config: StoreConfig) -> Self {
        Self::new(Arc::new(MemorySubstrate::new()), config)
    }

    /// The configuration this store was built with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ---- Loading ----

    /// Load whatever `iri` addresses: an object, or a collection with its
    /// members dereferenced.
    pub fn load(&self, iri: &Iri) -> StoreResult<Item> {
        self.load_with(&Filter::from_iri(iri))
    }

    /// Evaluate a filter against the store.
    ///
    /// With a target IRI the filter is resolved through the path codec;
    /// without one, its item keys are loaded directly ("load these N known
    /// members"). Collection results are counted before pagination.
    pub fn load_with(&self, filter: &Filter) -> StoreResult<Item> {
        let Some(target) = filter.iri.clone() else {
            return self.load_keys(filter);
        };
        let resolved = path::resolve(&target)?;
        let fingerprint = filter.fingerprint();

        match resolved.kind {
            PathKind::Entity => {
                if filter.is_simple_lookup() {
                    if let Some(hit) = self.cache.get_item(&target) {
                        debug!(iri = %target, "item served from cache");
                        return Ok(hit);
                    }
                }
            }
            PathKind::InstanceCollection(_) | PathKind::OwnedCollection(_) => {
                if let Some(hit) = self.cache.get_query(&fingerprint) {
                    debug!(iri = %target, "query served from cache");
                    return Ok(hit);
                }
            }
        }

        let loaded = self.view(|tx| self.load_target(tx, &target, &resolved, filter))?;

        if loaded.is_collection() {
            self.cache
                .put_query(fingerprint, Some(target.clone()), &loaded);
        } else if filter.is_simple_lookup() {
            self.cache.put_item(&loaded);
        }
        Ok(loaded)
    }

    fn load_keys(&self, filter: &Filter) -> StoreResult<Item> {
        if filter.item_keys.is_empty() {
            return Err(StoreError::NotValid(
                "filter names neither a target IRI nor item keys".to_string(),
            ));
        }
        let links: Vec<Item> = filter.item_keys.iter().cloned().map(Item::Link).collect();
        let members = self.view(|tx| Ok(self.resolve_members(tx, &links, Some(filter), 0)))?;
        let (total, page) = filter.page(members);
        Ok(Item::from(Collection {
            id: None,
            kind: Kind::OrderedCollection,
            total_items: total,
            items: page,
        }))
    }

    fn load_target(
        &self,
        tx: &mut dyn Transaction,
        target: &Iri,
        resolved: &ResolvedPath,
        filter: &Filter,
    ) -> StoreResult<Item> {
        let depth = resolved.kind.depth();
        let scanned = tx.scan_prefix(&resolved.scan_prefix())?;
        let mut visited = false;
        let mut found: Vec<Item> = Vec::new();

        for (key, raw) in &scanned {
            visited = true;
            if path::too_deep(&resolved.path, key, depth) {
                continue;
            }
            if !path::is_item_key(key) {
                continue;
            }
            self.collect_entry(tx, key, raw, filter, &mut found);
        }

        match resolved.kind {
            PathKind::Entity => {
                if !visited {
                    return Err(StoreError::NotFound(format!("no record at {target}")));
                }
                let mut first = found
                    .into_iter()
                    .next()
                    .ok_or_else(|| StoreError::NotFound(format!("no record at {target}")))?;
                if let Item::Collection(ref mut collection) = first {
                    if collection.id.is_none() {
                        collection.id = Some(target.clone());
                    }
                }
                Ok(first)
            }
            PathKind::InstanceCollection(_) => {
                // mandatory collections resolve even before anything exists
                let (total, page) = filter.page(flatten_members(found));
                Ok(collection_result(target, total, page))
            }
            PathKind::OwnedCollection(_) => {
                if !visited {
                    return Err(StoreError::NotFound(format!(
                        "collection {target} does not exist"
                    )));
                }
                let (total, page) = filter.page(flatten_members(found));
                Ok(collection_result(target, total, page))
            }
        }
    }

    /// Decode one scanned payload record and accumulate its results.
    ///
    /// A record that fails to decode is logged and skipped; a partial
    /// listing beats failing the whole scan.
    fn collect_entry(
        &self,
        tx: &mut dyn Transaction,
        key: &[u8],
        raw: &[u8],
        filter: &Filter,
        out: &mut Vec<Item>,
    ) {
        let item = match Item::from_json_slice(raw) {
            Ok(item) => item,
            Err(e) => {
                warn!(key = %String::from_utf8_lossy(key), error = %e, "skipping undecodable record");
                return;
            }
        };
        match item {
            Item::Link(link) => match self.resolve_entity(tx, &link, Some(filter), 0) {
                Some(resolved) => out.push(resolved),
                None => out.push(Item::Link(link)),
            },
            Item::Collection(collection) => {
                let collection = *collection;
                let members = self.resolve_members(tx, &collection.items, Some(filter), 0);
                out.push(Item::Collection(Box::new(Collection {
                    id: collection.id,
                    kind: collection.kind,
                    total_items: members.len() as u64,
                    items: members,
                })));
            }
            Item::Object(object) => {
                if let Some(object) = self.apply_activity_policy(tx, *object, Some(filter), 0) {
                    if filter.matches(&object) {
                        out.push(Item::Object(Box::new(object)));
                    }
                }
            }
        }
    }

    /// Dereference collection members one by one, flat.
    ///
    /// Members that do not resolve locally stay bare links, unless the
    /// filter needs their payload to evaluate its clauses.
    fn resolve_members(
        &self,
        tx: &mut dyn Transaction,
        members: &[Item],
        filter: Option<&Filter>,
        depth: u8,
    ) -> Vec<Item> {
        let mut out = Vec::new();
        for member in members {
            let Some(iri) = member.id() else {
                continue;
            };
            match self.resolve_entity(tx, iri, filter, depth) {
                Some(item) => out.push(item),
                None => {
                    if filter.map_or(true, |f| link_matches(f, iri)) {
                        out.push(Item::Link(iri.clone()));
                    }
                }
            }
        }
        out
    }

    /// Load the single record at `iri`, following the decode rules: a bare
    /// link redirects once, a membership record dereferences its members,
    /// a typed record passes the dereferencing policy and the filter.
    ///
    /// Returns `None` when nothing usable is stored there or the filter
    /// rejects the record.
    fn resolve_entity(
        &self,
        tx: &mut dyn Transaction,
        iri: &Iri,
        filter: Option<&Filter>,
        depth: u8,
    ) -> Option<Item> {
        if depth > MAX_DEREF_DEPTH {
            return Some(Item::Link(iri.clone()));
        }
        let resolved = path::resolve(iri).ok()?;
        let raw = tx.get(&resolved.item_key()).ok()??;
        let item = match Item::from_json_slice(&raw) {
            Ok(item) => item,
            Err(e) => {
                warn!(iri = %iri, error = %e, "skipping undecodable record");
                return None;
            }
        };
        match item {
            Item::Link(next) => {
                if depth >= MAX_REDIRECTS {
                    return Some(Item::Link(next));
                }
                self.resolve_entity(tx, &next, filter, depth + 1)
            }
            Item::Collection(collection) => {
                let members =
                    self.resolve_members(tx, &collection.items, filter, depth.saturating_add(1));
                Some(Item::Collection(Box::new(Collection {
                    id: Some(iri.clone()),
                    kind: collection.kind.clone(),
                    total_items: members.len() as u64,
                    items: members,
                })))
            }
            Item::Object(object) => {
                let object = self.apply_activity_policy(tx, *object, filter, depth)?;
                if let Some(f) = filter {
                    if !f.matches(&object) {
                        return None;
                    }
                }
                Some(Item::Object(Box::new(object)))
            }
        }
    }

    /// Expand an activity's participants per the dereferencing policy and
    /// evaluate the filter's participant constraints.
    ///
    /// Expansion happens only at depth zero: one level, never through an
    /// already-expanded record. A participant constraint that fails
    /// eliminates the activity entirely. Non-activities are eliminated too
    /// when participant constraints are present.
    fn apply_activity_policy(
        &self,
        tx: &mut dyn Transaction,
        mut object: Object,
        filter: Option<&Filter>,
        depth: u8,
    ) -> Option<Object> {
        let constrained = filter.is_some_and(|f| {
            f.filters_on_actor() || f.filters_on_object() || f.filters_on_target()
        });
        if !object.kind.is_activity() {
            if depth == 0 && constrained {
                return None;
            }
            return Some(object);
        }
        if depth > 0 {
            return Some(object);
        }

        if deref::expand_object(&object.kind, filter) {
            object.object = self.expand_participant(tx, object.object.take());
        }
        if deref::expand_actor(filter) {
            object.actor = self.expand_participant(tx, object.actor.take());
        }
        if deref::expand_target(filter) {
            object.target = self.expand_participant(tx, object.target.take());
        }

        if let Some(f) = filter {
            if let Some(sub) = &f.actor {
                if !participant_ok(object.actor.as_ref(), sub) {
                    return None;
                }
            }
            if let Some(sub) = &f.object {
                if !participant_ok(object.object.as_ref(), sub) {
                    return None;
                }
            }
            if let Some(sub) = &f.target {
                if !participant_ok(object.target.as_ref(), sub) {
                    return None;
                }
            }
        }
        Some(object)
    }

    fn expand_participant(&self, tx: &mut dyn Transaction, participant: Option<Item>) -> Option<Item> {
        match participant {
            Some(Item::Link(iri)) => match self.resolve_entity(tx, &iri, None, 1) {
                Some(item) => Some(item),
                None => Some(Item::Link(iri)),
            },
            other => other,
        }
    }

    // ---- Saving ----

    /// Persist an item at its IRI, overwriting any previous record.
    ///
    /// Declared owned sub-collections are created as empty membership
    /// records on first save and the item's stream fields are flattened to
    /// links; full collections are never embedded inline. Non-local items
    /// are rejected before any write.
    pub fn save(&self, item: Object) -> StoreResult<Object> {
        let mut item = item;
        let iri = item.id.clone();
        if !self.config.is_local(&iri) {
            return Err(StoreError::NotValid(format!(
                "refusing to save non-local item {iri}"
            )));
        }
        let resolved = path::resolve(&iri)?;
        let mut existed = false;
        self.update(|tx| {
            existed = tx.get(&resolved.item_key())?.is_some();
            for kind in item.declared_streams() {
                let stream_iri = kind.iri_of(&iri);
                let stream_key = path::resolve(&stream_iri)?.item_key();
                if tx.get(&stream_key)?.is_none() {
                    tx.put(&stream_key, EMPTY_MEMBERSHIP)?;
                }
                item.set_stream(kind, Some(Item::Link(stream_iri)));
            }
            let raw = serde_json::to_vec(&item)?;
            tx.put(&resolved.item_key(), &raw)
        })?;

        self.cache.put_item(&Item::from(item.clone()));
        if existed {
            debug!(iri = %iri, kind = %item.kind, "updated item");
        } else {
            debug!(iri = %iri, kind = %item.kind, "added new item");
        }
        Ok(item)
    }

    /// Create an empty membership record for a collection.
    ///
    /// Does not populate members and leaves an existing record untouched.
    pub fn create(&self, collection: &Collection) -> StoreResult<Collection> {
        let Some(iri) = collection.id.clone() else {
            return Err(StoreError::NotValid(
                "cannot create a collection without an id".to_string(),
            ));
        };
        if !self.config.is_local(&iri) {
            return Err(StoreError::NotValid(format!(
                "refusing to create non-local collection {iri}"
            )));
        }
        let resolved = path::resolve(&iri)?;
        self.update(|tx| {
            let key = resolved.item_key();
            if tx.get(&key)?.is_none() {
                tx.put(&key, EMPTY_MEMBERSHIP)?;
            }
            Ok(())
        })?;
        debug!(iri = %iri, "created collection");
        Ok(collection.clone())
    }

    // ---- Collection membership ----

    /// Add `item` to a collection's membership set.
    ///
    /// Membership is a set under IRI equality: adding a present member is a
    /// successful no-op. If the owning object does not yet expose this
    /// collection, it is attached first, best-effort.
    pub fn add_to(&self, collection: &Iri, item: &Item) -> StoreResult<()> {
        let member = item.id().cloned().ok_or_else(|| {
            StoreError::NotValid("cannot add an item without an id to a collection".to_string())
        })?;
        self.attach_to_owner(collection);
        debug!(collection = %collection, member = %member, "adding member");
        self.on_collection(collection, |mut members| {
            if !members.contains(&member) {
                members.push(member);
            }
            members
        })
    }

    /// Remove every entry for `item` from a collection's membership set.
    ///
    /// Removing an absent member is a successful no-op.
    pub fn remove_from(&self, collection: &Iri, item: &Item) -> StoreResult<()> {
        let member = item.id().cloned().ok_or_else(|| {
            StoreError::NotValid(
                "cannot remove an item without an id from a collection".to_string(),
            )
        })?;
        debug!(collection = %collection, member = %member, "removing member");
        self.on_collection(collection, |members| {
            members.into_iter().filter(|iri| *iri != member).collect()
        })
    }

    /// Run one membership mutation inside a single transaction.
    fn on_collection(
        &self,
        collection: &Iri,
        op: impl FnOnce(Vec<Iri>) -> Vec<Iri>,
    ) -> StoreResult<()> {
        if !self.config.is_local(collection) {
            return Err(StoreError::NotValid(format!(
                "collection {collection} is not local"
            )));
        }
        let resolved = path::resolve(collection)?;
        self.update(|tx| {
            let key = resolved.item_key();
            let members: Vec<Iri> = match tx.get(&key)? {
                Some(raw) => serde_json::from_slice(&raw).map_err(|e| {
                    StoreError::NotValid(format!(
                        "membership record at {collection} is undecodable: {e}"
                    ))
                })?,
                None => Vec::new(),
            };
            let members = op(members);
            let raw = serde_json::to_vec(&members)?;
            tx.put(&key, &raw)
        })?;
        self.cache.invalidate(collection);
        Ok(())
    }

    /// Attach a collection to its owning object if it is not exposed yet.
    ///
    /// A side channel of `add_to`; its failure never aborts the add.
    fn attach_to_owner(&self, collection: &Iri) {
        let Some((owner, kind)) = CollectionKind::split(collection) else {
            return;
        };
        if kind.is_instance() {
            return;
        }
        let Ok(item) = self.load(&owner) else {
            return;
        };
        let Some(object) = item.as_object() else {
            return;
        };
        if object.stream(kind).is_some() {
            return;
        }
        let mut owner_object = object.clone();
        owner_object.set_stream(kind, Some(Item::Link(collection.clone())));
        if let Err(e) = self.save(owner_object) {
            warn!(collection = %collection, error = %e, "could not attach collection to its owner");
        }
    }

    // ---- Deletion ----

    /// Delete an item, leaving a tombstone at its IRI.
    ///
    /// Deleting a collection recurses over its members. Deleting an object
    /// cascade-deletes its owned sub-collections (each best-effort), then
    /// writes a tombstone carrying the former type and a public-only
    /// audience.
    pub fn delete(&self, item: &Item) -> StoreResult<Item> {
        if let Item::Collection(collection) = item {
            let mut last = item.clone();
            for member in &collection.items {
                last = self.delete(member)?;
            }
            return Ok(last);
        }
        let iri = item.id().cloned().ok_or_else(|| {
            StoreError::NotValid("cannot delete an item without an id".to_string())
        })?;

        // Best-effort: the prior record supplies the former type.
        let old = self
            .load(&iri)
            .ok()
            .and_then(|loaded| loaded.as_object().cloned());

        let former_kind = old
            .as_ref()
            .map(|object| object.kind.clone())
            .or_else(|| item.kind().cloned());
        for kind in owned_collections(former_kind.as_ref()) {
            let stream = kind.iri_of(&iri);
            if let Err(e) = self.drop_record(&stream) {
                warn!(collection = %stream, error = %e, "cascade delete failed");
            }
            self.cache.invalidate(&stream);
        }
        self.cache.invalidate(&iri);

        let mut tombstone = Object::new(iri.clone(), Kind::Tombstone);
        tombstone.former_type = former_kind;
        tombstone.deleted = Some(Utc::now());
        tombstone.to = vec![Iri::public()];
        tombstone.preferred_username = old.and_then(|object| object.preferred_username);
        let saved = self.save(tombstone)?;
        info!(iri = %iri, "wrote tombstone");
        Ok(Item::from(saved))
    }

    fn drop_record(&self, iri: &Iri) -> StoreResult<()> {
        let resolved = path::resolve(iri)?;
        self.update(|tx| tx.delete(&resolved.item_key()))
    }

    // ---- Bootstrap ----

    /// Persist the instance's root service actor if nothing is stored at
    /// its IRI yet. Idempotent.
    pub fn create_service(&self, service: Object) -> StoreResult<()> {
        let iri = service.id.clone();
        match self.load(&iri) {
            Ok(_) => {
                debug!(iri = %iri, "service actor already present");
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                self.save(service)?;
                info!(iri = %iri, "bootstrapped service actor");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    // ---- Credential metadata ----

    /// Hash `secret` and store it in the item's metadata record.
    pub fn password_set(&self, item: &Item, secret: &str) -> StoreResult<()> {
        let iri = item
            .id()
            .ok_or_else(|| StoreError::NotValid("item has no id".to_string()))?;
        let hash = password::hash_secret(secret)?;
        self.save_metadata(&Metadata::with_password_hash(hash), iri)
    }

    /// Verify `secret` against the item's stored credential.
    ///
    /// Fails unauthorized on mismatch, not-found when no metadata record
    /// exists at all.
    pub fn password_check(&self, item: &Item, secret: &str) -> StoreResult<()> {
        let iri = item
            .id()
            .ok_or_else(|| StoreError::NotValid("item has no id".to_string()))?;
        let metadata = self.load_metadata(iri)?;
        let hash = metadata
            .pw
            .ok_or_else(|| StoreError::Unauthorized(format!("no credential set for {iri}")))?;
        password::verify_secret(secret, &hash)
    }

    /// Load the metadata record stored beside the item at `iri`.
    pub fn load_metadata(&self, iri: &Iri) -> StoreResult<Metadata> {
        let resolved = path::resolve(iri)?;
        let raw = self.view(|tx| tx.get(&resolved.meta_key()))?;
        match raw {
            Some(raw) => Ok(Metadata::from_json_slice(&raw)?),
            None => Err(StoreError::NotFound(format!("no metadata at {iri}"))),
        }
    }

    /// Write the metadata record beside the item at `iri`.
    ///
    /// Metadata has its own lifecycle: it may exist before the item does.
    pub fn save_metadata(&self, metadata: &Metadata, iri: &Iri) -> StoreResult<()> {
        let resolved = path::resolve(iri)?;
        let raw = metadata.to_json_vec()?;
        self.update(|tx| tx.put(&resolved.meta_key(), &raw))
    }

    // ---- Transaction plumbing ----

    fn view<R>(&self, op: impl FnOnce(&mut dyn Transaction) -> StoreResult<R>) -> StoreResult<R> {
        self.run(Mode::ReadOnly, op)
    }

    fn update<R>(&self, op: impl FnOnce(&mut dyn Transaction) -> StoreResult<R>) -> StoreResult<R> {
        self.run(Mode::ReadWrite, op)
    }

    fn run<R>(
        &self,
        mode: Mode,
        op: impl FnOnce(&mut dyn Transaction) -> StoreResult<R>,
    ) -> StoreResult<R> {
        let mut op = Some(op);
        let mut out: Option<R> = None;
        self.substrate.transaction(mode, &mut |tx| {
            let op = op
                .take()
                .ok_or_else(|| StoreError::Internal("transaction body invoked twice".to_string()))?;
            out = Some(op(tx)?);
            Ok(())
        })?;
        out.ok_or_else(|| StoreError::Internal("transaction body never invoked".to_string()))
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("base_url", &self.config.base_url)
            .field("cache", &self.cache)
            .finish()
    }
}

/// The owned sub-collections cascade-deleted with an item of `kind`.
fn owned_collections(kind: Option<&Kind>) -> &'static [CollectionKind] {
    match kind {
        Some(kind) if kind.is_actor() => &CollectionKind::ACTOR_OWNED,
        Some(kind) if kind.is_activity() => &[],
        Some(_) => &CollectionKind::OBJECT_OWNED,
        None => &[],
    }
}

/// Splice dereferenced membership records into their member lists.
fn flatten_members(found: Vec<Item>) -> Vec<Item> {
    found
        .into_iter()
        .flat_map(|item| match item {
            Item::Collection(collection) => collection.items,
            other => vec![other],
        })
        .collect()
}

fn collection_result(target: &Iri, total: u64, items: Vec<Item>) -> Item {
    Item::from(Collection {
        id: Some(target.clone()),
        kind: Kind::OrderedCollection,
        total_items: total,
        items,
    })
}

/// The clauses a bare link can satisfy without a payload.
fn link_matches(filter: &Filter, iri: &Iri) -> bool {
    filter.kinds.is_empty()
        && filter.audience.is_empty()
        && (filter.item_keys.is_empty() || filter.item_keys.contains(iri))
        && filter.actor.is_none()
        && filter.object.is_none()
        && filter.target.is_none()
}

fn participant_ok(participant: Option<&Item>, sub: &Filter) -> bool {
    match participant {
        Some(item) => sub.participant_matches(item),
        None => false,
    }
}
