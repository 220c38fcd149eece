//! Storage facade for ShelfDB
//!
//! ## Design: STATELESS FACADE
//!
//! [`DocumentStore`] holds only the injected backing-collection handle and
//! the configured limits. No caches, no ambient state; every operation
//! takes the caller's tenant scope explicitly and issues its store round
//! trips in order. Multiple facade instances over one collection are safe.
//!
//! ## Data flow
//!
//! Inbound wire JSON → type casters decode tagged values → validation
//! chain (forbidden fields, then key formats) → field translation to the
//! internal view → store operation under criteria-builder scoping →
//! results translated back and re-encoded for the wire.
//!
//! ## Per-document lifecycle
//!
//! absent → active (create) → active (update)* → deleted (delete).
//! Delete is always soft; nothing here removes rows physically. A create
//! may re-occupy a soft-deleted key, yielding a fresh logical document.

use chrono::Utc;
use serde_json::Value as Wire;
use shelf_codec::{decode_document, encode_document};
use shelf_core::fields::{
    EXT_BUCKET, EXT_CREATED, EXT_KEY, INT_APP, INT_BUCKET, INT_CREATED, INT_DELETED, INT_ID,
    INT_IP, INT_UPDATED, INT_USER,
};
use shelf_core::key::{generate_key, internal_id};
use shelf_core::{Document, Error, Limits, Result, TenantScope, Value};
use shelf_query::{build_criteria, to_external, to_internal, ValidationChain};
use shelf_store::BackingCollection;
use std::sync::Arc;
use tracing::debug;

/// Target selector for update/delete: exactly one of key or filter
#[derive(Debug, Clone)]
pub enum Target {
    /// Address a single document by its external key
    Key(String),
    /// Address every document matching a wire filter
    Filter(Wire),
}

/// Pagination bounds for find
#[derive(Debug, Clone, Copy, Default)]
pub struct Page {
    /// Documents to skip (default 0)
    pub skip: usize,
    /// Page size; `None` uses the configured default
    pub limit: Option<usize>,
}

/// Outcome of the force-mode save helper
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The target existed and was updated in place
    Updated,
    /// The target was absent; a new document was created with this key
    Created(String),
}

/// Tenant-scoped CRUD facade over a backing document collection
#[derive(Clone)]
pub struct DocumentStore {
    collection: Arc<dyn BackingCollection>,
    limits: Limits,
}

impl DocumentStore {
    /// Create a facade over an injected collection handle
    pub fn new(collection: Arc<dyn BackingCollection>, limits: Limits) -> Self {
        Self { collection, limits }
    }

    /// The configured limits
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    // ========================================================================
    // create
    // ========================================================================

    /// Store a new document, returning its external key
    ///
    /// Generates a random unique key when the document carries no `_key`.
    /// Fails with `DocumentAlreadyExists` when a live document occupies
    /// the key; the existence probe runs first, and the store's unique
    /// index backstops the probe-then-insert window.
    pub fn create(
        &self,
        scope: &TenantScope,
        ip: &str,
        bucket: &str,
        doc: &Wire,
    ) -> Result<String> {
        scope.require()?;
        let decoded = self.decode_body(doc, scope)?;
        ValidationChain::for_save().check(&decoded)?;

        let key = match decoded.get(EXT_KEY) {
            None => generate_key(),
            Some(Value::String(k)) => k.clone(),
            Some(_) => {
                return Err(Error::InvalidRequest(format!(
                    "{} must be a string",
                    EXT_KEY
                )))
            }
        };
        if key.is_empty() || key.len() > self.limits.max_key_bytes {
            return Err(Error::InvalidDocumentKey);
        }
        let id = internal_id(&scope.app_id, &scope.user_id, bucket, &key)?;

        let mut probe = Document::new();
        probe.insert(INT_ID.to_string(), Value::String(id.clone()));
        probe.insert(INT_DELETED.to_string(), Value::Bool(false));
        if self.collection.exists(&probe)? {
            return Err(Error::DocumentAlreadyExists {
                key,
                bucket: bucket.to_string(),
            });
        }

        let mut internal = to_internal(&decoded, scope, bucket)?;
        let now = Value::Timestamp(Utc::now());
        internal.insert(INT_ID.to_string(), Value::String(id));
        internal.insert(INT_APP.to_string(), Value::String(scope.app_id.clone()));
        internal.insert(INT_USER.to_string(), Value::String(scope.user_id.clone()));
        internal.insert(INT_BUCKET.to_string(), Value::String(bucket.to_string()));
        internal.insert(INT_CREATED.to_string(), now.clone());
        internal.insert(INT_UPDATED.to_string(), now);
        internal.insert(INT_IP.to_string(), Value::String(ip.to_string()));
        internal.insert(INT_DELETED.to_string(), Value::Bool(false));

        match self.collection.insert(internal) {
            Ok(()) => {
                debug!(%scope, bucket, key = %key, "document created");
                Ok(key)
            }
            // two creates raced past the probe; the unique index decides
            Err(Error::UniqueIndexViolation(_)) => Err(Error::DocumentAlreadyExists {
                key,
                bucket: bucket.to_string(),
            }),
            Err(other) => Err(other),
        }
    }

    // ========================================================================
    // get
    // ========================================================================

    /// Fetch one document by key; `None` when absent or soft-deleted
    pub fn get(&self, scope: &TenantScope, bucket: &str, key: &str) -> Result<Option<Wire>> {
        scope.require()?;
        if key.is_empty() {
            return Err(Error::InvalidDocumentKey);
        }
        let id = internal_id(&scope.app_id, &scope.user_id, bucket, key)?;
        let mut criteria = Document::new();
        criteria.insert(INT_ID.to_string(), Value::String(id));
        criteria.insert(INT_DELETED.to_string(), Value::Bool(false));

        let found = self.collection.find_one(&criteria)?;
        Ok(found.map(|doc| Wire::Object(encode_document(&to_external(doc)))))
    }

    // ========================================================================
    // find
    // ========================================================================

    /// Query a bucket with an optional filter and pagination bounds
    pub fn find(
        &self,
        scope: &TenantScope,
        bucket: &str,
        filter: Option<&Wire>,
        page: Page,
    ) -> Result<Vec<Wire>> {
        scope.require()?;
        let limit = page.limit.unwrap_or(self.limits.default_page_size);
        if limit == 0 {
            return Err(Error::InvalidRequest("limit must be positive".to_string()));
        }

        let decoded = match filter {
            Some(f) => {
                let d = self.decode_filter(f, scope)?;
                ValidationChain::for_filter().check(&d)?;
                Some(d)
            }
            None => None,
        };
        let criteria = build_criteria(scope, bucket, decoded.as_ref())?;

        let rows = self.collection.find(&criteria, page.skip, limit)?;
        debug!(%scope, bucket, matched = rows.len(), "find");
        Ok(rows
            .into_iter()
            .map(|doc| Wire::Object(encode_document(&to_external(doc))))
            .collect())
    }

    // ========================================================================
    // update
    // ========================================================================

    /// Field-merge a fragment into every document the target selects
    ///
    /// Reserved external fields (`_key`, `_bucket`, `_created`) are
    /// silently dropped from the fragment; the tenant scope, key and
    /// creation metadata of a document never change after create. Does
    /// not report how many documents matched.
    pub fn update(
        &self,
        scope: &TenantScope,
        ip: &str,
        bucket: &str,
        fragment: &Wire,
        target: &Target,
    ) -> Result<()> {
        scope.require()?;
        let decoded = self.decode_body(fragment, scope)?;
        ValidationChain::for_update().check(&decoded)?;

        let mut patch = self.update_patch(&decoded, scope, bucket)?;
        patch.insert(INT_UPDATED.to_string(), Value::Timestamp(Utc::now()));
        patch.insert(INT_IP.to_string(), Value::String(ip.to_string()));

        let criteria = self.target_criteria(scope, bucket, target)?;
        let matched = self.collection.update_many(&criteria, &patch)?;
        debug!(%scope, bucket, matched, "update");
        Ok(())
    }

    // ========================================================================
    // delete (soft)
    // ========================================================================

    /// Soft-delete every document the target selects
    ///
    /// Flips the deleted flag and stamps update metadata; the row stays in
    /// the collection but disappears from get/find and existence checks.
    pub fn delete(
        &self,
        scope: &TenantScope,
        ip: &str,
        bucket: &str,
        target: &Target,
    ) -> Result<()> {
        scope.require()?;
        let criteria = self.target_criteria(scope, bucket, target)?;

        let mut patch = Document::new();
        patch.insert(INT_DELETED.to_string(), Value::Bool(true));
        patch.insert(INT_UPDATED.to_string(), Value::Timestamp(Utc::now()));
        patch.insert(INT_IP.to_string(), Value::String(ip.to_string()));

        let matched = self.collection.update_many(&criteria, &patch)?;
        debug!(%scope, bucket, matched, "soft delete");
        Ok(())
    }

    // ========================================================================
    // existence probe
    // ========================================================================

    /// Does any live document match the filter in this bucket?
    pub fn is_document_exists(
        &self,
        scope: &TenantScope,
        bucket: &str,
        filter: Option<&Wire>,
    ) -> Result<bool> {
        scope.require()?;
        let decoded = match filter {
            Some(f) => {
                let d = self.decode_filter(f, scope)?;
                ValidationChain::for_filter().check(&d)?;
                Some(d)
            }
            None => None,
        };
        let criteria = build_criteria(scope, bucket, decoded.as_ref())?;
        self.collection.exists(&criteria)
    }

    // ========================================================================
    // save: the API-boundary force/upsert helper
    // ========================================================================

    /// Update the target, or create it when absent and `force` is set
    ///
    /// Check-then-act in two store round trips, not atomic: a concurrent
    /// create between the probe and the branch surfaces as
    /// `DocumentAlreadyExists` from the create path.
    pub fn save(
        &self,
        scope: &TenantScope,
        ip: &str,
        bucket: &str,
        doc: &Wire,
        target: &Target,
        force: bool,
    ) -> Result<SaveOutcome> {
        scope.require()?;
        let criteria = self.target_criteria(scope, bucket, target)?;
        if self.collection.exists(&criteria)? {
            self.update(scope, ip, bucket, doc, target)?;
            return Ok(SaveOutcome::Updated);
        }
        if !force {
            return Err(Error::DocumentNotFound);
        }
        let key = match target {
            // re-occupy the addressed key
            Target::Key(k) => {
                let mut with_key = match doc.as_object() {
                    Some(obj) => obj.clone(),
                    None => return Err(Error::InvalidDocument { fields: vec![] }),
                };
                with_key.insert(EXT_KEY.to_string(), Wire::String(k.clone()));
                self.create(scope, ip, bucket, &Wire::Object(with_key))?
            }
            Target::Filter(_) => self.create(scope, ip, bucket, doc)?,
        };
        Ok(SaveOutcome::Created(key))
    }

    // ========================================================================
    // helpers
    // ========================================================================

    fn decode_body(&self, body: &Wire, scope: &TenantScope) -> Result<Document> {
        match body.as_object() {
            Some(obj) => decode_document(obj, scope),
            None => Err(Error::InvalidDocument { fields: vec![] }),
        }
    }

    fn decode_filter(&self, filter: &Wire, scope: &TenantScope) -> Result<Document> {
        match filter.as_object() {
            Some(obj) => decode_document(obj, scope),
            None => Err(Error::InvalidRequest("filter must be an object".to_string())),
        }
    }

    /// Build the internal update fragment: reserved externals dropped,
    /// remaining fields translated (ISO coercion included)
    fn update_patch(
        &self,
        decoded: &Document,
        scope: &TenantScope,
        bucket: &str,
    ) -> Result<Document> {
        let mut stripped = decoded.clone();
        stripped.remove(EXT_KEY);
        stripped.remove(EXT_BUCKET);
        stripped.remove(EXT_CREATED);
        to_internal(&stripped, scope, bucket)
    }

    fn target_criteria(
        &self,
        scope: &TenantScope,
        bucket: &str,
        target: &Target,
    ) -> Result<Document> {
        match target {
            Target::Key(key) => {
                if key.is_empty() {
                    return Err(Error::InvalidDocumentKey);
                }
                let mut by_key = Document::new();
                by_key.insert(EXT_KEY.to_string(), Value::String(key.clone()));
                build_criteria(scope, bucket, Some(&by_key))
            }
            Target::Filter(filter) => {
                let decoded = self.decode_filter(filter, scope)?;
                ValidationChain::for_filter().check(&decoded)?;
                build_criteria(scope, bucket, Some(&decoded))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shelf_store::MemoryCollection;

    fn store() -> DocumentStore {
        DocumentStore::new(Arc::new(MemoryCollection::new()), Limits::default())
    }

    fn scope() -> TenantScope {
        TenantScope::new("app", "alice")
    }

    const IP: &str = "203.0.113.9";

    // === Tenant preconditions ===

    #[test]
    fn test_missing_identity_fails_before_store_access() {
        let s = store();
        let anon = TenantScope::new("", "alice");
        let err = s.create(&anon, IP, "books", &json!({})).unwrap_err();
        assert_eq!(err, Error::InvalidTenant);
        assert_eq!(s.get(&anon, "books", "k").unwrap_err(), Error::InvalidTenant);
        assert_eq!(
            s.find(&anon, "books", None, Page::default()).unwrap_err(),
            Error::InvalidTenant
        );
    }

    // === create ===

    #[test]
    fn test_create_generates_key_when_absent() {
        let s = store();
        let key = s.create(&scope(), IP, "books", &json!({"title": "T"})).unwrap();
        assert_eq!(key.len(), 32);
        assert!(s.get(&scope(), "books", &key).unwrap().is_some());
    }

    #[test]
    fn test_create_honors_explicit_key() {
        let s = store();
        let key = s
            .create(&scope(), IP, "books", &json!({"_key": "k1", "title": "T"}))
            .unwrap();
        assert_eq!(key, "k1");
    }

    #[test]
    fn test_create_duplicate_key_fails_with_names_in_message() {
        let s = store();
        s.create(&scope(), IP, "books", &json!({"_key": "k1"})).unwrap();
        let err = s.create(&scope(), IP, "books", &json!({"_key": "k1"})).unwrap_err();
        match &err {
            Error::DocumentAlreadyExists { key, bucket } => {
                assert_eq!(key, "k1");
                assert_eq!(bucket, "books");
            }
            other => panic!("expected DocumentAlreadyExists, got {:?}", other),
        }
    }

    #[test]
    fn test_same_key_different_bucket_or_tenant_is_fine() {
        let s = store();
        s.create(&scope(), IP, "books", &json!({"_key": "k1"})).unwrap();
        s.create(&scope(), IP, "films", &json!({"_key": "k1"})).unwrap();
        let bob = TenantScope::new("app", "bob");
        s.create(&bob, IP, "books", &json!({"_key": "k1"})).unwrap();
    }

    #[test]
    fn test_create_rejects_forbidden_fields() {
        let s = store();
        let err = s
            .create(&scope(), IP, "books", &json!({"a": {"b": {"$where": 1}}}))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDocument { .. }));
    }

    #[test]
    fn test_create_rejects_bad_field_names() {
        let s = store();
        let err = s
            .create(&scope(), IP, "books", &json!({"bad name": 1, "also bad!": 2}))
            .unwrap_err();
        match err {
            Error::InvalidKeyFormat { names } => assert_eq!(names.len(), 2),
            other => panic!("expected InvalidKeyFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_create_rejects_oversized_or_empty_key() {
        let s = store();
        let err = s
            .create(&scope(), IP, "books", &json!({"_key": ""}))
            .unwrap_err();
        assert_eq!(err, Error::InvalidDocumentKey);

        let small = DocumentStore::new(
            Arc::new(MemoryCollection::new()),
            Limits::with_small_limits(),
        );
        let long_key = "k".repeat(65);
        let err = small
            .create(&scope(), IP, "books", &json!({"_key": long_key}))
            .unwrap_err();
        assert_eq!(err, Error::InvalidDocumentKey);
    }

    #[test]
    fn test_create_rejects_non_object_body() {
        let s = store();
        let err = s.create(&scope(), IP, "books", &json!(null)).unwrap_err();
        assert!(matches!(err, Error::InvalidDocument { .. }));
        let err = s.create(&scope(), IP, "books", &json!([1, 2])).unwrap_err();
        assert!(matches!(err, Error::InvalidDocument { .. }));
    }

    // === get ===

    #[test]
    fn test_get_returns_external_view() {
        let s = store();
        let key = s
            .create(&scope(), IP, "books", &json!({"title": "T", "author": "X"}))
            .unwrap();
        let doc = s.get(&scope(), "books", &key).unwrap().unwrap();
        let obj = doc.as_object().unwrap();
        assert_eq!(obj["title"], json!("T"));
        assert_eq!(obj["_key"], json!(key));
        assert_eq!(obj["_bucket"], json!("books"));
        // bare ISO string, not a tagged Date
        assert!(obj["_created"].is_string());
        // no bookkeeping leakage
        assert!(!obj.contains_key("_id"));
        assert!(obj.keys().all(|k| !k.starts_with("__")));
    }

    #[test]
    fn test_get_absent_is_none_not_error() {
        let s = store();
        assert!(s.get(&scope(), "books", "nope").unwrap().is_none());
    }

    #[test]
    fn test_get_empty_key_is_invalid() {
        let s = store();
        assert_eq!(
            s.get(&scope(), "books", "").unwrap_err(),
            Error::InvalidDocumentKey
        );
    }

    // === tenant isolation ===

    #[test]
    fn test_tenant_isolation() {
        let s = store();
        s.create(&scope(), IP, "books", &json!({"_key": "k1", "title": "T"}))
            .unwrap();
        let bob = TenantScope::new("app", "bob");
        assert!(s.get(&bob, "books", "k1").unwrap().is_none());
        assert!(s.find(&bob, "books", None, Page::default()).unwrap().is_empty());
    }

    // === find ===

    #[test]
    fn test_find_with_filter_and_pagination() {
        let s = store();
        for i in 0..5 {
            s.create(
                &scope(),
                IP,
                "books",
                &json!({"_key": format!("k{}", i), "n": i, "kind": "x"}),
            )
            .unwrap();
        }
        let all = s
            .find(&scope(), "books", Some(&json!({"kind": "x"})), Page::default())
            .unwrap();
        assert_eq!(all.len(), 5);

        let page = s
            .find(
                &scope(),
                "books",
                None,
                Page { skip: 2, limit: Some(2) },
            )
            .unwrap();
        assert_eq!(page.len(), 2);

        let past_end = s
            .find(&scope(), "books", None, Page { skip: 50, limit: Some(10) })
            .unwrap();
        assert!(past_end.is_empty());
    }

    #[test]
    fn test_find_zero_limit_is_invalid() {
        let s = store();
        let err = s
            .find(&scope(), "books", None, Page { skip: 0, limit: Some(0) })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn test_find_dotted_path_filter() {
        let s = store();
        s.create(&scope(), IP, "books", &json!({"a": {"b": {"c": 5}}}))
            .unwrap();
        let hit = s
            .find(&scope(), "books", Some(&json!({"a.b.c": 5})), Page::default())
            .unwrap();
        assert_eq!(hit.len(), 1);
        let miss = s
            .find(
                &scope(),
                "books",
                Some(&json!({"a.b": {"c.d": 5}})),
                Page::default(),
            )
            .unwrap();
        assert!(miss.is_empty());
    }

    #[test]
    fn test_find_range_operator_on_coerced_dates() {
        let s = store();
        s.create(
            &scope(),
            IP,
            "events",
            &json!({"_key": "old", "when": "2020-01-01T00:00:00Z"}),
        )
        .unwrap();
        s.create(
            &scope(),
            IP,
            "events",
            &json!({"_key": "new", "when": "2024-01-01T00:00:00Z"}),
        )
        .unwrap();
        let hits = s
            .find(
                &scope(),
                "events",
                Some(&json!({"when": {"$gt": "2022-01-01T00:00:00Z"}})),
                Page::default(),
            )
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].as_object().unwrap()["_key"], json!("new"));
    }

    #[test]
    fn test_find_rejects_where_operator_in_filter() {
        let s = store();
        let err = s
            .find(&scope(), "books", Some(&json!({"$where": "1"})), Page::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDocument { .. }));
    }

    // === update ===

    #[test]
    fn test_update_by_key_merges_fields() {
        let s = store();
        s.create(&scope(), IP, "books", &json!({"_key": "k1", "title": "T", "n": 1}))
            .unwrap();
        s.update(
            &scope(),
            IP,
            "books",
            &json!({"n": 2, "extra": true}),
            &Target::Key("k1".to_string()),
        )
        .unwrap();
        let doc = s.get(&scope(), "books", "k1").unwrap().unwrap();
        let obj = doc.as_object().unwrap();
        assert_eq!(obj["n"], json!(2));
        assert_eq!(obj["extra"], json!(true));
        assert_eq!(obj["title"], json!("T"), "merge, not replace");
    }

    #[test]
    fn test_update_cannot_move_reserved_fields() {
        let s = store();
        s.create(&scope(), IP, "books", &json!({"_key": "k1"})).unwrap();
        s.update(
            &scope(),
            IP,
            "books",
            &json!({"_key": "hijack", "_bucket": "elsewhere", "n": 1}),
            &Target::Key("k1".to_string()),
        )
        .unwrap();
        let doc = s.get(&scope(), "books", "k1").unwrap().unwrap();
        let obj = doc.as_object().unwrap();
        assert_eq!(obj["_key"], json!("k1"));
        assert_eq!(obj["_bucket"], json!("books"));
        assert_eq!(obj["n"], json!(1));
        assert!(s.get(&scope(), "books", "hijack").unwrap().is_none());
    }

    #[test]
    fn test_update_by_filter_touches_all_matches() {
        let s = store();
        for i in 0..3 {
            s.create(&scope(), IP, "books", &json!({"_key": format!("k{}", i), "kind": "x"}))
                .unwrap();
        }
        s.update(
            &scope(),
            IP,
            "books",
            &json!({"seen": true}),
            &Target::Filter(json!({"kind": "x"})),
        )
        .unwrap();
        let hits = s
            .find(&scope(), "books", Some(&json!({"seen": true})), Page::default())
            .unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_update_missing_target_is_silent() {
        // update does not report match counts; no error on zero matches
        let s = store();
        s.update(
            &scope(),
            IP,
            "books",
            &json!({"n": 1}),
            &Target::Key("ghost".to_string()),
        )
        .unwrap();
    }

    // === delete ===

    #[test]
    fn test_soft_delete_hides_then_key_reusable() {
        let s = store();
        s.create(&scope(), IP, "books", &json!({"_key": "k1", "title": "old"}))
            .unwrap();
        s.delete(&scope(), IP, "books", &Target::Key("k1".to_string()))
            .unwrap();

        assert!(s.get(&scope(), "books", "k1").unwrap().is_none());
        assert!(s.find(&scope(), "books", None, Page::default()).unwrap().is_empty());

        // the logical slot is free again
        s.create(&scope(), IP, "books", &json!({"_key": "k1", "title": "new"}))
            .unwrap();
        let doc = s.get(&scope(), "books", "k1").unwrap().unwrap();
        assert_eq!(doc.as_object().unwrap()["title"], json!("new"));
    }

    #[test]
    fn test_delete_by_filter() {
        let s = store();
        s.create(&scope(), IP, "books", &json!({"_key": "a", "kind": "x"})).unwrap();
        s.create(&scope(), IP, "books", &json!({"_key": "b", "kind": "y"})).unwrap();
        s.delete(&scope(), IP, "books", &Target::Filter(json!({"kind": "x"})))
            .unwrap();
        let rest = s.find(&scope(), "books", None, Page::default()).unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].as_object().unwrap()["_key"], json!("b"));
    }

    // === existence probe ===

    #[test]
    fn test_is_document_exists() {
        let s = store();
        s.create(&scope(), IP, "books", &json!({"_key": "k1", "n": 1})).unwrap();
        assert!(s
            .is_document_exists(&scope(), "books", Some(&json!({"_key": "k1"})))
            .unwrap());
        assert!(!s
            .is_document_exists(&scope(), "books", Some(&json!({"n": 99})))
            .unwrap());
    }

    // === save (force/upsert) ===

    #[test]
    fn test_save_updates_existing_target() {
        let s = store();
        s.create(&scope(), IP, "books", &json!({"_key": "k1", "n": 1})).unwrap();
        let outcome = s
            .save(
                &scope(),
                IP,
                "books",
                &json!({"n": 2}),
                &Target::Key("k1".to_string()),
                false,
            )
            .unwrap();
        assert_eq!(outcome, SaveOutcome::Updated);
        let doc = s.get(&scope(), "books", "k1").unwrap().unwrap();
        assert_eq!(doc.as_object().unwrap()["n"], json!(2));
    }

    #[test]
    fn test_save_force_creates_on_miss() {
        let s = store();
        let outcome = s
            .save(
                &scope(),
                IP,
                "books",
                &json!({"n": 1}),
                &Target::Filter(json!({"n": 1})),
                true,
            )
            .unwrap();
        match outcome {
            SaveOutcome::Created(key) => {
                assert!(s.get(&scope(), "books", &key).unwrap().is_some())
            }
            other => panic!("expected Created, got {:?}", other),
        }
    }

    #[test]
    fn test_save_without_force_reports_not_found_and_mutates_nothing() {
        let s = store();
        let err = s
            .save(
                &scope(),
                IP,
                "books",
                &json!({"n": 1}),
                &Target::Key("ghost".to_string()),
                false,
            )
            .unwrap_err();
        assert_eq!(err, Error::DocumentNotFound);
        assert!(s.find(&scope(), "books", None, Page::default()).unwrap().is_empty());
    }

    #[test]
    fn test_save_force_by_key_reoccupies_that_key() {
        let s = store();
        let outcome = s
            .save(
                &scope(),
                IP,
                "books",
                &json!({"n": 1}),
                &Target::Key("chosen".to_string()),
                true,
            )
            .unwrap();
        assert_eq!(outcome, SaveOutcome::Created("chosen".to_string()));
    }

    // === rich values through the facade ===

    #[test]
    fn test_tagged_values_round_trip_through_storage() {
        let s = store();
        let key = s
            .create(
                &scope(),
                IP,
                "books",
                &json!({
                    "when": {"_type": "Date", "iso": "2024-03-01T12:00:00.000Z"},
                    "author": {"_type": "Pointer", "bucket": "authors", "key": "a1"},
                    "cover": {"_type": "Blob", "base64": "Zm9v"},
                    "where": {"_type": "GeoPoint", "latitude": 1.5, "longitude": -2.5}
                }),
            )
            .unwrap();
        let doc = s.get(&scope(), "books", &key).unwrap().unwrap();
        let obj = doc.as_object().unwrap();
        assert_eq!(obj["when"], json!({"_type": "Date", "iso": "2024-03-01T12:00:00.000Z"}));
        assert_eq!(
            obj["author"],
            json!({"_type": "Pointer", "bucket": "authors", "key": "a1"})
        );
        assert_eq!(obj["cover"], json!({"_type": "Blob", "base64": "Zm9v"}));
        assert_eq!(
            obj["where"],
            json!({"_type": "GeoPoint", "latitude": 1.5, "longitude": -2.5})
        );
    }

    #[test]
    fn test_geo_proximity_filter() {
        let s = store();
        s.create(
            &scope(),
            IP,
            "places",
            &json!({"_key": "paris", "loc": {"_type": "GeoPoint", "latitude": 48.8566, "longitude": 2.3522}}),
        )
        .unwrap();
        s.create(
            &scope(),
            IP,
            "places",
            &json!({"_key": "tokyo", "loc": {"_type": "GeoPoint", "latitude": 35.6762, "longitude": 139.6503}}),
        )
        .unwrap();

        let near_london = json!({
            "loc": {
                "_type": "GeoPoint",
                "near": {"latitude": 51.5074, "longitude": -0.1278},
                "maxDistance": 500.0,
                "unit": "km"
            }
        });
        let hits = s
            .find(&scope(), "places", Some(&near_london), Page::default())
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].as_object().unwrap()["_key"], json!("paris"));
    }
}
