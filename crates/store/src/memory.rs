//! In-memory backing collection
//!
//! An ordered map of internal id → document behind a `parking_lot` RwLock.
//! Iteration order is `_id` order, which makes find pagination
//! deterministic. The unique primary-key index is enforced on insert; a
//! soft-deleted occupant surrenders its slot to a fresh insert.

use parking_lot::RwLock;
use shelf_core::fields::{INT_DELETED, INT_ID};
use shelf_core::{Document, Error, Result, Value};
use std::collections::BTreeMap;

use crate::matcher::{matches, set_path};
use crate::traits::BackingCollection;

/// Mongo-style document collection held entirely in memory
///
/// Safe for concurrent use from any number of facade instances; all state
/// sits behind one lock, taken per call.
#[derive(Default)]
pub struct MemoryCollection {
    rows: RwLock<BTreeMap<String, Document>>,
}

impl MemoryCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of physical rows, soft-deleted included
    pub fn physical_len(&self) -> usize {
        self.rows.read().len()
    }
}

fn id_of(doc: &Document) -> Result<&str> {
    match doc.get(INT_ID) {
        Some(Value::String(id)) => Ok(id),
        _ => Err(Error::BackingStore(
            "document missing string _id".to_string(),
        )),
    }
}

fn is_live(doc: &Document) -> bool {
    !matches!(doc.get(INT_DELETED), Some(Value::Bool(true)))
}

impl BackingCollection for MemoryCollection {
    fn insert(&self, doc: Document) -> Result<()> {
        let id = id_of(&doc)?.to_string();
        let mut rows = self.rows.write();
        if let Some(existing) = rows.get(&id) {
            if is_live(existing) {
                return Err(Error::UniqueIndexViolation(id));
            }
        }
        rows.insert(id, doc);
        Ok(())
    }

    fn find_one(&self, criteria: &Document) -> Result<Option<Document>> {
        let rows = self.rows.read();
        for doc in rows.values() {
            if matches(doc, criteria)? {
                return Ok(Some(doc.clone()));
            }
        }
        Ok(None)
    }

    fn find(&self, criteria: &Document, skip: usize, limit: usize) -> Result<Vec<Document>> {
        let rows = self.rows.read();
        let mut out = Vec::new();
        let mut seen = 0usize;
        for doc in rows.values() {
            if !matches(doc, criteria)? {
                continue;
            }
            if seen < skip {
                seen += 1;
                continue;
            }
            out.push(doc.clone());
            if out.len() == limit {
                break;
            }
        }
        Ok(out)
    }

    fn update_many(&self, criteria: &Document, patch: &Document) -> Result<u64> {
        let mut rows = self.rows.write();
        let mut matched = 0u64;
        for doc in rows.values_mut() {
            if !matches(doc, criteria)? {
                continue;
            }
            matched += 1;
            for (path, value) in patch {
                set_path(doc, path, value.clone());
            }
        }
        Ok(matched)
    }

    fn exists(&self, criteria: &Document) -> Result<bool> {
        let rows = self.rows.read();
        for doc in rows.values() {
            if matches(doc, criteria)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
