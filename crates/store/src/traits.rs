//! The backing-collection seam
//!
//! One handle is shared by every facade instance; implementations must be
//! safe for concurrent use (a pooled connection or an internally locked
//! map, never per-call state).

use shelf_core::{Document, Result};

/// An opaque document collection, Mongo-like in shape
///
/// Criteria and patches are plain internal-view documents: criteria use a
/// closed operator subset (`$and`, `$or`, `$gt`, `$gte`, `$lt`, `$lte`,
/// `$ne`, `$exists`, `$in`, geo `$near`/`$maxDistance`, dotted paths);
/// patches are field-merge fragments whose dotted paths address nested
/// fields. A single insert or update call is atomic per document; nothing
/// larger is coordinated here.
pub trait BackingCollection: Send + Sync {
    /// Insert one document keyed by its `_id` field
    ///
    /// Fails with `UniqueIndexViolation` when a live document already
    /// occupies the id. A soft-deleted occupant is replaced: the deleted
    /// row has surrendered the logical slot.
    fn insert(&self, doc: Document) -> Result<()>;

    /// Return the first document matching `criteria`, in `_id` order
    fn find_one(&self, criteria: &Document) -> Result<Option<Document>>;

    /// Return matching documents in `_id` order, bounded by skip/limit
    fn find(&self, criteria: &Document, skip: usize, limit: usize) -> Result<Vec<Document>>;

    /// Field-merge `patch` into every document matching `criteria`
    ///
    /// Never replaces whole documents. Returns the match count.
    fn update_many(&self, criteria: &Document, patch: &Document) -> Result<u64>;

    /// Existence probe; implementations should fetch ids only
    fn exists(&self, criteria: &Document) -> Result<bool>;
}
