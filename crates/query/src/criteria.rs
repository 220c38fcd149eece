//! Criteria building for ShelfDB
//!
//! A criteria document is the final backing-store query: tenant scoping,
//! soft-delete exclusion and the caller's translated filter composed into
//! one object. This layer only constructs; execution belongs to the store.

use shelf_core::fields::{EXT_KEY, INT_APP, INT_BUCKET, INT_DELETED, INT_ID, INT_USER};
use shelf_core::key::internal_id;
use shelf_core::{Document, Result, TenantScope, Value};

use crate::translate::to_internal;

/// Compose the backing-store criteria for an operation
///
/// Always excludes soft-deleted rows. When the filter resolves a single
/// document by its reserved `_key` alone, the clause short-circuits to the
/// composite `_id`: the id already encodes tenant and bucket, so repeating
/// the scope fields buys nothing (an optimization, not a relaxation).
/// Otherwise the clause scopes by (app, user, bucket) and merges in the
/// translated filter, including substitutions inside logical combinators.
pub fn build_criteria(
    scope: &TenantScope,
    bucket: &str,
    filter: Option<&Document>,
) -> Result<Document> {
    if let Some(f) = filter {
        if f.len() == 1 {
            if let Some(Value::String(key)) = f.get(EXT_KEY) {
                let id = internal_id(&scope.app_id, &scope.user_id, bucket, key)?;
                let mut criteria = Document::new();
                criteria.insert(INT_ID.to_string(), Value::String(id));
                criteria.insert(INT_DELETED.to_string(), Value::Bool(false));
                return Ok(criteria);
            }
        }
    }

    let mut criteria = Document::new();
    criteria.insert(INT_APP.to_string(), Value::String(scope.app_id.clone()));
    criteria.insert(INT_USER.to_string(), Value::String(scope.user_id.clone()));
    criteria.insert(INT_BUCKET.to_string(), Value::String(bucket.to_string()));
    criteria.insert(INT_DELETED.to_string(), Value::Bool(false));

    if let Some(f) = filter {
        // to_internal drops caller-supplied bookkeeping fields, so the
        // filter can never overwrite the scope clauses above
        for (name, value) in to_internal(f, scope, bucket)? {
            criteria.insert(name, value);
        }
    }
    Ok(criteria)
}
