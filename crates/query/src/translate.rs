//! Field translation between external and internal document views
//!
//! The external view is what callers see: user fields plus `_key`,
//! `_bucket` and `_created`. The internal view is what the backing
//! collection stores: the composite `_id` primary key plus marker-wrapped
//! bookkeeping fields. This module is the only place those two views meet.
//!
//! Translation recurses into nested objects and arrays because filters may
//! be written either as dotted paths or as nested documents; the reserved
//! substitutions must hold at every depth.
//!
//! External→internal additionally coerces RFC-3339-looking string leaves
//! into native timestamps, best effort, so a filter written as a plain
//! string compares correctly against stored temporal values.

use chrono::{DateTime, Utc};
use shelf_core::fields::{
    is_internal_field, EXT_BUCKET, EXT_CREATED, EXT_KEY, INT_BUCKET, INT_CREATED, INT_ID,
};
use shelf_core::key::{external_key, internal_id};
use shelf_core::{Document, Error, Result, TenantScope, Value};

/// Translate an external document (or filter) into the internal view
///
/// - internal bookkeeping fields are dropped (defense in depth; callers
///   can never supply them)
/// - `_key` becomes the composite `_id`
/// - `_bucket` / `_created` become their bookkeeping counterparts
/// - the same substitutions apply inside nested objects and arrays
pub fn to_internal(doc: &Document, scope: &TenantScope, bucket: &str) -> Result<Document> {
    let mut out = Document::with_capacity(doc.len());
    for (name, value) in doc {
        if is_internal_field(name) {
            continue;
        }
        match name.as_str() {
            EXT_KEY => {
                let key = value.as_str().ok_or_else(|| {
                    Error::InvalidRequest(format!("{} must be a string", EXT_KEY))
                })?;
                let id = internal_id(&scope.app_id, &scope.user_id, bucket, key)?;
                out.insert(INT_ID.to_string(), Value::String(id));
            }
            EXT_BUCKET => {
                out.insert(INT_BUCKET.to_string(), internal_value(value, scope, bucket)?);
            }
            EXT_CREATED => {
                out.insert(
                    INT_CREATED.to_string(),
                    internal_value(value, scope, bucket)?,
                );
            }
            _ => {
                out.insert(name.clone(), internal_value(value, scope, bucket)?);
            }
        }
    }
    Ok(out)
}

fn internal_value(value: &Value, scope: &TenantScope, bucket: &str) -> Result<Value> {
    match value {
        Value::Object(obj) => Ok(Value::Object(to_internal(obj, scope, bucket)?)),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(internal_value(item, scope, bucket)?);
            }
            Ok(Value::Array(out))
        }
        // Opportunistic: a string leaf that parses as RFC-3339 becomes a
        // native timestamp; anything else passes through unchanged
        Value::String(s) => Ok(coerce_iso(s).map(Value::Timestamp).unwrap_or_else(|| value.clone())),
        other => Ok(other.clone()),
    }
}

fn coerce_iso(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Translate a stored internal document back into the external view
///
/// Removes every bookkeeping field, re-injecting `_key` (derived from the
/// composite id), `_bucket` and `_created`.
pub fn to_external(mut doc: Document) -> Document {
    let mut out = Document::with_capacity(doc.len());
    if let Some(Value::String(id)) = doc.remove(INT_ID) {
        out.insert(
            EXT_KEY.to_string(),
            Value::String(external_key(&id).to_string()),
        );
    }
    if let Some(bucket) = doc.remove(INT_BUCKET) {
        out.insert(EXT_BUCKET.to_string(), bucket);
    }
    if let Some(created) = doc.remove(INT_CREATED) {
        out.insert(EXT_CREATED.to_string(), created);
    }
    for (name, value) in doc {
        if is_internal_field(&name) {
            continue;
        }
        out.insert(name, value);
    }
    out
}

/// Absent stays absent: translating no document yields no document
pub fn to_external_opt(doc: Option<Document>) -> Option<Document> {
    doc.map(to_external)
}
