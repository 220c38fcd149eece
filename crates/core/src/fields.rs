//! Reserved field names and bookkeeping conventions
//!
//! Two namespaces coexist in a stored document:
//!
//! - the *external view*, what callers send and receive: user fields plus
//!   the reserved names `_key`, `_bucket`, `_created`
//! - the *internal view*, what the backing collection holds: the primary
//!   key `_id` plus marker-wrapped bookkeeping fields (`__bucket__`,
//!   `__deleted__`, ...)
//!
//! A field name that starts AND ends with the `__` marker is internal by
//! convention and must never be caller-supplied; the field translator is
//! the only component allowed to inject or strip such names.

use once_cell::sync::Lazy;
use std::collections::HashSet;

// --- External reserved names (wire format) ---

/// External document key
pub const EXT_KEY: &str = "_key";
/// External bucket name
pub const EXT_BUCKET: &str = "_bucket";
/// External creation timestamp
pub const EXT_CREATED: &str = "_created";

// --- Internal bookkeeping fields (storage format) ---

/// Primary key of the backing collection (the composite internal id)
pub const INT_ID: &str = "_id";
/// Tenant application id
pub const INT_APP: &str = "__app__";
/// Tenant user id
pub const INT_USER: &str = "__user__";
/// Logical collection name
pub const INT_BUCKET: &str = "__bucket__";
/// Creation timestamp
pub const INT_CREATED: &str = "__created__";
/// Last-update timestamp
pub const INT_UPDATED: &str = "__updated__";
/// Caller IP provenance
pub const INT_IP: &str = "__ip__";
/// Soft-delete flag
pub const INT_DELETED: &str = "__deleted__";

/// Marker wrapping internal bookkeeping field names
pub const INTERNAL_MARKER: &str = "__";

/// Store control operators callers may never smuggle into documents or
/// filters. `$where` is the free-form server-side-expression escape.
pub static FORBIDDEN_OPERATORS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| HashSet::from(["$where"]));

/// Check whether a field name follows the internal bookkeeping convention
///
/// True for marker-wrapped names (`__deleted__`) and for the primary key
/// field `_id`. The bare marker `__` itself does not qualify.
pub fn is_internal_field(name: &str) -> bool {
    if name == INT_ID {
        return true;
    }
    name.len() > 2 * INTERNAL_MARKER.len()
        && name.starts_with(INTERNAL_MARKER)
        && name.ends_with(INTERNAL_MARKER)
}

/// Check whether a field name is a forbidden store-control operator
pub fn is_forbidden_operator(name: &str) -> bool {
    FORBIDDEN_OPERATORS.contains(name)
}

/// True when a reserved metadata field serializes its timestamp as a bare
/// ISO string rather than a tagged Date object (backward compatibility
/// with plain date filters)
pub fn is_bare_date_field(name: &str) -> bool {
    name == EXT_CREATED || name == INT_CREATED || name == INT_UPDATED
}
