//! Key namespacing for ShelfDB
//!
//! Every stored document is physically keyed by a composite internal id:
//!
//! ```text
//! app_id|user_id|bucket|external_key
//! ```
//!
//! The id is globally unique across the backing collection because it
//! embeds the full tenant scope. The first three components must not
//! contain the separator; the external key may (parsing strips exactly
//! three components and returns the remainder verbatim).

use crate::error::{Error, Result};
use uuid::Uuid;

/// Separator joining the composite id components
pub const ID_SEPARATOR: char = '|';

/// Build the composite internal id for a document
///
/// Fails with `InvalidRequest` if `app_id`, `user_id` or `bucket` contain
/// the separator; ids built from such components could not be parsed back
/// unambiguously.
///
/// # Examples
///
/// ```
/// use shelf_core::key::internal_id;
///
/// let id = internal_id("app", "user", "books", "k1").unwrap();
/// assert_eq!(id, "app|user|books|k1");
///
/// // The external key itself may contain the separator
/// assert!(internal_id("app", "user", "books", "a|b").is_ok());
///
/// // The scope components may not
/// assert!(internal_id("ap|p", "user", "books", "k1").is_err());
/// ```
pub fn internal_id(app_id: &str, user_id: &str, bucket: &str, key: &str) -> Result<String> {
    for (name, component) in [("app_id", app_id), ("user_id", user_id), ("bucket", bucket)] {
        if component.contains(ID_SEPARATOR) {
            return Err(Error::InvalidRequest(format!(
                "{} must not contain '{}'",
                name, ID_SEPARATOR
            )));
        }
    }
    Ok(format!(
        "{}{sep}{}{sep}{}{sep}{}",
        app_id,
        user_id,
        bucket,
        key,
        sep = ID_SEPARATOR
    ))
}

/// Extract the external key from a composite internal id
///
/// Strips the first three separator-delimited components and returns the
/// remainder verbatim, so external keys containing the separator survive
/// the round trip. An input with fewer than three separators is returned
/// unchanged (malformed ids pass through; this function is total).
pub fn external_key(internal_id: &str) -> &str {
    let mut rest = internal_id;
    for _ in 0..3 {
        match rest.split_once(ID_SEPARATOR) {
            Some((_, tail)) => rest = tail,
            None => return internal_id,
        }
    }
    rest
}

/// Split a composite id into (app_id, user_id, bucket, key)
///
/// Returns `None` for malformed ids. Used when re-encoding stored
/// references back into their wire `{bucket, key}` form.
pub fn split_id(internal_id: &str) -> Option<(&str, &str, &str, &str)> {
    let (app, rest) = internal_id.split_once(ID_SEPARATOR)?;
    let (user, rest) = rest.split_once(ID_SEPARATOR)?;
    let (bucket, key) = rest.split_once(ID_SEPARATOR)?;
    Some((app, user, bucket, key))
}

/// Generate a random unique external key
///
/// Used by create when the caller supplies no `_key`.
pub fn generate_key() -> String {
    Uuid::new_v4().simple().to_string()
}
