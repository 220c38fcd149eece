//! Criteria matching for the in-memory collection
//!
//! Implements the operator subset the criteria builder emits: top-level
//! `$and`/`$or` combinators, dotted-path field resolution (descending
//! through objects only), per-field comparison operators, geo proximity,
//! and strict-equality fallback with scalar-against-stored-array
//! membership. Operators outside the subset are rejected the way a real
//! store rejects an unknown operator: as a backing-store error.

use shelf_core::{Document, Error, GeoPoint, Result, Value};

/// Does `doc` satisfy `criteria`?
pub fn matches(doc: &Document, criteria: &Document) -> Result<bool> {
    for (name, cond) in criteria {
        match name.as_str() {
            "$and" => {
                for clause in combinator_clauses(name, cond)? {
                    if !matches(doc, clause)? {
                        return Ok(false);
                    }
                }
            }
            "$or" => {
                let mut any = false;
                for clause in combinator_clauses(name, cond)? {
                    if matches(doc, clause)? {
                        any = true;
                        break;
                    }
                }
                if !any {
                    return Ok(false);
                }
            }
            _ if name.starts_with('$') => {
                return Err(Error::BackingStore(format!(
                    "rejected operator {:?}",
                    name
                )));
            }
            path => {
                if !match_condition(resolve_path(doc, path), cond)? {
                    return Ok(false);
                }
            }
        }
    }
    Ok(true)
}

fn combinator_clauses<'a>(name: &str, cond: &'a Value) -> Result<Vec<&'a Document>> {
    let items = cond.as_array().ok_or_else(|| {
        Error::BackingStore(format!("{} requires an array of clauses", name))
    })?;
    items
        .iter()
        .map(|item| {
            item.as_object().ok_or_else(|| {
                Error::BackingStore(format!("{} clauses must be objects", name))
            })
        })
        .collect()
}

/// Resolve a dotted path against a document
///
/// Descends through object fields only: a dot always splits segments, and
/// a literal dotted key inside a nested object is unreachable. Any segment
/// landing on a non-object ends the walk.
pub fn resolve_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn match_condition(field: Option<&Value>, cond: &Value) -> Result<bool> {
    // an object whose keys are all operators is a condition, not a literal
    let operator_object = cond
        .as_object()
        .filter(|obj| !obj.is_empty() && obj.keys().all(|k| k.starts_with('$')));
    if let Some(ops) = operator_object {
        for (op, operand) in ops {
            let hit = match op.as_str() {
                "$gt" => compare(field, operand).map(|o| o.is_gt()).unwrap_or(false),
                "$gte" => compare(field, operand).map(|o| o.is_ge()).unwrap_or(false),
                "$lt" => compare(field, operand).map(|o| o.is_lt()).unwrap_or(false),
                "$lte" => compare(field, operand).map(|o| o.is_le()).unwrap_or(false),
                // an absent field is "not equal" to anything
                "$ne" => field.map(|v| v != operand).unwrap_or(true),
                "$exists" => {
                    let want = operand.as_bool().ok_or_else(|| {
                        Error::BackingStore("$exists requires a boolean".to_string())
                    })?;
                    field.is_some() == want
                }
                "$in" => {
                    let choices = operand.as_array().ok_or_else(|| {
                        Error::BackingStore("$in requires an array".to_string())
                    })?;
                    field
                        .map(|v| choices.iter().any(|c| equals(v, c)))
                        .unwrap_or(false)
                }
                "$near" => match_near(field, operand, ops.get("$maxDistance"))?,
                // consumed together with $near
                "$maxDistance" => true,
                other => {
                    return Err(Error::BackingStore(format!(
                        "rejected operator {:?}",
                        other
                    )))
                }
            };
            if !hit {
                return Ok(false);
            }
        }
        return Ok(true);
    }

    Ok(field.map(|v| equals(v, cond)).unwrap_or(false))
}

/// Equality with Mongo's scalar-against-array membership rule
fn equals(stored: &Value, wanted: &Value) -> bool {
    if stored == wanted {
        return true;
    }
    match (stored, wanted) {
        (Value::Array(items), w) if !matches!(w, Value::Array(_)) => {
            items.iter().any(|item| item == w)
        }
        _ => false,
    }
}

/// Range comparison across the orderable kinds
///
/// Int and Float bridge numerically (store comparison semantics); strings
/// and timestamps compare within their own kind. Everything else is
/// unordered and never satisfies a range operator.
fn compare(field: Option<&Value>, operand: &Value) -> Option<std::cmp::Ordering> {
    let field = field?;
    match (field, operand) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn match_near(field: Option<&Value>, center: &Value, max: Option<&Value>) -> Result<bool> {
    let center = match center {
        Value::Geo(g) => g,
        _ => {
            return Err(Error::BackingStore(
                "$near requires a geo point".to_string(),
            ))
        }
    };
    let max_radians = match max {
        None => f64::INFINITY,
        Some(Value::Float(r)) => *r,
        Some(Value::Int(r)) => *r as f64,
        Some(_) => {
            return Err(Error::BackingStore(
                "$maxDistance requires a number".to_string(),
            ))
        }
    };
    let stored = match field {
        Some(Value::Geo(g)) => g,
        _ => return Ok(false),
    };
    Ok(stored.angle_to(center) <= max_radians)
}

/// Apply a dotted-path field-merge patch entry
///
/// Creates intermediate objects as needed; a non-object intermediate is
/// replaced by an object.
pub fn set_path(doc: &mut Document, path: &str, value: Value) {
    let (prefix, last) = match path.rsplit_once('.') {
        Some(split) => split,
        None => {
            doc.insert(path.to_string(), value);
            return;
        }
    };
    let mut current = doc;
    for segment in prefix.split('.') {
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Document::new()));
        if !slot.is_object() {
            *slot = Value::Object(Document::new());
        }
        current = match slot {
            Value::Object(obj) => obj,
            // slot was just made an object
            _ => return,
        };
    }
    current.insert(last.to_string(), value);
}
