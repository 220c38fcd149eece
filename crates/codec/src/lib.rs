//! Type caster registry for ShelfDB
//!
//! Wire JSON cannot natively carry dates, binary payloads, cross-bucket
//! references or geo coordinates. Those kinds travel as tagged objects:
//!
//! ```json
//! { "_type": "Date",     "iso": "2024-03-01T12:00:00Z" }
//! { "_type": "Pointer",  "bucket": "authors", "key": "k1" }
//! { "_type": "Blob",     "base64": "aGVsbG8=" }
//! { "_type": "GeoPoint", "latitude": 48.85, "longitude": 2.35 }
//! ```
//!
//! Decoding walks the full wire tree and replaces every tagged object with
//! its native [`Value`] variant; encoding performs the inverse walk.
//! Dispatch is a closed tag → caster lookup ([`TypeTag`]); an unrecognized
//! `_type` value is NOT an error, the object passes through untouched so
//! newer clients can talk to older deployments.
//!
//! One asymmetry: a timestamp owned by a reserved metadata field
//! (`_created`, `__updated__`) encodes as a bare ISO string instead of a
//! tagged object, so plain string date filters keep working against it.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value as Wire;
use shelf_core::fields::is_bare_date_field;
use shelf_core::key::{internal_id, split_id};
use shelf_core::{Document, Error, GeoPoint, Result, TenantScope, Value};
use std::collections::HashMap;

/// Field carrying the type tag on the wire
pub const TYPE_FIELD: &str = "_type";

/// Mean Earth radius in kilometers, for proximity-unit conversion
pub const EARTH_RADIUS_KM: f64 = 6371.0;
/// Mean Earth radius in miles
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

// =============================================================================
// TypeTag - the closed set of rich wire kinds
// =============================================================================

/// Recognized `_type` tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    /// ISO-8601 timestamp
    Date,
    /// Cross-bucket document reference
    Pointer,
    /// Base64-encoded binary payload
    Blob,
    /// Geographic coordinate, optionally a proximity-search envelope
    GeoPoint,
}

impl TypeTag {
    /// Look up a wire tag; `None` means pass-through (forward compat)
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Date" => Some(TypeTag::Date),
            "Pointer" => Some(TypeTag::Pointer),
            "Blob" => Some(TypeTag::Blob),
            "GeoPoint" => Some(TypeTag::GeoPoint),
            _ => None,
        }
    }

    /// The wire tag emitted for this kind
    pub fn as_tag(&self) -> &'static str {
        match self {
            TypeTag::Date => "Date",
            TypeTag::Pointer => "Pointer",
            TypeTag::Blob => "Blob",
            TypeTag::GeoPoint => "GeoPoint",
        }
    }
}

// =============================================================================
// Distance units for geo proximity filters
// =============================================================================

/// Unit selector for a GeoPoint proximity envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceUnit {
    /// Kilometers (the default)
    #[default]
    Kilometers,
    /// Statute miles
    Miles,
    /// Raw radians, passed through unconverted
    Radians,
}

impl DistanceUnit {
    /// Parse the wire unit selector
    pub fn from_wire(unit: &str) -> Result<Self> {
        match unit {
            "km" | "kilometers" => Ok(DistanceUnit::Kilometers),
            "miles" => Ok(DistanceUnit::Miles),
            "radians" => Ok(DistanceUnit::Radians),
            other => Err(Error::InvalidRequest(format!(
                "unknown distance unit {:?}",
                other
            ))),
        }
    }

    /// Convert a distance in this unit to radians on the Earth sphere
    pub fn to_radians(&self, distance: f64) -> f64 {
        match self {
            DistanceUnit::Kilometers => distance / EARTH_RADIUS_KM,
            DistanceUnit::Miles => distance / EARTH_RADIUS_MILES,
            DistanceUnit::Radians => distance,
        }
    }
}

// =============================================================================
// Decoding: wire JSON -> native values
// =============================================================================

fn missing(tag: TypeTag, field: &str) -> Error {
    Error::InvalidRequest(format!(
        "{} value missing field {:?}",
        tag.as_tag(),
        field
    ))
}

fn require_str<'a>(obj: &'a serde_json::Map<String, Wire>, tag: TypeTag, field: &str) -> Result<&'a str> {
    obj.get(field)
        .and_then(Wire::as_str)
        .ok_or_else(|| missing(tag, field))
}

fn require_f64(obj: &serde_json::Map<String, Wire>, tag: TypeTag, field: &str) -> Result<f64> {
    obj.get(field)
        .and_then(Wire::as_f64)
        .ok_or_else(|| missing(tag, field))
}

/// Decode a whole wire document into the native model
///
/// The scope is needed to resolve `Pointer` values into internal ids.
pub fn decode_document(wire: &serde_json::Map<String, Wire>, scope: &TenantScope) -> Result<Document> {
    let mut doc = Document::with_capacity(wire.len());
    for (k, v) in wire {
        doc.insert(k.clone(), decode_value(v, scope)?);
    }
    Ok(doc)
}

/// Decode a single wire value, recursing through objects and arrays
pub fn decode_value(wire: &Wire, scope: &TenantScope) -> Result<Value> {
    match wire {
        Wire::Null => Ok(Value::Null),
        Wire::Bool(b) => Ok(Value::Bool(*b)),
        Wire::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Int(i))
            } else {
                // u64 overflow or fractional; f64 always representable
                Ok(Value::Float(n.as_f64().unwrap_or(f64::NAN)))
            }
        }
        Wire::String(s) => Ok(Value::String(s.clone())),
        Wire::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(decode_value(item, scope)?);
            }
            Ok(Value::Array(out))
        }
        Wire::Object(obj) => {
            if let Some(tag) = obj.get(TYPE_FIELD).and_then(Wire::as_str) {
                if let Some(kind) = TypeTag::from_tag(tag) {
                    return decode_tagged(kind, obj, scope);
                }
                // Unrecognized tag: fall through, keep the object as-is
            }
            let mut out = HashMap::with_capacity(obj.len());
            for (k, v) in obj {
                out.insert(k.clone(), decode_value(v, scope)?);
            }
            Ok(Value::Object(out))
        }
    }
}

fn decode_tagged(
    kind: TypeTag,
    obj: &serde_json::Map<String, Wire>,
    scope: &TenantScope,
) -> Result<Value> {
    match kind {
        TypeTag::Date => {
            let iso = require_str(obj, kind, "iso")?;
            let ts = parse_iso(iso)
                .ok_or_else(|| Error::InvalidRequest(format!("invalid Date value {:?}", iso)))?;
            Ok(Value::Timestamp(ts))
        }
        TypeTag::Pointer => {
            let bucket = require_str(obj, kind, "bucket")?;
            let key = require_str(obj, kind, "key")?;
            let id = internal_id(&scope.app_id, &scope.user_id, bucket, key)?;
            Ok(Value::Reference(id))
        }
        TypeTag::Blob => {
            let b64 = require_str(obj, kind, "base64")?;
            let bytes = BASE64
                .decode(b64)
                .map_err(|e| Error::InvalidRequest(format!("invalid Blob payload: {}", e)))?;
            Ok(Value::Bytes(bytes))
        }
        TypeTag::GeoPoint => decode_geo(obj, kind),
    }
}

/// Decode a GeoPoint, in either its stored or its proximity-filter form
///
/// `{latitude, longitude}` becomes a plain `Value::Geo`. The filter form
/// `{near: {latitude, longitude}, maxDistance, unit}` becomes a proximity
/// clause `{$near: <geo>, $maxDistance: <radians>}` consumable by the
/// backing store's matcher.
fn decode_geo(obj: &serde_json::Map<String, Wire>, kind: TypeTag) -> Result<Value> {
    if let Some(near) = obj.get("near") {
        let near = near
            .as_object()
            .ok_or_else(|| Error::InvalidRequest("GeoPoint near must be an object".into()))?;
        let center = GeoPoint::new(
            require_f64(near, kind, "latitude")?,
            require_f64(near, kind, "longitude")?,
        );
        let max_distance = require_f64(obj, kind, "maxDistance")?;
        let unit = match obj.get("unit") {
            Some(u) => DistanceUnit::from_wire(
                u.as_str()
                    .ok_or_else(|| Error::InvalidRequest("GeoPoint unit must be a string".into()))?,
            )?,
            None => DistanceUnit::default(),
        };
        let mut clause = HashMap::new();
        clause.insert("$near".to_string(), Value::Geo(center));
        clause.insert(
            "$maxDistance".to_string(),
            Value::Float(unit.to_radians(max_distance)),
        );
        return Ok(Value::Object(clause));
    }

    Ok(Value::Geo(GeoPoint::new(
        require_f64(obj, kind, "latitude")?,
        require_f64(obj, kind, "longitude")?,
    )))
}

/// Parse an ISO-8601 / RFC-3339 timestamp
pub fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

// =============================================================================
// Encoding: native values -> wire JSON
// =============================================================================

/// Encode a whole native document into wire JSON
pub fn encode_document(doc: &Document) -> serde_json::Map<String, Wire> {
    let mut out = serde_json::Map::with_capacity(doc.len());
    for (k, v) in doc {
        out.insert(k.clone(), encode_value(v, Some(k)));
    }
    out
}

/// Encode a single native value, recursing through objects and arrays
///
/// `field` is the owning field name, used to decide whether a timestamp
/// serializes bare (reserved metadata fields) or tagged (everything else).
pub fn encode_value(value: &Value, field: Option<&str>) -> Wire {
    match value {
        Value::Null => Wire::Null,
        Value::Bool(b) => Wire::Bool(*b),
        Value::Int(i) => Wire::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(Wire::Number)
            .unwrap_or(Wire::Null),
        Value::String(s) => Wire::String(s.clone()),
        Value::Timestamp(t) => {
            let iso = format_iso(t);
            if field.map(is_bare_date_field).unwrap_or(false) {
                Wire::String(iso)
            } else {
                tagged(TypeTag::Date, |o| {
                    o.insert("iso".to_string(), Wire::String(iso));
                })
            }
        }
        Value::Reference(id) => match split_id(id) {
            Some((_, _, bucket, key)) => tagged(TypeTag::Pointer, |o| {
                o.insert("bucket".to_string(), Wire::String(bucket.to_string()));
                o.insert("key".to_string(), Wire::String(key.to_string()));
            }),
            // Malformed stored id: surface it verbatim rather than guess
            None => Wire::String(id.clone()),
        },
        Value::Bytes(bytes) => tagged(TypeTag::Blob, |o| {
            o.insert("base64".to_string(), Wire::String(BASE64.encode(bytes)));
        }),
        Value::Geo(point) => tagged(TypeTag::GeoPoint, |o| {
            o.insert("latitude".to_string(), Wire::from(point.latitude));
            o.insert("longitude".to_string(), Wire::from(point.longitude));
        }),
        Value::Array(items) => {
            Wire::Array(items.iter().map(|v| encode_value(v, None)).collect())
        }
        Value::Object(obj) => {
            let mut out = serde_json::Map::with_capacity(obj.len());
            for (k, v) in obj {
                out.insert(k.clone(), encode_value(v, Some(k)));
            }
            Wire::Object(out)
        }
    }
}

/// Format a timestamp as RFC-3339 with millisecond precision
pub fn format_iso(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn tagged(kind: TypeTag, fill: impl FnOnce(&mut serde_json::Map<String, Wire>)) -> Wire {
    let mut obj = serde_json::Map::new();
    obj.insert(
        TYPE_FIELD.to_string(),
        Wire::String(kind.as_tag().to_string()),
    );
    fill(&mut obj);
    Wire::Object(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scope() -> TenantScope {
        TenantScope::new("app", "user")
    }

    fn decode(wire: Wire) -> Result<Value> {
        decode_value(&wire, &scope())
    }

    // === Date ===

    #[test]
    fn test_decode_date() {
        let v = decode(json!({"_type": "Date", "iso": "2024-03-01T12:00:00Z"})).unwrap();
        let ts = v.as_timestamp().unwrap();
        assert_eq!(format_iso(&ts), "2024-03-01T12:00:00.000Z");
    }

    #[test]
    fn test_decode_date_missing_iso() {
        let err = decode(json!({"_type": "Date"})).unwrap_err();
        assert!(err.to_string().contains("iso"));
    }

    #[test]
    fn test_decode_date_garbage_iso() {
        let err = decode(json!({"_type": "Date", "iso": "yesterday"})).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn test_encode_date_tagged_by_default() {
        let ts = parse_iso("2024-03-01T12:00:00Z").unwrap();
        let wire = encode_value(&Value::Timestamp(ts), Some("birthday"));
        assert_eq!(
            wire,
            json!({"_type": "Date", "iso": "2024-03-01T12:00:00.000Z"})
        );
    }

    #[test]
    fn test_encode_date_bare_for_reserved_metadata() {
        let ts = parse_iso("2024-03-01T12:00:00Z").unwrap();
        let wire = encode_value(&Value::Timestamp(ts), Some("_created"));
        assert_eq!(wire, json!("2024-03-01T12:00:00.000Z"));
    }

    // === Pointer ===

    #[test]
    fn test_decode_pointer_resolves_internal_id() {
        let v = decode(json!({"_type": "Pointer", "bucket": "authors", "key": "k9"})).unwrap();
        assert_eq!(v, Value::Reference("app|user|authors|k9".to_string()));
    }

    #[test]
    fn test_decode_pointer_missing_bucket() {
        let err = decode(json!({"_type": "Pointer", "key": "k9"})).unwrap_err();
        assert!(err.to_string().contains("bucket"));
    }

    #[test]
    fn test_decode_pointer_missing_key() {
        let err = decode(json!({"_type": "Pointer", "bucket": "authors"})).unwrap_err();
        assert!(err.to_string().contains("key"));
    }

    #[test]
    fn test_encode_pointer_roundtrip() {
        let wire = encode_value(&Value::Reference("app|user|authors|k9".into()), None);
        assert_eq!(
            wire,
            json!({"_type": "Pointer", "bucket": "authors", "key": "k9"})
        );
    }

    #[test]
    fn test_encode_malformed_reference_passes_through() {
        let wire = encode_value(&Value::Reference("not-an-id".into()), None);
        assert_eq!(wire, json!("not-an-id"));
    }

    // === Blob ===

    #[test]
    fn test_blob_roundtrip() {
        let v = decode(json!({"_type": "Blob", "base64": "aGVsbG8="})).unwrap();
        assert_eq!(v, Value::Bytes(b"hello".to_vec()));
        let wire = encode_value(&v, None);
        assert_eq!(wire, json!({"_type": "Blob", "base64": "aGVsbG8="}));
    }

    #[test]
    fn test_blob_invalid_base64() {
        let err = decode(json!({"_type": "Blob", "base64": "!!!"})).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn test_blob_missing_payload() {
        let err = decode(json!({"_type": "Blob"})).unwrap_err();
        assert!(err.to_string().contains("base64"));
    }

    // === GeoPoint ===

    #[test]
    fn test_decode_geo_point() {
        let v = decode(json!({"_type": "GeoPoint", "latitude": 48.85, "longitude": 2.35})).unwrap();
        assert_eq!(v, Value::Geo(GeoPoint::new(48.85, 2.35)));
    }

    #[test]
    fn test_decode_geo_missing_longitude() {
        let err = decode(json!({"_type": "GeoPoint", "latitude": 48.85})).unwrap_err();
        assert!(err.to_string().contains("longitude"));
    }

    #[test]
    fn test_decode_geo_proximity_km() {
        let v = decode(json!({
            "_type": "GeoPoint",
            "near": {"latitude": 0.0, "longitude": 0.0},
            "maxDistance": 6371.0,
            "unit": "km"
        }))
        .unwrap();
        let obj = v.as_object().unwrap();
        assert_eq!(obj["$near"], Value::Geo(GeoPoint::new(0.0, 0.0)));
        assert_eq!(obj["$maxDistance"], Value::Float(1.0));
    }

    #[test]
    fn test_decode_geo_proximity_miles() {
        let v = decode(json!({
            "_type": "GeoPoint",
            "near": {"latitude": 0.0, "longitude": 0.0},
            "maxDistance": 3959.0,
            "unit": "miles"
        }))
        .unwrap();
        let obj = v.as_object().unwrap();
        assert_eq!(obj["$maxDistance"], Value::Float(1.0));
    }

    #[test]
    fn test_decode_geo_proximity_default_unit_is_km() {
        let v = decode(json!({
            "_type": "GeoPoint",
            "near": {"latitude": 0.0, "longitude": 0.0},
            "maxDistance": 6371.0
        }))
        .unwrap();
        assert_eq!(v.as_object().unwrap()["$maxDistance"], Value::Float(1.0));
    }

    #[test]
    fn test_decode_geo_proximity_radians_pass_through() {
        let v = decode(json!({
            "_type": "GeoPoint",
            "near": {"latitude": 0.0, "longitude": 0.0},
            "maxDistance": 0.25,
            "unit": "radians"
        }))
        .unwrap();
        assert_eq!(v.as_object().unwrap()["$maxDistance"], Value::Float(0.25));
    }

    #[test]
    fn test_decode_geo_unknown_unit() {
        let err = decode(json!({
            "_type": "GeoPoint",
            "near": {"latitude": 0.0, "longitude": 0.0},
            "maxDistance": 1.0,
            "unit": "leagues"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("leagues"));
    }

    // === Forward compatibility ===

    #[test]
    fn test_unknown_tag_passes_through() {
        let v = decode(json!({"_type": "Hologram", "frames": 3})).unwrap();
        let obj = v.as_object().unwrap();
        assert_eq!(obj["_type"], Value::String("Hologram".into()));
        assert_eq!(obj["frames"], Value::Int(3));
    }

    #[test]
    fn test_non_string_type_field_is_plain_data() {
        let v = decode(json!({"_type": 7})).unwrap();
        assert_eq!(v.as_object().unwrap()["_type"], Value::Int(7));
    }

    // === Recursive traversal ===

    #[test]
    fn test_decode_recurses_into_arrays_and_objects() {
        let v = decode(json!({
            "tags": [{"_type": "Date", "iso": "2024-01-01T00:00:00Z"}],
            "meta": {"blob": {"_type": "Blob", "base64": "QQ=="}}
        }))
        .unwrap();
        let obj = v.as_object().unwrap();
        let tags = obj["tags"].as_array().unwrap();
        assert!(matches!(tags[0], Value::Timestamp(_)));
        let meta = obj["meta"].as_object().unwrap();
        assert_eq!(meta["blob"], Value::Bytes(b"A".to_vec()));
    }

    #[test]
    fn test_untagged_scalars_pass_through() {
        assert_eq!(decode(json!(null)).unwrap(), Value::Null);
        assert_eq!(decode(json!(true)).unwrap(), Value::Bool(true));
        assert_eq!(decode(json!(5)).unwrap(), Value::Int(5));
        assert_eq!(decode(json!(2.5)).unwrap(), Value::Float(2.5));
        assert_eq!(decode(json!("plain")).unwrap(), Value::String("plain".into()));
    }

    // === Document-level roundtrip ===

    #[test]
    fn test_document_roundtrip() {
        let wire = json!({
            "title": "T",
            "count": 3,
            "when": {"_type": "Date", "iso": "2024-03-01T12:00:00.000Z"},
            "author": {"_type": "Pointer", "bucket": "authors", "key": "a1"},
            "cover": {"_type": "Blob", "base64": "Zm9v"},
            "where": {"_type": "GeoPoint", "latitude": 1.5, "longitude": -2.5}
        });
        let doc = decode_document(wire.as_object().unwrap(), &scope()).unwrap();
        let back = Wire::Object(encode_document(&doc));
        assert_eq!(back, wire);
    }
}
