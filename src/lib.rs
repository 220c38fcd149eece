//! ShelfDB - multi-tenant document-storage facade
//!
//! ShelfDB lets many independent applications, each serving many users,
//! store arbitrary JSON-like documents in named logical buckets with
//! tenant isolation, stable external keys, soft deletion and safe
//! filter/update semantics over nested paths.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use shelfdb::{DocumentStore, Limits, MemoryCollection, TenantScope};
//!
//! let store = DocumentStore::new(Arc::new(MemoryCollection::new()), Limits::default());
//! let alice = TenantScope::new("my-app", "alice");
//!
//! let key = store
//!     .create(&alice, "203.0.113.9", "books", &json!({"title": "T"}))
//!     .unwrap();
//! let doc = store.get(&alice, "books", &key).unwrap().unwrap();
//! assert_eq!(doc["title"], json!("T"));
//! ```
//!
//! # Architecture
//!
//! The [`DocumentStore`] facade orchestrates the wire-boundary type
//! casters, the validation chain, the field translator and the criteria
//! builder against an injected [`BackingCollection`] handle. Swap
//! [`MemoryCollection`] for a driver-backed implementation in production.

pub use shelf_codec::{decode_document, encode_document, DistanceUnit, TypeTag};
pub use shelf_core::{Document, Error, GeoPoint, Limits, Result, TenantScope, Value};
pub use shelf_facade::{DocumentStore, Page, SaveOutcome, Target};
pub use shelf_query::{build_criteria, to_external, to_internal, ValidationChain};
pub use shelf_store::{BackingCollection, MemoryCollection};
