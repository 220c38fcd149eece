//! Core types for ShelfDB
//!
//! This crate defines the building blocks shared by every layer of the
//! storage facade:
//! - `Value` / `Document`: the native value model stored in the backing
//!   collection (richer than wire JSON: timestamps, references, blobs,
//!   geo points)
//! - `Error` / `Result`: the error taxonomy for the whole system
//! - `key`: the internal/external document-id namespacing scheme
//! - `fields`: reserved field names and the internal bookkeeping marker
//!   convention
//! - `Limits`: tunable configuration enforced by the facade

pub mod error;
pub mod fields;
pub mod key;
pub mod limits;
pub mod types;
pub mod value;

pub use error::{Error, Result};
pub use limits::Limits;
pub use types::TenantScope;
pub use value::{Document, GeoPoint, Value};
