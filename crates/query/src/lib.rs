//! Query-side machinery for ShelfDB
//!
//! Three concerns live here, in the order an inbound request meets them:
//!
//! 1. [`validate`] — reject forbidden fields and malformed field names
//! 2. [`translate`] — map documents between external and internal views
//! 3. [`criteria`] — compose the tenant-scoped backing-store query

pub mod criteria;
pub mod translate;
pub mod validate;

pub use criteria::build_criteria;
pub use translate::{to_external, to_external_opt, to_internal};
pub use validate::{ValidationChain, ValidationContext, Validator};
