//! Tenant identity types
//!
//! Every facade operation is scoped to an (app_id, user_id) pair supplied
//! explicitly by the caller; the facade never reads ambient state.

use crate::error::{Error, Result};
use std::fmt;

/// Tenant scope: the (application, user) pair owning a document
///
/// Two scopes sharing a bucket name never collide; the bucket is logical
/// and tenant-local, the composite internal id provides global uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantScope {
    /// Application identifier (opaque)
    pub app_id: String,
    /// User identifier (opaque)
    pub user_id: String,
}

impl TenantScope {
    /// Create a new tenant scope
    pub fn new(app_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            user_id: user_id.into(),
        }
    }

    /// Require both identifiers to be present
    ///
    /// Every facade operation calls this before touching the store;
    /// violation is an `InvalidTenant` error.
    pub fn require(&self) -> Result<()> {
        if self.app_id.is_empty() || self.user_id.is_empty() {
            return Err(Error::InvalidTenant);
        }
        Ok(())
    }
}

impl fmt::Display for TenantScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_id, self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_accepts_populated_scope() {
        assert!(TenantScope::new("app", "user").require().is_ok());
    }

    #[test]
    fn test_require_rejects_missing_app() {
        let err = TenantScope::new("", "user").require().unwrap_err();
        assert_eq!(err, Error::InvalidTenant);
    }

    #[test]
    fn test_require_rejects_missing_user() {
        let err = TenantScope::new("app", "").require().unwrap_err();
        assert_eq!(err, Error::InvalidTenant);
    }

    #[test]
    fn test_display() {
        assert_eq!(TenantScope::new("a", "u").to_string(), "a/u");
    }
}
