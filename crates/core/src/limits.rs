//! Tunable limits for the storage facade
//!
//! Limits are set once at facade construction; the defaults match the
//! production configuration and can be overridden per deployment.

/// Configuration enforced by the facade
#[derive(Debug, Clone)]
pub struct Limits {
    /// Page size used by `find` when the caller supplies no limit
    pub default_page_size: usize,

    /// Maximum external key length in bytes
    pub max_key_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            default_page_size: 100,
            max_key_bytes: 1024,
        }
    }
}

impl Limits {
    /// Create limits with small values for testing
    pub fn with_small_limits() -> Self {
        Limits {
            default_page_size: 2,
            max_key_bytes: 64,
        }
    }
}
