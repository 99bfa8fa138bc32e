//! Cache key definitions
//!
//! Composite keys for feed cache entries: operation name, principal id and,
//! for dependent-scoped feeds, the dependent id.

use std::fmt;

/// Cache key for a feed operation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Operation name ("feed", "conversations", ...)
    pub op: &'static str,
    /// Principal the feed is built for
    pub principal_id: String,
    /// Dependent the feed is scoped to, if any
    pub dependent_id: Option<String>,
}

impl CacheKey {
    /// Key for a principal-scoped feed
    pub fn feed(principal_id: &str) -> Self {
        Self {
            op: "feed",
            principal_id: principal_id.to_string(),
            dependent_id: None,
        }
    }

    /// Key for a dependent-scoped feed
    pub fn feed_for_dependent(principal_id: &str, dependent_id: &str) -> Self {
        Self {
            op: "feed",
            principal_id: principal_id.to_string(),
            dependent_id: Some(dependent_id.to_string()),
        }
    }

    /// Convert to storage key string
    /// Format: op:principal: or op:principal:dependent:
    ///
    /// Every key ends with the delimiter so a prefix match stops at
    /// component boundaries; "feed:p1:" never matches a key for "p10".
    pub fn to_storage_key(&self) -> String {
        match &self.dependent_id {
            Some(dep) => format!("{}:{}:{}:", self.op, self.principal_id, dep),
            None => format!("{}:{}:", self.op, self.principal_id),
        }
    }

    /// Prefix matching every feed entry for a principal, regardless of
    /// dependent scoping
    pub fn invalidation_prefix(principal_id: &str) -> String {
        format!("feed:{}:", principal_id)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_storage_key())
    }
}
