//! Error types for discovery-proxy.

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type.
///
/// Lookup misses are not errors: `find` returns an empty list and `resolve`
/// returns `None`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Online announcement carried no annotations at all.
    #[error("Endpoint is invalid: announcement carries no annotations")]
    InvalidEndpoint,

    /// A replica announced under a parent that never seeded its name.
    #[error("No parent available for service '{name}'")]
    NoParentRegistered {
        /// Logical name the replica announced itself with.
        name: String,
    },
}

impl Error {
    /// Create a missing-parent error.
    pub fn no_parent<S: Into<String>>(name: S) -> Self {
        Self::NoParentRegistered { name: name.into() }
    }
}
