use thiserror::Error;

/// Shared error type for the version-manager engine and its retrievers.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("empty version")]
    EmptyVersion,

    #[error("no compatible version found")]
    NoCompatible,

    /// Non-fatal for `use`: the evaluated version is carried so callers can
    /// still act on it.
    #[error("no compatible version found locally")]
    NoCompatibleLocally { version: String },

    #[error("invalid version constraint {constraint:?}: {reason}")]
    InvalidConstraint { constraint: String, reason: String },

    #[error("unexpected response from the release catalog: missing {context}")]
    BadResponse { context: &'static str },

    #[error("no matching asset found in release {tag}")]
    AssetNotFound { tag: String },

    #[error("network error during {operation}: {details}")]
    Network {
        operation: &'static str,
        details: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ManagerError {
    pub fn network(operation: &'static str, details: impl Into<String>) -> Self {
        Self::Network {
            operation,
            details: details.into(),
        }
    }
}
