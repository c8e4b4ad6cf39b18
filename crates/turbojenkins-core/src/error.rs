//! Error types for the pure building blocks.

use thiserror::Error;

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the name/URL codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The URL does not live under the expected Jenkins root.
    #[error("{url} is not in {root}")]
    ForeignUrl {
        /// Offending URL
        url: String,
        /// Root URL it was expected to start with
        root: String,
    },

    /// The job name cannot be mapped to a URL.
    #[error("Invalid job name '{name}': {reason}")]
    InvalidName {
        /// Offending name
        name: String,
        /// Why it was rejected
        reason: &'static str,
    },
}
