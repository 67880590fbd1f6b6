//! Error type for kvo operations.
//!
//! Steady-state observation is total: missing properties, null objects and
//! non-observable values are ordinary states. The only failure is a
//! malformed key path supplied at construction time.

/// Errors from kvo operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvoError {
    /// An argument violated a construction-time contract.
    InvalidArgument {
        /// The offending input, verbatim.
        path: String,
        /// What was wrong with it.
        reason: &'static str,
    },
}

impl std::fmt::Display for KvoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument { path, reason } => {
                write!(f, "invalid key path '{path}': {reason}")
            }
        }
    }
}

impl std::error::Error for KvoError {}

/// Result alias for kvo operations.
pub type Result<T> = std::result::Result<T, KvoError>;
