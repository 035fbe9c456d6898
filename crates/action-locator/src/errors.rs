//! Error types for the locator

use rapidtap_core_types::TapError;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum LocatorError {
    /// Pattern definition cannot be compiled
    #[error("Invalid pattern '{id}': {reason}")]
    InvalidPattern { id: String, reason: String },

    /// Two patterns share one identity
    #[error("Duplicate pattern: {0}")]
    DuplicatePattern(String),

    /// Host search call failed
    #[error("Search '{method}' failed: {reason}")]
    SearchFailed { method: String, reason: String },
}

impl From<LocatorError> for TapError {
    fn from(err: LocatorError) -> Self {
        TapError::new(err.to_string())
    }
}
