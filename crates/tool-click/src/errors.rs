use thiserror::Error;

use rapidtap_core_types::TapError;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("actuator port is required")]
    MissingActuator,
    #[error("primary activation failed: {0}")]
    Activation(String),
    #[error("gesture dispatch failed: {0}")]
    Gesture(String),
    #[error("gesture not acknowledged within {0}ms")]
    GestureTimeout(u64),
    #[error("operation cancelled")]
    Cancelled,
}

impl From<DispatchError> for TapError {
    fn from(err: DispatchError) -> Self {
        TapError::new(err.to_string())
    }
}
