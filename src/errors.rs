//! Errors raised while wiring the engine together

use action_locator::LocatorError;
use rapidtap_core_types::TapError;
use rapidtap_policy_center::PolicyError;
use thiserror::Error;
use tool_click::DispatchError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("policy: {0}")]
    Policy(#[from] PolicyError),
    #[error("patterns: {0}")]
    Patterns(#[from] LocatorError),
    #[error("dispatcher: {0}")]
    Dispatcher(#[from] DispatchError),
    #[error("scene: {0}")]
    Scene(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl From<AppError> for TapError {
    fn from(err: AppError) -> Self {
        TapError::new(err.to_string())
    }
}
