use async_trait::async_trait;
use action_locator::ElementRef;
use rapidtap_core_types::TapError;

use crate::model::{GestureAck, TapGesture};

/// Host capability that mutates UI state.
///
/// Implementations marshal each call onto whatever execution context the
/// host requires for actuation.
#[async_trait]
pub trait ActuatorPort: Send + Sync {
    /// Primary activation. `Ok(false)` means the host declined the action.
    async fn activate(&self, element: &ElementRef) -> Result<bool, TapError>;

    /// Resolves once the host reports the gesture completed or cancelled.
    async fn dispatch_gesture(&self, gesture: TapGesture) -> Result<GestureAck, TapError>;
}
