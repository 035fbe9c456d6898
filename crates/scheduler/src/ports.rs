use std::sync::Arc;

use action_locator::UiTree;
use async_trait::async_trait;
use rapidtap_core_types::TapError;

/// Access to the host's current interface.
#[async_trait]
pub trait HostPort: Send + Sync {
    /// Root of the active window, `None` while no window is available.
    async fn active_root(&self) -> Result<Option<Arc<dyn UiTree>>, TapError>;
}
