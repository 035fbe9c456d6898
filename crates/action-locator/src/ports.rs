//! Host capabilities consumed by the locator
//!
//! Tree traversal belongs to the host platform; the locator only issues the
//! three lookups below and inspects the attributes of the handles returned.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use rapidtap_core_types::{Bounds, TapError};

/// One node of the live interface tree.
pub trait UiElement: Send + Sync + fmt::Debug {
    /// Current on-screen rectangle. Fails when the node has gone stale.
    fn bounds(&self) -> Result<Bounds, TapError>;

    fn is_clickable(&self) -> bool;

    fn is_enabled(&self) -> bool;

    fn is_visible(&self) -> bool;

    /// Visible text, when the node exposes any.
    fn text(&self) -> Option<String>;

    fn view_id(&self) -> Option<String> {
        None
    }

    fn description(&self) -> Option<String> {
        None
    }
}

/// Shared handle to a tree node.
pub type ElementRef = Arc<dyn UiElement>;

/// Search capability over the current interface root.
#[async_trait]
pub trait UiTree: Send + Sync {
    async fn find_by_text(&self, text: &str) -> Result<Vec<ElementRef>, TapError>;

    async fn find_by_view_id(&self, view_id: &str) -> Result<Vec<ElementRef>, TapError>;

    async fn find_by_description(&self, description: &str)
        -> Result<Vec<ElementRef>, TapError>;
}
