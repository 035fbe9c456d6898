//! In-memory interface tree
//!
//! Backs the simulator and tests. Lookups can be slowed down or made to fail
//! per query string, and every lookup is recorded.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rapidtap_core_types::{Bounds, TapError};

use crate::ports::{ElementRef, UiElement, UiTree};
use crate::types::LocateMethod;

/// A fixed tree node.
#[derive(Debug, Clone)]
pub struct StaticElement {
    id: String,
    text: Option<String>,
    view_id: Option<String>,
    description: Option<String>,
    bounds: Option<Bounds>,
    clickable: bool,
    enabled: bool,
    visible: bool,
}

impl StaticElement {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: None,
            view_id: None,
            description: None,
            bounds: Some(Bounds::new(0, 0, 100, 40)),
            clickable: true,
            enabled: true,
            visible: true,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_view_id(mut self, view_id: impl Into<String>) -> Self {
        self.view_id = Some(view_id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Node whose bounds can no longer be read.
    pub fn stale(mut self) -> Self {
        self.bounds = None;
        self
    }

    pub fn with_clickable(mut self, clickable: bool) -> Self {
        self.clickable = clickable;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl UiElement for StaticElement {
    fn bounds(&self) -> Result<Bounds, TapError> {
        self.bounds
            .ok_or_else(|| TapError::new(format!("node '{}' is stale", self.id)))
    }

    fn is_clickable(&self) -> bool {
        self.clickable
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn text(&self) -> Option<String> {
        self.text.clone()
    }

    fn view_id(&self) -> Option<String> {
        self.view_id.clone()
    }

    fn description(&self) -> Option<String> {
        self.description.clone()
    }
}

#[derive(Default)]
pub struct StaticTree {
    elements: RwLock<Vec<Arc<StaticElement>>>,
    latency: HashMap<String, Duration>,
    faults: HashSet<String>,
    calls: Mutex<Vec<(LocateMethod, String)>>,
}

impl StaticTree {
    pub fn new(elements: Vec<StaticElement>) -> Self {
        Self {
            elements: RwLock::new(elements.into_iter().map(Arc::new).collect()),
            ..Default::default()
        }
    }

    /// Every lookup for `query` sleeps for `latency` before answering.
    pub fn with_latency(mut self, query: impl Into<String>, latency: Duration) -> Self {
        self.latency.insert(query.into(), latency);
        self
    }

    /// Every lookup for `query` fails.
    pub fn with_fault(mut self, query: impl Into<String>) -> Self {
        self.faults.insert(query.into());
        self
    }

    pub fn replace_elements(&self, elements: Vec<StaticElement>) {
        *self.elements.write() = elements.into_iter().map(Arc::new).collect();
    }

    pub fn find_element(&self, id: &str) -> Option<Arc<StaticElement>> {
        self.elements
            .read()
            .iter()
            .find(|element| element.id == id)
            .cloned()
    }

    pub fn calls(&self) -> Vec<(LocateMethod, String)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, method: LocateMethod) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(called, _)| *called == method)
            .count()
    }

    async fn lookup<F>(
        &self,
        method: LocateMethod,
        query: &str,
        accept: F,
    ) -> Result<Vec<ElementRef>, TapError>
    where
        F: Fn(&StaticElement) -> bool,
    {
        self.calls.lock().push((method, query.to_string()));
        if let Some(latency) = self.latency.get(query) {
            tokio::time::sleep(*latency).await;
        }
        if self.faults.contains(query) {
            return Err(TapError::new(format!("{method} lookup for '{query}' failed")));
        }
        Ok(self
            .elements
            .read()
            .iter()
            .filter(|element| accept(element))
            .map(|element| element.clone() as ElementRef)
            .collect())
    }
}

fn contains_ignore_case(haystack: &Option<String>, needle: &str) -> bool {
    haystack
        .as_deref()
        .map(|value| value.to_lowercase().contains(&needle.to_lowercase()))
        .unwrap_or(false)
}

#[async_trait]
impl UiTree for StaticTree {
    async fn find_by_text(&self, text: &str) -> Result<Vec<ElementRef>, TapError> {
        // like platform text search, descriptions are matched too
        self.lookup(LocateMethod::Text, text, |element| {
            contains_ignore_case(&element.text, text)
                || contains_ignore_case(&element.description, text)
        })
        .await
    }

    async fn find_by_view_id(&self, view_id: &str) -> Result<Vec<ElementRef>, TapError> {
        self.lookup(LocateMethod::ViewId, view_id, |element| {
            element.view_id.as_deref() == Some(view_id)
        })
        .await
    }

    async fn find_by_description(
        &self,
        description: &str,
    ) -> Result<Vec<ElementRef>, TapError> {
        self.lookup(LocateMethod::Description, description, |element| {
            contains_ignore_case(&element.description, description)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookups_match_by_method() {
        let tree = StaticTree::new(vec![
            StaticElement::new("a").with_text("Buy Now"),
            StaticElement::new("b").with_view_id("app:id/buy"),
            StaticElement::new("c").with_description("Pay now button"),
        ]);
        assert_eq!(tree.find_by_text("buy now").await.unwrap().len(), 1);
        assert_eq!(tree.find_by_text("pay now").await.unwrap().len(), 1);
        assert_eq!(tree.find_by_view_id("app:id/buy").await.unwrap().len(), 1);
        assert!(tree.find_by_view_id("app:id/bu").await.unwrap().is_empty());
        assert_eq!(tree.find_by_description("PAY NOW").await.unwrap().len(), 1);
        assert_eq!(tree.calls().len(), 5);
        assert_eq!(tree.call_count(LocateMethod::ViewId), 2);
    }

    #[tokio::test]
    async fn faults_surface_as_errors() {
        let tree = StaticTree::new(vec![StaticElement::new("a").with_text("Go")]).with_fault("Go");
        assert!(tree.find_by_text("Go").await.is_err());
        assert!(StaticElement::new("x").stale().bounds().is_err());
    }
}
