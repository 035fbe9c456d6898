//! Element locator with fallback chain

use std::sync::Arc;
use std::time::Duration;

use rapidtap_core_types::{Bounds, StrategyKind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::cache::{CacheEntry, CacheKey, ResultCache};
use crate::errors::LocatorError;
use crate::pattern::TargetPattern;
use crate::ports::{ElementRef, UiTree};
use crate::types::{LocateMethod, Located};

/// Returns the element's bounds when it can be acted on right now.
pub fn is_actionable(element: &ElementRef) -> Option<Bounds> {
    if !(element.is_clickable() && element.is_enabled() && element.is_visible()) {
        return None;
    }
    match element.bounds() {
        Ok(bounds) if !bounds.is_empty() => Some(bounds),
        Ok(_) => None,
        Err(err) => {
            debug!(error = %err, "candidate bounds unavailable");
            None
        }
    }
}

/// Finds an actionable element for a pattern, trying each search method in
/// fallback order. Successful matches are written to the shared cache.
pub struct ElementLocator {
    cache: Arc<ResultCache>,
}

impl ElementLocator {
    pub fn new(cache: Arc<ResultCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Each method gets its own `timeout`. Timeouts, host faults and empty
    /// results all fall through to the next method.
    #[instrument(skip_all, fields(pattern = %pattern.id(), strategy = %strategy))]
    pub async fn locate(
        &self,
        root: &dyn UiTree,
        pattern: &TargetPattern,
        strategy: StrategyKind,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Option<Located> {
        for method in LocateMethod::fallback_chain() {
            if pattern.queries(method).is_empty() {
                continue;
            }
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(method = method.name(), "search cancelled");
                    return None;
                }
                outcome = tokio::time::timeout(timeout, self.search(root, pattern, method)) => outcome,
            };
            match outcome {
                Ok(Some(located)) => {
                    debug!(method = method.name(), bounds = %located.bounds, "element located");
                    self.cache.put(
                        CacheKey::new(pattern.id().clone(), strategy),
                        CacheEntry::new(located.element.clone(), located.bounds),
                    );
                    return Some(located);
                }
                Ok(None) => debug!(method = method.name(), "no actionable candidate"),
                Err(_) => debug!(
                    method = method.name(),
                    timeout_ms = timeout.as_millis() as u64,
                    "search timed out"
                ),
            }
        }
        None
    }

    async fn search(
        &self,
        root: &dyn UiTree,
        pattern: &TargetPattern,
        method: LocateMethod,
    ) -> Option<Located> {
        for query in pattern.queries(method) {
            let found = match method {
                LocateMethod::Text => root.find_by_text(query).await,
                LocateMethod::ViewId => root.find_by_view_id(query).await,
                LocateMethod::Description => root.find_by_description(query).await,
            };
            let candidates = match found {
                Ok(candidates) => candidates,
                Err(err) => {
                    let err = LocatorError::SearchFailed {
                        method: method.name().to_string(),
                        reason: err.to_string(),
                    };
                    debug!(query = %query, error = %err, "lookup failed");
                    continue;
                }
            };
            for element in candidates {
                if method == LocateMethod::Text && !text_accepted(pattern, &element) {
                    continue;
                }
                if let Some(bounds) = is_actionable(&element) {
                    return Some(Located::new(element, bounds, method));
                }
            }
        }
        None
    }
}

fn text_accepted(pattern: &TargetPattern, element: &ElementRef) -> bool {
    element
        .text()
        .map(|text| pattern.matches_text(&text))
        .unwrap_or(true)
}
