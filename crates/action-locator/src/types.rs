//! Core types for the locator

use std::fmt;

use rapidtap_core_types::Bounds;

use crate::ports::ElementRef;

/// Search method enumeration
///
/// Defines the three methods used to find a target, in fallback order:
/// - Text: primary-text search verified by the pattern's matcher
/// - ViewId: stable resource identifier lookup
/// - Description: accessibility description lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocateMethod {
    /// Primary text search
    Text,

    /// Stable identifier search
    ViewId,

    /// Accessibility description search
    Description,
}

impl LocateMethod {
    /// Get method name as string
    pub fn name(&self) -> &'static str {
        match self {
            LocateMethod::Text => "text",
            LocateMethod::ViewId => "view-id",
            LocateMethod::Description => "description",
        }
    }

    /// Get all methods in fallback order
    pub fn fallback_chain() -> [LocateMethod; 3] {
        [
            LocateMethod::Text,
            LocateMethod::ViewId,
            LocateMethod::Description,
        ]
    }
}

impl fmt::Display for LocateMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An actionable element produced by a successful search.
#[derive(Clone, Debug)]
pub struct Located {
    /// Handle to the live element
    pub element: ElementRef,

    /// On-screen bounds captured when the element was found
    pub bounds: Bounds,

    /// Method that produced the match
    pub method: LocateMethod,
}

impl Located {
    pub fn new(element: ElementRef, bounds: Bounds, method: LocateMethod) -> Self {
        Self {
            element,
            bounds,
            method,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_chain_order() {
        let chain = LocateMethod::fallback_chain();
        assert_eq!(chain[0], LocateMethod::Text);
        assert_eq!(chain[1], LocateMethod::ViewId);
        assert_eq!(chain[2], LocateMethod::Description);
    }

    #[test]
    fn method_names() {
        assert_eq!(LocateMethod::Text.name(), "text");
        assert_eq!(LocateMethod::ViewId.to_string(), "view-id");
        assert_eq!(LocateMethod::Description.name(), "description");
    }
}
