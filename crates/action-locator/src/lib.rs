//! Element location for the locate-and-act engine
//!
//! This crate implements:
//! - The immutable pattern catalogue with precompiled text matchers
//! - Ordered fallback search (primary text, view id, description)
//! - The TTL cache of located elements keyed by pattern and strategy
//! - An in-memory UI tree for hosts without a live accessibility tree

pub mod cache;
pub mod errors;
pub mod memory;
pub mod pattern;
pub mod ports;
pub mod resolver;
pub mod types;

pub use cache::{CacheEntry, CacheKey, ResultCache};
pub use errors::LocatorError;
pub use memory::{StaticElement, StaticTree};
pub use pattern::{PatternRegistry, TargetPattern};
pub use ports::{ElementRef, UiElement, UiTree};
pub use resolver::{is_actionable, ElementLocator};
pub use types::{LocateMethod, Located};
