use std::fmt;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

/// Shared error type for the RapidTap crates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TapError {
    #[error("{message}")]
    Message { message: String },
}

impl TapError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CycleId(pub String);

impl CycleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for CycleId {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable identity of a target pattern.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct PatternId(pub String);

impl PatternId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Screen-space rectangle of a UI element, edges in pixels.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top)
    }

    /// A rectangle with no positive area cannot be tapped.
    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    pub fn center(&self) -> (i32, i32) {
        (
            self.left + self.width() / 2,
            self.top + self.height() / 2,
        )
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{},{}][{},{}]",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// Kind of UI-change notification delivered by the host.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum UiEventKind {
    ContentChanged,
    StateChanged,
    Scrolled,
    Focused,
    Other,
}

impl UiEventKind {
    /// Kinds that can reveal a new actionable element.
    pub fn is_layout_change(&self) -> bool {
        matches!(
            self,
            UiEventKind::ContentChanged | UiEventKind::StateChanged | UiEventKind::Scrolled
        )
    }
}

/// A UI-change signal pushed by the host platform.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UiEvent {
    pub package: String,
    pub kind: UiEventKind,
}

impl UiEvent {
    pub fn new(package: impl Into<String>, kind: UiEventKind) -> Self {
        Self {
            package: package.into(),
            kind,
        }
    }
}

/// Identity of an operating strategy.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum StrategyKind {
    Turbo,
    Normal,
    Aggressive,
    Emergency,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Turbo => "turbo",
            StrategyKind::Normal => "normal",
            StrategyKind::Aggressive => "aggressive",
            StrategyKind::Emergency => "emergency",
        }
    }

    pub fn all() -> [StrategyKind; 4] {
        [
            StrategyKind::Turbo,
            StrategyKind::Normal,
            StrategyKind::Aggressive,
            StrategyKind::Emergency,
        ]
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Timing and retry parameters of one operating strategy.
///
/// Values are never mutated once published; the controller swaps whole
/// strategies.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Strategy {
    pub kind: StrategyKind,
    /// Wall-clock budget for one dispatch cycle.
    pub time_budget: Duration,
    /// Upper bound for each individual search method.
    pub search_timeout: Duration,
    /// Primary activation attempts per element.
    pub max_retries: u32,
    /// Delay between primary attempts; also the synthetic tap duration.
    pub retry_delay: Duration,
}

impl Strategy {
    pub fn new(
        kind: StrategyKind,
        time_budget: Duration,
        search_timeout: Duration,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            kind,
            time_budget,
            search_timeout,
            max_retries,
            retry_delay,
        }
    }

    /// Built-in parameter table.
    pub fn builtin(kind: StrategyKind) -> Self {
        let (budget, search, retries, delay) = match kind {
            StrategyKind::Turbo => (100, 25, 1, 10),
            StrategyKind::Normal => (200, 50, 2, 25),
            StrategyKind::Aggressive => (500, 100, 5, 50),
            StrategyKind::Emergency => (2000, 200, 10, 100),
        };
        Self::new(
            kind,
            Duration::from_millis(budget),
            Duration::from_millis(search),
            retries,
            Duration::from_millis(delay),
        )
    }

    pub fn is_emergency(&self) -> bool {
        self.kind == StrategyKind::Emergency
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (budget={}ms search={}ms retries={} delay={}ms)",
            self.kind,
            self.time_budget.as_millis(),
            self.search_timeout.as_millis(),
            self.max_retries,
            self.retry_delay.as_millis()
        )
    }
}
