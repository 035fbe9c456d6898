use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Synthetic single-point tap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapGesture {
    pub x: i32,
    pub y: i32,
    /// Stroke duration.
    pub duration: Duration,
}

impl TapGesture {
    pub fn new(x: i32, y: i32, duration: Duration) -> Self {
        Self { x, y, duration }
    }
}

/// Host acknowledgement of a dispatched gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureAck {
    Completed,
    Cancelled,
}
