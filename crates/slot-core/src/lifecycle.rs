//! Property lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a property as seen by remote clients.
///
/// ```text
/// Idle ──request──▶ Busy ──completion──▶ Ok
///   │                 │
///   └──invalid──▶ Alert ◀──rejected──┘
/// ```
///
/// `Ok` and `Alert` are steady states; the next request moves the property
/// back to `Busy` (or straight to `Alert` if it is invalid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyState {
    /// No outstanding request.
    #[default]
    Idle,
    /// Request accepted, hardware in progress.
    Busy,
    /// Value reflects the true hardware state.
    Ok,
    /// Request failed or was invalid.
    Alert,
}

impl PropertyState {
    /// Protocol label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Busy => "Busy",
            Self::Ok => "Ok",
            Self::Alert => "Alert",
        }
    }

    /// True for states that end a request (`Ok`, `Alert`).
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ok | Self::Alert)
    }
}

impl fmt::Display for PropertyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
