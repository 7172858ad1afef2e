//! Queue update policy.

use serde::{Deserialize, Serialize};

/// When the scheduler re-evaluates its pending queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMethod {
    /// No automatic evaluation; passes run only when requested
    None,
    /// The queue is evaluated every time the commands or contexts change
    #[default]
    EventDriven,
    /// The queue is evaluated by the host, e.g. once per frame
    Manual,
}

impl UpdateMethod {
    /// Whether state changes evaluate the queue on their own.
    pub fn is_automatic(&self) -> bool {
        matches!(self, UpdateMethod::EventDriven)
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateMethod::None => "none",
            UpdateMethod::EventDriven => "event_driven",
            UpdateMethod::Manual => "manual",
        }
    }
}

impl std::fmt::Display for UpdateMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UpdateMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "none" => Ok(UpdateMethod::None),
            "event_driven" | "event" => Ok(UpdateMethod::EventDriven),
            "manual" => Ok(UpdateMethod::Manual),
            other => Err(format!("unknown update method: {}", other)),
        }
    }
}
