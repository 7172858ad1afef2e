//! Unique identifiers for scheduled entities.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for a command submitted to a scheduler.
///
/// Command names are for diagnostics only and may repeat, so every
/// submission is addressed by its own id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommandId(Ulid);

impl CommandId {
    /// Generate a new CommandId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for CommandId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}
