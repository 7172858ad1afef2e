//! Lifecycle events - what other collaborators can observe about commands.

use crate::id::CommandId;
use crate::state::Outcome;
use crate::Time;
use serde::{Deserialize, Serialize};

/// A lifecycle transition of a single command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Command the event is about
    pub command: CommandId,

    /// Command name at the time of the event
    pub name: String,

    /// What happened
    pub kind: LifecycleKind,

    /// When it happened
    pub timestamp: Time,
}

impl LifecycleEvent {
    /// Create a new event stamped with the current time.
    pub fn new(command: CommandId, name: impl Into<String>, kind: LifecycleKind) -> Self {
        Self {
            command,
            name: name.into(),
            kind,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Whether this event ends the command's lifecycle.
    pub fn is_finish(&self) -> bool {
        matches!(self.kind, LifecycleKind::Finished(_))
    }
}

/// Kind of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleKind {
    /// Entered the pending queue
    Queued,
    /// Admitted; execution started
    Started,
    /// Execution complete or aborted
    Finished(Outcome),
}
