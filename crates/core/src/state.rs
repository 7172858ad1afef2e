//! Command lifecycle as seen by the scheduler.

use serde::{Deserialize, Serialize};

/// Where a command is in its lifecycle.
///
/// ```text
/// Pending --admitted--> Active --signal--> Completed | Aborted
/// ```
///
/// A pending command may also be withdrawn straight to `Aborted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandState {
    /// Waiting in the queue for its contexts
    Pending,
    /// Admitted and holding its contexts
    Active,
    /// Finished normally
    Completed,
    /// Cancelled before or during execution
    Aborted,
}

impl CommandState {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CommandState::Completed | CommandState::Aborted)
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandState::Pending => "pending",
            CommandState::Active => "active",
            CommandState::Completed => "completed",
            CommandState::Aborted => "aborted",
        }
    }
}

impl std::fmt::Display for CommandState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an active command finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The command's work ran to the end
    Completed,
    /// The command was cancelled
    Aborted,
}

impl From<Outcome> for CommandState {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Completed => CommandState::Completed,
            Outcome::Aborted => CommandState::Aborted,
        }
    }
}
