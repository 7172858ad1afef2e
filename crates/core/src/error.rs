//! Error types for scheduler operations.

use crate::id::CommandId;

/// Error type for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Errors reported by scheduler operations.
///
/// None of these are fatal: the operation that failed leaves the
/// scheduler untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// A context with this name is already registered
    #[error("Context with name {0} already exists")]
    DuplicateContext(String),

    /// No context with this name is registered
    #[error("There is no context with name {0}")]
    UnknownContext(String),

    /// The command is neither pending nor active
    #[error("Command not found: {0}")]
    UnknownCommand(CommandId),
}

/// Errors raised by a context's hold bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    /// Release requested while nothing holds the context
    #[error("Context {context} released by {command} without a matching acquire")]
    NotHeld {
        /// Context name
        context: String,
        /// Command that attempted the release
        command: CommandId,
    },
}
