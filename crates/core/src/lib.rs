//! cmdctx core data models.
//!
//! This crate defines the plain data shared by the scheduler and its
//! hosts: command identities and lifecycle states, the queue update
//! policy, lifecycle events, errors and configuration.

#![warn(missing_docs)]

// Core identities
mod id;

// Lifecycle
mod state;
mod event;

// Policy and configuration
mod mode;
mod config;

mod error;

// Re-exports
pub use id::CommandId;
pub use state::{CommandState, Outcome};
pub use event::{LifecycleEvent, LifecycleKind};
pub use mode::UpdateMethod;
pub use config::SchedulerConfig;
pub use error::{ContextError, Result, SchedulerError};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
