//! Execution layer - commands, contexts and context-guarded scheduling.
//!
//! A [`Scheduler`] keeps a FIFO queue of [`Command`]s and a registry of
//! [`Context`]s. A command is admitted only when every context it names is
//! registered, enabled and not held by another active command.

#![warn(missing_docs)]

pub mod command;
pub mod context;
pub mod admission;
pub mod snapshot;
pub mod scheduler;

pub use command::{Command, CommandHandle, FnCommand};
pub use context::{BaseContext, Context};
pub use admission::Admission;
pub use snapshot::{ContextSnapshot, QueueSnapshot, UnschedulableCommand};
pub use scheduler::{Scheduler, SchedulerStats};
