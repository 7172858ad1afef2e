//! Read-only views of the queue for diagnostics.

use cmdctx_core::UpdateMethod;
use serde::Serialize;
use std::fmt;

/// Queue state grouped by context, in context registration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueSnapshot {
    /// Update method at the time of the snapshot
    pub update_method: UpdateMethod,

    /// One entry per registered context
    pub contexts: Vec<ContextSnapshot>,

    /// Pending commands that name at least one unregistered context
    pub unschedulable: Vec<UnschedulableCommand>,
}

/// Commands referencing one context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextSnapshot {
    /// Context name
    pub name: String,

    /// Whether the context admits new commands
    pub enabled: bool,

    /// Whether an active command holds it
    pub busy: bool,

    /// Names of active commands in this context
    pub active: Vec<String>,

    /// Names of pending commands in this context
    pub pending: Vec<String>,
}

/// A pending command that cannot start until more contexts are registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnschedulableCommand {
    /// Command name
    pub name: String,

    /// Required contexts missing from the registry
    pub missing: Vec<String>,
}

impl fmt::Display for QueueSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for context in &self.contexts {
            if context.enabled {
                writeln!(f, "{}:", context.name)?;
            } else {
                writeln!(f, "{}: (disabled)", context.name)?;
            }
            writeln!(f, "  Active:")?;
            for name in &context.active {
                writeln!(f, "    {}", name)?;
            }
            writeln!(f, "  Pending:")?;
            for name in &context.pending {
                writeln!(f, "    {}", name)?;
            }
        }

        if !self.unschedulable.is_empty() {
            writeln!(f, "Unschedulable:")?;
            for cmd in &self.unschedulable {
                writeln!(f, "    {} (missing: {})", cmd.name, cmd.missing.join(", "))?;
            }
        }

        Ok(())
    }
}
