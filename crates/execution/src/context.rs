//! Contexts - named mutual-exclusion guards commands run under.

use cmdctx_core::{CommandId, ContextError};

/// A named resource at most one admitted command at a time is expected to hold.
///
/// The scheduler is the only caller of [`Context::acquire`] and
/// [`Context::release`]; the owning application may toggle
/// [`Context::set_enabled`] at any time.
pub trait Context {
    /// Unique name within a scheduler.
    fn name(&self) -> &str;

    /// Whether new commands may be admitted into this context.
    fn is_enabled(&self) -> bool;

    /// Enable or disable admission. Does not affect commands already active.
    fn set_enabled(&mut self, enabled: bool);

    /// Whether any active command currently holds this context.
    fn is_busy(&self) -> bool;

    /// Record that `command` became active while holding this context.
    fn acquire(&mut self, command: CommandId);

    /// Record that `command` finished.
    fn release(&mut self, command: CommandId) -> Result<(), ContextError>;
}

/// Counting context: busy while its hold count is positive.
#[derive(Debug, Clone)]
pub struct BaseContext {
    name: String,
    enabled: bool,
    holds: usize,
}

impl BaseContext {
    /// Create an enabled, idle context.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            holds: 0,
        }
    }

    /// Start out disabled.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Number of active commands holding this context.
    pub fn hold_count(&self) -> usize {
        self.holds
    }
}

impl Context for BaseContext {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_busy(&self) -> bool {
        self.holds > 0
    }

    fn acquire(&mut self, _command: CommandId) {
        self.holds += 1;
    }

    fn release(&mut self, command: CommandId) -> Result<(), ContextError> {
        if self.holds == 0 {
            return Err(ContextError::NotHeld {
                context: self.name.clone(),
                command,
            });
        }
        self.holds -= 1;
        Ok(())
    }
}
