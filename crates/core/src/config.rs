//! Scheduler configuration.

use crate::mode::UpdateMethod;
use serde::{Deserialize, Serialize};

/// Configuration for a scheduler instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Initial queue update method
    #[serde(default)]
    pub update_method: UpdateMethod,

    /// Warn when a command is queued with a context that is not registered
    #[serde(default = "default_true")]
    pub warn_unschedulable: bool,

    /// Maximum number of lifecycle events kept until drained
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_true() -> bool {
    true
}

fn default_history_limit() -> usize {
    1024
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            update_method: UpdateMethod::default(),
            warn_unschedulable: default_true(),
            history_limit: default_history_limit(),
        }
    }
}

impl SchedulerConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial update method.
    pub fn with_update_method(mut self, method: UpdateMethod) -> Self {
        self.update_method = method;
        self
    }

    /// Enable or disable the enqueue-time warning for unknown contexts.
    pub fn with_warn_unschedulable(mut self, warn: bool) -> Self {
        self.warn_unschedulable = warn;
        self
    }

    /// Set the lifecycle event buffer size. Zero disables recording.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }
}
