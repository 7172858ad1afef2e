//! Timer-backed command used by the demo host.

use cmdctx_execution::{Command, CommandHandle};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Holds its contexts for a fixed time, then completes.
pub struct TimerCommand {
    name: String,
    contexts: Vec<String>,
    duration: Duration,
    task: Option<JoinHandle<()>>,
}

impl TimerCommand {
    /// Create a new timer command.
    pub fn new(name: impl Into<String>, contexts: Vec<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            contexts,
            duration,
            task: None,
        }
    }
}

impl Command for TimerCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn contexts(&self) -> &[String] {
        &self.contexts
    }

    fn execute(&mut self, handle: CommandHandle) {
        let duration = self.duration;
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            handle.complete();
        }));
    }

    fn on_abort(&mut self) {
        if let Some(task) = self.task.take() {
            debug!("Cancelling timer for {}", self.name);
            task.abort();
        }
    }
}
