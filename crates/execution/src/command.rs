//! Command abstraction and the handle a running command signals through.

use cmdctx_core::{CommandId, Outcome};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// A unit of work the scheduler admits once all its contexts are free.
///
/// The scheduler only looks at the name and the required contexts. What
/// happens after [`Command::execute`] is up to the implementation: it may
/// finish inside `execute` or hand the [`CommandHandle`] to a timer, a
/// spawned task or anything else that signals later.
pub trait Command {
    /// Human-readable name for logging and queue printing.
    fn name(&self) -> &str;

    /// Required context names, in declaration order.
    fn contexts(&self) -> &[String];

    /// Whether `context` is one of the required contexts.
    fn is_in_context(&self, context: &str) -> bool {
        self.contexts().iter().any(|c| c == context)
    }

    /// Start the work. Called exactly once, when the command is admitted.
    ///
    /// The command must eventually call [`CommandHandle::complete`] or
    /// [`CommandHandle::abort`] to give its contexts back.
    fn execute(&mut self, handle: CommandHandle);

    /// Called when the host aborts the command while it is active.
    ///
    /// The scheduler releases the contexts itself afterwards, so
    /// implementations only need to stop their own work.
    fn on_abort(&mut self) {}
}

/// Completion signal sent from a command back to its scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Signal {
    pub(crate) command: CommandId,
    pub(crate) outcome: Outcome,
}

/// Handle given to a command when it starts.
///
/// Cheap to clone and `Send`, so it can be moved into async tasks.
/// Only the first signal for a command has any effect.
#[derive(Debug, Clone)]
pub struct CommandHandle {
    id: CommandId,
    tx: UnboundedSender<Signal>,
}

impl CommandHandle {
    pub(crate) fn new(id: CommandId, tx: UnboundedSender<Signal>) -> Self {
        Self { id, tx }
    }

    /// Id of the command this handle belongs to.
    pub fn id(&self) -> CommandId {
        self.id
    }

    /// Signal that execution finished normally.
    pub fn complete(&self) {
        self.signal(Outcome::Completed);
    }

    /// Signal that execution was cancelled.
    pub fn abort(&self) {
        self.signal(Outcome::Aborted);
    }

    fn signal(&self, outcome: Outcome) {
        let signal = Signal {
            command: self.id,
            outcome,
        };
        if self.tx.send(signal).is_err() {
            debug!("Scheduler gone, dropping {:?} signal for {}", outcome, self.id);
        }
    }
}

/// A command built from a name, its contexts and a closure.
///
/// Handy for hosts whose work is a single callback and for tests.
pub struct FnCommand<F>
where
    F: FnMut(CommandHandle),
{
    name: String,
    contexts: Vec<String>,
    run: F,
}

impl<F> FnCommand<F>
where
    F: FnMut(CommandHandle),
{
    /// Create a new closure-backed command.
    pub fn new<I, S>(name: impl Into<String>, contexts: I, run: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            contexts: contexts.into_iter().map(Into::into).collect(),
            run,
        }
    }
}

impl<F> Command for FnCommand<F>
where
    F: FnMut(CommandHandle),
{
    fn name(&self) -> &str {
        &self.name
    }

    fn contexts(&self) -> &[String] {
        &self.contexts
    }

    fn execute(&mut self, handle: CommandHandle) {
        (self.run)(handle)
    }
}
