//! Context-guarded command scheduling.

use crate::admission::{self, Admission};
use crate::command::{Command, CommandHandle, Signal};
use crate::context::Context;
use crate::snapshot::{ContextSnapshot, QueueSnapshot, UnschedulableCommand};
use cmdctx_core::{
    CommandId, CommandState, LifecycleEvent, LifecycleKind, Outcome, Result, SchedulerConfig,
    SchedulerError, UpdateMethod,
};
use serde::Serialize;
use std::collections::VecDeque;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

/// Counters describing what the scheduler has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    /// Admission passes run
    pub passes: u64,
    /// Commands started
    pub admitted: u64,
    /// Commands finished normally
    pub completed: u64,
    /// Commands aborted, active or still pending
    pub aborted: u64,
}

struct Entry {
    id: CommandId,
    state: CommandState,
    command: Box<dyn Command>,
    /// Contexts taken at start, by name and registration generation.
    held: Vec<(String, u64)>,
}

/// Admits queued commands once every context they need is free and enabled.
///
/// Single-threaded: all methods take `&mut self` and never block. Commands
/// report completion through their [`CommandHandle`]; those signals are
/// picked up at the end of every scheduler operation, by
/// [`Scheduler::process_signals`], or by awaiting [`Scheduler::next_signal`].
///
/// ```text
/// add_to_queue → pending → (pass) → active → handle.complete() → released
/// ```
pub struct Scheduler {
    config: SchedulerConfig,
    update_method: UpdateMethod,
    contexts: Vec<Box<dyn Context>>,
    /// Registration generation of each context, index-aligned with `contexts`.
    generations: Vec<u64>,
    next_generation: u64,
    pending: Vec<Entry>,
    active: Vec<Entry>,
    signal_tx: UnboundedSender<Signal>,
    signal_rx: UnboundedReceiver<Signal>,
    events: VecDeque<LifecycleEvent>,
    stats: SchedulerStats,
}

impl Scheduler {
    /// Create a scheduler with the given initial update method.
    pub fn new(update_method: UpdateMethod) -> Self {
        Self::with_config(SchedulerConfig::default().with_update_method(update_method))
    }

    /// Create a scheduler from a full configuration.
    pub fn with_config(config: SchedulerConfig) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        Self {
            update_method: config.update_method,
            config,
            contexts: Vec::new(),
            generations: Vec::new(),
            next_generation: 0,
            pending: Vec::new(),
            active: Vec::new(),
            signal_tx,
            signal_rx,
            events: VecDeque::new(),
            stats: SchedulerStats::default(),
        }
    }

    // === Update method ===

    /// Current queue update method.
    pub fn update_method(&self) -> UpdateMethod {
        self.update_method
    }

    /// Change the queue update method.
    ///
    /// Switching does not run a pass by itself; it only decides whether the
    /// next state change will.
    pub fn set_update_method(&mut self, method: UpdateMethod) {
        if self.update_method == method {
            return;
        }
        info!("Queue update method: {} -> {}", self.update_method, method);
        self.update_method = method;
    }

    // === Contexts ===

    /// Register a context.
    ///
    /// A context whose name is already taken is rejected and the registry
    /// is left unchanged.
    pub fn add_context<C>(&mut self, context: C) -> Result<()>
    where
        C: Context + 'static,
    {
        if admission::find(&self.contexts, context.name()).is_some() {
            warn!("Context with name {} already exists", context.name());
            return Err(SchedulerError::DuplicateContext(context.name().to_string()));
        }

        info!("Added context {}", context.name());
        self.contexts.push(Box::new(context));
        self.generations.push(self.next_generation);
        self.next_generation += 1;

        self.trigger();
        self.settle();
        Ok(())
    }

    /// Unregister a context and hand it back.
    ///
    /// Commands still holding it keep running; releasing it later is a
    /// no-op. Pending commands that need it stay queued until a context
    /// with the same name comes back.
    pub fn remove_context(&mut self, name: &str) -> Result<Box<dyn Context>> {
        let Some(index) = self.contexts.iter().position(|c| c.name() == name) else {
            warn!("There is no context with name {}", name);
            return Err(SchedulerError::UnknownContext(name.to_string()));
        };

        let context = self.contexts.remove(index);
        self.generations.remove(index);
        info!("Removed context {}", name);

        self.trigger();
        self.settle();
        Ok(context)
    }

    /// Enable or disable a registered context.
    ///
    /// Active commands are not affected, and no pass is run.
    pub fn set_context_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        let Some(context) = self.context_mut(name) else {
            warn!("There is no context with name {}", name);
            return Err(SchedulerError::UnknownContext(name.to_string()));
        };
        context.set_enabled(enabled);
        debug!("Context {} enabled = {}", name, enabled);
        Ok(())
    }

    /// Look up a registered context.
    pub fn context(&self, name: &str) -> Option<&dyn Context> {
        admission::find(&self.contexts, name)
    }

    /// Look up a registered context for modification.
    pub fn context_mut(&mut self, name: &str) -> Option<&mut dyn Context> {
        match self.contexts.iter_mut().find(|c| c.name() == name) {
            Some(context) => {
                let context: &mut dyn Context = &mut **context;
                Some(context)
            }
            None => None,
        }
    }

    /// Names of registered contexts, in registration order.
    pub fn context_names(&self) -> Vec<&str> {
        self.contexts.iter().map(|c| c.name()).collect()
    }

    // === Commands ===

    /// Append a command to the pending queue.
    pub fn add_to_queue<C>(&mut self, command: C) -> CommandId
    where
        C: Command + 'static,
    {
        let id = CommandId::new();

        if self.config.warn_unschedulable {
            let missing = admission::missing(&self.contexts, command.contexts());
            if !missing.is_empty() {
                warn!(
                    "Command {} needs unregistered contexts {:?}; it stays pending until they are added",
                    command.name(),
                    missing
                );
            }
        }

        debug!("Queued {} ({})", command.name(), id);
        self.record(id, command.name(), LifecycleKind::Queued);
        self.pending.push(Entry {
            id,
            state: CommandState::Pending,
            command: Box::new(command),
            held: Vec::new(),
        });

        self.trigger();
        self.settle();
        id
    }

    /// Run one admission pass over the pending queue.
    ///
    /// Works in every update method. Completion signals already received
    /// are applied first, so contexts they free count in this pass.
    pub fn update_queue(&mut self) {
        self.settle();
        if self.run_pass() > 0 {
            self.trigger();
        }
        self.settle();
    }

    /// Abort a pending or active command.
    ///
    /// A pending command is withdrawn from the queue. An active one gets its
    /// [`Command::on_abort`] hook and then releases its contexts.
    pub fn abort(&mut self, id: CommandId) -> Result<()> {
        if let Some(index) = self.pending.iter().position(|e| e.id == id) {
            let mut entry = self.pending.remove(index);
            entry.state = CommandState::Aborted;
            info!("Withdrew pending command {}", entry.command.name());
            self.stats.aborted += 1;
            self.record(id, entry.command.name(), LifecycleKind::Finished(Outcome::Aborted));
            return Ok(());
        }

        let Some(entry) = self.active.iter_mut().find(|e| e.id == id) else {
            return Err(SchedulerError::UnknownCommand(id));
        };
        entry.command.on_abort();

        self.finish(Signal {
            command: id,
            outcome: Outcome::Aborted,
        });
        self.trigger();
        self.settle();
        Ok(())
    }

    // === Signals ===

    /// Apply every completion signal received so far.
    ///
    /// Returns the number of commands that finished.
    pub fn process_signals(&mut self) -> usize {
        self.settle()
    }

    /// Wait for the next completion signal, then apply it together with any
    /// others already queued.
    ///
    /// Never resolves if no command will signal again, so hosts should only
    /// await it while [`Scheduler::has_active`] is true.
    pub async fn next_signal(&mut self) -> usize {
        let Some(signal) = self.signal_rx.recv().await else {
            return 0;
        };
        let mut finished = 0;
        if self.finish(signal) {
            finished += 1;
            self.trigger();
        }
        finished + self.settle()
    }

    // === Queries ===

    /// Lifecycle state of a command still known to the scheduler.
    ///
    /// Finished commands are dropped, so this returns `None` for them.
    pub fn state(&self, id: CommandId) -> Option<CommandState> {
        self.pending
            .iter()
            .chain(self.active.iter())
            .find(|e| e.id == id)
            .map(|e| e.state)
    }

    /// Number of commands waiting for admission.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of commands running.
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Whether any command is running.
    pub fn has_active(&self) -> bool {
        !self.active.is_empty()
    }

    /// Whether nothing is pending or running.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.active.is_empty()
    }

    /// Names of pending commands, in submission order.
    pub fn pending_names(&self) -> Vec<&str> {
        self.pending.iter().map(|e| e.command.name()).collect()
    }

    /// Names of active commands, in admission order.
    pub fn active_names(&self) -> Vec<&str> {
        self.active.iter().map(|e| e.command.name()).collect()
    }

    /// Counters since creation.
    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Take the lifecycle events recorded since the last call.
    pub fn drain_events(&mut self) -> Vec<LifecycleEvent> {
        self.events.drain(..).collect()
    }

    /// Structured view of the queue.
    pub fn snapshot(&self) -> QueueSnapshot {
        let contexts = self
            .contexts
            .iter()
            .map(|context| {
                let name = context.name();
                ContextSnapshot {
                    name: name.to_string(),
                    enabled: context.is_enabled(),
                    busy: context.is_busy(),
                    active: names_in(&self.active, name),
                    pending: names_in(&self.pending, name),
                }
            })
            .collect();

        let unschedulable = self
            .pending
            .iter()
            .filter_map(|entry| {
                let missing = admission::missing(&self.contexts, entry.command.contexts());
                (!missing.is_empty()).then(|| UnschedulableCommand {
                    name: entry.command.name().to_string(),
                    missing,
                })
            })
            .collect();

        QueueSnapshot {
            update_method: self.update_method,
            contexts,
            unschedulable,
        }
    }

    /// Human-readable queue state, for debugging.
    pub fn print_queue(&self) -> String {
        self.snapshot().to_string()
    }

    // === Internals ===

    /// Run a pass if the update method asks for automatic evaluation.
    ///
    /// Commands finishing during a pass get their follow-up pass once it
    /// is over.
    fn trigger(&mut self) {
        if !self.update_method.is_automatic() {
            return;
        }
        while self.run_pass() > 0 {}
    }

    /// Greedy FIFO scan over the pending commands present at the start.
    ///
    /// Returns how many commands finished while it ran.
    fn run_pass(&mut self) -> usize {
        let mut finished = 0;
        self.stats.passes += 1;
        let queued: Vec<CommandId> = self.pending.iter().map(|e| e.id).collect();
        debug!("Admission pass {} over {} pending", self.stats.passes, queued.len());

        for id in queued {
            let Some(index) = self
                .pending
                .iter()
                .position(|e| e.id == id && e.state == CommandState::Pending)
            else {
                continue;
            };

            match admission::check(&self.contexts, self.pending[index].command.contexts()) {
                Admission::Ready => {
                    self.start(index);
                    finished += self.drain_signals();
                }
                Admission::Blocked { busy, disabled } => {
                    debug!(
                        "{} waits: busy {:?}, disabled {:?}",
                        self.pending[index].command.name(),
                        busy,
                        disabled
                    );
                }
                Admission::Missing(missing) => {
                    debug!(
                        "{} cannot start: unregistered {:?}",
                        self.pending[index].command.name(),
                        missing
                    );
                }
            }
        }
        finished
    }

    /// Move a pending command to active, take its contexts and execute it.
    fn start(&mut self, index: usize) {
        let mut entry = self.pending.remove(index);
        entry.state = CommandState::Active;

        for name in entry.command.contexts() {
            if let Some(index) = self.contexts.iter().position(|c| c.name() == name.as_str()) {
                self.contexts[index].acquire(entry.id);
                entry.held.push((name.clone(), self.generations[index]));
            }
        }

        info!("Execute: {}", entry.command.name());
        self.stats.admitted += 1;
        self.record(entry.id, entry.command.name(), LifecycleKind::Started);

        let handle = CommandHandle::new(entry.id, self.signal_tx.clone());
        self.active.push(entry);
        if let Some(entry) = self.active.last_mut() {
            entry.command.execute(handle);
        }
    }

    /// Release a finished command. Returns whether anything changed.
    fn finish(&mut self, signal: Signal) -> bool {
        let Some(index) = self.active.iter().position(|e| e.id == signal.command) else {
            if self.pending.iter().any(|e| e.id == signal.command) {
                warn!("Command {} signaled completion before it started; ignored", signal.command);
            } else {
                debug!("Ignoring signal for finished or unknown command {}", signal.command);
            }
            return false;
        };

        let mut entry = self.active.remove(index);
        entry.state = signal.outcome.into();

        for (name, generation) in &entry.held {
            let index = self
                .contexts
                .iter()
                .zip(&self.generations)
                .position(|(c, g)| c.name() == name.as_str() && g == generation);
            match index {
                Some(index) => {
                    if let Err(e) = self.contexts[index].release(entry.id) {
                        error!("Hold count underflow: {}", e);
                    }
                }
                None => debug!("Context {} was removed while held by {}", name, entry.command.name()),
            }
        }

        match signal.outcome {
            Outcome::Completed => {
                info!("Complete: {}", entry.command.name());
                self.stats.completed += 1;
            }
            Outcome::Aborted => {
                info!("Abort: {}", entry.command.name());
                self.stats.aborted += 1;
            }
        }
        self.record(entry.id, entry.command.name(), LifecycleKind::Finished(signal.outcome));
        true
    }

    /// Apply queued signals; each finished command triggers its own pass.
    fn settle(&mut self) -> usize {
        let mut finished = 0;
        while let Ok(signal) = self.signal_rx.try_recv() {
            if self.finish(signal) {
                finished += 1;
                self.trigger();
            }
        }
        finished
    }

    /// Apply queued signals without running any pass.
    fn drain_signals(&mut self) -> usize {
        let mut finished = 0;
        while let Ok(signal) = self.signal_rx.try_recv() {
            if self.finish(signal) {
                finished += 1;
            }
        }
        finished
    }

    fn record(&mut self, id: CommandId, name: &str, kind: LifecycleKind) {
        if self.config.history_limit == 0 {
            return;
        }
        while self.events.len() >= self.config.history_limit {
            self.events.pop_front();
        }
        self.events.push_back(LifecycleEvent::new(id, name, kind));
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(UpdateMethod::default())
    }
}

fn names_in(entries: &[Entry], context: &str) -> Vec<String> {
    entries
        .iter()
        .filter(|e| e.command.is_in_context(context))
        .map(|e| e.command.name().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::FnCommand;
    use crate::context::BaseContext;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Handles of started commands, keyed by name, so tests can finish them.
    #[derive(Clone, Default)]
    struct Started(Rc<RefCell<Vec<(String, CommandHandle)>>>);

    impl Started {
        fn command(&self, name: &str, contexts: &[&str]) -> impl Command + 'static {
            let started = self.clone();
            let label = name.to_string();
            FnCommand::new(name, contexts.iter().copied(), move |handle: CommandHandle| {
                started.0.borrow_mut().push((label.clone(), handle));
            })
        }

        fn names(&self) -> Vec<String> {
            self.0.borrow().iter().map(|(n, _)| n.clone()).collect()
        }

        fn complete(&self, name: &str) {
            let started = self.0.borrow();
            let (_, handle) = started
                .iter()
                .find(|(n, _)| n == name)
                .expect("command was never started");
            handle.complete();
        }
    }

    fn instant(name: &str, contexts: &[&str]) -> impl Command + 'static {
        FnCommand::new(name, contexts.iter().copied(), |handle: CommandHandle| {
            handle.complete()
        })
    }

    fn busy(scheduler: &Scheduler, name: &str) -> bool {
        scheduler.context(name).map(|c| c.is_busy()).unwrap_or(false)
    }

    #[test]
    fn test_shared_context_runs_one_at_a_time() {
        let started = Started::default();
        let mut scheduler = Scheduler::new(UpdateMethod::EventDriven);
        scheduler.add_context(BaseContext::new("X")).unwrap();

        scheduler.add_to_queue(started.command("A", &["X"]));
        scheduler.add_to_queue(started.command("B", &["X"]));

        assert_eq!(started.names(), vec!["A"]);
        assert_eq!(scheduler.active_names(), vec!["A"]);
        assert_eq!(scheduler.pending_names(), vec!["B"]);
        assert!(busy(&scheduler, "X"));

        started.complete("A");
        assert_eq!(scheduler.process_signals(), 1);

        assert_eq!(started.names(), vec!["A", "B"]);
        assert_eq!(scheduler.active_names(), vec!["B"]);
        assert!(busy(&scheduler, "X"));

        started.complete("B");
        scheduler.process_signals();
        assert!(scheduler.is_idle());
        assert!(!busy(&scheduler, "X"));
    }

    #[test]
    fn test_disjoint_contexts_run_together() {
        let started = Started::default();
        let mut scheduler = Scheduler::new(UpdateMethod::Manual);
        scheduler.add_context(BaseContext::new("X")).unwrap();
        scheduler.add_context(BaseContext::new("Y")).unwrap();
        scheduler.add_to_queue(started.command("A", &["X"]));
        scheduler.add_to_queue(started.command("B", &["Y"]));
        assert!(started.names().is_empty());

        scheduler.update_queue();

        assert_eq!(started.names(), vec!["A", "B"]);
        assert_eq!(scheduler.stats().passes, 1);
        assert!(busy(&scheduler, "X"));
        assert!(busy(&scheduler, "Y"));
    }

    #[test]
    fn test_fifo_with_skip() {
        let started = Started::default();
        let mut scheduler = Scheduler::new(UpdateMethod::Manual);
        for name in ["X", "Y"] {
            scheduler.add_context(BaseContext::new(name)).unwrap();
        }
        scheduler.add_to_queue(started.command("A", &["X", "Y"]));
        scheduler.add_to_queue(started.command("B", &["X"]));
        scheduler.add_to_queue(started.command("C", &["Y"]));
        scheduler.set_context_enabled("Y", false).unwrap();

        scheduler.update_queue();

        // A blocked by disabled Y, B skips ahead, C still blocked
        assert_eq!(started.names(), vec!["B"]);
        assert_eq!(scheduler.pending_names(), vec!["A", "C"]);
    }

    #[test]
    fn test_earlier_admission_blocks_later_in_same_pass() {
        let started = Started::default();
        let mut scheduler = Scheduler::new(UpdateMethod::Manual);
        scheduler.add_context(BaseContext::new("X")).unwrap();
        scheduler.add_context(BaseContext::new("Y")).unwrap();
        scheduler.add_to_queue(started.command("A", &["X"]));
        scheduler.add_to_queue(started.command("B", &["Y", "X"]));
        scheduler.add_to_queue(started.command("C", &["Y"]));

        scheduler.update_queue();

        assert_eq!(started.names(), vec!["A", "C"]);
        assert_eq!(scheduler.pending_names(), vec!["B"]);
    }

    #[test]
    fn test_disabled_context_blocks_until_enabled() {
        let started = Started::default();
        let mut scheduler = Scheduler::new(UpdateMethod::EventDriven);
        scheduler.add_context(BaseContext::new("Z").disabled()).unwrap();
        let id = scheduler.add_to_queue(started.command("C", &["Z"]));

        scheduler.update_queue();
        assert!(started.names().is_empty());
        assert_eq!(scheduler.state(id), Some(CommandState::Pending));

        scheduler.set_context_enabled("Z", true).unwrap();
        // enabling alone is not a trigger
        assert!(started.names().is_empty());

        scheduler.update_queue();
        assert_eq!(started.names(), vec!["C"]);
        assert_eq!(scheduler.state(id), Some(CommandState::Active));
    }

    #[test]
    fn test_disabling_does_not_preempt() {
        let started = Started::default();
        let mut scheduler = Scheduler::default();
        scheduler.add_context(BaseContext::new("X")).unwrap();
        scheduler.add_to_queue(started.command("A", &["X"]));

        scheduler.set_context_enabled("X", false).unwrap();
        assert_eq!(scheduler.active_names(), vec!["A"]);

        started.complete("A");
        scheduler.process_signals();
        assert!(!busy(&scheduler, "X"));
    }

    #[test]
    fn test_unregistered_context_starves_and_is_reported() {
        let started = Started::default();
        let mut scheduler = Scheduler::default();
        scheduler.add_context(BaseContext::new("X")).unwrap();
        scheduler.add_to_queue(started.command("D", &["X", "W"]));

        for _ in 0..3 {
            scheduler.update_queue();
        }
        assert!(started.names().is_empty());
        assert_eq!(scheduler.pending_names(), vec!["D"]);

        let snapshot = scheduler.snapshot();
        assert_eq!(snapshot.unschedulable.len(), 1);
        assert_eq!(snapshot.unschedulable[0].name, "D");
        assert_eq!(snapshot.unschedulable[0].missing, vec!["W".to_string()]);
        assert!(scheduler.print_queue().contains("Unschedulable:\n    D (missing: W)"));

        // registering the context lets it through
        scheduler.add_context(BaseContext::new("W")).unwrap();
        assert_eq!(started.names(), vec!["D"]);
    }

    #[test]
    fn test_event_driven_triggers_one_pass_each() {
        let started = Started::default();
        let mut scheduler = Scheduler::new(UpdateMethod::EventDriven);

        scheduler.add_context(BaseContext::new("X")).unwrap();
        assert_eq!(scheduler.stats().passes, 1);

        scheduler.add_to_queue(started.command("A", &["X"]));
        assert_eq!(scheduler.stats().passes, 2);

        scheduler.add_context(BaseContext::new("Y")).unwrap();
        assert_eq!(scheduler.stats().passes, 3);

        scheduler.remove_context("Y").unwrap();
        assert_eq!(scheduler.stats().passes, 4);

        started.complete("A");
        scheduler.process_signals();
        assert_eq!(scheduler.stats().passes, 5);
    }

    #[test]
    fn test_manual_mode_triggers_nothing() {
        let started = Started::default();
        let mut scheduler = Scheduler::new(UpdateMethod::Manual);

        scheduler.add_context(BaseContext::new("X")).unwrap();
        scheduler.add_to_queue(started.command("A", &["X"]));
        scheduler.add_to_queue(started.command("B", &["X"]));
        scheduler.add_context(BaseContext::new("Y")).unwrap();
        scheduler.remove_context("Y").unwrap();
        assert_eq!(scheduler.stats().passes, 0);
        assert!(started.names().is_empty());

        scheduler.update_queue();
        assert_eq!(started.names(), vec!["A"]);

        started.complete("A");
        scheduler.process_signals();
        assert_eq!(scheduler.stats().passes, 1);
        assert!(!busy(&scheduler, "X"));
        assert_eq!(started.names(), vec!["A"]);

        scheduler.update_queue();
        assert_eq!(started.names(), vec!["A", "B"]);
    }

    #[test]
    fn test_none_mode_only_runs_requested_passes() {
        let started = Started::default();
        let mut scheduler = Scheduler::new(UpdateMethod::None);
        scheduler.add_context(BaseContext::new("X")).unwrap();
        scheduler.add_to_queue(started.command("A", &["X"]));
        assert!(started.names().is_empty());

        scheduler.update_queue();
        assert_eq!(started.names(), vec!["A"]);
    }

    #[test]
    fn test_switching_mode() {
        let started = Started::default();
        let mut scheduler = Scheduler::new(UpdateMethod::Manual);
        scheduler.add_context(BaseContext::new("X")).unwrap();
        scheduler.add_to_queue(started.command("A", &["X"]));
        scheduler.add_to_queue(started.command("B", &["X"]));
        scheduler.update_queue();

        scheduler.set_update_method(UpdateMethod::Manual);
        scheduler.set_update_method(UpdateMethod::EventDriven);
        assert_eq!(scheduler.update_method(), UpdateMethod::EventDriven);
        // no pass on switch; A still active, B still pending
        assert_eq!(scheduler.stats().passes, 1);
        assert_eq!(started.names(), vec!["A"]);

        started.complete("A");
        scheduler.process_signals();
        assert_eq!(started.names(), vec!["A", "B"]);

        scheduler.set_update_method(UpdateMethod::Manual);
        started.complete("B");
        scheduler.process_signals();
        assert_eq!(scheduler.stats().passes, 2);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_duplicate_context_rejected() {
        let mut scheduler = Scheduler::default();
        scheduler.add_context(BaseContext::new("X")).unwrap();

        let err = scheduler.add_context(BaseContext::new("X").disabled()).unwrap_err();
        assert_eq!(err, SchedulerError::DuplicateContext("X".to_string()));
        assert_eq!(scheduler.context_names(), vec!["X"]);
        assert!(scheduler.context("X").unwrap().is_enabled());
    }

    #[test]
    fn test_remove_unknown_context_rejected() {
        let mut scheduler = Scheduler::default();
        let err = scheduler.remove_context("nope").err().unwrap();
        assert_eq!(err, SchedulerError::UnknownContext("nope".to_string()));
        assert_eq!(
            scheduler.set_context_enabled("nope", true),
            Err(SchedulerError::UnknownContext("nope".to_string()))
        );
    }

    #[test]
    fn test_remove_context_while_held() {
        let started = Started::default();
        let mut scheduler = Scheduler::default();
        scheduler.add_context(BaseContext::new("X")).unwrap();
        scheduler.add_context(BaseContext::new("Y")).unwrap();
        scheduler.add_to_queue(started.command("A", &["X", "Y"]));

        let removed = scheduler.remove_context("X").unwrap();
        assert!(removed.is_busy());
        assert_eq!(scheduler.active_names(), vec!["A"]);

        started.complete("A");
        assert_eq!(scheduler.process_signals(), 1);
        assert!(!busy(&scheduler, "Y"));
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_release_skips_reregistered_context() {
        let started = Started::default();
        let mut scheduler = Scheduler::default();
        scheduler.add_context(BaseContext::new("X")).unwrap();
        scheduler.add_to_queue(started.command("A", &["X"]));

        scheduler.remove_context("X").unwrap();
        scheduler.add_context(BaseContext::new("X")).unwrap();
        scheduler.add_to_queue(started.command("B", &["X"]));
        scheduler.add_to_queue(started.command("C", &["X"]));
        assert_eq!(scheduler.active_names(), vec!["A", "B"]);

        // A held the old X; the new one still belongs to B
        started.complete("A");
        scheduler.process_signals();
        assert_eq!(scheduler.active_names(), vec!["B"]);
        assert_eq!(scheduler.pending_names(), vec!["C"]);
        assert!(busy(&scheduler, "X"));

        started.complete("B");
        scheduler.process_signals();
        assert_eq!(scheduler.active_names(), vec!["C"]);
    }

    #[test]
    fn test_instant_completion_inside_execute() {
        let mut scheduler = Scheduler::default();
        scheduler.add_context(BaseContext::new("X")).unwrap();

        scheduler.add_to_queue(instant("A", &["X"]));
        scheduler.add_to_queue(instant("B", &["X"]));

        assert!(scheduler.is_idle());
        assert!(!busy(&scheduler, "X"));
        assert_eq!(scheduler.stats().admitted, 2);
        assert_eq!(scheduler.stats().completed, 2);
    }

    #[test]
    fn test_command_without_contexts_runs_once() {
        let started = Started::default();
        let mut scheduler = Scheduler::default();
        scheduler.add_to_queue(started.command("free", &[]));
        scheduler.update_queue();
        scheduler.update_queue();
        assert_eq!(started.names(), vec!["free"]);
    }

    #[test]
    fn test_completion_inside_pass_frees_context_for_later_entries() {
        let started = Started::default();
        let mut scheduler = Scheduler::new(UpdateMethod::Manual);
        scheduler.add_context(BaseContext::new("X")).unwrap();
        scheduler.add_to_queue(instant("A", &["X"]));
        scheduler.add_to_queue(instant("B", &["X"]));
        scheduler.add_to_queue(started.command("C", &["X"]));
        scheduler.add_to_queue(started.command("D", &["X"]));

        scheduler.update_queue();

        assert_eq!(scheduler.stats().passes, 1);
        assert_eq!(scheduler.stats().completed, 2);
        assert_eq!(scheduler.active_names(), vec!["C"]);
        assert_eq!(scheduler.pending_names(), vec!["D"]);
        assert!(busy(&scheduler, "X"));
    }

    #[test]
    fn test_repeated_context_is_balanced() {
        let started = Started::default();
        let mut scheduler = Scheduler::default();
        scheduler.add_context(BaseContext::new("X")).unwrap();
        scheduler.add_to_queue(started.command("A", &["X", "X"]));
        scheduler.add_to_queue(started.command("B", &["X"]));
        assert_eq!(scheduler.active_names(), vec!["A"]);

        started.complete("A");
        scheduler.process_signals();
        assert_eq!(scheduler.active_names(), vec!["B"]);

        started.complete("B");
        scheduler.process_signals();
        assert!(scheduler.is_idle());
        assert!(!busy(&scheduler, "X"));
    }

    #[test]
    fn test_abort_active_and_pending() {
        let started = Started::default();
        let mut scheduler = Scheduler::default();
        scheduler.add_context(BaseContext::new("X")).unwrap();
        let a = scheduler.add_to_queue(started.command("A", &["X"]));
        let b = scheduler.add_to_queue(started.command("B", &["X"]));
        let c = scheduler.add_to_queue(started.command("C", &["X"]));

        scheduler.abort(b).unwrap();
        assert_eq!(scheduler.pending_names(), vec!["C"]);
        assert_eq!(scheduler.state(b), None);

        scheduler.abort(a).unwrap();
        assert_eq!(started.names(), vec!["A", "C"]);
        assert_eq!(scheduler.state(c), Some(CommandState::Active));
        assert_eq!(scheduler.stats().aborted, 2);

        // A late signal from the aborted command changes nothing
        started.complete("A");
        assert_eq!(scheduler.process_signals(), 0);
        assert!(busy(&scheduler, "X"));

        assert_eq!(scheduler.abort(a), Err(SchedulerError::UnknownCommand(a)));
    }

    #[test]
    fn test_double_complete_is_ignored() {
        let started = Started::default();
        let mut scheduler = Scheduler::default();
        scheduler.add_context(BaseContext::new("X")).unwrap();
        scheduler.add_to_queue(started.command("A", &["X"]));

        started.complete("A");
        started.complete("A");
        assert_eq!(scheduler.process_signals(), 1);
        assert_eq!(scheduler.stats().completed, 1);
        assert!(!busy(&scheduler, "X"));
    }

    #[test]
    fn test_print_queue_follows_registration_order() {
        let started = Started::default();
        let mut scheduler = Scheduler::default();
        scheduler.add_context(BaseContext::new("Context 2")).unwrap();
        scheduler.add_context(BaseContext::new("Context 1")).unwrap();
        scheduler.add_to_queue(started.command("A", &["Context 1", "Context 2"]));
        scheduler.add_to_queue(started.command("B", &["Context 1"]));
        scheduler.add_to_queue(started.command("C", &["Context 2"]));

        let expected = "Context 2:\n  Active:\n    A\n  Pending:\n    C\n\
                        Context 1:\n  Active:\n    A\n  Pending:\n    B\n";
        assert_eq!(scheduler.print_queue(), expected);
        assert_eq!(scheduler.print_queue(), expected);
    }

    #[test]
    fn test_lifecycle_events() {
        let started = Started::default();
        let mut scheduler = Scheduler::default();
        scheduler.add_context(BaseContext::new("X")).unwrap();
        let id = scheduler.add_to_queue(started.command("A", &["X"]));
        started.complete("A");
        scheduler.process_signals();

        let kinds: Vec<_> = scheduler
            .drain_events()
            .into_iter()
            .inspect(|e| assert_eq!(e.command, id))
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                LifecycleKind::Queued,
                LifecycleKind::Started,
                LifecycleKind::Finished(Outcome::Completed),
            ]
        );
        assert!(scheduler.drain_events().is_empty());
    }

    #[test]
    fn test_history_limit() {
        let mut scheduler =
            Scheduler::with_config(SchedulerConfig::default().with_history_limit(2));
        scheduler.add_to_queue(instant("A", &[]));
        let events = scheduler.drain_events();
        assert_eq!(events.len(), 2);
        assert!(events[1].is_finish());

        let mut scheduler =
            Scheduler::with_config(SchedulerConfig::default().with_history_limit(0));
        scheduler.add_to_queue(instant("A", &[]));
        assert!(scheduler.drain_events().is_empty());
    }

    #[tokio::test]
    async fn test_async_completion() {
        let mut scheduler = Scheduler::default();
        scheduler.add_context(BaseContext::new("X")).unwrap();
        for name in ["A", "B"] {
            scheduler.add_to_queue(FnCommand::new(name, ["X"], |handle: CommandHandle| {
                tokio::spawn(async move {
                    tokio::task::yield_now().await;
                    handle.complete();
                });
            }));
        }
        assert_eq!(scheduler.active_names(), vec!["A"]);

        while scheduler.has_active() {
            scheduler.next_signal().await;
        }

        assert!(scheduler.is_idle());
        assert_eq!(scheduler.stats().completed, 2);
    }
}
