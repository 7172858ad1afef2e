//! Demo host loop.
//!
//! Queues the scenario's commands followed by a mode-switch command that
//! needs every context. When the switch finishes, the scheduler flips
//! between event-driven and manual evaluation and the next cycle is queued.
//! In manual mode the host drives a pass on every tick.

use crate::scenario::Scenario;
use crate::timer::TimerCommand;
use anyhow::{bail, Result};
use cmdctx_core::{CommandId, UpdateMethod};
use cmdctx_execution::{BaseContext, CommandHandle, FnCommand, Scheduler, SchedulerStats};
use serde::Serialize;
use std::io::Write;
use std::time::Duration;
use tracing::{info, warn};

/// How queue state is written while the demo runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Render {
    /// Nothing
    Quiet,
    /// `print_queue` text whenever it changes
    Text,
    /// One JSON snapshot per line whenever it changes
    Json,
}

/// Summary of a finished demo run.
#[derive(Debug, Clone, Serialize)]
pub struct DemoReport {
    /// Mode-switch cycles completed
    pub cycles: usize,
    /// Update method the scheduler ended in
    pub final_method: UpdateMethod,
    /// Scheduler counters
    pub stats: SchedulerStats,
}

struct Switch {
    id: CommandId,
    target: UpdateMethod,
}

/// Run `scenario` until all its cycles have finished.
pub async fn run(scenario: &Scenario, render: Render, out: &mut dyn Write) -> Result<DemoReport> {
    if scenario.scheduler.update_method == UpdateMethod::None {
        bail!("The demo needs an event_driven or manual update method");
    }

    let mut scheduler = Scheduler::with_config(scenario.scheduler.clone());
    for spec in &scenario.contexts {
        let mut context = BaseContext::new(spec.name.clone());
        if !spec.enabled {
            context = context.disabled();
        }
        if let Err(e) = scheduler.add_context(context) {
            warn!("Skipping context: {}", e);
        }
    }

    let wanted = scenario.cycles.max(1);
    let mut cycles = 0;
    let mut switch = queue_cycle(&mut scheduler, scenario);
    let mut ticker = tokio::time::interval(Duration::from_millis(scenario.tick_ms.max(1)));
    let mut last_rendered = String::new();

    loop {
        ticker.tick().await;

        scheduler.process_signals();
        if scheduler.update_method() == UpdateMethod::Manual {
            scheduler.update_queue();
        }

        for event in scheduler.drain_events() {
            if event.command == switch.id && event.is_finish() {
                scheduler.set_update_method(switch.target);
                cycles += 1;
                info!("Cycle {} done", cycles);
                if cycles < wanted {
                    switch = queue_cycle(&mut scheduler, scenario);
                }
            }
        }

        render_queue(&scheduler, render, &mut last_rendered, out)?;

        if scheduler.is_idle() {
            break;
        }
        if !scheduler.has_active() {
            let admitted = scheduler.stats().admitted;
            scheduler.update_queue();
            if scheduler.stats().admitted == admitted {
                bail!("Queue stalled with nothing running:\n{}", scheduler.print_queue());
            }
        }
    }

    Ok(DemoReport {
        cycles,
        final_method: scheduler.update_method(),
        stats: scheduler.stats(),
    })
}

/// Queue every scenario command plus a switch to the other update method.
fn queue_cycle(scheduler: &mut Scheduler, scenario: &Scenario) -> Switch {
    for spec in &scenario.commands {
        let duration = Duration::from_millis(spec.duration_ms.unwrap_or(scenario.duration_ms));
        scheduler.add_to_queue(TimerCommand::new(
            spec.name.clone(),
            spec.contexts.clone(),
            duration,
        ));
    }

    let target = match scheduler.update_method() {
        UpdateMethod::EventDriven => UpdateMethod::Manual,
        _ => UpdateMethod::EventDriven,
    };
    let name = format!("Change to {}", target);
    let id = scheduler.add_to_queue(FnCommand::new(
        name,
        scenario.context_names(),
        |handle: CommandHandle| handle.complete(),
    ));

    Switch { id, target }
}

fn render_queue(
    scheduler: &Scheduler,
    render: Render,
    last: &mut String,
    out: &mut dyn Write,
) -> Result<()> {
    if render == Render::Quiet {
        return Ok(());
    }

    let text = scheduler.print_queue();
    if text == *last {
        return Ok(());
    }

    match render {
        Render::Text => {
            writeln!(out, "[{}]", scheduler.update_method())?;
            write!(out, "{}", text)?;
        }
        Render::Json => {
            serde_json::to_writer(&mut *out, &scheduler.snapshot())?;
            writeln!(out)?;
        }
        Render::Quiet => {}
    }
    *last = text;
    Ok(())
}
