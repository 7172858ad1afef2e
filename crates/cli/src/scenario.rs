//! Demo scenario description, loadable from JSON.

use anyhow::Context as _;
use cmdctx_core::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Contexts and commands the demo host runs, cycle after cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scheduler configuration, including the starting update method
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Contexts registered before the first cycle
    pub contexts: Vec<ContextSpec>,

    /// Commands queued at the start of every cycle
    pub commands: Vec<CommandSpec>,

    /// Run time of commands that do not set their own
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,

    /// How many fill-and-switch cycles to run
    #[serde(default = "default_cycles")]
    pub cycles: usize,

    /// Host tick interval
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

/// A context to register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSpec {
    /// Context name
    pub name: String,

    /// Whether it starts enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// A timer command to queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Command name
    pub name: String,

    /// Required contexts
    pub contexts: Vec<String>,

    /// Run time override
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

fn default_duration_ms() -> u64 {
    1000
}

fn default_cycles() -> usize {
    2
}

fn default_tick_ms() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

impl Default for Scenario {
    fn default() -> Self {
        let command = |name: &str, contexts: &[&str]| CommandSpec {
            name: name.to_string(),
            contexts: contexts.iter().map(|c| c.to_string()).collect(),
            duration_ms: None,
        };

        Self {
            scheduler: SchedulerConfig::default(),
            contexts: ["Context 1", "Context 2", "Context 3"]
                .into_iter()
                .map(|name| ContextSpec {
                    name: name.to_string(),
                    enabled: true,
                })
                .collect(),
            commands: vec![
                command("A", &["Context 1", "Context 2", "Context 3"]),
                command("B", &["Context 1", "Context 2", "Context 3"]),
                command("C", &["Context 1", "Context 3"]),
                command("D", &["Context 1", "Context 3"]),
                command("E", &["Context 2"]),
                command("F", &["Context 2"]),
                command("G", &["Context 2", "Context 3"]),
                command("H", &["Context 2"]),
                command("I", &["Context 3"]),
                command("J", &["Context 3"]),
            ],
            duration_ms: default_duration_ms(),
            cycles: default_cycles(),
            tick_ms: default_tick_ms(),
        }
    }
}

impl Scenario {
    /// Read a scenario from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        let scenario = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid scenario {}", path.display()))?;
        Ok(scenario)
    }

    /// Names of all scenario contexts.
    pub fn context_names(&self) -> Vec<String> {
        self.contexts.iter().map(|c| c.name.clone()).collect()
    }
}
