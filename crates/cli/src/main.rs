//! cmdctx CLI - runs the context scheduler demo.

mod host;
mod scenario;
mod timer;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cmdctx_core::UpdateMethod;
use host::Render;
use scenario::Scenario;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cmdctx")]
#[command(about = "Run commands under mutually exclusive contexts", long_about = None)]
struct Cli {
    /// Log scheduler decisions at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the demo scenario
    Demo {
        /// Scenario file (JSON); the built-in scenario is used otherwise
        #[arg(long)]
        scenario: Option<PathBuf>,
        /// Starting update method (event_driven or manual)
        #[arg(long)]
        mode: Option<UpdateMethod>,
        /// Number of fill-and-switch cycles
        #[arg(long)]
        cycles: Option<usize>,
        /// Default command run time in milliseconds
        #[arg(long)]
        duration_ms: Option<u64>,
        /// Host tick interval in milliseconds
        #[arg(long)]
        tick_ms: Option<u64>,
        /// Print queue snapshots as JSON lines
        #[arg(long)]
        json: bool,
        /// Do not print the queue, only the final report
        #[arg(long, conflicts_with = "json")]
        quiet: bool,
    },
    /// Print the built-in scenario as JSON
    Scenario,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Demo {
            scenario,
            mode,
            cycles,
            duration_ms,
            tick_ms,
            json,
            quiet,
        } => {
            let mut scenario = match scenario {
                Some(path) => Scenario::load(&path)?,
                None => Scenario::default(),
            };
            if let Some(mode) = mode {
                scenario.scheduler.update_method = mode;
            }
            if let Some(cycles) = cycles {
                scenario.cycles = cycles;
            }
            if let Some(duration_ms) = duration_ms {
                scenario.duration_ms = duration_ms;
            }
            if let Some(tick_ms) = tick_ms {
                scenario.tick_ms = tick_ms;
            }

            let render = if quiet {
                Render::Quiet
            } else if json {
                Render::Json
            } else {
                Render::Text
            };

            let mut stdout = std::io::stdout();
            let report = host::run(&scenario, render, &mut stdout).await?;
            info!("Completed {} cycles", report.cycles);

            println!("Cycles: {}", report.cycles);
            println!("  Final update method: {}", report.final_method);
            println!("  Passes: {}", report.stats.passes);
            println!("  Admitted: {}", report.stats.admitted);
            println!("  Completed: {}", report.stats.completed);
            println!("  Aborted: {}", report.stats.aborted);
        }
        Commands::Scenario => {
            println!("{}", serde_json::to_string_pretty(&Scenario::default())?);
        }
    }

    Ok(())
}
