//! Ethogram Simulator CLI
//!
//! Run builtin scenarios or JSON configurations through the compute and
//! display loops.

use clap::Parser;
use ethogram_sim::scenarios::ScenarioId;
use ethogram_sim::{ScenarioResult, ScenarioRunner, SimConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Ethogram behavior-network simulator
#[derive(Parser, Debug)]
#[command(name = "ethogram-sim")]
#[command(about = "Run behavior-network simulations", long_about = None)]
struct Args {
    /// JSON run configuration (overrides --scenario)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scenario to run (forage, flock, orbit, still, inhibition_demo, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Master seed for spawn scatter
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Ticks per pass
    #[arg(short, long)]
    ticks: Option<usize>,

    /// Passes to compute and display (0 = until ctrl-c)
    #[arg(short, long)]
    passes: Option<u64>,

    /// Display pacing per tick in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Pace the display on wall-clock time instead of virtual time
    #[arg(long)]
    wall_clock: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export displayed trajectories to a JSON file
    #[arg(long)]
    export: Option<PathBuf>,
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = FmtSubscriber::builder().with_max_level(level);
    let result = match EnvFilter::try_from_default_env() {
        Ok(filter) => tracing::subscriber::set_global_default(builder.with_env_filter(filter).finish()),
        Err(_) => tracing::subscriber::set_global_default(builder.finish()),
    };
    if let Err(e) = result {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

fn runner(args: &Args) -> ScenarioRunner {
    let mut runner = ScenarioRunner::new(args.seed).with_wall_clock(args.wall_clock);
    if let Some(ticks) = args.ticks {
        runner = runner.with_ticks(ticks);
    }
    if let Some(passes) = args.passes {
        runner = runner.with_passes(passes);
    }
    if let Some(ms) = args.interval_ms {
        runner = runner.with_interval(Duration::from_millis(ms));
    }
    if let Some(path) = &args.export {
        runner = runner.with_export(path);
    }
    runner
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if !args.json {
        info!("Ethogram Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let runner = runner(&args);
    let mut results: Vec<ScenarioResult> = Vec::new();

    if let Some(path) = &args.config {
        let config = match SimConfig::from_json_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Cannot load {}: {}", path.display(), e);
                std::process::exit(1);
            }
        };
        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("custom");
        results.push(runner.run_config(name, config).await);
    } else {
        let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
            ScenarioId::all()
        } else {
            match args.scenario.parse() {
                Ok(scenario) => vec![scenario],
                Err(e) => {
                    error!("{}", e);
                    error!("Available scenarios: forage, flock, orbit, still, inhibition_demo, all");
                    std::process::exit(1);
                }
            }
        };
        if args.export.is_some() && scenarios.len() > 1 {
            error!("--export only supports a single scenario, not 'all'");
            std::process::exit(1);
        }
        for scenario in scenarios {
            results.push(runner.run(scenario).await);
        }
    }

    let failed: Vec<&ScenarioResult> = results.iter().filter(|r| !r.passed).collect();

    if args.json {
        let summary = serde_json::json!({
            "total": results.len(),
            "passed": results.len() - failed.len(),
            "failed": failed.len(),
            "results": results,
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Cannot encode summary: {}", e),
        }
    } else {
        for result in &results {
            if result.passed {
                info!(
                    "✓ {} (seed={}) PASSED: {} passes, {} records",
                    result.scenario, result.seed, result.passes_displayed, result.ticks_rendered
                );
            } else {
                error!(
                    "✗ {} (seed={}) FAILED: {}",
                    result.scenario,
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        if failed.is_empty() {
            info!("All {} runs passed", results.len());
        } else {
            error!("{}/{} runs failed", failed.len(), results.len());
        }
    }

    if !failed.is_empty() {
        std::process::exit(1);
    }
}
