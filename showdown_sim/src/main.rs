//! Showdown Simulator CLI
//!
//! Run whole fights in process and report who is left standing.

use clap::Parser;
use showdown_sim::scenarios::ScenarioId;
use showdown_sim::{ScenarioResult, ScenarioRunner};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Showdown Simulation CLI
#[derive(Parser, Debug)]
#[command(name = "showdown-sim")]
#[command(about = "Run in-process Showdown fights", long_about = None)]
struct Args {
    /// Master seed (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (duel, standoff, free_for_all, lossy_saloon, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to run
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Directory receiving one journal per run
    #[arg(long, default_value = "showdown-journals")]
    journal_dir: PathBuf,

    /// Real-time limit per run in seconds
    #[arg(long, default_value = "30")]
    max_wall_secs: u64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    let default = if args.verbose { "debug" } else if args.json { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    if !args.json {
        info!("Showdown Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        match args.scenario.parse() {
            Ok(id) => vec![id],
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!("Available scenarios: duel, standoff, free_for_all, lossy_saloon, all");
                std::process::exit(2);
            }
        }
    };

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = ScenarioRunner::new(seed, &args.journal_dir)
            .with_max_wall_time(Duration::from_secs(args.max_wall_secs));

        for scenario in &scenarios {
            let result = match runner.run(*scenario).await {
                Ok(result) => result,
                Err(e) => {
                    error!("✗ {} (seed={}) could not start: {}", scenario.name(), seed, e);
                    std::process::exit(1);
                }
            };

            if !args.json {
                let r = &result.report;
                if result.passed {
                    info!(
                        "✓ {} (seed={}) winner={} records={} bytes={} t={:.0}s",
                        scenario.name(),
                        seed,
                        r.winner.as_deref().unwrap_or("nobody"),
                        r.journal_records,
                        r.journal_bytes,
                        r.virtual_time_secs
                    );
                    for c in &r.combatants {
                        info!("    {:<8} {:<18} {:>3} hp  {}", c.name, c.endpoint, c.health, c.phase);
                    }
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if !result.passed {
                failed_count += 1;
            }
            all_results.push(result);
        }
    }

    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results,
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to encode summary: {}", e),
        }
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
