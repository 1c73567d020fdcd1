//! Headless skirmish runner.
//!
//! Runs games without any viewer attached, streaming events as JSON lines
//! on stdout. Designed for external viewers, allocation studies and CI
//! determinism checks.
//!
//! # Usage
//!
//! ```bash
//! # Stream a single game
//! cargo run -p skirmish_headless -- run --scenario scenarios/difficulty_1.ron
//!
//! # Batch over 1000 seeds
//! cargo run -p skirmish_headless -- batch --count 1000 --output results/
//!
//! # Verify determinism
//! cargo run -p skirmish_headless -- verify --seed 12345 --runs 5
//!
//! # Inspect a recorded event log
//! cargo run -p skirmish_headless -- inspect --file game.bin
//! ```
//!
//! # Protocol
//!
//! Output (stdout): JSON records, one per line
//! Logs (stderr): Debug information

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use skirmish_core::config::Pacing;
use skirmish_core::events::EventLog;
use skirmish_core::setup::Allocation;
use skirmish_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    protocol::{JsonLinesSink, StreamRecord},
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "skirmish_headless")]
#[command(about = "Headless stochastic skirmish runner")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr (includes engine events)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Scenario selection shared by every game-running command.
#[derive(Args, Clone)]
struct ScenarioArgs {
    /// Scenario file to load (RON)
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Difficulty level when no scenario file is given
    #[arg(short, long, default_value = "1")]
    difficulty: u32,

    /// Artillery resources (overrides the scenario)
    #[arg(long)]
    artillery: Option<u32>,

    /// Helipad resources (overrides the scenario)
    #[arg(long)]
    helipad: Option<u32>,

    /// Reconnaissance plane resources (overrides the scenario)
    #[arg(long)]
    recon: Option<u32>,
}

impl ScenarioArgs {
    fn resolve(&self) -> Scenario {
        let mut scenario = match &self.scenario {
            Some(path) => match Scenario::load(path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Failed to load scenario: {}", e);
                    std::process::exit(1);
                }
            },
            None => Scenario::difficulty(self.difficulty),
        };

        let current = scenario.setup.allocation;
        scenario.setup.allocation = Allocation::new(
            self.artillery.unwrap_or(current.artillery),
            self.helipad.unwrap_or(current.helipad),
            self.recon.unwrap_or(current.recon),
        );

        if let Err(e) = scenario.validate() {
            eprintln!("FATAL: {}", e);
            std::process::exit(1);
        }
        scenario
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single game, streaming events on stdout
    Run {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Random seed (defaults to the scenario's seed, else 0)
        #[arg(long)]
        seed: Option<u64>,

        /// Pace the run in real time at this many simulated units per second
        #[arg(long)]
        real_time: Option<f64>,

        /// Drop debug events (moves and shots) from the stream
        #[arg(short, long)]
        quiet: bool,

        /// Save the binary event log to this file
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Run a batch of games over consecutive seeds
    Batch {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Number of games to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel games (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Verify determinism by running same seed multiple times
    Verify {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },

    /// Summarize a recorded event log
    Inspect {
        /// Event log file path
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for the event stream)
    let default_filter = if cli.verbose {
        "debug"
    } else {
        "info,skirmish_core=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Some(Commands::Run {
            scenario,
            seed,
            real_time,
            quiet,
            record,
        }) => {
            cmd_run(&scenario, seed, real_time, quiet, record);
        }
        Some(Commands::Batch {
            scenario,
            count,
            parallel,
            output,
            seed,
        }) => {
            cmd_batch(&scenario, count, parallel, output, seed);
        }
        Some(Commands::Verify {
            scenario,
            seed,
            runs,
        }) => {
            cmd_verify(&scenario, seed, runs);
        }
        Some(Commands::Inspect { file }) => {
            cmd_inspect(file);
        }
        None => {
            // Default: stream one standard game
            let defaults = ScenarioArgs {
                scenario: None,
                difficulty: 1,
                artillery: None,
                helipad: None,
                recon: None,
            };
            cmd_run(&defaults, None, None, false, None);
        }
    }
}

/// Run a single streamed game
fn cmd_run(
    args: &ScenarioArgs,
    seed: Option<u64>,
    real_time: Option<f64>,
    quiet: bool,
    record: Option<PathBuf>,
) {
    let scenario = args.resolve();
    let seed = seed.unwrap_or_else(|| scenario.seed_or(0));

    tracing::info!(
        scenario = %scenario.name,
        seed = seed,
        allocation = ?scenario.setup.allocation,
        "Starting game"
    );

    let mut config = match scenario.engine_config(seed, quiet) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("FATAL: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(speed) = real_time {
        config.pacing = Pacing::RealTime { speed };
    }

    let mut engine = match scenario.setup.build(config) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("FATAL: {}", e);
            std::process::exit(1);
        }
    };
    engine.set_sink(JsonLinesSink::new(std::io::stdout()));

    let result = match engine.run() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("FATAL: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(path) = record {
        if let Err(e) = engine.log().save(&path) {
            tracing::error!(error = %e, path = %path.display(), "Failed to save event log");
            eprintln!("FATAL: Failed to save event log: {}", e);
            std::process::exit(1);
        }
        tracing::info!(path = %path.display(), events = engine.log().len(), "Event log saved");
    }

    eprintln!(
        "Score: {}/{} ({:.1}%) at t={:.2} [{}]",
        result.points,
        result.possible_points,
        result.score_ratio() * 100.0,
        result.end_time,
        result.end_reason
    );
}

/// Run a batch of games
fn cmd_batch(args: &ScenarioArgs, count: u32, parallel: u32, output: PathBuf, seed: u64) {
    let scenario = args.resolve();

    let num_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);

    tracing::info!(
        scenario = %scenario.name,
        count = count,
        parallel = parallel,
        seed = seed,
        output = %output.display(),
        cpus_available = num_cpus,
        "Batch configuration"
    );

    // Ensure output directory exists
    if let Err(e) = std::fs::create_dir_all(&output) {
        tracing::error!(error = %e, path = %output.display(), "Failed to create output directory");
        eprintln!(
            "FATAL: Cannot create output directory '{}': {}",
            output.display(),
            e
        );
        std::process::exit(1);
    }

    let config = BatchConfig::new(scenario, count)
        .with_output(output.clone())
        .with_seed(seed)
        .with_parallelism(parallel);

    let results = run_batch(config);

    let results_path = output.join("batch_results.json");
    if let Err(e) = results.save(&results_path) {
        tracing::error!(error = %e, path = %results_path.display(), "Failed to save results");
        eprintln!("FATAL: Failed to save results: {}", e);
        std::process::exit(1);
    }

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Games played: {}", results.runs.len());
    if !results.errors.is_empty() {
        eprintln!("Games FAILED: {}", results.errors.len());
    }
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!(
        "Points: mean {:.2} ± {:.2} (sd {:.2}, min {}, max {})",
        summary.mean_points, summary.std_error, summary.std_dev, summary.min_points, summary.max_points
    );
    eprintln!(
        "Score ratio: {:.1}%, boards cleared: {}",
        summary.mean_score_ratio * 100.0,
        summary.cleared_runs
    );
    eprintln!("\nFacility yield:");
    for (id, facility) in &summary.facilities {
        eprintln!(
            "  {} {} ({} res): {:.2} pts, {:.3} pts/res",
            facility.kind, id, facility.resources, facility.mean_earned_points, facility.mean_efficiency
        );
    }

    if !results.errors.is_empty() {
        eprintln!("\nGAME FAILURES:");
        for error in results.errors.iter().take(10) {
            eprintln!(
                "  Game {} (seed {}): {}",
                error.run_index, error.seed, error.message
            );
        }
        if results.errors.len() > 10 {
            eprintln!("  ... and {} more failures", results.errors.len() - 10);
        }
    }

    eprintln!("\nResults saved to: {}", results_path.display());
}

/// Verify determinism
fn cmd_verify(args: &ScenarioArgs, seed: u64, runs: u32) {
    let scenario = args.resolve();
    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs)",
        scenario.name,
        seed,
        runs
    );

    match verify_determinism(&scenario, seed, runs) {
        Ok(true) => eprintln!("PASS: All {} runs produced identical event logs", runs),
        Ok(false) => {
            eprintln!("FAIL: Non-determinism detected!");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("FAIL: Error during verification: {}", e);
            std::process::exit(1);
        }
    }
}

/// Summarize a recorded event log
fn cmd_inspect(file: PathBuf) {
    tracing::info!("Inspecting event log: {}", file.display());

    let log = match EventLog::load(&file) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to load event log: {}", e);
            std::process::exit(1);
        }
    };

    eprintln!("Loaded event log:");
    eprintln!("  Seed: {}", log.seed);
    eprintln!("  Events: {}", log.len());
    eprintln!("  Destructions: {}", log.destructions().count());
    match log.fingerprint() {
        Ok(fingerprint) => eprintln!("  Fingerprint: {:016x}", fingerprint),
        Err(e) => eprintln!("  Fingerprint: unavailable ({})", e),
    }

    match log.game_over() {
        Some(result) => match StreamRecord::game_over(result).to_json_line() {
            Ok(line) => println!("{line}"),
            Err(e) => eprintln!("Failed to encode result: {}", e),
        },
        None => eprintln!("  (no game-over record)"),
    }
}
