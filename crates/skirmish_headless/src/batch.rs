//! Batch runner for allocation studies.
//!
//! Runs one scenario across consecutive seeds in parallel using rayon and
//! summarizes the score distribution. Each run owns its own engine, so
//! runs share nothing but the read-only scenario.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::metrics::{BatchSummary, RunMetrics};
use crate::scenario::{Scenario, ScenarioError};

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario to run
    pub scenario: Scenario,
    /// Number of runs
    pub run_count: u32,
    /// Maximum parallel runs (0 = use rayon default)
    pub parallel_runs: u32,
    /// Output directory for results
    pub output_dir: PathBuf,
    /// Seed of the first run; run `i` uses `seed_start + i`
    pub seed_start: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: Scenario::default(),
            run_count: 100,
            parallel_runs: 0,
            output_dir: PathBuf::from("results"),
            seed_start: 0,
        }
    }
}

impl BatchConfig {
    /// Create config for a scenario
    pub fn new(scenario: Scenario, run_count: u32) -> Self {
        Self {
            scenario,
            run_count,
            ..Default::default()
        }
    }

    /// Set output directory
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set parallelism
    pub fn with_parallelism(mut self, threads: u32) -> Self {
        self.parallel_runs = threads;
        self
    }

    /// Seed of run `index`.
    #[must_use]
    pub fn seed_for(&self, index: u32) -> u64 {
        self.seed_start.wrapping_add(u64::from(index))
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual run metrics, in run order
    pub runs: Vec<RunMetrics>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Error during batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Run index
    pub run_index: u32,
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Progress tracking for batch runs
#[derive(Debug)]
pub struct BatchProgress {
    /// Total runs
    pub total: u32,
    /// Completed runs
    completed: AtomicU32,
    /// Start time
    pub start_time: Instant,
}

impl BatchProgress {
    /// Create new progress tracker
    pub fn new(total: u32) -> Self {
        Self {
            total,
            completed: AtomicU32::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a completed run, returning the new count
    pub fn record_completion(&self) -> u32 {
        self.completed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Get current completion count
    pub fn current(&self) -> u32 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Get completion percentage
    pub fn percentage(&self) -> f64 {
        self.current() as f64 / self.total.max(1) as f64 * 100.0
    }

    /// Get estimated time remaining
    pub fn eta(&self) -> Duration {
        let completed = self.current();
        if completed == 0 {
            return Duration::from_secs(0);
        }

        let elapsed = self.start_time.elapsed();
        let per_run = elapsed.as_secs_f64() / completed as f64;
        let remaining = self.total.saturating_sub(completed);
        Duration::from_secs_f64(per_run * remaining as f64)
    }

    /// Display progress to stderr
    pub fn display(&self) {
        let eta = self.eta();
        eprintln!(
            "Batch progress: {}/{} ({:.1}%), ETA {}m {}s",
            self.current(),
            self.total,
            self.percentage(),
            eta.as_secs() / 60,
            eta.as_secs() % 60
        );
    }
}

/// Run one scenario game in simulation mode.
pub fn run_single(scenario: &Scenario, run_index: u32, seed: u64) -> Result<RunMetrics, ScenarioError> {
    let mut engine = scenario.build_engine(seed, true)?;
    let result = engine.run()?;
    let fingerprint = engine.log().fingerprint()?;
    Ok(RunMetrics::from_result(run_index, &result, fingerprint))
}

/// Run a batch of games
pub fn run_batch(config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    let progress = BatchProgress::new(config.run_count);

    info!(
        "Starting batch run: {} runs of '{}'",
        config.run_count, config.scenario.name
    );

    let execute = || -> Vec<Result<RunMetrics, BatchError>> {
        (0..config.run_count)
            .into_par_iter()
            .map(|i| {
                let seed = config.seed_for(i);
                match run_single(&config.scenario, i, seed) {
                    Ok(metrics) => {
                        let completed = progress.record_completion();
                        if completed % 100 == 0 {
                            debug!("Progress: {}/{}", completed, config.run_count);
                        }
                        if completed % 1000 == 0 {
                            progress.display();
                        }
                        Ok(metrics)
                    }
                    Err(e) => {
                        warn!("Run {} failed: {}", i, e);
                        Err(BatchError {
                            run_index: i,
                            seed,
                            message: e.to_string(),
                        })
                    }
                }
            })
            .collect()
    };

    // Requested parallelism applies to this batch only
    let results = if config.parallel_runs > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_runs as usize)
            .build()
        {
            Ok(pool) => pool.install(execute),
            Err(e) => {
                warn!("Failed to build thread pool: {}, using global pool", e);
                execute()
            }
        }
    } else {
        execute()
    };

    let (runs, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let runs: Vec<RunMetrics> = runs.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_runs(&runs);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} runs in {:.1}s ({:.1} runs/sec)",
        runs.len(),
        duration_seconds,
        runs.len() as f64 / duration_seconds.max(1e-9)
    );

    BatchResults {
        config,
        runs,
        summary,
        duration_seconds,
        errors,
    }
}

/// Verify determinism by running the same seed multiple times.
///
/// Returns `Ok(true)` when every run produced the same event-log fingerprint.
pub fn verify_determinism(scenario: &Scenario, seed: u64, runs: u32) -> Result<bool, ScenarioError> {
    let fingerprints = (0..runs)
        .map(|i| run_single(scenario, i, seed).map(|m| (m.fingerprint, m.points)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(fingerprints.windows(2).all(|w| w[0] == w[1]))
}
