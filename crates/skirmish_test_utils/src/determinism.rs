//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a run produces identical event
//! logs given identical inputs.
//!
//! # Testing Strategy
//!
//! A run must be a pure function of its seed and setup. Sources of
//! non-determinism include:
//!
//! - **Map iteration order**: Rust's default hasher is randomized.
//!   Pieces and facilities live in `BTreeMap`s and are visited in id order.
//!
//! - **Scheduler ties**: Simultaneous wakeups are broken by scheduling
//!   order, never by heap layout.
//!
//! - **System randomness**: Every draw comes from the engine's seeded
//!   ChaCha8 stream.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual behaviors (walks, jumps, scans)
//! 2. **Property tests**: Random setups must still replay identically
//! 3. **Integration tests**: Full games are reproducible
//! 4. **Parallel tests**: Running N games on threads all match

use std::thread;

use skirmish_core::engine::Engine;
use skirmish_core::error::Result;
use skirmish_core::events::{Event, EventLog};

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Fingerprints from each run.
    pub fingerprints: Vec<u64>,
}

impl DeterminismResult {
    /// Get all unique fingerprints (should be 1 for a deterministic run).
    #[must_use]
    pub fn unique_fingerprints(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.fingerprints.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different fingerprints.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_fingerprints();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Unique fingerprints: {} (expected 1)\n\
                 All fingerprints: {:?}",
                self.fingerprints.len(),
                unique.len(),
                self.fingerprints
            );
        }
    }
}

/// Run a process multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `setup` - Function to create initial state
/// * `run` - Function to drive the state to completion
/// * `fingerprint` - Function to compute a result fingerprint
pub fn verify_determinism<S, Setup, Run, Fingerprint>(
    runs: usize,
    setup: Setup,
    run: Run,
    fingerprint: Fingerprint,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Run: Fn(&mut S),
    Fingerprint: Fn(&S) -> u64,
{
    let mut fingerprints = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();
        run(&mut state);
        fingerprints.push(fingerprint(&state));
    }

    let is_deterministic = fingerprints.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        fingerprints,
    }
}

/// Run a set-up engine to completion and return its event log.
///
/// # Errors
///
/// Propagates run errors.
pub fn run_to_log(mut engine: Engine) -> Result<EventLog> {
    engine.run()?;
    Ok(engine.take_log())
}

/// Run two engines from the same setup and compare their logs.
///
/// Returns `true` if both runs succeeded with byte-identical logs.
pub fn verify_engine_determinism<F>(setup_fn: F) -> bool
where
    F: Fn() -> Engine,
{
    let runs = || run_to_log(setup_fn()).and_then(|log| log.fingerprint());
    matches!((runs(), runs()), (Ok(a), Ok(b)) if a == b)
}

/// Result of parallel runs.
#[derive(Debug, Clone)]
pub struct ParallelRunResult {
    /// Log fingerprint from each run.
    pub fingerprints: Vec<u64>,
    /// Number of runs.
    pub num_runs: usize,
}

impl ParallelRunResult {
    /// Check if all runs produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.fingerprints.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all runs matched.
    ///
    /// # Panics
    ///
    /// Panics if runs produced different fingerprints.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.fingerprints.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel runs diverged!\n\
                 Runs: {}\n\
                 Unique fingerprints: {}\n\
                 All fingerprints: {:?}",
                self.num_runs,
                unique.len(),
                self.fingerprints
            );
        }
    }
}

/// Run N engines on scoped threads and collect their log fingerprints.
///
/// Catches non-determinism that only shows up under thread scheduling
/// variations. Runs that fail to complete or encode fingerprint as 0.
///
/// # Panics
///
/// Panics if a run thread panics.
pub fn run_parallel_scoped<F>(setup_fn: F, num_runs: usize) -> ParallelRunResult
where
    F: Fn() -> Engine + Sync,
{
    let fingerprints = thread::scope(|s| {
        let handles: Vec<_> = (0..num_runs)
            .map(|_| {
                s.spawn(|| {
                    run_to_log(setup_fn())
                        .and_then(|log| log.fingerprint())
                        .unwrap_or(0)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("run thread panicked"))
            .collect()
    });

    ParallelRunResult {
        fingerprints,
        num_runs,
    }
}

/// Compare two logs event-by-event, finding the first divergence.
///
/// # Returns
///
/// `None` if the logs are identical, `Some(index)` of the first event that
/// differs (or the length of the shorter log if one is a prefix).
#[must_use]
pub fn find_first_divergence(a: &EventLog, b: &EventLog) -> Option<usize> {
    let mismatch = a
        .iter()
        .zip(b.iter())
        .position(|(x, y)| !same_event(x, y));

    match mismatch {
        Some(index) => Some(index),
        None if a.len() != b.len() => Some(a.len().min(b.len())),
        None => None,
    }
}

fn same_event(a: &Event, b: &Event) -> bool {
    a.time.to_bits() == b.time.to_bits() && a == b
}

/// Verify that saving and loading a log preserves it exactly.
pub fn verify_log_roundtrip(log: &EventLog) -> bool {
    let Ok(bytes) = log.to_bytes() else {
        return false;
    };
    match (EventLog::from_bytes(&bytes), log.fingerprint()) {
        (Ok(restored), Ok(expected)) => restored.fingerprint().is_ok_and(|f| f == expected),
        _ => false,
    }
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing.
pub mod strategies {
    use proptest::prelude::*;
    use skirmish_core::grid::Cell;
    use skirmish_core::setup::{Allocation, GameSetup};

    /// Generate a run seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }

    /// Generate a difficulty level (1-3, kept small for test speed).
    pub fn arb_difficulty() -> impl Strategy<Value = u32> {
        1u32..=3u32
    }

    /// Generate an allocation whose total never exceeds `limit`.
    pub fn arb_allocation(limit: u32) -> impl Strategy<Value = Allocation> {
        (0..=limit)
            .prop_flat_map(move |artillery| (Just(artillery), 0..=limit - artillery))
            .prop_flat_map(move |(artillery, helipad)| {
                (Just(artillery), Just(helipad), 0..=limit - artillery - helipad)
            })
            .prop_map(|(artillery, helipad, recon)| Allocation::new(artillery, helipad, recon))
    }

    /// Generate a cell on a board of `half_width`.
    pub fn arb_cell(half_width: i32) -> impl Strategy<Value = Cell> {
        (-half_width..=half_width, -half_width..=half_width)
    }

    /// Generate a small standard setup within budget.
    pub fn arb_setup() -> impl Strategy<Value = GameSetup> {
        (arb_difficulty(), arb_allocation(50), 0.3f64..=2.0, any::<bool>()).prop_map(
            |(difficulty, allocation, helicopter_alpha, antithetic)| GameSetup {
                difficulty,
                allocation,
                helicopter_alpha,
                antithetic,
                ..GameSetup::default()
            },
        )
    }
}
