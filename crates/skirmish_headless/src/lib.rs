//! Headless runner for allocation studies and viewer integration.
//!
//! This crate drives the skirmish engine without any interactive front end:
//!
//! - **Scenarios**: RON files describing the board and the allocation
//! - **Event stream**: JSON lines on stdout for an external viewer
//! - **Batches**: many seeds in parallel, summarized for allocation studies
//! - **Verification**: same-seed runs must produce identical event logs
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdout**: Event records followed by one `game_over` record
//! - **stderr**: Logs (human-readable)
//!
//! See [`protocol`] module for the record format.
//!
//! # Example
//!
//! ```bash
//! # Stream one game
//! cargo run -p skirmish_headless -- run --scenario scenarios/difficulty_1.ron
//!
//! # Study an allocation over 1000 seeds
//! cargo run -p skirmish_headless -- batch --artillery 30 --helipad 10 --recon 10 --count 1000
//!
//! # Verify determinism
//! cargo run -p skirmish_headless -- verify --seed 7 --runs 5
//! ```

pub mod batch;
pub mod metrics;
pub mod protocol;
pub mod scenario;

pub use batch::{run_batch, BatchConfig, BatchResults};
pub use metrics::{BatchSummary, RunMetrics};
pub use protocol::{JsonLinesSink, StreamRecord};
pub use scenario::{Scenario, ScenarioError};
