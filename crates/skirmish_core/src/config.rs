//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::grid::MAX_HALF_WIDTH;

/// Simulated time at which every run stops.
pub const DEFAULT_HORIZON: f64 = 100.0;

/// Default board half-width.
pub const DEFAULT_HALF_WIDTH: i32 = 20;

/// Default resource limit.
pub const DEFAULT_RESOURCE_LIMIT: u32 = 50;

/// How simulated time maps onto wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Pacing {
    /// Run as fast as possible.
    #[default]
    Simulated,
    /// Sleep so one simulated time unit takes `1 / speed` seconds.
    RealTime {
        /// Simulated time units per wall-clock second.
        speed: f64,
    },
}

/// Parameters of one engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Board half-width; coordinates span `[-half_width, half_width]`.
    pub half_width: i32,
    /// Maximum total facility resources.
    pub resource_limit: u32,
    /// Random seed.
    pub seed: u64,
    /// Simulated time at which the run stops.
    pub horizon: f64,
    /// Drop debug-importance events from the log and sink.
    pub simulation_mode: bool,
    /// Wall-clock pacing.
    pub pacing: Pacing,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            half_width: DEFAULT_HALF_WIDTH,
            resource_limit: DEFAULT_RESOURCE_LIMIT,
            seed: 0,
            horizon: DEFAULT_HORIZON,
            simulation_mode: false,
            pacing: Pacing::Simulated,
        }
    }
}

impl EngineConfig {
    /// Default configuration with the given seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Check the configuration for values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidParameter`] for a half-width outside
    /// `[0, MAX_HALF_WIDTH]`, a non-positive horizon or a non-positive
    /// real-time speed.
    pub fn validate(&self) -> Result<()> {
        if self.half_width < 0 {
            return Err(SimError::invalid_parameter(
                "half_width",
                self.half_width,
                "must be >= 0",
            ));
        }
        if self.half_width > MAX_HALF_WIDTH {
            return Err(SimError::invalid_parameter(
                "half_width",
                self.half_width,
                "board width must fit in i32",
            ));
        }
        if !(self.horizon > 0.0) {
            return Err(SimError::invalid_parameter(
                "horizon",
                self.horizon,
                "must be > 0",
            ));
        }
        if let Pacing::RealTime { speed } = self.pacing {
            if !(speed > 0.0 && speed.is_finite()) {
                return Err(SimError::invalid_parameter("speed", speed, "must be > 0"));
            }
        }
        Ok(())
    }
}
