//! Scenario loading and configuration.
//!
//! Scenarios are RON documents wrapping a [`GameSetup`] with an optional
//! fixed seed and optional real-time pacing.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use skirmish_core::config::{EngineConfig, Pacing};
use skirmish_core::engine::Engine;
use skirmish_core::error::SimError;
use skirmish_core::setup::{Allocation, GameSetup};

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Failed to encode RON.
    #[error("Failed to encode scenario: {0}")]
    EncodeError(#[from] ron::Error),
    /// Scenario parameters were rejected.
    #[error("Invalid scenario: {0}")]
    Invalid(#[from] SimError),
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Game parameters.
    #[serde(default)]
    pub setup: GameSetup,
    /// Fixed seed; runs without one use the caller's seed.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Real-time pacing speed in simulated units per second.
    #[serde(default)]
    pub real_time: Option<f64>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::difficulty(1)
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string and validate it.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Encode as pretty RON.
    pub fn to_ron_string(&self) -> Result<String, ScenarioError> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// The standard game at difficulty `d` with the default allocation.
    #[must_use]
    pub fn difficulty(d: u32) -> Self {
        Self {
            name: format!("difficulty_{d}"),
            description: format!(
                "Standard game on a {0}x{0} board",
                2 * u64::from(d) * skirmish_core::setup::SIZE_PER_DIFFICULTY as u64 + 1
            ),
            setup: GameSetup {
                difficulty: d,
                ..GameSetup::default()
            },
            seed: None,
            real_time: None,
        }
    }

    /// Replace the allocation.
    #[must_use]
    pub fn with_allocation(mut self, allocation: Allocation) -> Self {
        self.setup.allocation = allocation;
        self
    }

    /// Reject scenarios the engine would refuse.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        self.setup.check_budget()?;
        self.setup.validate()?;
        if let Some(speed) = self.real_time {
            if !(speed > 0.0 && speed.is_finite()) {
                return Err(ScenarioError::Invalid(SimError::InvalidParameter {
                    name: "real_time",
                    value: speed.to_string(),
                    reason: "must be > 0",
                }));
            }
        }
        Ok(())
    }

    /// Seed to use: the scenario's own, else `fallback`.
    #[must_use]
    pub fn seed_or(&self, fallback: u64) -> u64 {
        self.seed.unwrap_or(fallback)
    }

    /// Engine configuration for one run.
    ///
    /// Bulk runs drop debug events; real-time pacing only applies to
    /// single interactive runs.
    pub fn engine_config(&self, seed: u64, simulation_mode: bool) -> Result<EngineConfig, ScenarioError> {
        let pacing = match self.real_time {
            Some(speed) if !simulation_mode => Pacing::RealTime { speed },
            _ => Pacing::Simulated,
        };
        Ok(EngineConfig {
            simulation_mode,
            pacing,
            ..self.setup.engine_config(seed)?
        })
    }

    /// Build a configured engine for `seed`.
    pub fn build_engine(&self, seed: u64, simulation_mode: bool) -> Result<Engine, ScenarioError> {
        let config = self.engine_config(seed, simulation_mode)?;
        Ok(self.setup.build(config)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"(
        name: "sample",
        description: "two facilities",
        setup: (
            difficulty: 2,
            resource_limit: 50,
            allocation: (artillery: 30, helipad: 0, recon: 20),
            random_walkers: 4,
            random_walker_points: 5,
            static_targets: 10,
            static_target_points: 1,
            helicopter_alpha: 1.0,
            antithetic: true,
        ),
        seed: Some(9),
        real_time: None,
    )"#;

    #[test]
    fn test_parse_sample() {
        let scenario = Scenario::from_ron_str(SAMPLE).unwrap();
        assert_eq!(scenario.name, "sample");
        assert_eq!(scenario.setup.difficulty, 2);
        assert_eq!(scenario.setup.allocation, Allocation::new(30, 0, 20));
        assert!(scenario.setup.antithetic);
        assert_eq!(scenario.seed_or(1), 9);
    }

    #[test]
    fn test_partial_setup_uses_defaults() {
        let scenario = Scenario::from_ron_str(r#"(name: "minimal", setup: (difficulty: 3))"#).unwrap();
        assert_eq!(scenario.setup.difficulty, 3);
        assert_eq!(scenario.setup.random_walkers, 10);
        assert_eq!(scenario.seed, None);
    }

    #[test]
    fn test_over_budget_rejected() {
        let ron = r#"(name: "greedy", setup: (allocation: (artillery: 40, helipad: 20, recon: 0)))"#;
        assert!(matches!(
            Scenario::from_ron_str(ron),
            Err(ScenarioError::Invalid(SimError::BudgetExceeded { .. }))
        ));
    }

    #[test]
    fn test_bad_alpha_rejected() {
        let ron = r#"(name: "wild", setup: (helicopter_alpha: 3.0))"#;
        assert!(matches!(
            Scenario::from_ron_str(ron),
            Err(ScenarioError::Invalid(SimError::InvalidParameter { .. }))
        ));
    }

    #[test]
    fn test_oversized_difficulty_rejected() {
        let ron = r#"(name: "vast", setup: (difficulty: 200000000))"#;
        assert!(matches!(
            Scenario::from_ron_str(ron),
            Err(ScenarioError::Invalid(SimError::InvalidParameter { name: "difficulty", .. }))
        ));

        let scenario = Scenario::difficulty(u32::MAX);
        assert!(scenario.validate().is_err());
        assert!(scenario.build_engine(0, true).is_err());
    }

    #[test]
    fn test_point_overflow_rejected() {
        let ron = r#"(name: "rich", setup: (random_walkers: 0, static_targets: 2, static_target_points: 4294967295))"#;
        assert!(matches!(
            Scenario::from_ron_str(ron),
            Err(ScenarioError::Invalid(SimError::InvalidParameter { name: "possible_points", .. }))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Scenario::load("/nonexistent/scenario.ron"),
            Err(ScenarioError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_ron_string_reloads() {
        let scenario = Scenario::difficulty(4).with_allocation(Allocation::new(10, 10, 30));
        let text = scenario.to_ron_string().unwrap();
        assert_eq!(Scenario::from_ron_str(&text).unwrap(), scenario);
    }

    #[test]
    fn test_real_time_only_for_interactive_runs() {
        let scenario = Scenario {
            real_time: Some(10.0),
            ..Scenario::default()
        };
        assert_eq!(
            scenario.engine_config(1, false).unwrap().pacing,
            Pacing::RealTime { speed: 10.0 }
        );
        assert_eq!(scenario.engine_config(1, true).unwrap().pacing, Pacing::Simulated);
    }
}
