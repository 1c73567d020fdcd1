//! Run metrics and batch statistics.
//!
//! Each run yields one [`RunMetrics`]; a batch reduces them to a
//! [`BatchSummary`] describing the score distribution of one allocation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use skirmish_core::facilities::FacilityId;
use skirmish_core::score::{EndReason, FacilityYield, RunResult};

/// Metrics for a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Position of the run in its batch.
    pub run_index: u32,
    /// Random seed used.
    pub seed: u64,
    /// Points scored.
    pub points: u32,
    /// Points available at start.
    pub possible_points: u32,
    /// Simulated end time.
    pub end_time: f64,
    /// Why the run ended.
    pub end_reason: EndReason,
    /// Per-facility yield.
    pub facilities: BTreeMap<FacilityId, FacilityYield>,
    /// Fingerprint of the run's event log.
    pub fingerprint: u64,
}

impl RunMetrics {
    /// Build metrics from a run result.
    #[must_use]
    pub fn from_result(run_index: u32, result: &RunResult, fingerprint: u64) -> Self {
        Self {
            run_index,
            seed: result.seed,
            points: result.points,
            possible_points: result.possible_points,
            end_time: result.end_time,
            end_reason: result.end_reason,
            facilities: result.facilities.clone(),
            fingerprint,
        }
    }

    /// Fraction of possible points scored.
    #[must_use]
    pub fn score_ratio(&self) -> f64 {
        if self.possible_points == 0 {
            0.0
        } else {
            f64::from(self.points) / f64::from(self.possible_points)
        }
    }
}

/// Mean yield of one facility across a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacilitySummary {
    /// Facility kind name.
    pub kind: String,
    /// Resources allocated.
    pub resources: u32,
    /// Mean points credited per run.
    pub mean_earned_points: f64,
    /// Mean points per resource.
    pub mean_efficiency: f64,
}

/// Aggregate statistics across a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Runs summarized.
    pub total_runs: u32,
    /// Mean points.
    pub mean_points: f64,
    /// Sample variance of points.
    pub variance: f64,
    /// Sample standard deviation of points.
    pub std_dev: f64,
    /// Standard error of the mean.
    pub std_error: f64,
    /// Lowest score.
    pub min_points: u32,
    /// Highest score.
    pub max_points: u32,
    /// Mean fraction of possible points.
    pub mean_score_ratio: f64,
    /// Mean simulated end time.
    pub mean_end_time: f64,
    /// Runs that cleared the board before the horizon.
    pub cleared_runs: u32,
    /// Per-facility means, keyed by facility id.
    pub facilities: BTreeMap<FacilityId, FacilitySummary>,
}

impl BatchSummary {
    /// Summarize a set of runs.
    #[must_use]
    pub fn from_runs(runs: &[RunMetrics]) -> Self {
        if runs.is_empty() {
            return Self::default();
        }

        let n = runs.len() as f64;
        let points: Vec<f64> = runs.iter().map(|r| f64::from(r.points)).collect();
        let mean_points = points.iter().sum::<f64>() / n;
        let variance = if runs.len() > 1 {
            points.iter().map(|p| (p - mean_points).powi(2)).sum::<f64>() / (n - 1.0)
        } else {
            0.0
        };
        let std_dev = variance.sqrt();

        let mut facilities: BTreeMap<FacilityId, FacilitySummary> = BTreeMap::new();
        for run in runs {
            for (&id, y) in &run.facilities {
                let entry = facilities.entry(id).or_insert_with(|| FacilitySummary {
                    kind: y.kind.name().to_string(),
                    resources: y.resources,
                    ..FacilitySummary::default()
                });
                entry.mean_earned_points += f64::from(y.earned_points) / n;
                entry.mean_efficiency += y.efficiency() / n;
            }
        }

        Self {
            total_runs: runs.len() as u32,
            mean_points,
            variance,
            std_dev,
            std_error: std_dev / n.sqrt(),
            min_points: runs.iter().map(|r| r.points).min().unwrap_or(0),
            max_points: runs.iter().map(|r| r.points).max().unwrap_or(0),
            mean_score_ratio: runs.iter().map(RunMetrics::score_ratio).sum::<f64>() / n,
            mean_end_time: runs.iter().map(|r| r.end_time).sum::<f64>() / n,
            cleared_runs: runs
                .iter()
                .filter(|r| r.end_reason == EndReason::AllTargetsDestroyed)
                .count() as u32,
            facilities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::events::ActorKind;

    fn run(index: u32, points: u32) -> RunMetrics {
        RunMetrics {
            run_index: index,
            seed: u64::from(index),
            points,
            possible_points: 100,
            end_time: 100.0,
            end_reason: EndReason::TimeLimit,
            facilities: BTreeMap::from([(
                1,
                FacilityYield {
                    kind: ActorKind::Artillery,
                    resources: 10,
                    earned_points: points,
                },
            )]),
            fingerprint: 0,
        }
    }

    #[test]
    fn test_empty_summary() {
        let summary = BatchSummary::from_runs(&[]);
        assert_eq!(summary.total_runs, 0);
        assert_eq!(summary.mean_points, 0.0);
    }

    #[test]
    fn test_summary_statistics() {
        let runs = vec![run(0, 10), run(1, 20), run(2, 30)];
        let summary = BatchSummary::from_runs(&runs);

        assert_eq!(summary.total_runs, 3);
        assert!((summary.mean_points - 20.0).abs() < 1e-9);
        assert!((summary.variance - 100.0).abs() < 1e-9);
        assert!((summary.std_error - 10.0 / 3f64.sqrt()).abs() < 1e-9);
        assert_eq!(summary.min_points, 10);
        assert_eq!(summary.max_points, 30);
        assert!((summary.mean_score_ratio - 0.2).abs() < 1e-9);
        assert_eq!(summary.cleared_runs, 0);

        let artillery = &summary.facilities[&1];
        assert_eq!(artillery.kind, "Artillery");
        assert!((artillery.mean_earned_points - 20.0).abs() < 1e-9);
        assert!((artillery.mean_efficiency - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_run_has_zero_variance() {
        let summary = BatchSummary::from_runs(&[run(0, 42)]);
        assert_eq!(summary.variance, 0.0);
        assert_eq!(summary.std_error, 0.0);
    }
}
