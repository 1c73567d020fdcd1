//! End-of-run scoring summary.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::events::ActorKind;
use crate::facilities::FacilityId;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndReason {
    /// The termination watcher found no active targets.
    AllTargetsDestroyed,
    /// The time horizon was reached first.
    TimeLimit,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllTargetsDestroyed => f.write_str("all targets destroyed"),
            Self::TimeLimit => f.write_str("time limit"),
        }
    }
}

/// Points one facility earned against what it spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityYield {
    /// Facility kind.
    pub kind: ActorKind,
    /// Resources allocated.
    pub resources: u32,
    /// Points credited to the facility (including its helicopters).
    pub earned_points: u32,
}

impl FacilityYield {
    /// Points per unit of resource.
    #[must_use]
    pub fn efficiency(&self) -> f64 {
        if self.resources == 0 {
            0.0
        } else {
            f64::from(self.earned_points) / f64::from(self.resources)
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Seed the run used.
    pub seed: u64,
    /// Points scored.
    pub points: u32,
    /// Points available at the start of the run.
    pub possible_points: u32,
    /// Simulated time the run ended at.
    pub end_time: f64,
    /// Why the run ended.
    pub end_reason: EndReason,
    /// Yield of each facility that took part.
    pub facilities: BTreeMap<FacilityId, FacilityYield>,
}

impl RunResult {
    /// Fraction of possible points scored, 0 when nothing was available.
    #[must_use]
    pub fn score_ratio(&self) -> f64 {
        if self.possible_points == 0 {
            0.0
        } else {
            f64::from(self.points) / f64::from(self.possible_points)
        }
    }

    /// Sum of points credited to facilities.
    #[must_use]
    pub fn credited_points(&self) -> u32 {
        self.facilities
            .values()
            .fold(0, |total: u32, f| total.saturating_add(f.earned_points))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_ratio_empty_board() {
        let result = RunResult {
            seed: 0,
            points: 0,
            possible_points: 0,
            end_time: 1.0,
            end_reason: EndReason::AllTargetsDestroyed,
            facilities: BTreeMap::new(),
        };
        assert_eq!(result.score_ratio(), 0.0);
    }

    #[test]
    fn test_efficiency() {
        let y = FacilityYield {
            kind: ActorKind::Artillery,
            resources: 20,
            earned_points: 5,
        };
        assert!((y.efficiency() - 0.25).abs() < f64::EPSILON);

        let idle = FacilityYield {
            resources: 0,
            ..y
        };
        assert_eq!(idle.efficiency(), 0.0);
    }
}
