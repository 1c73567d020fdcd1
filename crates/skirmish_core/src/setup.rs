//! Standard game construction from a difficulty level and an allocation.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::error::{Result, SimError};
use crate::facilities::{Facility, FacilityId};
use crate::grid::MAX_HALF_WIDTH;
use crate::pieces::{validate_alpha, Piece, PieceId};
use crate::score::RunResult;

/// Board half-width per difficulty level.
pub const SIZE_PER_DIFFICULTY: i32 = 20;

/// Id of the first generated piece.
pub const FIRST_PIECE_ID: PieceId = 100_000;

/// Artillery facility id.
pub const ARTILLERY_ID: FacilityId = 1;
/// Helipad facility id.
pub const HELIPAD_ID: FacilityId = 2;
/// Reconnaissance plane facility id.
pub const RECON_ID: FacilityId = 3;

/// Resources given to each facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Allocation {
    /// Artillery resources.
    pub artillery: u32,
    /// Helipad resources.
    pub helipad: u32,
    /// Reconnaissance plane resources.
    pub recon: u32,
}

impl Allocation {
    /// Create an allocation.
    #[must_use]
    pub const fn new(artillery: u32, helipad: u32, recon: u32) -> Self {
        Self {
            artillery,
            helipad,
            recon,
        }
    }

    /// Total resources requested.
    #[must_use]
    pub fn total(&self) -> u64 {
        u64::from(self.artillery) + u64::from(self.helipad) + u64::from(self.recon)
    }
}

/// Parameters of the standard game.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSetup {
    /// Difficulty level; board half-width is `20 * difficulty`.
    pub difficulty: u32,
    /// Resource limit.
    pub resource_limit: u32,
    /// Facility allocation.
    pub allocation: Allocation,
    /// Number of random-walking targets; walker `i` moves every `i + 1` units.
    pub random_walkers: u32,
    /// Points per random-walking target.
    pub random_walker_points: u32,
    /// Number of static targets.
    pub static_targets: u32,
    /// Points per static target.
    pub static_target_points: u32,
    /// Tail exponent of helipad helicopters.
    pub helicopter_alpha: f64,
    /// Antithetic artillery shots.
    pub antithetic: bool,
}

impl Default for GameSetup {
    fn default() -> Self {
        Self {
            difficulty: 1,
            resource_limit: 50,
            allocation: Allocation::new(20, 20, 10),
            random_walkers: 10,
            random_walker_points: 5,
            static_targets: 50,
            static_target_points: 1,
            helicopter_alpha: 0.5,
            antithetic: false,
        }
    }
}

impl GameSetup {
    /// Standard setup at `difficulty` with `allocation`.
    #[must_use]
    pub fn new(difficulty: u32, allocation: Allocation) -> Self {
        Self {
            difficulty,
            allocation,
            ..Self::default()
        }
    }

    /// Board half-width for this difficulty.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidParameter`] if the board would not fit in
    /// `i32` coordinates.
    pub fn half_width(&self) -> Result<i32> {
        i32::try_from(self.difficulty)
            .ok()
            .and_then(|d| d.checked_mul(SIZE_PER_DIFFICULTY))
            .filter(|&size| size <= MAX_HALF_WIDTH)
            .ok_or_else(|| {
                SimError::invalid_parameter("difficulty", self.difficulty, "board too large")
            })
    }

    /// Reconnaissance strata for this difficulty, `max(1, 11 - 2 * (5 - d))`.
    #[must_use]
    pub fn recon_strata(&self) -> u32 {
        let d = i64::from(self.difficulty);
        let strata = (11 - (5 - d) * 2).max(1);
        u32::try_from(strata).unwrap_or(u32::MAX)
    }

    /// Points available on a freshly built board.
    #[must_use]
    pub fn possible_points(&self) -> u64 {
        u64::from(self.random_walkers) * u64::from(self.random_walker_points)
            + u64::from(self.static_targets) * u64::from(self.static_target_points)
    }

    /// Engine configuration for a bulk run with `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidParameter`] if the difficulty is too large.
    pub fn engine_config(&self, seed: u64) -> Result<EngineConfig> {
        Ok(EngineConfig {
            half_width: self.half_width()?,
            resource_limit: self.resource_limit,
            seed,
            simulation_mode: true,
            ..EngineConfig::default()
        })
    }

    /// Reject setups that cannot be built.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidParameter`] for an oversized board, a
    /// point total that overflows `u32` or a Lévy exponent outside `(0, 2]`.
    pub fn validate(&self) -> Result<()> {
        self.half_width()?;
        let possible = self.possible_points();
        if possible > u64::from(u32::MAX) {
            return Err(SimError::invalid_parameter(
                "possible_points",
                possible,
                "must fit in u32",
            ));
        }
        validate_alpha(self.helicopter_alpha)
    }

    /// Build a configured engine.
    ///
    /// Piece positions are drawn from the engine's own random source, so
    /// the whole game is a function of `config.seed`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidParameter`] for invalid parameters.
    pub fn build(&self, config: EngineConfig) -> Result<Engine> {
        self.validate()?;
        let mut engine = Engine::new(config)?;

        let mut next_id = FIRST_PIECE_ID;
        let mut pieces = Vec::new();
        for i in 0..self.random_walkers {
            let at = engine.random_position();
            let speed = f64::from(i) + 1.0;
            pieces.push(Piece::random_walk_target(
                next_id,
                at,
                self.random_walker_points,
                speed,
            )?);
            next_id += 1;
        }
        for _ in 0..self.static_targets {
            let at = engine.random_position();
            pieces.push(Piece::target(next_id, at, self.static_target_points));
            next_id += 1;
        }

        let facilities = [
            Facility::artillery(ARTILLERY_ID, self.allocation.artillery)
                .with_antithetic(self.antithetic),
            Facility::helipad(HELIPAD_ID, self.allocation.helipad, self.helicopter_alpha)?,
            Facility::recon_plane(RECON_ID, self.allocation.recon, self.recon_strata())?,
        ];

        engine.setup(pieces, facilities)?;
        Ok(engine)
    }

    /// Check the allocation against the limit without running.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::BudgetExceeded`] if the allocation is over the limit.
    pub fn check_budget(&self) -> Result<()> {
        let total = self.allocation.total();
        if total > u64::from(self.resource_limit) {
            return Err(SimError::BudgetExceeded {
                requested: u32::try_from(total).unwrap_or(u32::MAX),
                limit: self.resource_limit,
            });
        }
        Ok(())
    }
}

/// Build and run one standard game in simulation mode.
///
/// # Errors
///
/// Propagates construction and run errors.
pub fn play(setup: &GameSetup, seed: u64) -> Result<RunResult> {
    let mut engine = setup.build(setup.engine_config(seed)?)?;
    engine.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_mapping() {
        let strata: Vec<u32> = (1..=5)
            .map(|d| GameSetup::new(d, Allocation::default()).recon_strata())
            .collect();
        assert_eq!(strata, vec![3, 5, 7, 9, 11]);
        assert_eq!(GameSetup::new(0, Allocation::default()).recon_strata(), 1);
        assert_eq!(GameSetup::new(3, Allocation::default()).half_width().unwrap(), 60);
    }

    #[test]
    fn test_build_standard_board() {
        let setup = GameSetup::default();
        let engine = setup.build(setup.engine_config(1).unwrap()).unwrap();

        assert_eq!(engine.pieces().count(), 60);
        assert_eq!(engine.facilities().count(), 3);
        assert_eq!(setup.possible_points(), 100);

        let walker = engine.piece(FIRST_PIECE_ID + 9).unwrap();
        assert_eq!(walker.speed(), Some(10.0));
        assert!(engine.pieces().all(|p| engine.board().contains(p.position())));
    }

    #[test]
    fn test_play_over_budget() {
        let setup = GameSetup::new(1, Allocation::new(30, 30, 0));
        assert!(setup.check_budget().is_err());
        assert!(matches!(
            play(&setup, 0),
            Err(SimError::BudgetExceeded { requested: 60, limit: 50 })
        ));
    }

    #[test]
    fn test_oversized_board_rejected() {
        let largest = (MAX_HALF_WIDTH / SIZE_PER_DIFFICULTY) as u32;
        assert!(GameSetup::new(largest, Allocation::default()).half_width().is_ok());

        for difficulty in [largest + 1, 200_000_000, u32::MAX] {
            let setup = GameSetup::new(difficulty, Allocation::default());
            assert!(matches!(
                setup.half_width(),
                Err(SimError::InvalidParameter { name: "difficulty", .. })
            ));
            assert!(setup.validate().is_err());
            assert!(matches!(
                play(&setup, 1),
                Err(SimError::InvalidParameter { name: "difficulty", .. })
            ));
        }
    }

    #[test]
    fn test_point_total_overflow_rejected() {
        let setup = GameSetup {
            random_walkers: 0,
            static_targets: 2,
            static_target_points: u32::MAX,
            ..GameSetup::default()
        };
        assert_eq!(setup.possible_points(), 2 * u64::from(u32::MAX));
        assert!(matches!(
            setup.validate(),
            Err(SimError::InvalidParameter { name: "possible_points", .. })
        ));
        assert!(matches!(
            play(&setup, 1),
            Err(SimError::InvalidParameter { name: "possible_points", .. })
        ));
    }

    #[test]
    fn test_play_within_bounds() {
        let setup = GameSetup::default();
        let result = play(&setup, 42).unwrap();
        assert_eq!(result.possible_points, 100);
        assert!(result.points <= result.possible_points);
        assert_eq!(result.credited_points(), result.points);
    }
}
