//! Hand-placed boards for tests.
//!
//! Every fixture returns an engine that is set up but not yet run, with
//! debug events recorded so tests can inspect moves and shots.
//!
//! # Panics
//!
//! Fixture builders panic on invalid hard-coded parameters; they are only
//! meant for tests.

use skirmish_core::prelude::*;

/// Id of the single target in [`lone_target`].
pub const LONE_TARGET_ID: PieceId = 1;

/// Cell of the single target in [`lone_target`].
pub const LONE_TARGET_CELL: Cell = (3, -4);

/// Verbose engine configuration for a board of `half_width`.
#[must_use]
pub fn config(half_width: i32, seed: u64) -> EngineConfig {
    EngineConfig {
        half_width,
        seed,
        ..EngineConfig::default()
    }
}

/// Build and set up an engine, panicking on invalid fixtures.
#[must_use]
pub fn engine_with(
    config: EngineConfig,
    pieces: impl IntoIterator<Item = Piece>,
    facilities: impl IntoIterator<Item = Facility>,
) -> Engine {
    let mut engine = Engine::new(config).expect("fixture config is valid");
    engine
        .setup(pieces, facilities)
        .expect("fixture ids are unique");
    engine
}

/// One static target worth 1 point and a full-budget artillery on a
/// half-width 10 board.
#[must_use]
pub fn lone_target(seed: u64) -> Engine {
    engine_with(
        config(10, seed),
        [Piece::target(LONE_TARGET_ID, LONE_TARGET_CELL, 1)],
        [Facility::artillery(1, 50)],
    )
}

/// A cheap reconnaissance plane with `n_strata` strata on a half-width 20
/// board, plus a walker and corner targets to keep the game going.
#[must_use]
pub fn recon_sweep(seed: u64, n_strata: u32) -> Engine {
    let walker = Piece::random_walk_target(1, (0, 0), 5, 1.0).expect("valid walker");
    let corners = [(-20, -20), (-20, 20), (20, -20), (20, 20)]
        .into_iter()
        .zip(2..)
        .map(|(cell, id)| Piece::target(id, cell, 1));
    engine_with(
        config(20, seed),
        std::iter::once(walker).chain(corners),
        [Facility::recon_plane(3, 1, n_strata).expect("valid strata")],
    )
}

/// A helipad hunting a grid of static targets on a small board.
#[must_use]
pub fn helicopter_hunt(seed: u64, alpha: f64) -> Engine {
    let targets = (-3..=3)
        .flat_map(|x| (-3..=3).map(move |y| (x, y)))
        .zip(1..)
        .map(|(cell, id)| Piece::target(id, cell, 1));
    engine_with(
        config(6, seed),
        targets,
        [Facility::helipad(2, 50, alpha).expect("valid alpha")],
    )
}

/// All three facility kinds against walkers and static targets.
#[must_use]
pub fn mixed_board(seed: u64) -> Engine {
    let walkers = (0..4).map(|i| {
        Piece::random_walk_target(i + 1, (i as i32 * 2, -(i as i32)), 5, f64::from(i + 1))
            .expect("valid walker")
    });
    let statics = (0..8).map(|i| Piece::target(10 + i, (i as i32 - 4, i as i32 - 4), 1));
    engine_with(
        config(8, seed),
        walkers.chain(statics),
        [
            Facility::artillery(1, 10).with_antithetic(true),
            Facility::helipad(2, 30, 0.5).expect("valid alpha"),
            Facility::recon_plane(3, 10, 3).expect("valid strata"),
        ],
    )
}

/// The standard game with debug events recorded.
#[must_use]
pub fn standard_game(seed: u64, allocation: Allocation) -> Engine {
    let setup = GameSetup {
        allocation,
        ..GameSetup::default()
    };
    let config = EngineConfig {
        simulation_mode: false,
        ..setup.engine_config(seed).expect("standard difficulty is valid")
    };
    setup.build(config).expect("standard setup is valid")
}
