//! End-to-end game scenarios.

use skirmish_core::prelude::*;
use skirmish_test_utils::determinism::{find_first_divergence, run_to_log};
use skirmish_test_utils::fixtures;

fn torus_distance(board: Board, a: Cell, b: Cell) -> i32 {
    let axis = |u: i32, v: i32| {
        let d = (u - v).abs();
        d.min(board.width() - d)
    };
    axis(a.0, b.0) + axis(a.1, b.1)
}

// =========================================================================
// Artillery
// =========================================================================

#[test]
fn test_lone_target_is_destroyed() {
    let mut engine = fixtures::lone_target(42);
    let result = engine.run().unwrap();

    assert_eq!(result.points, 1);
    assert_eq!(result.possible_points, 1);
    assert_eq!(result.end_reason, EndReason::AllTargetsDestroyed);
    assert!(engine
        .log()
        .destructions()
        .any(|(id, _)| id == fixtures::LONE_TARGET_ID));
    assert!(!engine.piece(fixtures::LONE_TARGET_ID).unwrap().active);
    assert_eq!(result.facilities[&1].earned_points, 1);
}

#[test]
fn test_lone_target_destroyed_once() {
    let mut engine = fixtures::lone_target(7);
    engine.run().unwrap();
    assert_eq!(engine.log().destructions().count(), 1);
}

#[test]
fn test_antithetic_shot_mirrors_each_shot() {
    let mut engine = fixtures::mixed_board(9);
    engine.run().unwrap();

    let board = engine.board();
    let artillery = ActorRef::new(ActorKind::Artillery, 1);
    let shots: Vec<&Event> = engine.log().by_actor(artillery).collect();
    assert!(!shots.is_empty());

    for pair in shots.chunks(2) {
        let [fired, mirrored] = pair else {
            panic!("shot without antithetic partner");
        };
        let EventKind::Fired { at: (x, y) } = fired.kind else {
            panic!("expected fired, got {:?}", fired.kind);
        };
        assert_eq!(
            mirrored.kind,
            EventKind::FiredAntithetic {
                at: board.wrap((-x, -y))
            }
        );
        assert_eq!(fired.time, mirrored.time);
    }
}

// =========================================================================
// Reconnaissance
// =========================================================================

#[test]
fn test_recon_cycles_through_strata() {
    let mut engine = fixtures::recon_sweep(3, 4);
    engine.run().unwrap();
    let board = engine.board();

    let scans: Vec<(i32, u32)> = engine
        .log()
        .iter()
        .filter_map(|e| match e.kind {
            EventKind::ScanStarted { row, stratum } => Some((row, stratum)),
            _ => None,
        })
        .take(4)
        .collect();
    assert_eq!(scans.len(), 4);

    let strata: Vec<u32> = scans.iter().map(|&(_, s)| s).collect();
    assert_eq!(strata, vec![0, 1, 2, 3]);

    for &(row, stratum) in &scans {
        assert!(board.band(4, stratum).contains(&row));
    }
    let bands: Vec<_> = (0..4).map(|s| board.band(4, s)).collect();
    for (i, a) in bands.iter().enumerate() {
        for b in &bands[i + 1..] {
            assert!(a.end() < b.start(), "bands {a:?} and {b:?} overlap");
        }
    }
}

#[test]
fn test_recon_attacks_stay_on_scanned_row() {
    let mut engine = fixtures::recon_sweep(8, 4);
    engine.run().unwrap();

    let mut row = None;
    for event in engine.log().iter() {
        match event.kind {
            EventKind::ScanStarted { row: r, .. } => row = Some(r),
            EventKind::Attacked { at: (_, y) } => assert_eq!(Some(y), row),
            _ => {}
        }
    }
}

// =========================================================================
// Pieces
// =========================================================================

#[test]
fn test_random_walker_takes_unit_steps() {
    let mut engine = fixtures::recon_sweep(1, 2);
    engine.run().unwrap();
    let board = engine.board();

    let walker = ActorRef::new(ActorKind::RandomWalkTarget, 1);
    let mut last = (0, 0);
    let mut moves = 0;
    for event in engine.log().by_actor(walker) {
        if let EventKind::Moved { to } = event.kind {
            assert_eq!(torus_distance(board, last, to), 1);
            assert_eq!(event.positions[&1], to);
            last = to;
            moves += 1;
        }
    }
    assert!(moves > 0);
}

#[test]
fn test_helicopters_spawn_with_fresh_ids_and_credit_helipad() {
    let mut engine = fixtures::helicopter_hunt(5, 0.5);
    let result = engine.run().unwrap();

    let spawned: Vec<PieceId> = engine
        .log()
        .iter()
        .filter_map(|e| match e.kind {
            EventKind::Spawned { piece, .. } => Some(piece),
            _ => None,
        })
        .collect();
    assert!(!spawned.is_empty());
    assert!(spawned.windows(2).all(|w| w[0] < w[1]));
    assert!(spawned.iter().all(|&id| id > 49));
    assert!(spawned
        .iter()
        .all(|&id| engine.piece(id).is_some_and(|p| p.owner() == Some(2))));

    assert_eq!(result.facilities[&2].earned_points, result.points);
}

#[test]
fn test_snapshots_stay_on_board() {
    let mut engine = fixtures::mixed_board(21);
    engine.run().unwrap();
    let board = engine.board();

    for event in engine.log().iter() {
        assert!(event.positions.values().all(|&cell| board.contains(cell)));
    }
}

// =========================================================================
// Engine invariants
// =========================================================================

#[test]
fn test_same_seed_identical_logs() {
    let a = run_to_log(fixtures::mixed_board(17)).unwrap();
    let b = run_to_log(fixtures::mixed_board(17)).unwrap();
    assert_eq!(find_first_divergence(&a, &b), None);
    assert_eq!(a.to_bytes().unwrap(), b.to_bytes().unwrap());
}

#[test]
fn test_standard_game_bounds() {
    for seed in 0..5 {
        let mut engine = fixtures::standard_game(seed, Allocation::new(20, 20, 10));
        let result = engine.run().unwrap();

        assert!(result.points <= result.possible_points);
        assert!(result.end_time <= 100.0);
        assert_eq!(result.credited_points(), result.points);

        let times: Vec<f64> = engine.log().iter().map(|e| e.time).collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }
}

#[test]
fn test_over_budget_game_never_starts() {
    let mut engine = fixtures::standard_game(0, Allocation::new(25, 25, 1));
    assert!(matches!(
        engine.run(),
        Err(SimError::BudgetExceeded {
            requested: 51,
            limit: 50
        })
    ));
    assert!(engine.log().is_empty());
}

// =========================================================================
// Property Tests
// =========================================================================

mod proptests {
    use super::*;
    use proptest::prelude::*;
    use skirmish_test_utils::determinism::strategies::arb_cell;

    proptest! {
        #[test]
        fn prop_attack_on_empty_cell_changes_nothing(cell in arb_cell(10)) {
            prop_assume!(cell != fixtures::LONE_TARGET_CELL);
            let mut engine = fixtures::lone_target(1);
            let attacker = ActorRef::new(ActorKind::Artillery, 1);

            prop_assert_eq!(engine.attack(attacker, cell), 0);
            prop_assert_eq!(engine.points(), 0);
            prop_assert!(engine.log().is_empty());
            prop_assert!(engine.piece(fixtures::LONE_TARGET_ID).unwrap().active);
            prop_assert_eq!(engine.facility(1).unwrap().earned_points, 0);
        }

        #[test]
        fn prop_attack_hits_target_from_any_wrapped_alias(dx in -3i32..=3, dy in -3i32..=3) {
            let mut engine = fixtures::lone_target(1);
            let width = engine.board().width();
            let (x, y) = fixtures::LONE_TARGET_CELL;
            let alias = (x + dx * width, y + dy * width);

            prop_assert_eq!(engine.attack(ActorRef::new(ActorKind::Artillery, 1), alias), 1);
            prop_assert_eq!(engine.points(), 1);
        }
    }
}
