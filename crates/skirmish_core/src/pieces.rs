//! Board pieces: targets and helicopters.
//!
//! Static targets never run. Random walkers and helicopters are processes
//! driven by the scheduler through [`start`] and [`resume`].

use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::error::{Result, SimError};
use crate::events::{ActorKind, ActorRef, EventKind, Importance};
use crate::facilities::FacilityId;
use crate::grid::Cell;
use crate::scheduler::Resume;

/// Unique piece identifier.
pub type PieceId = u32;

/// Piece variants and their parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PieceKind {
    /// Stationary target.
    Target {
        /// Points awarded on destruction.
        points: u32,
    },
    /// Target taking one unit step every `speed` time units.
    RandomWalkTarget {
        /// Points awarded on destruction.
        points: u32,
        /// Time between steps.
        speed: f64,
    },
    /// Lévy-flight attacker owned by a helipad.
    Helicopter {
        /// Jump-length tail exponent.
        alpha: f64,
        /// Time between jumps.
        speed: f64,
        /// Helipad credited with this helicopter's kills.
        parent: FacilityId,
    },
}

/// A piece on the board.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    /// Unique id.
    pub id: PieceId,
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Cleared once destroyed; inactive pieces never act again.
    pub active: bool,
    /// Variant.
    pub kind: PieceKind,
}

impl Piece {
    /// Stationary target.
    #[must_use]
    pub const fn target(id: PieceId, (x, y): Cell, points: u32) -> Self {
        Self {
            id,
            x,
            y,
            active: true,
            kind: PieceKind::Target { points },
        }
    }

    /// Random-walking target.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidParameter`] unless `speed` is positive and finite.
    pub fn random_walk_target(id: PieceId, (x, y): Cell, points: u32, speed: f64) -> Result<Self> {
        if !(speed > 0.0 && speed.is_finite()) {
            return Err(SimError::invalid_parameter("speed", speed, "must be > 0"));
        }
        Ok(Self {
            id,
            x,
            y,
            active: true,
            kind: PieceKind::RandomWalkTarget { points, speed },
        })
    }

    /// Helicopter owned by helipad `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidParameter`] unless `alpha` is in `(0, 2]`
    /// and `speed` is positive and finite.
    pub fn helicopter(
        id: PieceId,
        (x, y): Cell,
        alpha: f64,
        speed: f64,
        parent: FacilityId,
    ) -> Result<Self> {
        validate_alpha(alpha)?;
        if !(speed > 0.0 && speed.is_finite()) {
            return Err(SimError::invalid_parameter("speed", speed, "must be > 0"));
        }
        Ok(Self {
            id,
            x,
            y,
            active: true,
            kind: PieceKind::Helicopter {
                alpha,
                speed,
                parent,
            },
        })
    }

    /// Current cell.
    #[must_use]
    pub const fn position(&self) -> Cell {
        (self.x, self.y)
    }

    /// Actor kind for event attribution.
    #[must_use]
    pub const fn actor_kind(&self) -> ActorKind {
        match self.kind {
            PieceKind::Target { .. } => ActorKind::Target,
            PieceKind::RandomWalkTarget { .. } => ActorKind::RandomWalkTarget,
            PieceKind::Helicopter { .. } => ActorKind::Helicopter,
        }
    }

    /// This piece as an event actor.
    #[must_use]
    pub const fn actor(&self) -> ActorRef {
        ActorRef::new(self.actor_kind(), self.id)
    }

    /// Whether attacks can destroy this piece.
    #[must_use]
    pub const fn is_target(&self) -> bool {
        !matches!(self.kind, PieceKind::Helicopter { .. })
    }

    /// Whether this piece is driven by a process.
    #[must_use]
    pub const fn is_runnable(&self) -> bool {
        !matches!(self.kind, PieceKind::Target { .. })
    }

    /// Points awarded for destroying this piece (0 for helicopters).
    #[must_use]
    pub const fn points(&self) -> u32 {
        match self.kind {
            PieceKind::Target { points } | PieceKind::RandomWalkTarget { points, .. } => points,
            PieceKind::Helicopter { .. } => 0,
        }
    }

    /// Facility credited with this piece's kills.
    #[must_use]
    pub const fn owner(&self) -> Option<FacilityId> {
        match self.kind {
            PieceKind::Helicopter { parent, .. } => Some(parent),
            _ => None,
        }
    }

    /// Time between moves for runnable pieces.
    #[must_use]
    pub const fn speed(&self) -> Option<f64> {
        match self.kind {
            PieceKind::RandomWalkTarget { speed, .. } | PieceKind::Helicopter { speed, .. } => {
                Some(speed)
            }
            PieceKind::Target { .. } => None,
        }
    }
}

/// Check a Lévy exponent lies in `(0, 2]`.
///
/// # Errors
///
/// Returns [`SimError::InvalidParameter`] otherwise.
pub fn validate_alpha(alpha: f64) -> Result<()> {
    if alpha > 0.0 && alpha <= 2.0 {
        Ok(())
    } else {
        Err(SimError::invalid_parameter("alpha", alpha, "must be in (0, 2]"))
    }
}

/// First resume step of a piece process.
pub(crate) fn start(piece: &Piece) -> Resume {
    match piece.speed() {
        Some(speed) if piece.active => Resume::Wait(speed),
        _ => Resume::Exit,
    }
}

/// Run one step of a piece process.
pub(crate) fn resume(engine: &mut Engine, id: PieceId) -> Resume {
    let Some(piece) = engine.piece(id).copied() else {
        return Resume::Exit;
    };
    if !piece.active {
        return Resume::Exit;
    }

    match piece.kind {
        PieceKind::Target { .. } => Resume::Exit,
        PieceKind::RandomWalkTarget { speed, .. } => {
            let (dx, dy) = engine.rng_mut().direction();
            let to = engine.move_piece(id, (piece.x + dx, piece.y + dy));
            engine.event(piece.actor(), EventKind::Moved { to }, Importance::Debug);
            Resume::Wait(speed)
        }
        PieceKind::Helicopter { alpha, speed, .. } => {
            let jump = engine.rng_mut().levy_jump(alpha);
            let (dx, dy) = engine.board().wrap(jump);
            let to = engine.move_piece(id, (piece.x + dx, piece.y + dy));
            engine.event(piece.actor(), EventKind::Moved { to }, Importance::Debug);
            engine.attack(piece.actor(), to);
            Resume::Wait(speed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_classification() {
        let t = Piece::target(1, (0, 0), 1);
        let rw = Piece::random_walk_target(2, (0, 0), 5, 1.0).unwrap();
        let h = Piece::helicopter(3, (0, 0), 0.5, 1.0, 2).unwrap();

        assert!(t.is_target() && !t.is_runnable());
        assert!(rw.is_target() && rw.is_runnable());
        assert!(!h.is_target() && h.is_runnable());
        assert_eq!(h.points(), 0);
        assert_eq!(h.owner(), Some(2));
        assert_eq!(rw.points(), 5);
    }

    #[test]
    fn test_helicopter_rejects_bad_alpha() {
        for alpha in [0.0, -1.0, 2.5, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                Piece::helicopter(1, (0, 0), alpha, 1.0, 1),
                Err(SimError::InvalidParameter { name: "alpha", .. })
            ));
        }
    }

    #[test]
    fn test_random_walker_rejects_bad_speed() {
        assert!(Piece::random_walk_target(1, (0, 0), 1, 0.0).is_err());
    }

    #[test]
    fn test_start_waits_for_speed() {
        let rw = Piece::random_walk_target(2, (0, 0), 5, 3.0).unwrap();
        assert_eq!(start(&rw), Resume::Wait(3.0));
        assert_eq!(start(&Piece::target(1, (0, 0), 1)), Resume::Exit);
    }
}
