//! Resource-funded attack facilities.
//!
//! Each facility turns its resource allocation into a Poisson process of
//! actions:
//!
//! - **Artillery** shells a uniformly random cell at rate `resources`.
//! - **Helipad** launches a Lévy-flight helicopter at rate
//!   `resources * 0.025`.
//! - **Reconnaissance plane** scans one row per unit time, cycling through
//!   horizontal strata, attacking each cell of the row with probability
//!   `resources * 0.02`.
//!
//! A facility with zero resources never acts.

use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::error::{Result, SimError};
use crate::events::{ActorKind, ActorRef, EventKind, Importance};
use crate::pieces::{validate_alpha, Piece};
use crate::scheduler::Resume;

/// Unique facility identifier.
pub type FacilityId = u32;

/// Helicopter launches per unit time per unit of resource.
pub const HELIPAD_RATE_PER_RESOURCE: f64 = 0.025;

/// Per-cell attack probability per unit of resource.
pub const RECON_SAMPLE_RATE_PER_RESOURCE: f64 = 0.02;

/// Row scans per unit time.
pub const RECON_SCAN_RATE: f64 = 1.0;

/// Time between helicopter jumps.
pub const DEFAULT_HELICOPTER_SPEED: f64 = 1.0;

/// Facility variants and their derived parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FacilityKind {
    /// Random shelling.
    Artillery {
        /// Shots per unit time.
        rate: f64,
        /// Also fire at the point-mirrored cell after each shot.
        antithetic: bool,
    },
    /// Helicopter launcher.
    Helipad {
        /// Launches per unit time.
        rate: f64,
        /// Tail exponent of launched helicopters.
        alpha: f64,
        /// Jump interval of launched helicopters.
        helicopter_speed: f64,
    },
    /// Stratified row sampler.
    ReconPlane {
        /// Per-cell attack probability.
        sample_rate: f64,
        /// Number of horizontal strata.
        n_strata: u32,
        /// Stratum of the next scan.
        current_stratum: u32,
    },
}

/// A facility and its bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    /// Unique id.
    pub id: FacilityId,
    /// Resources allocated; counts against the engine's limit.
    pub resources: u32,
    /// Points credited to this facility so far.
    pub earned_points: u32,
    /// Variant.
    pub kind: FacilityKind,
}

impl Facility {
    /// Artillery firing at rate `resources`.
    #[must_use]
    pub fn artillery(id: FacilityId, resources: u32) -> Self {
        Self {
            id,
            resources,
            earned_points: 0,
            kind: FacilityKind::Artillery {
                rate: f64::from(resources),
                antithetic: false,
            },
        }
    }

    /// Enable or disable antithetic shots. No effect on other kinds.
    #[must_use]
    pub fn with_antithetic(mut self, enabled: bool) -> Self {
        if let FacilityKind::Artillery { antithetic, .. } = &mut self.kind {
            *antithetic = enabled;
        }
        self
    }

    /// Helipad launching helicopters with tail exponent `alpha`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidParameter`] unless `alpha` is in `(0, 2]`.
    pub fn helipad(id: FacilityId, resources: u32, alpha: f64) -> Result<Self> {
        validate_alpha(alpha)?;
        Ok(Self {
            id,
            resources,
            earned_points: 0,
            kind: FacilityKind::Helipad {
                rate: f64::from(resources) * HELIPAD_RATE_PER_RESOURCE,
                alpha,
                helicopter_speed: DEFAULT_HELICOPTER_SPEED,
            },
        })
    }

    /// Set the jump interval of launched helicopters. No effect on other kinds.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidParameter`] unless `speed` is positive and finite.
    pub fn with_helicopter_speed(mut self, speed: f64) -> Result<Self> {
        if !(speed > 0.0 && speed.is_finite()) {
            return Err(SimError::invalid_parameter(
                "helicopter_speed",
                speed,
                "must be > 0",
            ));
        }
        if let FacilityKind::Helipad {
            helicopter_speed, ..
        } = &mut self.kind
        {
            *helicopter_speed = speed;
        }
        Ok(self)
    }

    /// Reconnaissance plane cycling through `n_strata` bands.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidParameter`] if `n_strata` is zero.
    pub fn recon_plane(id: FacilityId, resources: u32, n_strata: u32) -> Result<Self> {
        if n_strata == 0 {
            return Err(SimError::invalid_parameter("n_strata", n_strata, "must be >= 1"));
        }
        Ok(Self {
            id,
            resources,
            earned_points: 0,
            kind: FacilityKind::ReconPlane {
                sample_rate: f64::from(resources) * RECON_SAMPLE_RATE_PER_RESOURCE,
                n_strata,
                current_stratum: 0,
            },
        })
    }

    /// Whether this facility has anything to spend.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.resources > 0
    }

    /// Actions per unit time.
    #[must_use]
    pub fn rate(&self) -> f64 {
        match self.kind {
            FacilityKind::Artillery { rate, .. } | FacilityKind::Helipad { rate, .. } => rate,
            FacilityKind::ReconPlane { .. } => RECON_SCAN_RATE,
        }
    }

    /// Actor kind for event attribution.
    #[must_use]
    pub const fn actor_kind(&self) -> ActorKind {
        match self.kind {
            FacilityKind::Artillery { .. } => ActorKind::Artillery,
            FacilityKind::Helipad { .. } => ActorKind::Helipad,
            FacilityKind::ReconPlane { .. } => ActorKind::ReconPlane,
        }
    }

    /// This facility as an event actor.
    #[must_use]
    pub const fn actor(&self) -> ActorRef {
        ActorRef::new(self.actor_kind(), self.id)
    }

    /// Advance the recon stratum and return the one to scan now.
    fn next_stratum(&mut self) -> Option<(u32, u32)> {
        match &mut self.kind {
            FacilityKind::ReconPlane {
                n_strata,
                current_stratum,
                ..
            } => {
                let stratum = *current_stratum;
                *current_stratum = (stratum + 1) % *n_strata;
                Some((stratum, *n_strata))
            }
            _ => None,
        }
    }
}

/// First resume step of a facility process.
pub(crate) fn start(engine: &mut Engine, facility: &Facility) -> Resume {
    if !facility.is_active() {
        return Resume::Exit;
    }
    Resume::Wait(engine.rng_mut().exponential(facility.rate()))
}

/// Run one action of a facility process.
///
/// # Errors
///
/// Propagates registration failures of spawned helicopters.
pub(crate) fn resume(engine: &mut Engine, id: FacilityId) -> Result<Resume> {
    let Some(facility) = engine.facility(id).copied() else {
        return Ok(Resume::Exit);
    };
    if !facility.is_active() {
        return Ok(Resume::Exit);
    }
    let actor = facility.actor();

    match facility.kind {
        FacilityKind::Artillery { antithetic, .. } => {
            let at = engine.random_position();
            engine.event(actor, EventKind::Fired { at }, Importance::Debug);
            engine.attack(actor, at);

            if antithetic {
                let at = engine.board().wrap((-at.0, -at.1));
                engine.event(actor, EventKind::FiredAntithetic { at }, Importance::Debug);
                engine.attack(actor, at);
            }
        }
        FacilityKind::Helipad {
            alpha,
            helicopter_speed,
            ..
        } => {
            let at = engine.random_position();
            let piece = engine.next_piece_id();
            let helicopter = Piece::helicopter(piece, at, alpha, helicopter_speed, id)?;
            engine.add_piece(helicopter)?;
            engine.event(actor, EventKind::Spawned { piece, at }, Importance::Info);
        }
        FacilityKind::ReconPlane { sample_rate, .. } => {
            let Some((stratum, n_strata)) = engine
                .facility_mut(id)
                .and_then(Facility::next_stratum)
            else {
                return Ok(Resume::Exit);
            };
            let band = engine.board().band(n_strata, stratum);
            let row = engine.rng_mut().uniform_int(*band.start(), *band.end());
            engine.event(actor, EventKind::ScanStarted { row, stratum }, Importance::Info);

            for x in engine.board().axis() {
                if engine.rng_mut().chance(sample_rate) {
                    let at = (x, row);
                    engine.event(actor, EventKind::Attacked { at }, Importance::Debug);
                    engine.attack(actor, at);
                }
            }
        }
    }

    Ok(Resume::Wait(engine.rng_mut().exponential(facility.rate())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_follow_resources() {
        assert_eq!(Facility::artillery(1, 20).rate(), 20.0);

        let helipad = Facility::helipad(2, 40, 0.5).unwrap();
        assert!((helipad.rate() - 1.0).abs() < 1e-12);

        let recon = Facility::recon_plane(3, 10, 4).unwrap();
        assert_eq!(recon.rate(), RECON_SCAN_RATE);
        match recon.kind {
            FacilityKind::ReconPlane { sample_rate, .. } => {
                assert!((sample_rate - 0.2).abs() < 1e-12);
            }
            _ => panic!("expected recon plane"),
        }
    }

    #[test]
    fn test_zero_resources_inactive() {
        assert!(!Facility::artillery(1, 0).is_active());
        assert!(Facility::artillery(1, 1).is_active());
    }

    #[test]
    fn test_strata_cycle() {
        let mut recon = Facility::recon_plane(3, 10, 3).unwrap();
        let seen: Vec<u32> = (0..5)
            .filter_map(|_| recon.next_stratum().map(|(s, _)| s))
            .collect();
        assert_eq!(seen, vec![0, 1, 2, 0, 1]);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(Facility::helipad(1, 10, 0.0).is_err());
        assert!(Facility::helipad(1, 10, 2.01).is_err());
        assert!(Facility::helipad(1, 10, 2.0).is_ok());
        assert!(Facility::recon_plane(1, 10, 0).is_err());
        assert!(Facility::helipad(1, 10, 1.0)
            .unwrap()
            .with_helicopter_speed(-1.0)
            .is_err());
    }

    #[test]
    fn test_antithetic_only_applies_to_artillery() {
        let art = Facility::artillery(1, 5).with_antithetic(true);
        assert!(matches!(
            art.kind,
            FacilityKind::Artillery {
                antithetic: true,
                ..
            }
        ));

        let pad = Facility::helipad(2, 5, 1.0).unwrap().with_antithetic(true);
        assert!(matches!(pad.kind, FacilityKind::Helipad { .. }));
    }
}
