//! # Skirmish Core
//!
//! Stochastic discrete-event combat simulation on a wraparound grid.
//!
//! Facilities spend a shared resource budget to destroy targets before a
//! fixed time horizon:
//! - Artillery shells random cells
//! - Helipads launch Lévy-flight helicopters
//! - Reconnaissance planes scan stratified rows
//!
//! Every run is a pure function of its seed and setup. Identical inputs
//! produce byte-identical event logs, which is what batch studies and
//! determinism checks rely on.
//!
//! ## Crate Structure
//!
//! - [`engine`] - Engine lifecycle, attacks and event emission
//! - [`scheduler`] - Event queue and process table
//! - [`pieces`] - Targets and helicopters
//! - [`facilities`] - Artillery, helipad and reconnaissance plane
//! - [`events`] - Event records and the event log
//! - [`setup`] - Standard game construction

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod facilities;
pub mod grid;
pub mod pieces;
pub mod random;
pub mod scheduler;
pub mod score;
pub mod setup;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{EngineConfig, Pacing};
    pub use crate::engine::Engine;
    pub use crate::error::{Result, SimError};
    pub use crate::events::{
        ActorKind, ActorRef, Event, EventKind, EventLog, EventSink, Importance,
    };
    pub use crate::facilities::{Facility, FacilityId, FacilityKind};
    pub use crate::grid::{Board, Cell};
    pub use crate::pieces::{Piece, PieceId, PieceKind};
    pub use crate::score::{EndReason, FacilityYield, RunResult};
    pub use crate::setup::{play, Allocation, GameSetup};
}
