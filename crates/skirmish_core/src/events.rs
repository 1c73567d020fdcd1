//! Event records and the append-only event log.
//!
//! Every event carries the simulated time it was emitted at, the actor that
//! emitted it, what happened, and a snapshot of every piece position at that
//! instant. Consumers (viewers, audits) can rebuild the board from the log
//! alone without re-running the simulation.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::grid::Cell;
use crate::pieces::PieceId;
use crate::score::RunResult;

/// Event log file format version for compatibility.
pub const EVENT_LOG_VERSION: u32 = 1;

/// Kind of entity that emitted an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActorKind {
    /// Static target.
    Target,
    /// Random-walking target.
    RandomWalkTarget,
    /// Helicopter spawned by a helipad.
    Helicopter,
    /// Artillery facility.
    Artillery,
    /// Helipad facility.
    Helipad,
    /// Reconnaissance plane facility.
    ReconPlane,
    /// The engine itself.
    System,
}

impl ActorKind {
    /// Whether this actor kind is a facility.
    #[must_use]
    pub const fn is_facility(self) -> bool {
        matches!(self, Self::Artillery | Self::Helipad | Self::ReconPlane)
    }

    /// Display name used in event messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Target => "Target",
            Self::RandomWalkTarget => "RWTarget",
            Self::Helicopter => "Helicopter",
            Self::Artillery => "Artillery",
            Self::Helipad => "Helipad",
            Self::ReconPlane => "ReconPlane",
            Self::System => "System",
        }
    }
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity of an event emitter or attacker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorRef {
    /// Actor kind.
    pub kind: ActorKind,
    /// Piece or facility id (0 for the system).
    pub id: u32,
}

impl ActorRef {
    /// The engine as an actor.
    pub const SYSTEM: Self = Self {
        kind: ActorKind::System,
        id: 0,
    };

    /// Create an actor reference.
    #[must_use]
    pub const fn new(kind: ActorKind, id: u32) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// How prominently an event is surfaced.
///
/// Importance never changes simulation state. In simulation mode `Debug`
/// events are neither recorded nor forwarded to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Importance {
    /// Routine activity (moves, shots).
    Debug,
    /// Outcome-relevant activity (destructions, spawns, scans, game over).
    Info,
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// The run started.
    GameStarted {
        /// Points available on the board at start.
        possible_points: u32,
    },
    /// A piece moved.
    Moved {
        /// New cell.
        to: Cell,
    },
    /// Artillery fired a shot.
    Fired {
        /// Target cell.
        at: Cell,
    },
    /// Artillery fired the mirrored antithetic shot.
    FiredAntithetic {
        /// Target cell.
        at: Cell,
    },
    /// A reconnaissance plane attacked a sampled cell.
    Attacked {
        /// Target cell.
        at: Cell,
    },
    /// A reconnaissance plane began scanning a row.
    ScanStarted {
        /// Scanned row.
        row: i32,
        /// Stratum the row was drawn from.
        stratum: u32,
    },
    /// A helipad spawned a helicopter.
    Spawned {
        /// New piece id.
        piece: PieceId,
        /// Spawn cell.
        at: Cell,
    },
    /// A target was destroyed.
    Destroyed {
        /// Who destroyed it.
        by: ActorRef,
        /// Points awarded.
        points: u32,
    },
    /// The run ended.
    GameOver(Box<RunResult>),
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GameStarted { possible_points } => {
                write!(f, "game started, {possible_points} possible points")
            }
            Self::Moved { to: (x, y) } => write!(f, "moved to ({x}, {y})"),
            Self::Fired { at: (x, y) } => write!(f, "fired at ({x}, {y})"),
            Self::FiredAntithetic { at: (x, y) } => {
                write!(f, "fired (antithetic) at ({x}, {y})")
            }
            Self::Attacked { at: (x, y) } => write!(f, "attacked ({x}, {y})"),
            Self::ScanStarted { row, stratum } => {
                write!(f, "began scanning horizontal band y={row} (stratum {stratum})")
            }
            Self::Spawned { piece, at: (x, y) } => {
                write!(f, "spawned Helicopter {piece} at ({x}, {y})")
            }
            Self::Destroyed { by, points } => write!(f, "destroyed by {by} ({points} points)"),
            Self::GameOver(result) => write!(
                f,
                "game over ({}): {}/{} points",
                result.end_reason, result.points, result.possible_points
            ),
        }
    }
}

/// One immutable event record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Simulated time of emission.
    pub time: f64,
    /// Emitting actor.
    pub actor: ActorRef,
    /// What happened.
    pub kind: EventKind,
    /// Surfacing level.
    pub importance: Importance,
    /// Position of every registered piece at emission time.
    pub positions: BTreeMap<PieceId, Cell>,
}

impl Event {
    /// Human-readable message for this event.
    #[must_use]
    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    /// Whether this is the end-of-game record.
    #[must_use]
    pub fn is_game_over(&self) -> bool {
        matches!(self.kind, EventKind::GameOver(_))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.2}]: {} {}", self.time, self.actor, self.kind)
    }
}

/// External subscriber receiving events as they are emitted.
pub trait EventSink {
    /// Called once per recorded event, in emission order.
    fn on_event(&mut self, event: &Event);
}

impl<F: FnMut(&Event)> EventSink for F {
    fn on_event(&mut self, event: &Event) {
        self(event);
    }
}

/// Append-only, ordered record of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    /// Format version.
    pub version: u32,
    /// Seed of the run that produced the log.
    pub seed: u64,
    events: Vec<Event>,
}

impl EventLog {
    /// Create an empty log for a run with `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            version: EVENT_LOG_VERSION,
            seed,
            events: Vec::new(),
        }
    }

    /// Append an event.
    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    /// All events in emission order.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Iterate over events in emission order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Most recent event.
    #[must_use]
    pub fn last(&self) -> Option<&Event> {
        self.events.last()
    }

    /// Events emitted by one actor.
    pub fn by_actor(&self, actor: ActorRef) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |e| e.actor == actor)
    }

    /// Destruction events, as `(target, event)` pairs.
    pub fn destructions(&self) -> impl Iterator<Item = (PieceId, &Event)> {
        self.events.iter().filter_map(|e| match e.kind {
            EventKind::Destroyed { .. } => Some((e.actor.id, e)),
            _ => None,
        })
    }

    /// The end-of-game result, if the run completed.
    #[must_use]
    pub fn game_over(&self) -> Option<&RunResult> {
        self.events.iter().rev().find_map(|e| match &e.kind {
            EventKind::GameOver(result) => Some(result.as_ref()),
            _ => None,
        })
    }

    /// Encode the log as bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| SimError::InvalidState(format!("Failed to serialize event log: {e}")))
    }

    /// Decode a log from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails or the format version differs.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let log: Self = bincode::deserialize(bytes).map_err(|e| {
            SimError::InvalidState(format!("Failed to deserialize event log: {e}"))
        })?;

        if log.version != EVENT_LOG_VERSION {
            return Err(SimError::InvalidState(format!(
                "Event log version mismatch: expected {}, got {}",
                EVENT_LOG_VERSION, log.version
            )));
        }

        Ok(log)
    }

    /// 64-bit hash of the encoded log.
    ///
    /// Two runs with byte-identical event sequences share a fingerprint.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be encoded.
    pub fn fingerprint(&self) -> Result<u64> {
        let bytes = self.to_bytes()?;
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        Ok(hasher.finish())
    }

    /// Save the log to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| SimError::InvalidState(format!("Failed to write event log: {e}")))
    }

    /// Load a log from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if file reading or decoding fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| SimError::InvalidState(format!("Failed to read event log: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moved(time: f64, id: u32, to: Cell) -> Event {
        Event {
            time,
            actor: ActorRef::new(ActorKind::RandomWalkTarget, id),
            kind: EventKind::Moved { to },
            importance: Importance::Debug,
            positions: BTreeMap::from([(id, to)]),
        }
    }

    #[test]
    fn test_messages_encode_coordinates() {
        assert_eq!(EventKind::Moved { to: (3, -4) }.to_string(), "moved to (3, -4)");
        assert_eq!(EventKind::Fired { at: (0, 9) }.to_string(), "fired at (0, 9)");
        assert_eq!(
            EventKind::Spawned { piece: 12, at: (1, 2) }.to_string(),
            "spawned Helicopter 12 at (1, 2)"
        );
    }

    #[test]
    fn test_event_display() {
        let event = moved(1.5, 3, (2, 2));
        assert_eq!(event.to_string(), "[1.50]: RWTarget 3 moved to (2, 2)");
    }

    #[test]
    fn test_by_actor_filters() {
        let mut log = EventLog::new(0);
        log.push(moved(1.0, 1, (0, 0)));
        log.push(moved(2.0, 2, (0, 1)));
        log.push(moved(3.0, 1, (1, 1)));

        let actor = ActorRef::new(ActorKind::RandomWalkTarget, 1);
        assert_eq!(log.by_actor(actor).count(), 2);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let mut a = EventLog::new(5);
        let mut b = EventLog::new(5);
        a.push(moved(1.0, 1, (0, 0)));
        b.push(moved(1.0, 1, (0, 0)));
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());

        b.push(moved(2.0, 1, (0, 1)));
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }

    #[test]
    fn test_fingerprint_distinguishes_logs_of_equal_length() {
        let mut a = EventLog::new(5);
        let mut b = EventLog::new(5);
        a.push(moved(1.0, 1, (0, 0)));
        b.push(moved(1.0, 1, (0, 1)));
        assert_eq!(a.len(), b.len());
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());

        let mut c = EventLog::new(6);
        c.push(moved(1.0, 1, (0, 0)));
        assert_ne!(a.fingerprint().unwrap(), c.fingerprint().unwrap());
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut log = EventLog::new(1);
        log.version = EVENT_LOG_VERSION + 1;
        let bytes = bincode::serialize(&log).unwrap();
        assert!(matches!(
            EventLog::from_bytes(&bytes),
            Err(SimError::InvalidState(_))
        ));
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |e: &Event| seen.push(e.time);
            sink.on_event(&moved(4.0, 1, (0, 0)));
        }
        assert_eq!(seen, vec![4.0]);
    }
}
