//! JSON-lines event stream for external viewers.
//!
//! A run writes one JSON object per line on stdout:
//!
//! **Events:** every recorded event, with a full position snapshot
//! **Game over:** one final record with the score and facility yields
//!
//! # Example Stream
//!
//! ```text
//! {"type":"event","time":0.0,"actor_kind":"System","actor_id":0,"message":"game started, 100 possible points",...}
//! {"type":"event","time":0.43,"actor_kind":"Artillery","actor_id":1,"message":"fired at (3, -7)",...}
//! {"type":"event","time":0.43,"actor_kind":"Target","actor_id":100017,"message":"destroyed by Artillery 1 (1 points)",...}
//! {"type":"game_over","points":37,"possible_points":100,"end_time":100.0,"end_reason":"time_limit","facilities":[...]}
//! ```

use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::warn;

use skirmish_core::events::{Event, EventKind, EventSink, Importance};
use skirmish_core::score::{EndReason, RunResult};

// ============================================================================
// Output Records (Runner -> Viewer)
// ============================================================================

/// One line of the event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamRecord {
    /// A recorded event.
    Event {
        /// Simulated time.
        time: f64,
        /// Emitting actor kind.
        actor_kind: String,
        /// Emitting actor id.
        actor_id: u32,
        /// Human-readable message.
        message: String,
        /// `debug` or `info`.
        importance: String,
        /// Every piece position at emission time.
        positions: Vec<PositionRecord>,
    },

    /// The end-of-game record.
    GameOver {
        /// Points scored.
        points: u32,
        /// Points available at start.
        possible_points: u32,
        /// Simulated end time.
        end_time: f64,
        /// `all_targets_destroyed` or `time_limit`.
        end_reason: String,
        /// Yield of each facility that took part.
        facilities: Vec<FacilityRecord>,
    },
}

/// Piece position in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRecord {
    /// Piece id.
    pub id: u32,
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

/// Per-facility result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityRecord {
    /// Facility id.
    pub id: u32,
    /// Facility kind.
    pub kind: String,
    /// Resources allocated.
    pub resources: u32,
    /// Points credited.
    pub earned_points: u32,
    /// Points per resource.
    pub efficiency: f64,
}

impl StreamRecord {
    /// Record for an event; game-over events become the end-of-game record.
    #[must_use]
    pub fn from_event(event: &Event) -> Self {
        if let EventKind::GameOver(result) = &event.kind {
            return Self::game_over(result);
        }
        Self::Event {
            time: event.time,
            actor_kind: event.actor.kind.name().to_string(),
            actor_id: event.actor.id,
            message: event.message(),
            importance: match event.importance {
                Importance::Debug => "debug",
                Importance::Info => "info",
            }
            .to_string(),
            positions: event
                .positions
                .iter()
                .map(|(&id, &(x, y))| PositionRecord { id, x, y })
                .collect(),
        }
    }

    /// End-of-game record for a result.
    #[must_use]
    pub fn game_over(result: &RunResult) -> Self {
        Self::GameOver {
            points: result.points,
            possible_points: result.possible_points,
            end_time: result.end_time,
            end_reason: match result.end_reason {
                EndReason::AllTargetsDestroyed => "all_targets_destroyed",
                EndReason::TimeLimit => "time_limit",
            }
            .to_string(),
            facilities: result
                .facilities
                .iter()
                .map(|(&id, y)| FacilityRecord {
                    id,
                    kind: y.kind.name().to_string(),
                    resources: y.resources,
                    earned_points: y.earned_points,
                    efficiency: y.efficiency(),
                })
                .collect(),
        }
    }

    /// Serialize to a single JSON line (no trailing newline).
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse a JSON line.
    pub fn from_json_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }

    /// Whether this is the end-of-game record.
    #[must_use]
    pub fn is_game_over(&self) -> bool {
        matches!(self, Self::GameOver { .. })
    }
}

/// Event sink writing one JSON line per event.
///
/// Write failures are logged and counted; the run continues.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
    failures: usize,
}

impl<W: Write> JsonLinesSink<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            written: 0,
            failures: 0,
        }
    }

    /// Lines written so far.
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }

    /// Failed writes so far.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Unwrap the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_record(&mut self, record: &StreamRecord) -> std::io::Result<()> {
        let line = record.to_json_line().map_err(std::io::Error::other)?;
        writeln!(self.writer, "{line}")?;
        if record.is_game_over() {
            self.writer.flush()?;
        }
        Ok(())
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn on_event(&mut self, event: &Event) {
        let record = StreamRecord::from_event(event);
        match self.write_record(&record) {
            Ok(()) => self.written += 1,
            Err(e) => {
                if self.failures == 0 {
                    warn!(error = %e, "Failed to write event record");
                }
                self.failures += 1;
            }
        }
    }
}
