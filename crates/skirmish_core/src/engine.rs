//! The simulation engine.
//!
//! The engine owns the board, the piece and facility registries, the random
//! source, the event log and the scheduler. Behaviors receive `&mut Engine`
//! and act through its methods: moving, attacking, spawning and emitting
//! events.
//!
//! ## Lifecycle
//!
//! 1. [`Engine::new`] with an [`EngineConfig`]
//! 2. [`Engine::setup`] registers pieces and facilities
//! 3. [`Engine::run`] checks the budget, runs until every target is
//!    destroyed or the horizon is reached, and returns a [`RunResult`]
//!
//! A finished engine is spent: running it again without a fresh `setup`
//! fails with [`SimError::NotConfigured`].

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, info, trace};

use crate::config::{EngineConfig, Pacing};
use crate::error::{Result, SimError};
use crate::events::{ActorKind, ActorRef, Event, EventKind, EventLog, EventSink, Importance};
use crate::facilities::{self, Facility, FacilityId};
use crate::grid::{Board, Cell};
use crate::pieces::{self, Piece, PieceId};
use crate::random::RandomSource;
use crate::scheduler::{Process, ProcessId, Resume, Scheduler};
use crate::score::{EndReason, FacilityYield, RunResult};

/// Interval between termination checks.
pub const WATCH_INTERVAL: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Ready,
    Running,
    Spent,
}

/// Discrete-event engine for one game.
pub struct Engine {
    config: EngineConfig,
    board: Board,
    rng: RandomSource,
    pieces: BTreeMap<PieceId, Piece>,
    facilities: BTreeMap<FacilityId, Facility>,
    scheduler: Scheduler,
    log: EventLog,
    sink: Option<Box<dyn EventSink + Send>>,
    phase: Phase,
    points: u32,
    possible_points: u32,
    next_piece_id: PieceId,
    watcher: Option<ProcessId>,
    end_reason: Option<EndReason>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("phase", &self.phase)
            .field("now", &self.scheduler.now())
            .field("pieces", &self.pieces.len())
            .field("facilities", &self.facilities.len())
            .field("points", &self.points)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Create an engine.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidParameter`] if the configuration is invalid.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            board: Board::new(config.half_width),
            rng: RandomSource::new(config.seed),
            pieces: BTreeMap::new(),
            facilities: BTreeMap::new(),
            scheduler: Scheduler::new(),
            log: EventLog::new(config.seed),
            sink: None,
            phase: Phase::Idle,
            points: 0,
            possible_points: 0,
            next_piece_id: 1,
            watcher: None,
            end_reason: None,
        })
    }

    /// Subscribe an external sink to every recorded event.
    pub fn set_sink(&mut self, sink: impl EventSink + Send + 'static) {
        self.sink = Some(Box::new(sink));
    }

    /// Register the initial pieces and facilities, replacing any previous game.
    ///
    /// Piece positions are wrapped onto the board.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::DuplicateId`] or [`SimError::DuplicateFacilityId`]
    /// if an id is registered twice.
    pub fn setup(
        &mut self,
        pieces: impl IntoIterator<Item = Piece>,
        facilities: impl IntoIterator<Item = Facility>,
    ) -> Result<()> {
        let mut piece_map = BTreeMap::new();
        for mut piece in pieces {
            (piece.x, piece.y) = self.board.wrap(piece.position());
            if piece_map.insert(piece.id, piece).is_some() {
                return Err(SimError::DuplicateId(piece.id));
            }
        }

        let mut facility_map = BTreeMap::new();
        for facility in facilities {
            if facility_map.insert(facility.id, facility).is_some() {
                return Err(SimError::DuplicateFacilityId(facility.id));
            }
        }

        self.next_piece_id = piece_map.keys().next_back().map_or(1, |max| max + 1);
        self.pieces = piece_map;
        self.facilities = facility_map;
        self.scheduler = Scheduler::new();
        self.log = EventLog::new(self.config.seed);
        self.points = 0;
        self.possible_points = 0;
        self.watcher = None;
        self.end_reason = None;
        self.phase = Phase::Ready;

        debug!(
            pieces = self.pieces.len(),
            facilities = self.facilities.len(),
            "Engine configured"
        );
        Ok(())
    }

    /// Run the game to completion.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NotConfigured`] if `setup` was not called since the
    /// last run, [`SimError::BudgetExceeded`] if facilities request more than
    /// the resource limit, [`SimError::InvalidParameter`] if the points on the
    /// board overflow `u32`, and propagates piece registration failures.
    pub fn run(&mut self) -> Result<RunResult> {
        if self.phase != Phase::Ready {
            return Err(SimError::NotConfigured);
        }

        let requested: u64 = self
            .facilities
            .values()
            .map(|f| u64::from(f.resources))
            .sum();
        if requested > u64::from(self.config.resource_limit) {
            return Err(SimError::BudgetExceeded {
                requested: u32::try_from(requested).unwrap_or(u32::MAX),
                limit: self.config.resource_limit,
            });
        }

        let possible: u64 = self
            .pieces
            .values()
            .filter(|p| p.active && p.is_target())
            .map(|p| u64::from(p.points()))
            .sum();
        let Ok(possible) = u32::try_from(possible) else {
            return Err(SimError::invalid_parameter(
                "possible_points",
                possible,
                "must fit in u32",
            ));
        };

        self.phase = Phase::Running;
        self.possible_points = possible;

        info!(
            seed = self.config.seed,
            size = self.board.half_width(),
            possible_points = self.possible_points,
            "Game started"
        );
        self.event(
            ActorRef::SYSTEM,
            EventKind::GameStarted {
                possible_points: self.possible_points,
            },
            Importance::Info,
        );

        let runnable: Vec<Piece> = self
            .pieces
            .values()
            .filter(|p| p.is_runnable())
            .copied()
            .collect();
        for piece in runnable {
            self.scheduler.spawn(Process::Piece(piece.id), pieces::start(&piece));
        }

        let active: Vec<Facility> = self
            .facilities
            .values()
            .filter(|f| f.is_active())
            .copied()
            .collect();
        for facility in active {
            let first = facilities::start(self, &facility);
            self.scheduler.spawn(Process::Facility(facility.id), first);
        }

        self.watcher = Some(
            self.scheduler
                .spawn(Process::Watcher, Resume::Wait(WATCH_INTERVAL)),
        );

        let outcome = self.drive();
        self.phase = Phase::Spent;
        outcome?;

        let end_reason = *self.end_reason.get_or_insert(EndReason::TimeLimit);
        if end_reason == EndReason::TimeLimit {
            self.scheduler.advance_to(self.config.horizon);
        }

        let result = self.result(end_reason);
        info!(
            points = result.points,
            possible_points = result.possible_points,
            end_time = result.end_time,
            reason = %end_reason,
            "Game over"
        );
        self.event(
            ActorRef::SYSTEM,
            EventKind::GameOver(Box::new(result.clone())),
            Importance::Info,
        );
        Ok(result)
    }

    fn drive(&mut self) -> Result<()> {
        let mut paced_until = self.scheduler.now();
        while let Some((pid, process)) = self.scheduler.next_due(self.config.horizon) {
            self.pace(paced_until);
            paced_until = self.scheduler.now();

            let step = match process {
                Process::Piece(id) => pieces::resume(self, id),
                Process::Facility(id) => facilities::resume(self, id)?,
                Process::Watcher => self.watch(),
            };
            self.scheduler.apply(pid, step);

            if self.end_reason.is_some() {
                break;
            }
        }
        Ok(())
    }

    fn pace(&self, since: f64) {
        if let Pacing::RealTime { speed } = self.config.pacing {
            let delta = (self.scheduler.now() - since) / speed;
            if delta > 0.0 && delta.is_finite() {
                std::thread::sleep(Duration::from_secs_f64(delta));
            }
        }
    }

    fn watch(&mut self) -> Resume {
        if self.pieces.values().any(|p| p.active && p.is_target()) {
            return Resume::Wait(WATCH_INTERVAL);
        }
        if let Some(watcher) = self.watcher {
            let interrupted = self.scheduler.interrupt_all_except(watcher);
            trace!(interrupted, "Interrupted remaining processes");
        }
        self.end_reason = Some(EndReason::AllTargetsDestroyed);
        Resume::Exit
    }

    fn result(&self, end_reason: EndReason) -> RunResult {
        RunResult {
            seed: self.config.seed,
            points: self.points,
            possible_points: self.possible_points,
            end_time: self.scheduler.now(),
            end_reason,
            facilities: self
                .facilities
                .values()
                .filter(|f| f.is_active())
                .map(|f| {
                    (
                        f.id,
                        FacilityYield {
                            kind: f.actor_kind(),
                            resources: f.resources,
                            earned_points: f.earned_points,
                        },
                    )
                })
                .collect(),
        }
    }

    /// Register a piece, starting its process if the game is running.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::DuplicateId`] if the id is taken.
    pub fn add_piece(&mut self, mut piece: Piece) -> Result<()> {
        if self.pieces.contains_key(&piece.id) {
            return Err(SimError::DuplicateId(piece.id));
        }
        (piece.x, piece.y) = self.board.wrap(piece.position());
        self.next_piece_id = self.next_piece_id.max(piece.id.saturating_add(1));
        self.pieces.insert(piece.id, piece);

        if self.phase == Phase::Running && piece.is_runnable() {
            self.scheduler
                .spawn(Process::Piece(piece.id), pieces::start(&piece));
        }
        Ok(())
    }

    /// Record an event stamped with the current time and piece positions.
    ///
    /// In simulation mode `Debug` events are dropped.
    pub fn event(&mut self, actor: ActorRef, kind: EventKind, importance: Importance) {
        if self.config.simulation_mode && importance == Importance::Debug {
            return;
        }

        let event = Event {
            time: self.scheduler.now(),
            actor,
            kind,
            importance,
            positions: self
                .pieces
                .values()
                .map(|p| (p.id, p.position()))
                .collect(),
        };

        match importance {
            Importance::Debug => debug!(time = event.time, actor = %actor, "{}", event.kind),
            Importance::Info => info!(time = event.time, actor = %actor, "{}", event.kind),
        }

        if let Some(sink) = self.sink.as_mut() {
            sink.on_event(&event);
        }
        self.log.push(event);
    }

    /// Destroy every active target at `cell` and return the points awarded.
    ///
    /// Points go to the running total and to the attacker's facility (a
    /// helicopter's parent helipad). Non-targets and destroyed targets are
    /// unaffected.
    pub fn attack(&mut self, attacker: ActorRef, cell: Cell) -> u32 {
        let cell = self.board.wrap(cell);
        let hits: Vec<PieceId> = self
            .pieces
            .values()
            .filter(|p| p.active && p.is_target() && p.position() == cell)
            .map(|p| p.id)
            .collect();
        if hits.is_empty() {
            return 0;
        }

        let mut earned: u32 = 0;
        for id in hits {
            let Some(piece) = self.pieces.get_mut(&id) else {
                continue;
            };
            piece.active = false;
            let points = piece.points();
            let actor = piece.actor();
            self.points = self.points.saturating_add(points);
            earned = earned.saturating_add(points);
            self.event(
                actor,
                EventKind::Destroyed {
                    by: attacker,
                    points,
                },
                Importance::Info,
            );
        }

        if let Some(facility) = self
            .credited_facility(attacker)
            .and_then(|id| self.facilities.get_mut(&id))
        {
            facility.earned_points = facility.earned_points.saturating_add(earned);
        }
        earned
    }

    fn credited_facility(&self, attacker: ActorRef) -> Option<FacilityId> {
        match attacker.kind {
            kind if kind.is_facility() => Some(attacker.id),
            ActorKind::Helicopter => self.pieces.get(&attacker.id).and_then(Piece::owner),
            _ => None,
        }
    }

    /// Allocate a fresh piece id.
    pub fn next_piece_id(&mut self) -> PieceId {
        let id = self.next_piece_id;
        self.next_piece_id += 1;
        id
    }

    /// Uniform cell on the board, drawn from the engine's random source.
    pub fn random_position(&mut self) -> Cell {
        self.rng.cell(&self.board)
    }

    /// Wrap a cell onto the board.
    #[must_use]
    pub fn wrap(&self, cell: Cell) -> Cell {
        self.board.wrap(cell)
    }

    pub(crate) fn move_piece(&mut self, id: PieceId, to: Cell) -> Cell {
        let to = self.board.wrap(to);
        if let Some(piece) = self.pieces.get_mut(&id) {
            (piece.x, piece.y) = to;
        }
        to
    }

    pub(crate) fn rng_mut(&mut self) -> &mut RandomSource {
        &mut self.rng
    }

    pub(crate) fn facility_mut(&mut self, id: FacilityId) -> Option<&mut Facility> {
        self.facilities.get_mut(&id)
    }

    /// Engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The board.
    #[must_use]
    pub const fn board(&self) -> Board {
        self.board
    }

    /// Current simulated time.
    #[must_use]
    pub const fn now(&self) -> f64 {
        self.scheduler.now()
    }

    /// Points scored so far.
    #[must_use]
    pub const fn points(&self) -> u32 {
        self.points
    }

    /// Points available at the start of the run.
    #[must_use]
    pub const fn possible_points(&self) -> u32 {
        self.possible_points
    }

    /// Look up a piece.
    #[must_use]
    pub fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.pieces.get(&id)
    }

    /// All pieces in id order.
    pub fn pieces(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.values()
    }

    /// Look up a facility.
    #[must_use]
    pub fn facility(&self, id: FacilityId) -> Option<&Facility> {
        self.facilities.get(&id)
    }

    /// All facilities in id order.
    pub fn facilities(&self) -> impl Iterator<Item = &Facility> {
        self.facilities.values()
    }

    /// Events recorded so far.
    #[must_use]
    pub const fn log(&self) -> &EventLog {
        &self.log
    }

    /// Take the event log, leaving an empty one.
    pub fn take_log(&mut self) -> EventLog {
        std::mem::replace(&mut self.log, EventLog::new(self.config.seed))
    }
}
