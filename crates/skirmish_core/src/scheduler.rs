//! Discrete-event process scheduler.
//!
//! Processes are resumable behaviors (pieces, facilities, the termination
//! watcher). Each resume step answers with either "wake me in `d` time
//! units" or "done". The scheduler keeps pending wakeups in a min-heap
//! ordered by wake time, breaking ties by scheduling order so runs are
//! deterministic.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::facilities::FacilityId;
use crate::pieces::PieceId;

/// Index of a registered process.
pub type ProcessId = usize;

/// What a process drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Process {
    /// A runnable piece (random walker or helicopter).
    Piece(PieceId),
    /// An active facility.
    Facility(FacilityId),
    /// The termination watcher.
    Watcher,
}

/// Outcome of one resume step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resume {
    /// Suspend for this many time units.
    Wait(f64),
    /// Leave the loop; the process never runs again.
    Exit,
}

/// Lifecycle of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Waiting for its next wakeup.
    Suspended,
    /// Interrupted while suspended; its pending wakeup is discarded.
    Interrupted,
    /// Exited.
    Finished,
}

#[derive(Debug)]
struct Wakeup {
    at: f64,
    seq: u64,
    pid: ProcessId,
}

impl PartialEq for Wakeup {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Wakeup {}

impl PartialOrd for Wakeup {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Wakeup {
    // Reversed so BinaryHeap pops the earliest wakeup first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .total_cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug)]
struct Entry {
    process: Process,
    state: ProcessState,
}

/// Event queue plus process table.
#[derive(Debug, Default)]
pub struct Scheduler {
    now: f64,
    next_seq: u64,
    queue: BinaryHeap<Wakeup>,
    processes: Vec<Entry>,
}

impl Scheduler {
    /// Create an empty scheduler at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time.
    #[must_use]
    pub const fn now(&self) -> f64 {
        self.now
    }

    /// Register a process and apply its first resume step.
    pub fn spawn(&mut self, process: Process, first: Resume) -> ProcessId {
        let pid = self.processes.len();
        self.processes.push(Entry {
            process,
            state: ProcessState::Suspended,
        });
        self.apply(pid, first);
        pid
    }

    /// Apply a resume step for `pid`.
    ///
    /// Waits schedule a wakeup at `now + delay`; exits finish the process.
    /// Steps for processes that are no longer suspended are ignored.
    pub fn apply(&mut self, pid: ProcessId, step: Resume) {
        let Some(entry) = self.processes.get_mut(pid) else {
            return;
        };
        if entry.state != ProcessState::Suspended {
            return;
        }
        match step {
            Resume::Wait(delay) => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.queue.push(Wakeup {
                    at: self.now + delay.max(0.0),
                    seq,
                    pid,
                });
            }
            Resume::Exit => entry.state = ProcessState::Finished,
        }
    }

    /// Pop the next wakeup strictly before `horizon`.
    ///
    /// Wakeups of interrupted processes are discarded. Returns `None` once
    /// nothing remains before the horizon, leaving the clock at the time of
    /// the last executed wakeup.
    pub fn next_due(&mut self, horizon: f64) -> Option<(ProcessId, Process)> {
        while let Some(wakeup) = self.queue.peek() {
            if wakeup.at >= horizon {
                return None;
            }
            let Some(wakeup) = self.queue.pop() else {
                break;
            };
            let Some(entry) = self.processes.get_mut(wakeup.pid) else {
                continue;
            };
            match entry.state {
                ProcessState::Suspended => {
                    self.now = wakeup.at;
                    return Some((wakeup.pid, entry.process));
                }
                ProcessState::Interrupted => entry.state = ProcessState::Finished,
                ProcessState::Finished => {}
            }
        }
        None
    }

    /// Time of the earliest pending wakeup.
    #[must_use]
    pub fn peek_time(&self) -> Option<f64> {
        self.queue.peek().map(|w| w.at)
    }

    /// Interrupt a suspended process.
    pub fn interrupt(&mut self, pid: ProcessId) -> bool {
        match self.processes.get_mut(pid) {
            Some(entry) if entry.state == ProcessState::Suspended => {
                entry.state = ProcessState::Interrupted;
                true
            }
            _ => false,
        }
    }

    /// Interrupt every suspended process except `keep`. Returns how many were interrupted.
    pub fn interrupt_all_except(&mut self, keep: ProcessId) -> usize {
        (0..self.processes.len())
            .filter(|&pid| pid != keep)
            .filter(|&pid| self.interrupt(pid))
            .count()
    }

    /// State of a process.
    #[must_use]
    pub fn state(&self, pid: ProcessId) -> Option<ProcessState> {
        self.processes.get(pid).map(|e| e.state)
    }

    /// Number of suspended processes.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.processes
            .iter()
            .filter(|e| e.state == ProcessState::Suspended)
            .count()
    }

    /// Number of processes ever registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    /// Whether no process was ever registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Move the clock forward to `time`; never moves it back.
    pub fn advance_to(&mut self, time: f64) {
        if time > self.now {
            self.now = time;
        }
    }
}
