//! Cooperative job queue.
//!
//! Every timer in the firmware is a typed [`Job`] handle with at most one
//! pending deadline.  Re-arming a handle replaces its deadline, so a
//! phase can always push its watchdog out without first cancelling it.
//!
//! ```text
//!   schedule_at(Reset, t1) ─┐
//!   schedule_at(Sensor, t2) ├──▶  { Job ──▶ Instant }  ──pop_due(now)──▶ dispatch
//!   schedule_at(Reset, t3) ─┘      (t3 replaced t1)
//! ```
//!
//! The queue also owns the monotonic "now" that callbacks observe.  The
//! dispatch loop advances it; nothing in the core reads a global clock.

use embassy_time::{Duration, Instant};
use heapless::FnvIndexMap;
use log::debug;

use crate::app::ports::Timers;

/// Timer handles.  One per independent callback of the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Job {
    /// Lifecycle watchdog: the current phase must make progress first.
    Reset = 0,
    /// Issue (or re-poll before issuing) a join request.
    Join = 1,
    /// Sensor re-poll or start of the next sample cycle.
    Sensor = 2,
    /// Status LED render loop.
    Indicator = 3,
}

impl Job {
    /// Total number of handles.
    pub const COUNT: usize = 4;

    pub fn name(self) -> &'static str {
        match self {
            Self::Reset => "reset",
            Self::Join => "join",
            Self::Sensor => "sensor",
            Self::Indicator => "indicator",
        }
    }
}

/// Pending deadlines keyed by handle.  Capacity must be a power of two
/// and at least [`Job::COUNT`].
const QUEUE_CAP: usize = 8;

/// The job queue.
pub struct JobQueue {
    pending: FnvIndexMap<Job, Instant, QUEUE_CAP>,
    now: Instant,
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl JobQueue {
    pub fn new() -> Self {
        Self::starting_at(Instant::from_ticks(0))
    }

    /// A queue whose clock starts at `now` (e.g. uptime at boot).
    pub fn starting_at(now: Instant) -> Self {
        Self {
            pending: FnvIndexMap::new(),
            now,
        }
    }

    /// Move the clock forward.  Earlier instants are ignored.
    pub fn advance_to(&mut self, t: Instant) {
        if t > self.now {
            self.now = t;
        }
    }

    /// Advance the clock by `d`.
    pub fn advance_by(&mut self, d: Duration) {
        self.now += d;
    }

    /// Earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }

    /// Remove and return the job with the earliest deadline that is due.
    /// Ties go to the lower handle so ordering is deterministic.
    pub fn pop_due(&mut self) -> Option<Job> {
        let (job, _) = self
            .pending
            .iter()
            .filter(|(_, at)| **at <= self.now)
            .min_by_key(|(job, at)| (**at, **job))
            .map(|(job, at)| (*job, *at))?;
        self.pending.remove(&job);
        debug!("job '{}' due at {} ms", job.name(), self.now.as_millis());
        Some(job)
    }

    pub fn is_pending(&self, job: Job) -> bool {
        self.pending.contains_key(&job)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Timers for JobQueue {
    fn now(&self) -> Instant {
        self.now
    }

    fn schedule_at(&mut self, job: Job, at: Instant) {
        // One slot per handle; QUEUE_CAP >= Job::COUNT so insert cannot fail.
        let _ = self.pending.insert(job, at);
    }

    fn cancel(&mut self, job: Job) {
        self.pending.remove(&job);
    }

    fn deadline(&self, job: Job) -> Option<Instant> {
        self.pending.get(&job).copied()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
