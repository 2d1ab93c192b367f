//! State and borrowed context threaded through every coordinator handler.
//!
//! [`CoordinatorState`] is what the coordinator owns between callbacks:
//! the phase, the watchdog reset budget, the open sampling window and
//! what the next `Job::Sensor` firing means.  [`LifecycleCtx`] is the set
//! of peripherals and runtime services lent to it for one dispatch.

use embassy_time::{Duration, Instant};

use super::LifecyclePhase;
use crate::app::ports::{
    LowPowerClock, NetworkStack, PayloadCodec, PositionSensor, Services, StatusFeedback,
};
use crate::error::FatalFault;

// ---------------------------------------------------------------------------
// Reset budget
// ---------------------------------------------------------------------------

/// Consecutive watchdog resets since the last successful join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetBudget {
    used: u8,
    max: u8,
}

impl ResetBudget {
    pub fn new(max: u8) -> Self {
        Self { used: 0, max }
    }

    /// Count one more reset.  Fails once the count exceeds the budget.
    /// A budget of `u8::MAX` still halts: the count cannot wrap, so the
    /// reset after the last granted one fails.
    pub fn consume(&mut self) -> Result<u8, FatalFault> {
        match self.used.checked_add(1) {
            Some(n) if n <= self.max => {
                self.used = n;
                Ok(n)
            }
            next => {
                self.used = next.unwrap_or(u8::MAX);
                Err(FatalFault::ResetBudgetExhausted { resets: self.used })
            }
        }
    }

    /// A join succeeded; the stack is healthy again.
    pub fn clear(&mut self) {
        self.used = 0;
    }

    pub fn used(&self) -> u8 {
        self.used
    }

    pub fn max(&self) -> u8 {
        self.max
    }
}

// ---------------------------------------------------------------------------
// Sampling window
// ---------------------------------------------------------------------------

/// Bounded wait for sensor data.  Once it closes the uplink goes out with
/// whatever the sensor has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingWindow {
    pub opened: Instant,
    pub length: Duration,
}

impl SamplingWindow {
    pub fn open(now: Instant, length: Duration) -> Self {
        Self {
            opened: now,
            length,
        }
    }

    /// Deadline by which the uplink must go out.
    pub fn closes_at(&self) -> Instant {
        self.opened + self.length
    }

    pub fn is_closed(&self, now: Instant) -> bool {
        now >= self.closes_at()
    }
}

/// Meaning of the next `Job::Sensor` firing.  Both uses share one handle
/// so a new cycle can never overlap a pending poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorStep {
    #[default]
    Idle,
    /// Ask the sensor again whether data is ready.
    Poll,
    /// Start the next sample cycle.
    NextCycle,
}

// ---------------------------------------------------------------------------
// Coordinator state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorState {
    pub phase: LifecyclePhase,
    pub resets: ResetBudget,
    pub window: Option<SamplingWindow>,
    pub sensor_step: SensorStep,
}

impl CoordinatorState {
    pub fn new(max_resets: u8) -> Self {
        Self {
            phase: LifecyclePhase::Joining,
            resets: ResetBudget::new(max_resets),
            window: None,
            sensor_step: SensorStep::Idle,
        }
    }
}

// ---------------------------------------------------------------------------
// Borrowed context
// ---------------------------------------------------------------------------

/// Everything a handler may touch during one callback.
pub struct LifecycleCtx<'a> {
    pub stack: &'a mut dyn NetworkStack,
    pub sensor: &'a mut dyn PositionSensor,
    pub codec: &'a mut dyn PayloadCodec,
    pub clock: &'a dyn LowPowerClock,
    pub feedback: &'a mut dyn StatusFeedback,
    pub svc: Services<'a>,
}

impl LifecycleCtx<'_> {
    pub fn now(&self) -> Instant {
        self.svc.timers.now()
    }
}
