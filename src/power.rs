//! Deep-sleep governor.
//!
//! The core may only enter its lowest-power state when no requester
//! holds a lease.  Two requesters exist: the network path (sensor polls
//! and radio activity) and the status LED while it is lit.  Each lease
//! carries its own expiry, so a requester that never releases cannot
//! keep the device awake forever.
//!
//! ```text
//!   Network   ──suspend(until)──▶ ┌──────────────┐
//!   Indicator ──suspend(until)──▶ │ SleepGovernor│──may_sleep(now)──▶ idle hook
//!             ──release()──────▶  └──────────────┘
//! ```

use embassy_time::Instant;
use log::debug;

use crate::app::ports::SleepLease;

/// Identity of a deep-sleep lease holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LeaseReason {
    /// Radio activity or an in-progress sensor sample.
    Network = 0,
    /// Status LED is lit and needs the core clocked.
    Indicator = 1,
}

impl LeaseReason {
    pub const COUNT: usize = 2;
}

/// Tracks the outstanding lease of each requester.
#[derive(Debug, Default)]
pub struct SleepGovernor {
    leases: [Option<Instant>; LeaseReason::COUNT],
}

impl SleepGovernor {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when every lease is absent or has expired at `now`.
    pub fn may_sleep(&mut self, now: Instant) -> bool {
        for slot in &mut self.leases {
            if slot.is_some_and(|until| until <= now) {
                *slot = None;
            }
        }
        self.leases.iter().all(Option::is_none)
    }

    /// Expiry of `reason`'s lease, if one is held.
    pub fn lease(&self, reason: LeaseReason) -> Option<Instant> {
        self.leases[reason as usize]
    }

    /// Earliest instant at which sleep could be permitted, assuming no
    /// new lease is taken.  `None` when nothing is held.
    pub fn held_until(&self) -> Option<Instant> {
        self.leases.iter().flatten().max().copied()
    }
}

impl SleepLease for SleepGovernor {
    fn suspend(&mut self, reason: LeaseReason, until: Instant) {
        debug!("sleep lease {:?} until {} ms", reason, until.as_millis());
        self.leases[reason as usize] = Some(until);
    }

    fn release(&mut self, reason: LeaseReason) {
        if self.leases[reason as usize].take().is_some() {
            debug!("sleep lease {:?} released", reason);
        }
    }
}
