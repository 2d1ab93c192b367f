//! Lifecycle coordinator: event-driven phase machine for the tracker.
//!
//! ```text
//!                    ┌──────────[Joining / LinkDead / watchdog]───────────┐
//!                    ▼                                                    │
//!  boot ──▶ JOINING ──[Joined / LinkAlive]──▶ JOINED ──[cycle]──▶ SAMPLING_SENSOR
//!                                              ▲                      │
//!                                     [TxComplete]          [data ready / window closed]
//!                                              │                      ▼
//!                                           SENDING ◀──[TxStart]── WAITING_TO_SEND
//! ```
//!
//! The coordinator is driven by two inputs: [`NetworkEvent`]s from the
//! stack and its own jobs on the [`Job`] queue.  Every phase arms the
//! `Job::Reset` watchdog; if the phase fails to make progress before it
//! fires, the stack is reset and a fresh join is issued.  Consecutive
//! resets are bounded by [`ResetBudget`](context::ResetBudget); exceeding
//! it is the only fatal condition in the core.
//!
//! Handlers live in [`transitions`] and receive a [`LifecycleCtx`] holding
//! the borrowed peripherals for the duration of the callback.

pub mod context;
mod transitions;

use core::fmt;

use context::{CoordinatorState, LifecycleCtx};
use log::debug;

use crate::app::events::NetworkEvent;
use crate::config::LifecycleConfig;
use crate::error::FatalFault;
use crate::scheduler::Job;

// ---------------------------------------------------------------------------
// Phase identity
// ---------------------------------------------------------------------------

/// Coordinator phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LifecyclePhase {
    Joining = 0,
    Joined = 1,
    SamplingSensor = 2,
    WaitingToSend = 3,
    Sending = 4,
}

impl LifecyclePhase {
    pub const COUNT: usize = 5;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Joining,
        Self::Joined,
        Self::SamplingSensor,
        Self::WaitingToSend,
        Self::Sending,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Joining => "Joining",
            Self::Joined => "Joined",
            Self::SamplingSensor => "SamplingSensor",
            Self::WaitingToSend => "WaitingToSend",
            Self::Sending => "Sending",
        }
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Uplink frame capacity (LoRaWAN DR0 application payload).
pub const MAX_UPLINK_LEN: usize = 51;

/// Scratch space for one raw sensor reading.
pub const SENSOR_READING_LEN: usize = 32;

/// The lifecycle coordinator.
pub struct Coordinator {
    state: CoordinatorState,
    cfg: LifecycleConfig,
}

impl Coordinator {
    pub fn new(cfg: LifecycleConfig) -> Self {
        Self {
            state: CoordinatorState::new(cfg.max_resets),
            cfg,
        }
    }

    /// Boot: show `Booting`, issue the first join and arm the watchdog.
    pub fn start(&mut self, ctx: &mut LifecycleCtx<'_>) {
        self.on_boot(ctx);
    }

    /// Handle one event from the network stack.
    pub fn on_event(&mut self, event: NetworkEvent, ctx: &mut LifecycleCtx<'_>) {
        debug!("stack event {} in {}", event, self.state.phase);
        match event {
            NetworkEvent::Joining | NetworkEvent::LinkDead => self.on_link_lost(ctx),
            NetworkEvent::Joined { net_id } => self.on_joined(net_id, ctx),
            NetworkEvent::LinkAlive => self.on_link_up(ctx),
            NetworkEvent::TxStart => self.on_tx_start(ctx),
            NetworkEvent::TxComplete { downlink } => self.on_tx_complete(downlink, ctx),
            other => debug!("ignoring {}", other),
        }
    }

    /// Handle a due job.  `Job::Indicator` belongs to the LED engine and
    /// is ignored here.
    pub fn on_job(&mut self, job: Job, ctx: &mut LifecycleCtx<'_>) -> Result<(), FatalFault> {
        match job {
            Job::Reset => self.on_watchdog(ctx)?,
            Job::Join => self.on_join_due(ctx),
            Job::Sensor => self.on_sensor_due(ctx),
            Job::Indicator => {}
        }
        Ok(())
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.state.phase
    }

    /// Consecutive watchdog resets since the last join.
    pub fn resets(&self) -> u8 {
        self.state.resets.used()
    }

    pub fn state(&self) -> &CoordinatorState {
        &self.state
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.cfg
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════
