//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the logger (UART on the device, stderr for the bench binary).

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the console.
#[derive(Debug, Default)]
pub struct LogEventSink {
    uplinks: u32,
    resets: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uplinks seen since construction.
    pub fn uplinks(&self) -> u32 {
        self.uplinks
    }

    /// Stack resets seen since construction.
    pub fn resets(&self) -> u32 {
        self.resets
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(phase) => {
                info!("START | phase={}", phase);
            }
            AppEvent::PhaseChanged { from, to } => {
                info!("PHASE | {} -> {}", from, to);
            }
            AppEvent::IndicatorChanged(state) => {
                info!("LED   | {:?} {:?}", state.color, state.pattern);
            }
            AppEvent::ResetIssued { count, max } => {
                self.resets += 1;
                warn!("RESET | stack reset {}/{}", count, max);
            }
            AppEvent::JoinDeferred => {
                info!("JOIN  | deferred, low-power clock not ready");
            }
            AppEvent::UplinkSubmitted { port, len } => {
                self.uplinks += 1;
                info!("UP    | port={} len={}", port, len);
            }
            AppEvent::DownlinkReceived { port, len } => {
                info!("DOWN  | port={} len={}", port, len);
            }
            AppEvent::FatalFault(fault) => {
                error!("FATAL | {}", fault);
            }
        }
    }
}
