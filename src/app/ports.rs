//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Tracker (domain)
//! ```
//!
//! The LoRaWAN MAC, GPS driver, payload codec, charger and LED
//! peripherals all live on the far side of these traits.  The
//! [`Tracker`](super::service::Tracker) consumes them via generics, so the
//! lifecycle coordinator and the status LED engine never touch hardware
//! directly and run unchanged against the mocks in `tests/`.

use embassy_time::{Duration, Instant};

use super::events::{AppEvent, NetworkEvent};
use crate::drivers::led_patterns::DeviceStatus;
use crate::power::LeaseReason;
use crate::scheduler::Job;

// ───────────────────────────────────────────────────────────────
// Network stack (driven adapter: domain ↔ LoRaWAN MAC)
// ───────────────────────────────────────────────────────────────

/// Commands into the LoRaWAN MAC and its event stream.
///
/// The only ordering the stack guarantees is that `TxStart` precedes
/// the matching `TxComplete`.
pub trait NetworkStack {
    /// Begin (or restart) the join handshake.
    fn start_join(&mut self);

    /// Drop all MAC state.  A join must be issued afterwards.
    fn reset(&mut self);

    /// Queue an uplink on `port`.  Completion arrives as `TxComplete`.
    fn submit_uplink(&mut self, port: u8, payload: &[u8]);

    /// Next pending stack event, delivered after the radio operation
    /// that produced it has finished.
    fn poll_event(&mut self) -> Option<NetworkEvent>;
}

/// Availability of the low-power clock the MAC needs for RX windows.
/// Early after boot it may not have settled yet.
pub trait LowPowerClock {
    fn is_available(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Position sensor (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Minimal polling contract for a positioning (or any telemetry)
/// source.  The coordinator never looks inside the bytes.
pub trait PositionSensor {
    /// Start acquiring a fresh sample.
    fn prepare(&mut self);

    /// `None` when data is ready now, otherwise how long to wait
    /// before asking again.
    fn data_ready_in(&mut self) -> Option<Duration>;

    /// Desired interval between samples.
    fn period(&self) -> Duration;

    /// Copy the latest sample into `buf`, returning the bytes written
    /// (0 when nothing usable was acquired).
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Optional power-gating capability.  Sensors that can be switched
    /// off between samples return `Some`.
    fn power_gating(&mut self) -> Option<&mut dyn PowerGating> {
        None
    }
}

/// Power control extension for sensors that may be switched off
/// between samples.
pub trait PowerGating {
    fn power_up(&mut self);
    fn power_down(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Payload codec (driven adapter: domain ↔ application protocol)
// ───────────────────────────────────────────────────────────────

/// Application payload encoder/decoder.
pub trait PayloadCodec {
    /// Build an uplink frame from a sensor reading (possibly empty).
    /// Returns `(port, len)` of the frame written to `frame`, or `None`
    /// when there is nothing to send.
    fn encode_uplink(&mut self, reading: &[u8], frame: &mut [u8]) -> Option<(u8, usize)>;

    /// Called when the radio starts transmitting.
    fn on_tx_start(&mut self) {}

    /// A downlink arrived with a non-empty payload.
    fn handle_downlink(&mut self, port: u8, payload: &[u8]);
}

// ───────────────────────────────────────────────────────────────
// Charger / battery monitor (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

pub trait ChargerMonitor {
    fn is_charging(&mut self) -> bool;
    fn vbus_present(&mut self) -> bool;
    fn battery_low(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Indicator hardware (driven adapter: domain → LED peripherals)
// ───────────────────────────────────────────────────────────────

/// The two LED channels of the bi-colour indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorChannel {
    Green,
    Red,
}

/// Which peripheral modulates a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSource {
    /// Plain PWM output, gated by the blink timer.
    Pwm,
    /// Hardware breathing engine.
    Breathe,
}

pub trait IndicatorHardware {
    fn enable_channel(&mut self, channel: IndicatorChannel, on: bool);
    fn set_channel_source(&mut self, channel: IndicatorChannel, source: ChannelSource);
    fn enable_breathe(&mut self, on: bool);
    fn enable_blink_timer(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Scheduler and deep-sleep leases (runtime services)
// ───────────────────────────────────────────────────────────────

/// Cooperative timer primitive.  One pending deadline per [`Job`];
/// scheduling a job again replaces its previous deadline.
pub trait Timers {
    /// Monotonic current instant.
    fn now(&self) -> Instant;

    fn schedule_at(&mut self, job: Job, at: Instant);

    fn schedule_now(&mut self, job: Job) {
        let now = self.now();
        self.schedule_at(job, now);
    }

    fn cancel(&mut self, job: Job);

    /// Pending deadline of `job`, if armed.
    fn deadline(&self, job: Job) -> Option<Instant>;
}

/// Time-bounded holds that keep the core out of deep sleep.
pub trait SleepLease {
    /// Hold (or move) `reason`'s lease until the absolute instant `until`.
    fn suspend(&mut self, reason: LeaseReason, until: Instant);

    fn release(&mut self, reason: LeaseReason);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.
/// Adapters decide where they go (serial log, test recorder, ...).
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Status feedback (coordinator → LED engine)
// ───────────────────────────────────────────────────────────────

/// Runtime services lent to a callback for the duration of one dispatch.
pub struct Services<'a> {
    pub timers: &'a mut dyn Timers,
    pub leases: &'a mut dyn SleepLease,
    pub sink: &'a mut dyn EventSink,
}

/// Receiver of coarse device status.  The coordinator pushes every
/// phase change here and knows nothing about how it is rendered.
pub trait StatusFeedback {
    /// Repeating the current status must be a no-op.
    fn notify(&mut self, status: DeviceStatus, svc: &mut Services<'_>);
}
