//! Simulated peripherals for the host bench binary.
//!
//! Everything here is deterministic: the MAC answers instantly, the GPS
//! acquires a fix after a fixed number of polls and the charger is
//! driven by the caller.  Events are queued in a fixed-size outbox and
//! handed to the tracker through [`NetworkStack::poll_event`].

use core::cell::Cell;
use core::convert::Infallible;

use embassy_time::Duration;
use embedded_hal::digital::{ErrorType, OutputPin};
use heapless::Deque;
use log::{debug, warn};

use crate::app::events::{Downlink, NetworkEvent};
use crate::app::ports::{
    ChargerMonitor, LowPowerClock, NetworkStack, PayloadCodec, PositionSensor, PowerGating,
};

// ───────────────────────────────────────────────────────────────
// Network stack
// ───────────────────────────────────────────────────────────────

const OUTBOX_CAP: usize = 8;

/// Downlink port used for the periodic acknowledgement frame.
pub const SIM_DOWNLINK_PORT: u8 = 10;

/// Scripted LoRaWAN MAC.
pub struct SimNetwork {
    outbox: Deque<NetworkEvent, OUTBOX_CAP>,
    accept_joins: bool,
    net_id: u32,
    joined: bool,
    /// Every n-th uplink carries a downlink.
    downlink_every: Option<u32>,
    join_requests: u32,
    resets: u32,
    uplinks: u32,
}

impl SimNetwork {
    pub fn new(net_id: u32) -> Self {
        Self {
            outbox: Deque::new(),
            accept_joins: true,
            net_id,
            joined: false,
            downlink_every: None,
            join_requests: 0,
            resets: 0,
            uplinks: 0,
        }
    }

    /// A network that never answers join requests.
    pub fn stalled(mut self) -> Self {
        self.accept_joins = false;
        self
    }

    pub fn with_downlink_every(mut self, n: u32) -> Self {
        self.downlink_every = (n > 0).then_some(n);
        self
    }

    pub fn set_accept_joins(&mut self, accept: bool) {
        self.accept_joins = accept;
    }

    /// Report a failed link check; the session is gone.
    pub fn drop_link(&mut self) {
        self.joined = false;
        self.push(NetworkEvent::LinkDead);
    }

    pub fn join_requests(&self) -> u32 {
        self.join_requests
    }

    pub fn resets(&self) -> u32 {
        self.resets
    }

    pub fn uplinks(&self) -> u32 {
        self.uplinks
    }

    fn push(&mut self, event: NetworkEvent) {
        if let Err(dropped) = self.outbox.push_back(event) {
            warn!("sim stack: outbox full, dropping {}", dropped);
        }
    }
}

impl NetworkStack for SimNetwork {
    fn start_join(&mut self) {
        self.join_requests += 1;
        self.push(NetworkEvent::Joining);
        if self.accept_joins {
            self.push(NetworkEvent::TxStart);
            self.joined = true;
            self.push(NetworkEvent::Joined {
                net_id: self.net_id,
            });
        }
    }

    fn reset(&mut self) {
        self.resets += 1;
        self.joined = false;
        self.outbox.clear();
    }

    fn submit_uplink(&mut self, port: u8, payload: &[u8]) {
        if !self.joined {
            warn!("sim stack: uplink on port {} while not joined", port);
            return;
        }
        self.uplinks += 1;
        debug!("sim stack: uplink #{} port {} {:02x?}", self.uplinks, port, payload);
        let downlink = match self.downlink_every {
            Some(n) if self.uplinks % n == 0 => {
                let seq = (self.uplinks as u16).to_be_bytes();
                Downlink::new(SIM_DOWNLINK_PORT, &seq)
            }
            _ => None,
        };
        self.push(NetworkEvent::TxStart);
        self.push(NetworkEvent::TxComplete { downlink });
    }

    fn poll_event(&mut self) -> Option<NetworkEvent> {
        self.outbox.pop_front()
    }
}

// ───────────────────────────────────────────────────────────────
// GPS
// ───────────────────────────────────────────────────────────────

/// Packed fix layout: quality byte, then latitude and longitude in
/// 1/10000 arc-minutes, little-endian.
pub const FIX_LEN: usize = 9;

const FIX_POLL: Duration = Duration::from_millis(100);

/// GPS receiver that needs a fixed number of polls to acquire a fix.
pub struct SimGps {
    period: Duration,
    polls_to_fix: u32,
    remaining: u32,
    powered: bool,
    lat: i32,
    lon: i32,
    fixes: u32,
}

impl SimGps {
    pub fn new(period: Duration, polls_to_fix: u32) -> Self {
        Self {
            period,
            polls_to_fix,
            remaining: polls_to_fix,
            powered: false,
            // 59°19.8' N, 18°4.1' E
            lat: 35_598_000,
            lon: 10_841_000,
            fixes: 0,
        }
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    pub fn fixes(&self) -> u32 {
        self.fixes
    }

    fn has_fix(&self) -> bool {
        self.remaining == 0
    }
}

impl PositionSensor for SimGps {
    fn prepare(&mut self) {
        self.remaining = self.polls_to_fix;
    }

    fn data_ready_in(&mut self) -> Option<Duration> {
        if self.has_fix() {
            return None;
        }
        self.remaining -= 1;
        Some(FIX_POLL)
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        if !self.has_fix() || buf.len() < FIX_LEN {
            return 0;
        }
        self.fixes += 1;
        // Drift north a little every fix.
        self.lat += 10;
        buf[0] = 1;
        buf[1..5].copy_from_slice(&self.lat.to_le_bytes());
        buf[5..9].copy_from_slice(&self.lon.to_le_bytes());
        FIX_LEN
    }

    fn power_gating(&mut self) -> Option<&mut dyn PowerGating> {
        Some(self)
    }
}

impl PowerGating for SimGps {
    fn power_up(&mut self) {
        self.powered = true;
    }

    fn power_down(&mut self) {
        self.powered = false;
    }
}

// ───────────────────────────────────────────────────────────────
// Payload codec
// ───────────────────────────────────────────────────────────────

/// Uplink port for position frames.
pub const POSITION_PORT: u8 = 1;
/// Uplink port for "alive, no fix" frames.
pub const HEARTBEAT_PORT: u8 = 2;

/// Frame layout: sequence byte, then the raw reading.
#[derive(Debug, Default)]
pub struct SimCodec {
    seq: u8,
    tx_started: u32,
    downlinks: u32,
    last_downlink: Option<(u8, heapless::Vec<u8, 16>)>,
}

impl SimCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tx_started(&self) -> u32 {
        self.tx_started
    }

    pub fn downlinks(&self) -> u32 {
        self.downlinks
    }

    pub fn last_downlink(&self) -> Option<(u8, &[u8])> {
        self.last_downlink
            .as_ref()
            .map(|(port, bytes)| (*port, bytes.as_slice()))
    }
}

impl PayloadCodec for SimCodec {
    fn encode_uplink(&mut self, reading: &[u8], frame: &mut [u8]) -> Option<(u8, usize)> {
        let len = 1 + reading.len();
        if frame.len() < len {
            return None;
        }
        frame[0] = self.seq;
        frame[1..len].copy_from_slice(reading);
        self.seq = self.seq.wrapping_add(1);
        let port = if reading.is_empty() {
            HEARTBEAT_PORT
        } else {
            POSITION_PORT
        };
        Some((port, len))
    }

    fn on_tx_start(&mut self) {
        self.tx_started += 1;
    }

    fn handle_downlink(&mut self, port: u8, payload: &[u8]) {
        self.downlinks += 1;
        let head = &payload[..payload.len().min(16)];
        self.last_downlink = heapless::Vec::from_slice(head).ok().map(|v| (port, v));
    }
}

// ───────────────────────────────────────────────────────────────
// Low-power clock
// ───────────────────────────────────────────────────────────────

/// 32 kHz oscillator that reports ready after a number of checks.
pub struct SimClock {
    settle_checks: Cell<u32>,
}

impl SimClock {
    pub fn new(settle_checks: u32) -> Self {
        Self {
            settle_checks: Cell::new(settle_checks),
        }
    }

    pub fn ready() -> Self {
        Self::new(0)
    }
}

impl LowPowerClock for SimClock {
    fn is_available(&self) -> bool {
        let left = self.settle_checks.get();
        if left == 0 {
            return true;
        }
        self.settle_checks.set(left - 1);
        false
    }
}

// ───────────────────────────────────────────────────────────────
// Charger
// ───────────────────────────────────────────────────────────────

/// Charger whose lines are set by the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimCharger {
    pub charging: bool,
    pub vbus: bool,
    pub low: bool,
}

impl SimCharger {
    /// USB plugged in, battery charging.
    pub fn plug_in(&mut self) {
        self.vbus = true;
        self.charging = true;
        self.low = false;
    }

    /// Charge complete, still on USB.
    pub fn charge_done(&mut self) {
        self.charging = false;
    }

    pub fn unplug(&mut self) {
        self.vbus = false;
        self.charging = false;
    }
}

impl ChargerMonitor for SimCharger {
    fn is_charging(&mut self) -> bool {
        self.charging
    }

    fn vbus_present(&mut self) -> bool {
        self.vbus
    }

    fn battery_low(&mut self) -> bool {
        self.low
    }
}

// ───────────────────────────────────────────────────────────────
// LED pin
// ───────────────────────────────────────────────────────────────

/// Output pin that only remembers its level.
#[derive(Debug, Default)]
pub struct SimPin {
    high: bool,
    toggles: u32,
}

impl SimPin {
    pub fn is_high(&self) -> bool {
        self.high
    }

    /// Level changes since construction.
    pub fn toggles(&self) -> u32 {
        self.toggles
    }

    fn set(&mut self, high: bool) {
        if self.high != high {
            self.toggles += 1;
        }
        self.high = high;
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set(true);
        Ok(())
    }
}
