//! Mock adapters for integration tests.
//!
//! Every mock records what the core asked of it so tests can assert on
//! the full command history without a radio, GPS or LEDs.

use std::collections::VecDeque;

use embassy_time::{Duration, Instant};
use loratrack::app::events::{AppEvent, NetworkEvent};
use loratrack::app::ports::{
    ChannelSource, ChargerMonitor, EventSink, IndicatorChannel, IndicatorHardware, LowPowerClock,
    NetworkStack, PayloadCodec, PositionSensor, PowerGating,
};
use loratrack::app::service::{Peripherals, Tracker};
use loratrack::config::SystemConfig;

// ── Network stack ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum StackCall {
    StartJoin,
    Reset,
    Uplink { port: u8, payload: Vec<u8> },
}

/// Stack whose events are injected by the test.
#[derive(Default)]
pub struct MockStack {
    pub calls: Vec<StackCall>,
    pub inbox: VecDeque<NetworkEvent>,
}

#[allow(dead_code)]
impl MockStack {
    pub fn inject(&mut self, event: NetworkEvent) {
        self.inbox.push_back(event);
    }

    pub fn uplinks(&self) -> Vec<(u8, Vec<u8>)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                StackCall::Uplink { port, payload } => Some((*port, payload.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &StackCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

impl NetworkStack for MockStack {
    fn start_join(&mut self) {
        self.calls.push(StackCall::StartJoin);
    }

    fn reset(&mut self) {
        self.calls.push(StackCall::Reset);
    }

    fn submit_uplink(&mut self, port: u8, payload: &[u8]) {
        self.calls.push(StackCall::Uplink {
            port,
            payload: payload.to_vec(),
        });
    }

    fn poll_event(&mut self) -> Option<NetworkEvent> {
        self.inbox.pop_front()
    }
}

// ── Position sensor ───────────────────────────────────────────

pub const FIX: [u8; 9] = [1, 0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70, 0x7F];

/// GPS mock: ready after `ready_after` polls (`None` = never).
pub struct MockGps {
    pub ready_after: Option<u32>,
    pub poll_delay: Duration,
    pub period: Duration,
    pub gated: bool,
    pub powered: bool,
    pub prepares: u32,
    pub polls: u32,
    pub power_cycles: u32,
}

impl Default for MockGps {
    fn default() -> Self {
        Self {
            ready_after: Some(0),
            poll_delay: Duration::from_millis(100),
            period: Duration::from_secs(60),
            gated: true,
            powered: false,
            prepares: 0,
            polls: 0,
            power_cycles: 0,
        }
    }
}

impl PositionSensor for MockGps {
    fn prepare(&mut self) {
        self.prepares += 1;
        self.polls = 0;
    }

    fn data_ready_in(&mut self) -> Option<Duration> {
        match self.ready_after {
            Some(n) if self.polls >= n => None,
            _ => {
                self.polls += 1;
                Some(self.poll_delay)
            }
        }
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        match self.ready_after {
            Some(n) if self.polls >= n => {
                buf[..FIX.len()].copy_from_slice(&FIX);
                FIX.len()
            }
            _ => 0,
        }
    }

    fn power_gating(&mut self) -> Option<&mut dyn PowerGating> {
        if self.gated { Some(self) } else { None }
    }
}

impl PowerGating for MockGps {
    fn power_up(&mut self) {
        self.powered = true;
    }

    fn power_down(&mut self) {
        self.powered = false;
        self.power_cycles += 1;
    }
}

// ── Payload codec ─────────────────────────────────────────────

/// Passes the reading through on port 1; empty readings go on port 2.
#[derive(Default)]
pub struct MockCodec {
    pub readings: Vec<Vec<u8>>,
    pub downlinks: Vec<(u8, Vec<u8>)>,
    pub tx_starts: u32,
    pub decline: bool,
}

impl PayloadCodec for MockCodec {
    fn encode_uplink(&mut self, reading: &[u8], frame: &mut [u8]) -> Option<(u8, usize)> {
        self.readings.push(reading.to_vec());
        if self.decline {
            return None;
        }
        frame[..reading.len()].copy_from_slice(reading);
        let port = if reading.is_empty() { 2 } else { 1 };
        Some((port, reading.len()))
    }

    fn on_tx_start(&mut self) {
        self.tx_starts += 1;
    }

    fn handle_downlink(&mut self, port: u8, payload: &[u8]) {
        self.downlinks.push((port, payload.to_vec()));
    }
}

// ── Clock and charger ─────────────────────────────────────────

pub struct MockClock {
    pub available: bool,
}

impl Default for MockClock {
    fn default() -> Self {
        Self { available: true }
    }
}

impl LowPowerClock for MockClock {
    fn is_available(&self) -> bool {
        self.available
    }
}

#[derive(Default)]
pub struct MockCharger {
    pub charging: bool,
    pub vbus: bool,
    pub low: bool,
}

impl ChargerMonitor for MockCharger {
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

// ── Indicator ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LedCall {
    Channel(IndicatorChannel, bool),
    Source(IndicatorChannel, ChannelSource),
    Breathe(bool),
    BlinkTimer(bool),
}

#[derive(Default)]
pub struct RecordingLed {
    pub calls: Vec<LedCall>,
    pub green: bool,
    pub red: bool,
}

#[allow(dead_code)]
impl RecordingLed {
    /// Number of times the hardware was re-routed for a new pattern.
    pub fn reconfigurations(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, LedCall::Breathe(_)))
            .count()
    }

    pub fn blink_timer_on(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                LedCall::BlinkTimer(on) => Some(*on),
                _ => None,
            })
            .unwrap_or(false)
    }
}

impl IndicatorHardware for RecordingLed {
    fn enable_channel(&mut self, channel: IndicatorChannel, on: bool) {
        match channel {
            IndicatorChannel::Green => self.green = on,
            IndicatorChannel::Red => self.red = on,
        }
        self.calls.push(LedCall::Channel(channel, on));
    }

    fn set_channel_source(&mut self, channel: IndicatorChannel, source: ChannelSource) {
        self.calls.push(LedCall::Source(channel, source));
    }

    fn enable_breathe(&mut self, on: bool) {
        self.calls.push(LedCall::Breathe(on));
    }

    fn enable_blink_timer(&mut self, on: bool) {
        self.calls.push(LedCall::BlinkTimer(on));
    }
}

// ── Event sink ────────────────────────────────────────────────

/// Collects all emitted events for assertion.
#[derive(Default)]
pub struct LogSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for LogSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Harness ───────────────────────────────────────────────────

pub type TestTracker = Tracker<MockStack, MockGps, MockCodec, MockClock, MockCharger, RecordingLed>;

pub fn peripherals() -> Peripherals<MockStack, MockGps, MockCodec, MockClock, MockCharger, RecordingLed> {
    Peripherals {
        stack: MockStack::default(),
        sensor: MockGps::default(),
        codec: MockCodec::default(),
        clock: MockClock::default(),
        charger: MockCharger::default(),
        indicator: RecordingLed::default(),
    }
}

/// A started tracker with default config and mocks.
#[allow(dead_code)]
pub fn started() -> (TestTracker, LogSink) {
    started_with(&SystemConfig::default(), |_| {})
}

/// A started tracker after `tweak` adjusted the mocks.
pub fn started_with(
    config: &SystemConfig,
    tweak: impl FnOnce(
        &mut Peripherals<MockStack, MockGps, MockCodec, MockClock, MockCharger, RecordingLed>,
    ),
) -> (TestTracker, LogSink) {
    let mut hw = peripherals();
    tweak(&mut hw);
    let mut tracker = Tracker::new(config, hw).expect("valid config");
    let mut sink = LogSink::new();
    tracker.start(&mut sink);
    tracker.run_pending(&mut sink).expect("no fault at boot");
    (tracker, sink)
}

#[allow(dead_code)]
pub fn secs(s: u64) -> Instant {
    Instant::from_secs(s)
}

#[allow(dead_code)]
pub fn ms(v: u64) -> Instant {
    Instant::from_millis(v)
}
