//! Fuzz target: tracker dispatch under arbitrary stack behaviour
//!
//! Interprets the input as a script of injected stack events, time
//! jumps and charger flips, and verifies:
//! - No panics for any event order
//! - The phase watchdog is armed whenever the tracker is running
//! - A fatal fault is latched and reported by every later call
//!
//! cargo fuzz run fuzz_event_sequence

#![no_main]

use std::collections::VecDeque;

use embassy_time::Duration;
use libfuzzer_sys::fuzz_target;
use loratrack::adapters::sim::{SimCharger, SimClock, SimCodec, SimGps};
use loratrack::app::events::{AppEvent, Downlink, NetworkEvent};
use loratrack::app::ports::{
    ChannelSource, EventSink, IndicatorChannel, IndicatorHardware, NetworkStack,
};
use loratrack::app::service::{Peripherals, Tracker};
use loratrack::config::SystemConfig;
use loratrack::scheduler::Job;

#[derive(Default)]
struct ScriptStack {
    inbox: VecDeque<NetworkEvent>,
}

impl NetworkStack for ScriptStack {
    fn start_join(&mut self) {}
    fn reset(&mut self) {
        self.inbox.clear();
    }
    fn submit_uplink(&mut self, _port: u8, _payload: &[u8]) {}
    fn poll_event(&mut self) -> Option<NetworkEvent> {
        self.inbox.pop_front()
    }
}

struct NullLed;

impl IndicatorHardware for NullLed {
    fn enable_channel(&mut self, _: IndicatorChannel, _: bool) {}
    fn set_channel_source(&mut self, _: IndicatorChannel, _: ChannelSource) {}
    fn enable_breathe(&mut self, _: bool) {}
    fn enable_blink_timer(&mut self, _: bool) {}
}

struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _: &AppEvent) {}
}

fn event_from(b: u8) -> NetworkEvent {
    match b % 9 {
        0 => NetworkEvent::Joining,
        1 => NetworkEvent::Joined { net_id: u32::from(b) },
        2 => NetworkEvent::TxStart,
        3 => NetworkEvent::TxComplete { downlink: None },
        4 => NetworkEvent::TxComplete {
            downlink: Downlink::new(b, &[b; 4]),
        },
        5 => NetworkEvent::LinkDead,
        6 => NetworkEvent::LinkAlive,
        7 => NetworkEvent::BeaconMissed,
        _ => NetworkEvent::RxComplete,
    }
}

fuzz_target!(|data: &[u8]| {
    let mut config = SystemConfig::default();
    config.lifecycle.max_resets = 2;
    config.lifecycle.join_timeout_secs = 60;

    let hw = Peripherals {
        stack: ScriptStack::default(),
        sensor: SimGps::new(Duration::from_secs(30), 3),
        codec: SimCodec::new(),
        clock: SimClock::new(1),
        charger: SimCharger::default(),
        indicator: NullLed,
    };
    let mut tracker = Tracker::new(&config, hw).expect("valid config");
    let mut sink = NullSink;
    tracker.start(&mut sink);

    let mut ops = data.chunks_exact(2);
    for op in &mut ops {
        let (kind, arg) = (op[0], op[1]);
        match kind % 4 {
            0 => tracker.stack_mut().inbox.push_back(event_from(arg)),
            1 => {
                let _ = tracker.advance_by(Duration::from_millis(u64::from(arg) * 100), &mut sink);
            }
            2 => {
                let c = tracker.charger_mut();
                c.charging = arg & 1 != 0;
                c.vbus = arg & 2 != 0;
                c.low = arg & 4 != 0;
            }
            _ => {
                let _ = tracker.advance_by(Duration::from_secs(u64::from(arg) * 10), &mut sink);
            }
        }

        match tracker.fault() {
            Some(_) => {
                assert!(tracker.step(&mut sink).is_err());
                return;
            }
            None => assert!(tracker.deadline(Job::Reset).is_some()),
        }
    }
});
