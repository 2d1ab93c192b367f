//! End-to-end scenarios: boot to idle, a sensor that never answers, a
//! battery going low while idle and a network stack that never recovers.

use embassy_time::{Duration, Instant};
use loratrack::adapters::gpio_indicator::GpioIndicator;
use loratrack::adapters::log_sink::LogEventSink;
use loratrack::adapters::sim::{SimCharger, SimClock, SimCodec, SimGps, SimNetwork, SimPin};
use loratrack::app::events::{AppEvent, NetworkEvent};
use loratrack::app::service::{Peripherals, Tracker};
use loratrack::config::SystemConfig;
use loratrack::drivers::led_patterns::{Color, IndicatorState, Pattern};
use loratrack::fsm::LifecyclePhase::{self, *};
use loratrack::scheduler::Job;
use loratrack::{Error, FatalFault};

use super::mock_hw::{StackCall, ms, secs, started, started_with};

fn phase_changes(events: &[AppEvent]) -> Vec<(LifecyclePhase, LifecyclePhase)> {
    events
        .iter()
        .filter_map(|e| match e {
            AppEvent::PhaseChanged { from, to } => Some((*from, *to)),
            _ => None,
        })
        .collect()
}

#[test]
fn boot_join_sample_send_idle() {
    let (mut tracker, mut sink) =
        started_with(&SystemConfig::default(), |hw| hw.sensor.ready_after = Some(2));
    assert_eq!(tracker.phase(), Joining);
    assert_eq!(
        tracker.indicator(),
        IndicatorState::new(Color::Yellow, Pattern::Breathe)
    );

    tracker.stack_mut().inject(NetworkEvent::Joined { net_id: 0x13 });
    tracker.run_pending(&mut sink).unwrap();
    assert_eq!(tracker.phase(), SamplingSensor);
    assert_eq!(tracker.indicator(), IndicatorState::OFF);

    tracker.advance_to(ms(200), &mut sink).unwrap();
    assert_eq!(tracker.phase(), WaitingToSend);
    assert_eq!(tracker.stack().uplinks().len(), 1);

    tracker.stack_mut().inject(NetworkEvent::TxStart);
    tracker.run_pending(&mut sink).unwrap();
    assert_eq!(tracker.phase(), Sending);
    assert_eq!(
        tracker.indicator(),
        IndicatorState::new(Color::Green, Pattern::BlinkFast)
    );

    tracker.advance_to(secs(2), &mut sink).unwrap();
    tracker.stack_mut().inject(NetworkEvent::TxComplete { downlink: None });
    tracker.run_pending(&mut sink).unwrap();
    assert_eq!(tracker.phase(), Joined);
    assert_eq!(tracker.indicator(), IndicatorState::OFF);
    assert!(tracker.may_sleep());

    assert_eq!(
        phase_changes(&sink.events),
        vec![
            (Joining, Joined),
            (Joined, SamplingSensor),
            (SamplingSensor, WaitingToSend),
            (WaitingToSend, Sending),
            (Sending, Joined),
        ]
    );
}

#[test]
fn silent_sensor_sends_when_window_closes() {
    let (mut tracker, mut sink) =
        started_with(&SystemConfig::default(), |hw| hw.sensor.ready_after = None);
    tracker.stack_mut().inject(NetworkEvent::Joined { net_id: 1 });
    tracker.run_pending(&mut sink).unwrap();

    tracker.advance_to(ms(1999), &mut sink).unwrap();
    assert_eq!(tracker.phase(), SamplingSensor);
    assert!(tracker.stack().uplinks().is_empty());

    tracker.advance_to(secs(2), &mut sink).unwrap();
    assert_eq!(tracker.phase(), WaitingToSend);
    assert_eq!(tracker.stack().uplinks(), vec![(2, Vec::new())]);
    assert!(!tracker.sensor().powered);
    // Next cycle counts from the moment the window closed.
    assert_eq!(tracker.deadline(Job::Sensor), Some(secs(62)));
}

#[test]
fn low_battery_shows_within_one_render() {
    let (mut tracker, mut sink) = started();
    tracker.stack_mut().inject(NetworkEvent::Joined { net_id: 1 });
    tracker.run_pending(&mut sink).unwrap();
    assert_eq!(tracker.indicator(), IndicatorState::OFF);

    tracker.charger_mut().low = true;
    tracker
        .advance_by(Duration::from_secs(10), &mut sink)
        .unwrap();
    assert_eq!(
        tracker.indicator(),
        IndicatorState::new(Color::Red, Pattern::BlinkRare)
    );
    // Short flash then long pause.
    assert!(tracker.indicator_hw().red);
    tracker.advance_by(Duration::from_millis(62), &mut sink).unwrap();
    assert!(!tracker.indicator_hw().red);
    assert_eq!(tracker.deadline(Job::Indicator), Some(ms(10_062 + 4_000)));
}

#[test]
fn ninth_reset_halts() {
    let mut config = SystemConfig::default();
    config.lifecycle.join_timeout_secs = 60;
    let (mut tracker, mut sink) = started_with(&config, |_| {});

    tracker.advance_to(secs(8 * 60), &mut sink).unwrap();
    assert_eq!(tracker.resets(), 8);
    assert_eq!(tracker.stack().count(&StackCall::Reset), 8);

    let err = tracker.advance_to(secs(9 * 60), &mut sink).unwrap_err();
    let fault = FatalFault::ResetBudgetExhausted { resets: 9 };
    assert_eq!(err, Error::Fatal(fault));
    assert_eq!(tracker.stack().count(&StackCall::Reset), 8);
    assert_eq!(tracker.step(&mut sink), Err(Error::Fatal(fault)));
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::ResetIssued { .. })),
        8
    );
}

#[test]
fn largest_reset_budget_still_halts() {
    let mut config = SystemConfig::default();
    config.lifecycle.join_timeout_secs = 60;
    config.lifecycle.max_resets = u8::MAX;
    let (mut tracker, mut sink) = started_with(&config, |_| {});

    tracker.advance_to(secs(255 * 60), &mut sink).unwrap();
    assert_eq!(tracker.resets(), u8::MAX);

    let err = tracker.advance_to(secs(256 * 60), &mut sink).unwrap_err();
    let fault = FatalFault::ResetBudgetExhausted { resets: u8::MAX };
    assert_eq!(err, Error::Fatal(fault));
    assert_eq!(tracker.stack().count(&StackCall::Reset), 255);
    assert_eq!(tracker.step(&mut sink), Err(Error::Fatal(fault)));
}

#[test]
fn hour_on_simulated_hardware() {
    let hw = Peripherals {
        stack: SimNetwork::new(0x13),
        sensor: SimGps::new(Duration::from_secs(60), 5),
        codec: SimCodec::new(),
        clock: SimClock::new(2),
        charger: SimCharger::default(),
        indicator: GpioIndicator::new(SimPin::default(), SimPin::default()),
    };
    let mut tracker = Tracker::new(&SystemConfig::default(), hw).unwrap();
    let mut sink = LogEventSink::new();
    tracker.start(&mut sink);
    tracker
        .advance_to(Instant::from_secs(3600), &mut sink)
        .unwrap();

    assert_eq!(tracker.stack().resets(), 0);
    assert_eq!(tracker.stack().join_requests(), 1);
    assert!(tracker.stack().uplinks() >= 55);
    assert!(tracker.sensor().fixes() >= 55);
    assert_eq!(sink.resets(), 0);
    assert_eq!(tracker.codec().downlinks(), 0);
    assert_ne!(tracker.phase(), Joining);
}

#[test]
fn stalled_network_never_uplinks() {
    let hw = Peripherals {
        stack: SimNetwork::new(0x13).stalled(),
        sensor: SimGps::new(Duration::from_secs(60), 5),
        codec: SimCodec::new(),
        clock: SimClock::ready(),
        charger: SimCharger::default(),
        indicator: GpioIndicator::new(SimPin::default(), SimPin::default()),
    };
    let mut tracker = Tracker::new(&SystemConfig::default(), hw).unwrap();
    let mut sink = LogEventSink::new();
    tracker.start(&mut sink);
    tracker
        .advance_to(Instant::from_secs(3 * 3600), &mut sink)
        .unwrap();

    assert_eq!(tracker.phase(), Joining);
    assert_eq!(tracker.stack().uplinks(), 0);
    assert_eq!(tracker.stack().resets(), 1);
    assert_eq!(tracker.resets(), 1);
}
