//! Status LED behaviour as seen through the tracker.
//!
//! The coordinator pushes device status; the render job polls the mock
//! charger.  Assertions are made on the recorded indicator hardware.

use embassy_time::Duration;
use loratrack::app::events::{AppEvent, NetworkEvent};
use loratrack::drivers::led_patterns::{
    BatteryCondition, Color, DeviceStatus, IndicatorState, Pattern,
};
use loratrack::power::LeaseReason;

use super::mock_hw::{LogSink, TestTracker, ms, secs, started};

const IDLE_POLL: Duration = Duration::from_secs(10);

fn inject(tracker: &mut TestTracker, sink: &mut LogSink, event: NetworkEvent) {
    tracker.stack_mut().inject(event);
    tracker.run_pending(sink).unwrap();
}

fn joined() -> (TestTracker, LogSink) {
    let (mut tracker, mut sink) = started();
    inject(&mut tracker, &mut sink, NetworkEvent::Joined { net_id: 1 });
    (tracker, sink)
}

fn shows(tracker: &TestTracker, color: Color, pattern: Pattern) -> bool {
    tracker.indicator() == IndicatorState::new(color, pattern)
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn boot_breathes_yellow() {
    let (tracker, sink) = started();
    assert_eq!(tracker.device_status(), Some(DeviceStatus::Booting));
    assert!(shows(&tracker, Color::Yellow, Pattern::Breathe));
    let led = tracker.indicator_hw();
    assert!(led.green && led.red);
    assert!(!led.blink_timer_on());
    assert_eq!(tracker.sleep().lease(LeaseReason::Indicator), Some(secs(10)));
    assert!(sink.events.contains(&AppEvent::IndicatorChanged(IndicatorState::new(
        Color::Yellow,
        Pattern::Breathe
    ))));
}

#[test]
fn breathe_holds_steady_across_renders() {
    let (mut tracker, mut sink) = started();
    let reconfigs = tracker.indicator_hw().reconfigurations();
    tracker.advance_by(Duration::from_secs(30), &mut sink).unwrap();
    assert!(tracker.led_lit());
    assert_eq!(tracker.indicator_hw().reconfigurations(), reconfigs);
    assert_eq!(tracker.sleep().lease(LeaseReason::Indicator), Some(secs(40)));
}

// ── Blinking ──────────────────────────────────────────────────

#[test]
fn joining_blinks_red_fast() {
    let (mut tracker, mut sink) = started();
    inject(&mut tracker, &mut sink, NetworkEvent::Joining);
    assert!(shows(&tracker, Color::Red, Pattern::BlinkFast));
    assert!(tracker.indicator_hw().blink_timer_on());

    // Status change starts on the lit half.
    assert!(tracker.indicator_hw().red);
    assert!(!tracker.indicator_hw().green);
    assert_eq!(tracker.sleep().lease(LeaseReason::Indicator), Some(ms(250)));

    tracker.advance_by(Duration::from_millis(250), &mut sink).unwrap();
    assert!(!tracker.indicator_hw().red);
    assert_eq!(tracker.sleep().lease(LeaseReason::Indicator), None);

    tracker.advance_by(Duration::from_millis(250), &mut sink).unwrap();
    assert!(tracker.indicator_hw().red);
}

#[test]
fn repeated_status_does_not_touch_hardware() {
    let (mut tracker, mut sink) = started();
    inject(&mut tracker, &mut sink, NetworkEvent::Joining);
    let calls = tracker.indicator_hw().calls.len();
    let changes = sink.count(|e| matches!(e, AppEvent::IndicatorChanged(_)));

    // LinkDead pushes Joining again.
    inject(&mut tracker, &mut sink, NetworkEvent::LinkDead);
    assert_eq!(tracker.indicator_hw().calls.len(), calls);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::IndicatorChanged(_))),
        changes
    );
}

#[test]
fn colour_change_keeps_routing() {
    let (mut tracker, mut sink) = joined();
    inject(&mut tracker, &mut sink, NetworkEvent::TxStart);
    assert!(shows(&tracker, Color::Green, Pattern::BlinkFast));
    let reconfigs = tracker.indicator_hw().reconfigurations();

    inject(&mut tracker, &mut sink, NetworkEvent::LinkDead);
    assert!(shows(&tracker, Color::Red, Pattern::BlinkFast));
    assert_eq!(tracker.indicator_hw().reconfigurations(), reconfigs);
    let led = tracker.indicator_hw();
    assert!(led.red && !led.green);
}

// ── Idle and battery ──────────────────────────────────────────

#[test]
fn idle_with_healthy_battery_is_dark() {
    let (mut tracker, _sink) = joined();
    assert!(shows(&tracker, Color::Off, Pattern::Off));
    let led = tracker.indicator_hw();
    assert!(!led.green && !led.red);
    assert!(!led.blink_timer_on());
    assert_eq!(tracker.sleep().lease(LeaseReason::Indicator), None);
    assert!(tracker.may_sleep());
}

#[test]
fn charging_then_charged() {
    let (mut tracker, mut sink) = joined();
    tracker.charger_mut().charging = true;
    tracker.charger_mut().vbus = true;
    tracker.advance_by(IDLE_POLL, &mut sink).unwrap();
    assert_eq!(tracker.battery(), BatteryCondition::Charging);
    assert!(shows(&tracker, Color::Red, Pattern::Breathe));

    tracker.charger_mut().charging = false;
    tracker.advance_by(IDLE_POLL, &mut sink).unwrap();
    assert_eq!(tracker.battery(), BatteryCondition::Charged);
    assert!(shows(&tracker, Color::Green, Pattern::Breathe));
    let led = tracker.indicator_hw();
    assert!(led.green && !led.red);
}

#[test]
fn charging_outranks_low_battery() {
    let (mut tracker, mut sink) = joined();
    tracker.charger_mut().charging = true;
    tracker.charger_mut().low = true;
    tracker.advance_by(IDLE_POLL, &mut sink).unwrap();
    assert_eq!(tracker.battery(), BatteryCondition::Charging);
}

#[test]
fn battery_hidden_while_joining() {
    let (mut tracker, mut sink) = started();
    inject(&mut tracker, &mut sink, NetworkEvent::Joining);
    tracker.charger_mut().low = true;
    tracker.advance_by(Duration::from_millis(250), &mut sink).unwrap();
    assert_eq!(tracker.battery(), BatteryCondition::Low);
    assert!(shows(&tracker, Color::Red, Pattern::BlinkFast));

    // Shown once the device goes idle.
    inject(&mut tracker, &mut sink, NetworkEvent::Joined { net_id: 1 });
    assert!(shows(&tracker, Color::Red, Pattern::BlinkRare));
}

#[test]
fn sending_blinks_green_and_returns_dark() {
    let (mut tracker, mut sink) = joined();
    inject(&mut tracker, &mut sink, NetworkEvent::TxStart);
    assert_eq!(tracker.device_status(), Some(DeviceStatus::Sending));
    assert!(tracker.indicator_hw().green);

    inject(&mut tracker, &mut sink, NetworkEvent::TxComplete { downlink: None });
    assert_eq!(tracker.device_status(), Some(DeviceStatus::Idle));
    assert!(shows(&tracker, Color::Off, Pattern::Off));
    assert!(!tracker.indicator_hw().green);
    assert!(!tracker.indicator_hw().blink_timer_on());
}

#[test]
fn indicator_events_follow_changes_only() {
    let (mut tracker, mut sink) = joined();
    tracker.advance_by(Duration::from_secs(55), &mut sink).unwrap();
    // Dark -> yellow at boot, yellow -> dark once joined.
    assert_eq!(sink.count(|e| matches!(e, AppEvent::IndicatorChanged(_))), 2);
}
