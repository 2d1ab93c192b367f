//! Bi-colour status LED engine.
//!
//! Owns the charger monitor and the two indicator channels.  The
//! lifecycle coordinator pushes [`DeviceStatus`] changes in through
//! [`StatusFeedback::notify`]; a self-rescheduling render job on
//! [`Job::Indicator`] polls the battery and drives the blink cadence.
//!
//! ```text
//!   notify(status) ──▶ select(status, battery) ──▶ pattern changed? ──▶ route hardware
//!                                                         │
//!   Job::Indicator ──▶ poll battery ──▶ draw ◀────────────┘
//!                                        │
//!                                        ├─▶ channels on/off
//!                                        ├─▶ re-arm Job::Indicator
//!                                        └─▶ hold / release sleep lease
//! ```
//!
//! ## Hardware routing
//!
//! | Pattern        | Channel source | Breathe engine | Blink timer |
//! |----------------|----------------|----------------|-------------|
//! | Off            | Pwm            | off            | off         |
//! | Breathe        | Breathe        | on             | off         |
//! | BlinkFast/Rare | Pwm            | off            | on          |

use embassy_time::Duration;
use log::{debug, info};

use super::led_patterns::{select, BatteryCondition, DeviceStatus, IndicatorState, Pattern};
use crate::app::events::AppEvent;
use crate::app::ports::{
    ChannelSource, ChargerMonitor, EventSink, IndicatorChannel, IndicatorHardware, Services,
    StatusFeedback,
};
use crate::config::IndicatorConfig;
use crate::power::LeaseReason;
use crate::scheduler::Job;

/// The LED engine.
pub struct FeedbackEngine<C, I> {
    charger: C,
    hw: I,
    cfg: IndicatorConfig,
    /// Last status pushed by the coordinator; `None` until the first push.
    status: Option<DeviceStatus>,
    battery: BatteryCondition,
    indicator: IndicatorState,
    /// Whether the channels are currently driven.
    lit: bool,
}

impl<C: ChargerMonitor, I: IndicatorHardware> FeedbackEngine<C, I> {
    /// Take ownership of the peripherals and route them for a dark LED.
    pub fn new(charger: C, hw: I, cfg: IndicatorConfig) -> Self {
        let mut engine = Self {
            charger,
            hw,
            cfg,
            status: None,
            battery: BatteryCondition::Ok,
            indicator: IndicatorState::OFF,
            lit: false,
        };
        engine.route_hardware();
        engine.hw.enable_channel(IndicatorChannel::Green, false);
        engine.hw.enable_channel(IndicatorChannel::Red, false);
        engine
    }

    /// Kick off the render loop.
    pub fn start(&mut self, svc: &mut Services<'_>) {
        svc.timers.schedule_now(Job::Indicator);
    }

    /// Render job callback.
    pub fn render(&mut self, svc: &mut Services<'_>) {
        self.draw(false, svc);
    }

    pub fn status(&self) -> Option<DeviceStatus> {
        self.status
    }

    pub fn battery(&self) -> BatteryCondition {
        self.battery
    }

    pub fn indicator(&self) -> IndicatorState {
        self.indicator
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    pub fn hardware(&self) -> &I {
        &self.hw
    }

    pub fn hardware_mut(&mut self) -> &mut I {
        &mut self.hw
    }

    pub fn charger_mut(&mut self) -> &mut C {
        &mut self.charger
    }

    // ───────────────────────────────────────────────────────────────
    // Internal
    // ───────────────────────────────────────────────────────────────

    fn poll_battery(&mut self) -> BatteryCondition {
        if self.charger.is_charging() {
            BatteryCondition::Charging
        } else if self.charger.vbus_present() {
            BatteryCondition::Charged
        } else if self.charger.battery_low() {
            BatteryCondition::Low
        } else {
            BatteryCondition::Ok
        }
    }

    /// Re-poll the charger.  Returns `true` if the indicator changed.
    fn refresh_battery(&mut self, sink: &mut dyn EventSink) -> bool {
        let battery = self.poll_battery();
        if battery == self.battery {
            return false;
        }
        debug!("battery {:?} -> {:?}", self.battery, battery);
        self.battery = battery;
        self.update_indicator(sink)
    }

    /// Recompute the indicator.  Hardware is only re-routed when the
    /// pattern changes.  Returns `true` if the indicator changed.
    fn update_indicator(&mut self, sink: &mut dyn EventSink) -> bool {
        let status = self.status.unwrap_or(DeviceStatus::Idle);
        let next = select(status, self.battery);
        if next == self.indicator {
            return false;
        }
        info!(
            "indicator {:?}/{:?} -> {:?}/{:?}",
            self.indicator.color, self.indicator.pattern, next.color, next.pattern
        );
        let rerouted = next.pattern != self.indicator.pattern;
        self.indicator = next;
        if rerouted {
            self.route_hardware();
        }
        sink.emit(&AppEvent::IndicatorChanged(next));
        true
    }

    fn route_hardware(&mut self) {
        let pattern = self.indicator.pattern;
        let breathe = pattern == Pattern::Breathe;
        let source = if breathe {
            ChannelSource::Breathe
        } else {
            ChannelSource::Pwm
        };
        self.hw.enable_breathe(breathe);
        self.hw.set_channel_source(IndicatorChannel::Green, source);
        self.hw.set_channel_source(IndicatorChannel::Red, source);
        self.hw.enable_blink_timer(pattern.blinks());
    }

    /// Drive the channels for the current indicator and schedule the
    /// next render.  `forced` restarts a blink on its lit half.
    fn draw(&mut self, forced: bool, svc: &mut Services<'_>) {
        let now = svc.timers.now();
        let restart = self.refresh_battery(svc.sink) || forced;

        let mut delay = self.cfg.idle_poll();
        match self.indicator.pattern {
            Pattern::Off => self.lit = false,
            Pattern::Breathe => self.lit = true,
            Pattern::BlinkFast => {
                self.lit = restart || !self.lit;
                delay = self.cfg.fast_blink();
            }
            Pattern::BlinkRare => {
                self.lit = restart || !self.lit;
                delay = self.rare_phase();
            }
        }

        let color = self.indicator.color;
        self.hw
            .enable_channel(IndicatorChannel::Green, self.lit && color.has_green());
        self.hw
            .enable_channel(IndicatorChannel::Red, self.lit && color.has_red());

        let next = now + delay;
        svc.timers.schedule_at(Job::Indicator, next);
        if self.lit {
            svc.leases.suspend(LeaseReason::Indicator, next);
        } else {
            svc.leases.release(LeaseReason::Indicator);
        }
    }

    fn rare_phase(&self) -> Duration {
        if self.lit {
            self.cfg.rare_blink_on()
        } else {
            self.cfg.rare_blink_off()
        }
    }
}

impl<C: ChargerMonitor, I: IndicatorHardware> StatusFeedback for FeedbackEngine<C, I> {
    fn notify(&mut self, status: DeviceStatus, svc: &mut Services<'_>) {
        if self.status == Some(status) {
            return;
        }
        debug!("status -> {:?}", status);
        self.status = Some(status);
        if self.update_indicator(svc.sink) {
            self.draw(true, svc);
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
