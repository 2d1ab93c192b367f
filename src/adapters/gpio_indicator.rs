//! Indicator adapter over two plain GPIO outputs.
//!
//! Boards without a PWM breathing engine wire the LEDs to ordinary
//! pins.  Breathing degrades to steady on; blinking is driven by the
//! render loop toggling the channels, so the blink timer is a no-op.
//! Pin errors are logged and otherwise ignored, matching how the
//! engine treats the indicator as best-effort.

use embedded_hal::digital::OutputPin;
use log::warn;

use crate::app::ports::{ChannelSource, IndicatorChannel, IndicatorHardware};

/// Two-pin indicator: one output per colour.
pub struct GpioIndicator<G, R> {
    green: G,
    red: R,
    active_low: bool,
    green_on: bool,
    red_on: bool,
    breathing: bool,
}

impl<G: OutputPin, R: OutputPin> GpioIndicator<G, R> {
    pub fn new(green: G, red: R) -> Self {
        Self {
            green,
            red,
            active_low: false,
            green_on: false,
            red_on: false,
            breathing: false,
        }
    }

    /// LEDs wired to the supply rail light when the pin is driven low.
    pub fn active_low(mut self) -> Self {
        self.active_low = true;
        self
    }

    pub fn is_on(&self, channel: IndicatorChannel) -> bool {
        match channel {
            IndicatorChannel::Green => self.green_on,
            IndicatorChannel::Red => self.red_on,
        }
    }

    /// `true` while a breathe pattern is shown as steady light.
    pub fn is_breathing(&self) -> bool {
        self.breathing
    }

    pub fn release(self) -> (G, R) {
        (self.green, self.red)
    }
}

fn drive<P: OutputPin>(pin: &mut P, level_high: bool, name: &str) {
    let res = if level_high {
        pin.set_high()
    } else {
        pin.set_low()
    };
    if res.is_err() {
        warn!("indicator: {} pin write failed", name);
    }
}

impl<G: OutputPin, R: OutputPin> IndicatorHardware for GpioIndicator<G, R> {
    fn enable_channel(&mut self, channel: IndicatorChannel, on: bool) {
        let level = on != self.active_low;
        match channel {
            IndicatorChannel::Green => {
                drive(&mut self.green, level, "green");
                self.green_on = on;
            }
            IndicatorChannel::Red => {
                drive(&mut self.red, level, "red");
                self.red_on = on;
            }
        }
    }

    fn set_channel_source(&mut self, _channel: IndicatorChannel, _source: ChannelSource) {}

    fn enable_breathe(&mut self, on: bool) {
        self.breathing = on;
    }

    fn enable_blink_timer(&mut self, _on: bool) {}
}
