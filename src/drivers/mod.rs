//! Status indicator: pattern selection and the LED render engine.

pub mod led_patterns;
pub mod status_led;
