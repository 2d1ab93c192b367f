//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter          | Implements          | Connects to                  |
//! |------------------|---------------------|------------------------------|
//! | `gpio_indicator` | IndicatorHardware   | two `embedded-hal` GPIO pins |
//! | `log_sink`       | EventSink           | Serial log output            |
//! | `sim`            | NetworkStack        | Scripted LoRaWAN MAC         |
//! |                  | PositionSensor      | Simulated GPS fix            |
//! |                  | PayloadCodec        | Fixed-layout uplink frame    |
//! |                  | LowPowerClock       | Settling 32 kHz oscillator   |
//! |                  | ChargerMonitor      | Scripted USB charger         |
//! |                  | `OutputPin`         | In-memory LED pin            |

pub mod gpio_indicator;
pub mod log_sink;
pub mod sim;
