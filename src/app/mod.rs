//! Application core: pure domain logic, zero I/O.
//!
//! Hosts the tracker service that ties the lifecycle coordinator to the
//! status LED engine.  All interaction with the radio, sensor, charger
//! and LEDs happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
