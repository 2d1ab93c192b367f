//! LoraTrack firmware library.
//!
//! Exposes the pure-logic core (lifecycle coordinator, status LED
//! engine, job queue, sleep governor) for integration testing and for
//! the host bench binary.  Radio, GPS and charger hardware live behind
//! the port traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod power;
pub mod scheduler;

pub use error::{Error, FatalFault, Result};
