//! Unified error types for the LoraTrack firmware.
//!
//! Only two things can go wrong inside the core: the lifecycle watchdog
//! runs out of reset budget (fatal, the device must halt), or a
//! configuration is rejected before the core is built.  Sensor timeouts,
//! missing downlinks and a late low-power clock are normal operation and
//! never surface here.  All variants are `Copy` so the dispatch loop can
//! latch and re-report a fault without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The device hit an unrecoverable condition and must halt.
    Fatal(FatalFault),
    /// Configuration is invalid or could not be decoded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fatal(e) => write!(f, "fatal: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Fatal faults
// ---------------------------------------------------------------------------

/// Conditions that end the process.  The caller aborts or restarts; the
/// core refuses to run any further callbacks once one is raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalFault {
    /// The network stack stayed stuck through more consecutive resets
    /// than the configured budget allows.
    ResetBudgetExhausted { resets: u8 },
}

impl fmt::Display for FatalFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResetBudgetExhausted { resets } => {
                write!(f, "network stack reset budget exhausted after {resets} resets")
            }
        }
    }
}

impl core::error::Error for FatalFault {}

impl From<FatalFault> for Error {
    fn from(e: FatalFault) -> Self {
        Self::Fatal(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from [`SystemConfig`](crate::config::SystemConfig) validation
/// and decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Stored bytes could not be decoded.
    Corrupted,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::Corrupted => write!(f, "config corrupted"),
        }
    }
}

impl core::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
