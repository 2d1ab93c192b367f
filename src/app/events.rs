//! Inbound network-stack events and outbound application events.
//!
//! [`NetworkEvent`]s arrive from the LoRaWAN MAC through
//! [`NetworkStack::poll_event`](super::ports::NetworkStack::poll_event).
//! [`AppEvent`]s leave the core through the
//! [`EventSink`](super::ports::EventSink) port; adapters decide what to do
//! with them (log to serial, record in a test).

use core::fmt;

use crate::drivers::led_patterns::IndicatorState;
use crate::error::FatalFault;
use crate::fsm::LifecyclePhase;

/// Largest application payload a LoRaWAN downlink can carry.
pub const MAX_DOWNLINK_LEN: usize = 242;

/// Application data received in the RX window after an uplink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downlink {
    pub port: u8,
    pub payload: heapless::Vec<u8, MAX_DOWNLINK_LEN>,
}

impl Downlink {
    /// `None` if `payload` exceeds [`MAX_DOWNLINK_LEN`].
    pub fn new(port: u8, payload: &[u8]) -> Option<Self> {
        Some(Self {
            port,
            payload: heapless::Vec::from_slice(payload).ok()?,
        })
    }
}

/// Events reported by the network stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    ScanTimeout,
    BeaconFound,
    BeaconMissed,
    BeaconTracked,
    /// Join handshake in progress.
    Joining,
    /// Join accepted.
    Joined { net_id: u32 },
    JoinFailed,
    RejoinFailed,
    /// Radio began transmitting.
    TxStart,
    /// Uplink finished, RX windows closed.
    TxComplete { downlink: Option<Downlink> },
    LostTsync,
    Reset,
    RxComplete,
    /// Link check failed; the stack gave up on the session.
    LinkDead,
    /// Link check succeeded again.
    LinkAlive,
    ScanFound,
}

impl NetworkEvent {
    /// Stable upper-case name used in debug logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ScanTimeout => "SCAN_TIMEOUT",
            Self::BeaconFound => "BEACON_FOUND",
            Self::BeaconMissed => "BEACON_MISSED",
            Self::BeaconTracked => "BEACON_TRACKED",
            Self::Joining => "JOINING",
            Self::Joined { .. } => "JOINED",
            Self::JoinFailed => "JOIN_FAILED",
            Self::RejoinFailed => "REJOIN_FAILED",
            Self::TxStart => "TXSTART",
            Self::TxComplete { .. } => "TXCOMPLETE",
            Self::LostTsync => "LOST_TSYNC",
            Self::Reset => "RESET",
            Self::RxComplete => "RXCOMPLETE",
            Self::LinkDead => "LINK_DEAD",
            Self::LinkAlive => "LINK_ALIVE",
            Self::ScanFound => "SCAN_FOUND",
        }
    }
}

impl fmt::Display for NetworkEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The tracker has started (carries the initial phase).
    Started(LifecyclePhase),

    /// The lifecycle coordinator changed phase.
    PhaseChanged {
        from: LifecyclePhase,
        to: LifecyclePhase,
    },

    /// The status LED now shows a different colour/pattern.
    IndicatorChanged(IndicatorState),

    /// The phase watchdog fired and the stack was reset.
    ResetIssued { count: u8, max: u8 },

    /// A join request was postponed until the low-power clock settles.
    JoinDeferred,

    /// An uplink frame was handed to the stack.
    UplinkSubmitted { port: u8, len: usize },

    /// A downlink was forwarded to the payload codec.
    DownlinkReceived { port: u8, len: usize },

    /// The device is halting.
    FatalFault(FatalFault),
}
