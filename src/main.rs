//! LoraTrack bench simulator.
//!
//! Runs the tracker core against simulated peripherals on virtual time,
//! so a day of operation takes milliseconds.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  SimNetwork   SimGps   SimCodec   SimClock   SimCharger      │
//! │  GpioIndicator<SimPin, SimPin>    LogEventSink               │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │             Tracker (pure logic)                       │  │
//! │  │  Coordinator · FeedbackEngine · JobQueue · Sleep       │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `loratrack-sim [--config PATH] [--hours N] [--stall]`
//!
//! `--stall` makes the network ignore join requests; the watchdog then
//! exhausts its reset budget and the process exits non-zero.
#![deny(unused_must_use)]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use embassy_time::{Duration, Instant};
use log::{error, info};
use tracing_subscriber::EnvFilter;

use loratrack::adapters::gpio_indicator::GpioIndicator;
use loratrack::adapters::log_sink::LogEventSink;
use loratrack::adapters::sim::{SimCharger, SimClock, SimCodec, SimGps, SimNetwork, SimPin};
use loratrack::app::ports::IndicatorChannel;
use loratrack::app::service::{Peripherals, Tracker};
use loratrack::config::SystemConfig;

const NET_ID: u32 = 0x13;
const GPS_PERIOD: Duration = Duration::from_secs(60);
const GPS_POLLS_TO_FIX: u32 = 12;
const CLOCK_SETTLE_CHECKS: u32 = 3;
const DOWNLINK_EVERY: u32 = 10;

// ── Command line ──────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "loratrack-sim")]
#[command(about = "Run the LoraTrack core on simulated peripherals")]
#[command(version)]
struct Options {
    /// JSON configuration file (defaults are used when absent)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Virtual hours to simulate
    #[arg(long, default_value_t = 24, value_parser = clap::value_parser!(u64).range(1..))]
    hours: u64,

    /// Network ignores join requests until the reset budget runs out
    #[arg(long)]
    stall: bool,
}

/// `RUST_LOG` wins over the configured level.
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{level}'"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!(e))
}

fn load_config(path: Option<&PathBuf>) -> Result<SystemConfig> {
    let Some(path) = path else {
        return Ok(SystemConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    SystemConfig::from_json(&text).with_context(|| format!("loading {}", path.display()))
}

// ── Charger script ────────────────────────────────────────────

/// Plug in at hour 6, full at hour 8, unplugged at hour 9, low at hour 20.
fn drive_charger(hour: u64, charger: &mut SimCharger) {
    match hour {
        6 => charger.plug_in(),
        8 => charger.charge_done(),
        9 => charger.unplug(),
        20 => charger.low = true,
        _ => {}
    }
}

// ── Entry point ───────────────────────────────────────────────

fn run(opts: &Options) -> Result<()> {
    let config = load_config(opts.config.as_ref())?;
    init_logging(config.log_level.as_str())?;

    let mut stack = SimNetwork::new(NET_ID).with_downlink_every(DOWNLINK_EVERY);
    if opts.stall {
        stack = stack.stalled();
    }
    let hw = Peripherals {
        stack,
        sensor: SimGps::new(GPS_PERIOD, GPS_POLLS_TO_FIX),
        codec: SimCodec::new(),
        clock: SimClock::new(CLOCK_SETTLE_CHECKS),
        charger: SimCharger::default(),
        indicator: GpioIndicator::new(SimPin::default(), SimPin::default()),
    };
    let mut tracker = Tracker::new(&config, hw)?;
    let mut sink = LogEventSink::new();

    info!("simulating {} h (stall={})", opts.hours, opts.stall);
    tracker.start(&mut sink);

    let end = Instant::from_secs(opts.hours * 3600);
    let mut hour = 0;
    while tracker.now() < end {
        let mark = (tracker.now() + Duration::from_secs(3600)).min(end);
        tracker
            .advance_to(mark, &mut sink)
            .with_context(|| format!("tracker halted during hour {hour}"))?;
        hour += 1;
        drive_charger(hour, tracker.charger_mut());

        let may_sleep = tracker.may_sleep();
        let led = tracker.indicator_hw();
        info!(
            "hour {:>3} | phase={} led={:?}/{:?} green={} red={} | uplinks={} resets={} | may_sleep={}",
            hour,
            tracker.phase(),
            tracker.indicator().color,
            tracker.indicator().pattern,
            led.is_on(IndicatorChannel::Green),
            led.is_on(IndicatorChannel::Red),
            sink.uplinks(),
            sink.resets(),
            may_sleep,
        );
    }

    info!(
        "done: {} uplinks, {} fixes, {} downlinks, {} stack resets, {} callbacks",
        tracker.stack().uplinks(),
        tracker.sensor().fixes(),
        tracker.codec().downlinks(),
        tracker.stack().resets(),
        tracker.dispatched(),
    );
    Ok(())
}

fn main() -> ExitCode {
    let opts = Options::parse();
    match run(&opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("loratrack-sim: {e:#}");
            ExitCode::FAILURE
        }
    }
}
