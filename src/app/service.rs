//! Application service: the hexagonal core.
//!
//! [`Tracker`] owns the lifecycle coordinator, the status LED engine, the
//! job queue and the sleep governor.  It is the single dispatch loop of
//! the firmware: stack events are drained first, then due jobs run one
//! at a time.  All I/O flows through the port traits in
//! [`ports`](super::ports), so the whole service runs against mocks.
//!
//! ```text
//!  NetworkStack ──events──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!  PositionSensor ◀───────▶ │           Tracker            │
//!  PayloadCodec   ◀───────▶ │  Coordinator · FeedbackEngine│
//!  ChargerMonitor ────────▶ │  JobQueue · SleepGovernor    │ ──▶ IndicatorHardware
//!                           └──────────────────────────────┘
//! ```

use embassy_time::{Duration, Instant};
use log::{error, info};

use super::events::AppEvent;
use super::ports::{
    ChargerMonitor, EventSink, IndicatorHardware, LowPowerClock, NetworkStack, PayloadCodec,
    PositionSensor, Services, Timers,
};
use crate::config::SystemConfig;
use crate::drivers::led_patterns::{BatteryCondition, DeviceStatus, IndicatorState};
use crate::drivers::status_led::FeedbackEngine;
use crate::error::{Error, FatalFault, Result};
use crate::fsm::context::LifecycleCtx;
use crate::fsm::{Coordinator, LifecyclePhase};
use crate::power::SleepGovernor;
use crate::scheduler::{Job, JobQueue};

// ───────────────────────────────────────────────────────────────
// Peripherals
// ───────────────────────────────────────────────────────────────

/// Every adapter the tracker needs, handed over once at construction.
pub struct Peripherals<N, S, P, K, C, I> {
    pub stack: N,
    pub sensor: S,
    pub codec: P,
    pub clock: K,
    pub charger: C,
    pub indicator: I,
}

// ───────────────────────────────────────────────────────────────
// Tracker
// ───────────────────────────────────────────────────────────────

pub struct Tracker<N, S, P, K, C, I> {
    coordinator: Coordinator,
    feedback: FeedbackEngine<C, I>,
    jobs: JobQueue,
    sleep: SleepGovernor,
    stack: N,
    sensor: S,
    codec: P,
    clock: K,
    /// Latched once raised; every later call reports it again.
    fault: Option<FatalFault>,
    dispatched: u64,
}

impl<N, S, P, K, C, I> Tracker<N, S, P, K, C, I>
where
    N: NetworkStack,
    S: PositionSensor,
    P: PayloadCodec,
    K: LowPowerClock,
    C: ChargerMonitor,
    I: IndicatorHardware,
{
    /// Validate `config` and assemble the core.  Nothing runs until
    /// [`start`](Self::start).
    pub fn new(config: &SystemConfig, hw: Peripherals<N, S, P, K, C, I>) -> Result<Self> {
        Self::starting_at(config, hw, Instant::from_ticks(0))
    }

    /// As [`new`](Self::new), with the clock starting at `uptime`.
    pub fn starting_at(
        config: &SystemConfig,
        hw: Peripherals<N, S, P, K, C, I>,
        uptime: Instant,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            coordinator: Coordinator::new(config.lifecycle.clone()),
            feedback: FeedbackEngine::new(hw.charger, hw.indicator, config.indicator.clone()),
            jobs: JobQueue::starting_at(uptime),
            sleep: SleepGovernor::new(),
            stack: hw.stack,
            sensor: hw.sensor,
            codec: hw.codec,
            clock: hw.clock,
            fault: None,
            dispatched: 0,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start the LED render loop, show `Booting` and schedule the first join.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        let mut svc = Services {
            timers: &mut self.jobs,
            leases: &mut self.sleep,
            sink: &mut *sink,
        };
        self.feedback.start(&mut svc);

        let mut ctx = LifecycleCtx {
            stack: &mut self.stack,
            sensor: &mut self.sensor,
            codec: &mut self.codec,
            clock: &self.clock,
            feedback: &mut self.feedback,
            svc,
        };
        self.coordinator.start(&mut ctx);

        let phase = self.coordinator.phase();
        info!("tracker started in {}", phase);
        sink.emit(&AppEvent::Started(phase));
    }

    // ── Dispatch ──────────────────────────────────────────────

    /// Run one callback: the next stack event if any, otherwise the
    /// earliest due job.  Returns `false` when nothing was runnable.
    pub fn step(&mut self, sink: &mut impl EventSink) -> Result<bool> {
        self.check_fault()?;

        if let Some(event) = self.stack.poll_event() {
            let mut ctx = LifecycleCtx {
                stack: &mut self.stack,
                sensor: &mut self.sensor,
                codec: &mut self.codec,
                clock: &self.clock,
                feedback: &mut self.feedback,
                svc: Services {
                    timers: &mut self.jobs,
                    leases: &mut self.sleep,
                    sink: &mut *sink,
                },
            };
            self.coordinator.on_event(event, &mut ctx);
            self.dispatched += 1;
            return Ok(true);
        }

        let Some(job) = self.jobs.pop_due() else {
            return Ok(false);
        };
        self.dispatched += 1;

        if job == Job::Indicator {
            let mut svc = Services {
                timers: &mut self.jobs,
                leases: &mut self.sleep,
                sink: &mut *sink,
            };
            self.feedback.render(&mut svc);
            return Ok(true);
        }

        let outcome = {
            let mut ctx = LifecycleCtx {
                stack: &mut self.stack,
                sensor: &mut self.sensor,
                codec: &mut self.codec,
                clock: &self.clock,
                feedback: &mut self.feedback,
                svc: Services {
                    timers: &mut self.jobs,
                    leases: &mut self.sleep,
                    sink: &mut *sink,
                },
            };
            self.coordinator.on_job(job, &mut ctx)
        };

        if let Err(fault) = outcome {
            error!("halting: {}", fault);
            self.fault = Some(fault);
            sink.emit(&AppEvent::FatalFault(fault));
            return Err(Error::Fatal(fault));
        }
        Ok(true)
    }

    /// Run callbacks until nothing is runnable at the current instant.
    /// Returns how many ran.
    pub fn run_pending(&mut self, sink: &mut impl EventSink) -> Result<usize> {
        let mut ran = 0;
        while self.step(sink)? {
            ran += 1;
        }
        Ok(ran)
    }

    /// Move the clock to `t`, running every job at its own deadline on
    /// the way.
    pub fn advance_to(&mut self, t: Instant, sink: &mut impl EventSink) -> Result<()> {
        self.run_pending(sink)?;
        while let Some(next) = self.jobs.next_deadline().filter(|d| *d <= t) {
            self.jobs.advance_to(next);
            self.run_pending(sink)?;
        }
        self.jobs.advance_to(t);
        self.run_pending(sink)?;
        Ok(())
    }

    pub fn advance_by(&mut self, d: Duration, sink: &mut impl EventSink) -> Result<()> {
        let t = self.jobs.now() + d;
        self.advance_to(t, sink)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn now(&self) -> Instant {
        self.jobs.now()
    }

    /// When the dispatch loop next has work, if ever.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.jobs.next_deadline()
    }

    pub fn deadline(&self, job: Job) -> Option<Instant> {
        self.jobs.deadline(job)
    }

    /// Idle hook: whether the core may enter deep sleep right now.
    pub fn may_sleep(&mut self) -> bool {
        self.sleep.may_sleep(self.jobs.now())
    }

    pub fn sleep(&self) -> &SleepGovernor {
        &self.sleep
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.coordinator.phase()
    }

    pub fn resets(&self) -> u8 {
        self.coordinator.resets()
    }

    pub fn device_status(&self) -> Option<DeviceStatus> {
        self.feedback.status()
    }

    pub fn battery(&self) -> BatteryCondition {
        self.feedback.battery()
    }

    pub fn indicator(&self) -> IndicatorState {
        self.feedback.indicator()
    }

    pub fn led_lit(&self) -> bool {
        self.feedback.is_lit()
    }

    pub fn fault(&self) -> Option<FatalFault> {
        self.fault
    }

    /// Callbacks run since construction.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    // ── Adapter access (bench and tests) ──────────────────────

    pub fn stack(&self) -> &N {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut N {
        &mut self.stack
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn codec(&self) -> &P {
        &self.codec
    }

    pub fn clock_mut(&mut self) -> &mut K {
        &mut self.clock
    }

    pub fn charger_mut(&mut self) -> &mut C {
        self.feedback.charger_mut()
    }

    pub fn indicator_hw(&self) -> &I {
        self.feedback.hardware()
    }

    // ── Internal ──────────────────────────────────────────────

    fn check_fault(&self) -> Result<()> {
        match self.fault {
            Some(fault) => Err(Error::Fatal(fault)),
            None => Ok(()),
        }
    }
}
