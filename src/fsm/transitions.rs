//! Coordinator handlers, one per trigger.
//!
//! ```text
//!  trigger                 phase after        watchdog (Job::Reset)
//!  ─────────────────────── ────────────────── ───────────────────────────────
//!  boot                    Joining            now + join_timeout
//!  Joining / LinkDead      Joining            now + join_timeout
//!  Joined / LinkAlive      Joined → sampling  now + tx_period_timeout
//!  data ready / window     WaitingToSend      unchanged
//!  TxStart                 Sending            now + tx_timeout
//!  TxComplete              Joined             now + max(period + margin, tx_period_timeout)
//!  Tx* while sampling      SamplingSensor     TxComplete only, as above
//!  watchdog fires          Joining            now + join_timeout
//! ```

use core::cmp::{max, min};

use embassy_time::Duration;
use log::{debug, error, info, warn};

use super::context::{LifecycleCtx, SamplingWindow, SensorStep};
use super::{Coordinator, LifecyclePhase, MAX_UPLINK_LEN, SENSOR_READING_LEN};
use crate::app::events::{AppEvent, Downlink};
use crate::drivers::led_patterns::DeviceStatus;
use crate::error::FatalFault;
use crate::power::LeaseReason;
use crate::scheduler::Job;

impl Coordinator {
    // ═══════════════════════════════════════════════════════════════════════
    //  Helpers
    // ═══════════════════════════════════════════════════════════════════════

    fn enter(&mut self, to: LifecyclePhase, ctx: &mut LifecycleCtx<'_>) {
        let from = self.state.phase;
        if from != to {
            info!("lifecycle: {} -> {}", from, to);
            ctx.svc.sink.emit(&AppEvent::PhaseChanged { from, to });
        }
        self.state.phase = to;
    }

    fn show(&self, status: DeviceStatus, ctx: &mut LifecycleCtx<'_>) {
        ctx.feedback.notify(status, &mut ctx.svc);
    }

    fn arm_watchdog(&self, after: Duration, ctx: &mut LifecycleCtx<'_>) {
        let at = ctx.now() + after;
        debug!(
            "watchdog armed for {} at {} ms",
            self.state.phase,
            at.as_millis()
        );
        ctx.svc.timers.schedule_at(Job::Reset, at);
    }

    // ═══════════════════════════════════════════════════════════════════════
    //  Boot and join
    // ═══════════════════════════════════════════════════════════════════════

    pub(super) fn on_boot(&mut self, ctx: &mut LifecycleCtx<'_>) {
        info!("lifecycle: starting in {}", self.state.phase);
        self.show(DeviceStatus::Booting, ctx);
        self.enter(LifecyclePhase::Joining, ctx);
        ctx.svc.timers.schedule_now(Job::Join);
        self.arm_watchdog(self.cfg.join_timeout(), ctx);
    }

    pub(super) fn on_join_due(&mut self, ctx: &mut LifecycleCtx<'_>) {
        if !ctx.clock.is_available() {
            debug!("low-power clock not ready, join deferred");
            let at = ctx.now() + self.cfg.clock_poll_interval();
            ctx.svc.timers.schedule_at(Job::Join, at);
            ctx.svc.sink.emit(&AppEvent::JoinDeferred);
            return;
        }
        info!("lifecycle: starting join");
        ctx.stack.start_join();
    }

    pub(super) fn on_link_lost(&mut self, ctx: &mut LifecycleCtx<'_>) {
        self.abandon_sample(ctx);
        self.enter(LifecyclePhase::Joining, ctx);
        self.show(DeviceStatus::Joining, ctx);
        self.arm_watchdog(self.cfg.join_timeout(), ctx);
    }

    pub(super) fn on_joined(&mut self, net_id: u32, ctx: &mut LifecycleCtx<'_>) {
        info!("lifecycle: joined netid={:#08x}", net_id);
        self.state.resets.clear();
        self.on_link_up(ctx);
    }

    pub(super) fn on_link_up(&mut self, ctx: &mut LifecycleCtx<'_>) {
        self.abandon_sample(ctx);
        self.enter(LifecyclePhase::Joined, ctx);
        self.arm_watchdog(self.cfg.tx_period_timeout(), ctx);
        self.begin_sample_cycle(ctx);
    }

    // ═══════════════════════════════════════════════════════════════════════
    //  Sampling
    // ═══════════════════════════════════════════════════════════════════════

    fn begin_sample_cycle(&mut self, ctx: &mut LifecycleCtx<'_>) {
        if self.state.phase != LifecyclePhase::Joined {
            debug!("sample cycle skipped in {}", self.state.phase);
            return;
        }
        self.enter(LifecyclePhase::SamplingSensor, ctx);
        self.state.window = Some(SamplingWindow::open(ctx.now(), self.cfg.sample_window()));
        self.show(DeviceStatus::SamplingSensor, ctx);
        if let Some(gate) = ctx.sensor.power_gating() {
            gate.power_up();
        }
        ctx.sensor.prepare();
        self.wait_for_sensor(ctx);
    }

    fn wait_for_sensor(&mut self, ctx: &mut LifecycleCtx<'_>) {
        let now = ctx.now();
        if let Some(window) = self.state.window.filter(|w| !w.is_closed(now)) {
            // A zero delay means the data is ready now.
            let pending = ctx.sensor.data_ready_in().filter(|d| d.as_ticks() > 0);
            if let Some(delay) = pending {
                let at = min(now + delay, window.closes_at());
                ctx.svc.timers.schedule_at(Job::Sensor, at);
                self.state.sensor_step = SensorStep::Poll;
                ctx.svc
                    .leases
                    .suspend(LeaseReason::Network, at + self.cfg.sensor_poll_slack());
                return;
            }
        } else {
            debug!("sampling window closed, sending without fresh data");
        }

        self.state.window = None;
        self.enter(LifecyclePhase::WaitingToSend, ctx);
        self.show(DeviceStatus::Idle, ctx);
        self.send_reading(ctx);

        let at = now + ctx.sensor.period();
        ctx.svc.timers.schedule_at(Job::Sensor, at);
        self.state.sensor_step = SensorStep::NextCycle;
    }

    fn send_reading(&mut self, ctx: &mut LifecycleCtx<'_>) {
        let mut reading = [0u8; SENSOR_READING_LEN];
        let n = ctx.sensor.read(&mut reading).min(reading.len());
        if let Some(gate) = ctx.sensor.power_gating() {
            gate.power_down();
        }

        let mut frame = [0u8; MAX_UPLINK_LEN];
        match ctx.codec.encode_uplink(&reading[..n], &mut frame) {
            Some((port, len)) => {
                let len = len.min(frame.len());
                ctx.stack.submit_uplink(port, &frame[..len]);
                ctx.svc.sink.emit(&AppEvent::UplinkSubmitted { port, len });
            }
            None => warn!("codec produced no uplink for a {}-byte reading", n),
        }
    }

    /// Drop an open sampling window: cancel its poll and power the
    /// sensor back down.
    fn abandon_sample(&mut self, ctx: &mut LifecycleCtx<'_>) {
        if self.state.window.take().is_none() {
            return;
        }
        debug!("sample abandoned in {}", self.state.phase);
        if self.state.sensor_step == SensorStep::Poll {
            ctx.svc.timers.cancel(Job::Sensor);
            self.state.sensor_step = SensorStep::Idle;
        }
        if let Some(gate) = ctx.sensor.power_gating() {
            gate.power_down();
        }
    }

    pub(super) fn on_sensor_due(&mut self, ctx: &mut LifecycleCtx<'_>) {
        match core::mem::take(&mut self.state.sensor_step) {
            SensorStep::Poll if self.state.phase == LifecyclePhase::SamplingSensor => {
                self.wait_for_sensor(ctx);
            }
            SensorStep::Poll => debug!("stale sensor poll in {}", self.state.phase),
            SensorStep::NextCycle => self.begin_sample_cycle(ctx),
            SensorStep::Idle => {}
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    //  Transmission
    // ═══════════════════════════════════════════════════════════════════════

    pub(super) fn on_tx_start(&mut self, ctx: &mut LifecycleCtx<'_>) {
        let until = ctx.now() + self.cfg.tx_timeout();
        ctx.svc.leases.suspend(LeaseReason::Network, until);
        ctx.codec.on_tx_start();

        if self.state.phase == LifecyclePhase::Joining {
            // Join request on air.
            self.show(DeviceStatus::Joining, ctx);
            return;
        }
        if self.state.phase == LifecyclePhase::SamplingSensor {
            // MAC traffic of its own; the pending poll still owns the cycle.
            debug!("tx started while sampling");
            return;
        }
        self.enter(LifecyclePhase::Sending, ctx);
        self.show(DeviceStatus::Sending, ctx);
        self.arm_watchdog(self.cfg.tx_timeout(), ctx);
    }

    pub(super) fn on_tx_complete(&mut self, downlink: Option<Downlink>, ctx: &mut LifecycleCtx<'_>) {
        // Next uplink is expected one sensor period from now.
        let quiet = max(
            ctx.sensor.period() + self.cfg.tx_complete_margin(),
            self.cfg.tx_period_timeout(),
        );
        self.arm_watchdog(quiet, ctx);

        if let Some(dl) = downlink.filter(|d| !d.payload.is_empty()) {
            info!("downlink port {} ({} bytes)", dl.port, dl.payload.len());
            ctx.codec.handle_downlink(dl.port, &dl.payload);
            ctx.svc.sink.emit(&AppEvent::DownlinkReceived {
                port: dl.port,
                len: dl.payload.len(),
            });
        }

        if self.state.phase == LifecyclePhase::SamplingSensor {
            if let Some(at) = ctx.svc.timers.deadline(Job::Sensor) {
                ctx.svc
                    .leases
                    .suspend(LeaseReason::Network, at + self.cfg.sensor_poll_slack());
            }
            return;
        }

        self.enter(LifecyclePhase::Joined, ctx);
        self.show(DeviceStatus::Idle, ctx);
        ctx.svc.leases.release(LeaseReason::Network);
    }

    // ═══════════════════════════════════════════════════════════════════════
    //  Watchdog
    // ═══════════════════════════════════════════════════════════════════════

    pub(super) fn on_watchdog(&mut self, ctx: &mut LifecycleCtx<'_>) -> Result<(), FatalFault> {
        let stalled = self.state.phase;
        let count = self.state.resets.consume().inspect_err(|fault| {
            error!("lifecycle: stuck in {}: {}", stalled, fault);
        })?;
        let max = self.state.resets.max();
        warn!(
            "lifecycle: no progress in {}, resetting stack ({}/{})",
            stalled, count, max
        );
        ctx.svc.sink.emit(&AppEvent::ResetIssued { count, max });

        self.abandon_sample(ctx);
        ctx.stack.reset();
        ctx.svc.leases.release(LeaseReason::Network);
        ctx.svc.timers.cancel(Job::Sensor);
        self.state.sensor_step = SensorStep::Idle;

        self.enter(LifecyclePhase::Joining, ctx);
        self.show(DeviceStatus::Joining, ctx);
        ctx.svc.timers.schedule_now(Job::Join);
        self.arm_watchdog(self.cfg.join_timeout(), ctx);
        Ok(())
    }
}
