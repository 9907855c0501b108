//! Connection-driven measurement scheduling.
//!
//! The scheduler owns one cancellable periodic task. The main loop starts
//! it when a peer connects and cancels it when the peer leaves; while it
//! runs, every firing takes one reading and pushes it through the
//! peripheral service.
//!
//! ```text
//!            start(delay)             fire               cycle done
//!   Idle ─────────────────▶ Scheduled ─────▶ Running ─────────────────┐
//!    ▲                          ▲                                     │
//!    │        cancel()          └──────── re-arm (period) ◀───────────┘
//!    └───────────────────── (any state, joins Running)
//! ```
//!
//! [`MeasurementCycle`] is the work body; the [`WorkTimer`] decides when it
//! runs. The two are joined in [`MeasurementCycle::into_work`].

use core::time::Duration;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::app::ports::{GattPort, SchedulerState, SensorPort, WorkTimer};
use crate::app::service::PeripheralService;
use crate::error::{SensorError, ServiceError};

// ═══════════════════════════════════════════════════════════════
//  Work body
// ═══════════════════════════════════════════════════════════════

/// Result of one measurement cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The sensor answered; each value went through its own update.
    Completed {
        temperature: Result<(), ServiceError>,
        humidity: Result<(), ServiceError>,
    },
    /// Trigger-and-fetch failed; nothing was published.
    SensorFailed(SensorError),
}

/// One sensor read followed by the temperature and humidity updates.
pub struct MeasurementCycle<S: SensorPort, G: GattPort> {
    sensor: S,
    service: Arc<PeripheralService<G>>,
    cycles: u32,
}

impl<S: SensorPort, G: GattPort> MeasurementCycle<S, G> {
    pub fn new(sensor: S, service: Arc<PeripheralService<G>>) -> Self {
        Self {
            sensor,
            service,
            cycles: 0,
        }
    }

    /// Measure and publish. Failures are logged and reported, never fatal.
    pub fn run_once(&mut self) -> CycleOutcome {
        self.cycles = self.cycles.wrapping_add(1);

        let reading = match self.sensor.measure() {
            Ok(r) => r,
            Err(e) => {
                warn!("measurement {} failed: {e}", self.cycles);
                return CycleOutcome::SensorFailed(e);
            }
        };

        let temperature = self.service.update_temperature(reading.temperature_c);
        if let Err(e) = temperature {
            warn!("temperature update failed: {e}");
        }
        let humidity = self.service.update_humidity(reading.humidity_pct);
        if let Err(e) = humidity {
            warn!("humidity update failed: {e}");
        }

        CycleOutcome::Completed {
            temperature,
            humidity,
        }
    }

    /// Cycles attempted so far.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }
}

impl<S, G> MeasurementCycle<S, G>
where
    S: SensorPort + 'static,
    G: GattPort + 'static,
{
    /// Adapt into the closure a [`WorkTimer`] implementation runs.
    pub fn into_work(mut self) -> impl FnMut() + Send + 'static {
        move || {
            let outcome = self.run_once();
            debug!("cycle {} finished: {outcome:?}", self.cycles);
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler
// ═══════════════════════════════════════════════════════════════

/// Start/stop control over the measurement timer.
pub struct MeasurementScheduler<T: WorkTimer> {
    timer: T,
    period: Duration,
}

impl<T: WorkTimer> MeasurementScheduler<T> {
    pub fn new(timer: T, period: Duration) -> Self {
        Self { timer, period }
    }

    /// Arm the first measurement after `initial_delay`, then every period.
    ///
    /// Re-arming replaces any pending due time, so there is never more
    /// than one measurement queued.
    pub fn start(&self, initial_delay: Duration) {
        info!(
            "measurements start in {} s, every {} s",
            initial_delay.as_secs(),
            self.period.as_secs()
        );
        self.timer.arm(initial_delay, self.period);
    }

    /// Stop measuring. Returns once any in-flight cycle has finished.
    pub fn cancel(&self) {
        if self.timer.state().is_idle() {
            return;
        }
        self.timer.cancel();
        info!("measurements stopped");
    }

    pub fn state(&self) -> SchedulerState {
        self.timer.state()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }
}
