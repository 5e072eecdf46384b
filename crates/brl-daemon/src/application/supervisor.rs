//! Keeps one driver class running: start, retry after failure, restart.
//!
//! A failed start installs the no-op driver and schedules an
//! [`Alarm::RetryDriver`].  When the alarm fires the control loop calls
//! [`DriverSupervisor::on_retry`]; if something else has already started the
//! driver in the meantime, the alarm is ignored.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::activation::{activate, Activation, ActivationPlan, DriverKind, DriverRegistry};
use super::alarm::{Alarm, AlarmId, AlarmQueue};

/// Default delay before a failed driver start is retried.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(5000);

/// What a supervisor currently runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverStatus {
    /// Nothing started yet, or stopped.
    Stopped,
    /// A real driver is running.
    Active { code: String, device: Option<String> },
    /// The no-op driver was chosen on purpose.
    Degraded,
    /// Start failed; the no-op driver fills in until the retry alarm.
    Retrying,
}

pub struct DriverSupervisor<K: DriverKind> {
    registry: DriverRegistry<K>,
    plan: ActivationPlan,
    retry_interval: Duration,
    driver: Box<K::Driver>,
    status: DriverStatus,
    pending_retry: Option<AlarmId>,
}

impl<K: DriverKind> DriverSupervisor<K> {
    pub fn new(registry: DriverRegistry<K>, plan: ActivationPlan, retry_interval: Duration) -> Self {
        Self { registry, plan, retry_interval, driver: K::no_op(), status: DriverStatus::Stopped, pending_retry: None }
    }

    pub fn status(&self) -> &DriverStatus {
        &self.status
    }

    /// A driver has been started, real or no-op by choice.
    pub fn is_started(&self) -> bool {
        matches!(self.status, DriverStatus::Active { .. } | DriverStatus::Degraded)
    }

    pub fn driver(&self) -> &K::Driver {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut K::Driver {
        &mut self.driver
    }

    /// Activates a driver.  On failure the no-op driver is installed and a
    /// retry is scheduled `retry_interval` after `now`.
    ///
    /// Returns whether a driver was started.
    pub fn try_start(&mut self, alarms: &mut AlarmQueue<Alarm>, now: Instant) -> bool {
        self.cancel_retry(alarms);

        match activate(&self.registry, &self.plan) {
            Ok(Activation::Engaged { code, device, driver }) => {
                info!(device = device.as_deref().unwrap_or("-"), "{} driver activated: {code}", K::CLASS);
                self.driver = driver;
                self.status = DriverStatus::Active { code, device };
                true
            }
            Ok(Activation::Degraded { driver }) => {
                info!("no {} driver", K::CLASS);
                self.driver = driver;
                self.status = DriverStatus::Degraded;
                true
            }
            Err(e) => {
                debug!("{e}; retrying in {:?}", self.retry_interval);
                self.driver = K::no_op();
                self.status = DriverStatus::Retrying;
                self.pending_retry = Some(alarms.schedule(now + self.retry_interval, Alarm::RetryDriver(K::CLASS)));
                false
            }
        }
    }

    /// Handles this class's retry alarm.  Returns whether a driver was
    /// started by this call.
    pub fn on_retry(&mut self, alarms: &mut AlarmQueue<Alarm>, now: Instant) -> bool {
        self.pending_retry = None;
        if self.is_started() {
            return false;
        }
        self.try_start(alarms, now)
    }

    /// Releases the driver and cancels any pending retry.
    pub fn stop(&mut self, alarms: &mut AlarmQueue<Alarm>) {
        self.cancel_retry(alarms);
        self.driver = K::no_op();
        self.status = DriverStatus::Stopped;
    }

    /// Stops and starts again, for a lost link or an explicit request.
    pub fn restart(&mut self, alarms: &mut AlarmQueue<Alarm>, now: Instant) -> bool {
        self.stop(alarms);
        info!("reinitializing {} driver", K::CLASS);
        self.try_start(alarms, now)
    }

    fn cancel_retry(&mut self, alarms: &mut AlarmQueue<Alarm>) {
        if let Some(id) = self.pending_retry.take() {
            alarms.cancel(id);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
