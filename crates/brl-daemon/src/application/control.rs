//! The daemon's control loop.
//!
//! # One tick (for beginners)
//!
//! The loop is driven by a fixed poll interval rather than by events,
//! because the display transports are polled with short timeouts.  Every
//! tick runs the same steps in order:
//!
//! 1. Fire due alarms (driver retries).
//! 2. Refresh the screen driver.
//! 3. If the braille display changed size, reallocate and blank the window.
//! 4. Read and dispatch braille key commands.
//! 5. Write the window and status cells.  A failed write means the display
//!    is gone, so the braille driver is restarted.
//! 6. Work out the pause before the next tick: the poll interval, or the
//!    display's write delay when a slow serial line is still draining.
//!
//! All three driver classes are owned by the loop, so nothing here locks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use brl_core::{Command, CommandCode, DisplayError, Firmness};
use tracing::{debug, info, warn};

use super::activation::{DriverClass, DriverError};
use super::alarm::{Alarm, AlarmQueue};
use super::drivers::{BrailleKind, ScreenKind, SpeechKind};
use super::supervisor::DriverSupervisor;

/// Upper bound on commands handled per tick, so a chattering display
/// cannot starve output.
const MAX_COMMANDS_PER_TICK: usize = 32;

pub struct ControlLoop {
    braille: DriverSupervisor<BrailleKind>,
    speech: DriverSupervisor<SpeechKind>,
    screen: DriverSupervisor<ScreenKind>,
    alarms: AlarmQueue<Alarm>,
    firmness: Firmness,
    poll_interval: Duration,
    window: Vec<u8>,
    status: Vec<u8>,
}

impl ControlLoop {
    pub fn new(
        braille: DriverSupervisor<BrailleKind>,
        speech: DriverSupervisor<SpeechKind>,
        screen: DriverSupervisor<ScreenKind>,
        firmness: Firmness,
        poll_interval: Duration,
    ) -> Self {
        Self {
            braille,
            speech,
            screen,
            alarms: AlarmQueue::new(),
            firmness,
            poll_interval,
            window: Vec::new(),
            status: Vec::new(),
        }
    }

    pub fn braille(&self) -> &DriverSupervisor<BrailleKind> {
        &self.braille
    }

    pub fn speech(&self) -> &DriverSupervisor<SpeechKind> {
        &self.speech
    }

    pub fn screen(&self) -> &DriverSupervisor<ScreenKind> {
        &self.screen
    }

    /// The cells written to the text window on every tick.
    pub fn window(&self) -> &[u8] {
        &self.window
    }

    /// Starts the screen, speech and braille drivers, in that order.
    pub fn start(&mut self, now: Instant) {
        self.screen.try_start(&mut self.alarms, now);
        self.speech.try_start(&mut self.alarms, now);
        if self.braille.try_start(&mut self.alarms, now) {
            self.braille_started();
        }
    }

    /// Runs until `running` is cleared, then stops every driver.
    pub fn run(&mut self, running: &AtomicBool) {
        self.start(Instant::now());
        while running.load(Ordering::Relaxed) {
            let pause = self.run_once(Instant::now());
            std::thread::sleep(pause);
        }
        self.stop();
    }

    /// Releases every driver and drops pending retries.
    pub fn stop(&mut self) {
        self.braille.stop(&mut self.alarms);
        self.speech.stop(&mut self.alarms);
        self.screen.stop(&mut self.alarms);
        info!("drivers stopped");
    }

    /// One tick of the loop at time `now`.
    ///
    /// Returns how long to wait before the next tick: never less than the
    /// poll interval, and never less than the time the display needs to
    /// absorb what this tick wrote.
    pub fn run_once(&mut self, now: Instant) -> Duration {
        while let Some(alarm) = self.alarms.pop_due(now) {
            self.handle_alarm(alarm, now);
        }

        self.screen.driver_mut().refresh();

        if self.braille.driver_mut().take_resize_required() {
            debug!("braille display resized");
            self.allocate_cells();
        }

        for _ in 0..MAX_COMMANDS_PER_TICK {
            let Some(command) = self.braille.driver_mut().read_command() else {
                break;
            };
            if !self.handle_command(command, now) {
                break;
            }
        }

        let driver = self.braille.driver_mut();
        let written = driver.write_window(&self.window).and_then(|()| driver.write_status(&self.status));
        match written {
            Ok(()) => {
                let write_delay = driver.take_write_delay();
                if write_delay > self.poll_interval {
                    debug!(?write_delay, "waiting for the display to drain");
                }
                self.poll_interval.max(write_delay)
            }
            Err(e) => {
                warn!("braille output failed: {e}");
                self.restart_braille(now);
                self.poll_interval
            }
        }
    }

    fn handle_alarm(&mut self, alarm: Alarm, now: Instant) {
        match alarm {
            Alarm::RetryDriver(DriverClass::Braille) => {
                if self.braille.on_retry(&mut self.alarms, now) {
                    self.braille_started();
                }
            }
            Alarm::RetryDriver(DriverClass::Speech) => {
                self.speech.on_retry(&mut self.alarms, now);
            }
            Alarm::RetryDriver(DriverClass::Screen) => {
                self.screen.on_retry(&mut self.alarms, now);
            }
        }
    }

    /// Returns `false` when no further commands should be read this tick.
    fn handle_command(&mut self, command: Command, now: Instant) -> bool {
        if command.is(CommandCode::RestartBrl) {
            self.restart_braille(now);
            return false;
        }

        if command.is(CommandCode::RestartSpeech) {
            self.speech.restart(&mut self.alarms, now);
        } else if command.is(CommandCode::Mute) {
            self.speech.driver_mut().mute();
        } else if command.is(CommandCode::SayLine) {
            let line = self.screen.driver().line(0);
            self.speech.driver_mut().say(&line);
        } else if command != Command::NOOP {
            debug!("command: {:06X}", command.0);
        }
        true
    }

    fn restart_braille(&mut self, now: Instant) {
        if self.braille.restart(&mut self.alarms, now) {
            self.braille_started();
        } else {
            self.allocate_cells();
        }
    }

    fn braille_started(&mut self) {
        self.allocate_cells();
        self.apply_firmness();
    }

    fn allocate_cells(&mut self) {
        let geometry = self.braille.driver().geometry();
        self.window = vec![0; geometry.text_cells()];
        self.status = vec![0; usize::from(geometry.status_cells)];
    }

    fn apply_firmness(&mut self) {
        let driver = self.braille.driver_mut();
        match driver.set_firmness(self.firmness) {
            Ok(()) => debug!("firmness set to {:?}", self.firmness),
            Err(DriverError::NotSupported(_) | DriverError::Display(DisplayError::NotSupported(_))) => {
                debug!("{} has no firmness setting", driver.name());
            }
            Err(e) => warn!("cannot set firmness: {e}"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};

    use brl_core::Geometry;

    use super::*;
    use crate::application::activation::{ActivationPlan, DriverRegistry, Loader, AUTO};
    use crate::application::drivers::{BrailleDriver, MockBrailleDriver, MockSpeechDriver, SpeechDriver};
    use crate::application::supervisor::{DriverStatus, DEFAULT_RETRY_INTERVAL};

    const GEOMETRY: Geometry = Geometry { text_columns: 40, text_rows: 1, status_cells: 3, help_page: 0 };

    /// A display that yields `commands` one per read, then stays idle.
    fn display(commands: Vec<Command>) -> MockBrailleDriver {
        let mut commands = VecDeque::from(commands);
        let mut mock = MockBrailleDriver::new();
        mock.expect_code().return_const("al");
        mock.expect_name().return_const("ABT 340");
        mock.expect_geometry().return_const(GEOMETRY);
        mock.expect_read_command().returning(move || commands.pop_front());
        mock.expect_write_window().returning(|_| Ok(()));
        mock.expect_write_status().returning(|_| Ok(()));
        mock.expect_set_firmness().returning(|_| Ok(()));
        mock.expect_take_resize_required().return_const(false);
        mock.expect_take_write_delay().return_const(Duration::ZERO);
        mock
    }

    /// Hands out `displays` in order; `None` entries fail to construct.
    fn loader(displays: Vec<Option<MockBrailleDriver>>, calls: Arc<AtomicUsize>) -> Loader<BrailleKind> {
        let displays = Mutex::new(VecDeque::from(displays));
        Box::new(move |_: Option<&str>| {
            calls.fetch_add(1, Ordering::SeqCst);
            match displays.lock().expect("lock").pop_front().flatten() {
                Some(display) => Ok(Box::new(display) as Box<dyn BrailleDriver>),
                None => Err(DriverError::Construct("no display".to_string())),
            }
        })
    }

    fn control_loop(
        displays: Vec<Option<MockBrailleDriver>>,
        speech: Option<MockSpeechDriver>,
    ) -> (ControlLoop, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut braille_registry = DriverRegistry::<BrailleKind>::new();
        braille_registry.register("al", loader(displays, Arc::clone(&calls)));
        let braille = DriverSupervisor::new(
            braille_registry,
            ActivationPlan::with_devices(vec!["al".to_string()], vec!["usb:".to_string()]),
            DEFAULT_RETRY_INTERVAL,
        );

        let mut speech_registry = DriverRegistry::<SpeechKind>::new();
        let mut speech_request = vec![AUTO.to_string()];
        if let Some(driver) = speech {
            let driver = Mutex::new(Some(driver));
            speech_registry.register(
                "ms",
                Box::new(move |_: Option<&str>| match driver.lock().expect("lock").take() {
                    Some(driver) => Ok(Box::new(driver) as Box<dyn SpeechDriver>),
                    None => Err(DriverError::Construct("used".to_string())),
                }),
            );
            speech_request = vec!["ms".to_string()];
        }
        let speech = DriverSupervisor::new(
            speech_registry,
            ActivationPlan::without_device(speech_request),
            DEFAULT_RETRY_INTERVAL,
        );
        let screen = DriverSupervisor::new(
            DriverRegistry::new(),
            ActivationPlan::without_device(vec![AUTO.to_string()]),
            DEFAULT_RETRY_INTERVAL,
        );

        (ControlLoop::new(braille, speech, screen, Firmness::High, Duration::from_millis(40)), calls)
    }

    #[test]
    fn test_start_sizes_window_and_applies_firmness() {
        // Arrange
        let mut display = MockBrailleDriver::new();
        display.expect_geometry().return_const(GEOMETRY);
        display.expect_set_firmness().withf(|f| *f == Firmness::High).times(1).returning(|_| Ok(()));
        let (mut control, _) = control_loop(vec![Some(display)], None);

        // Act
        control.start(Instant::now());

        // Assert
        assert_eq!(control.window().len(), 40);
        assert!(matches!(control.braille().status(), DriverStatus::Active { code, .. } if code == "al"));
        assert_eq!(control.screen().status(), &DriverStatus::Degraded);
        assert_eq!(control.speech().status(), &DriverStatus::Degraded);
    }

    #[test]
    fn test_restart_command_reinitializes_braille() {
        // Arrange
        let (mut control, calls) =
            control_loop(vec![Some(display(vec![Command::RESTART_BRL])), Some(display(vec![]))], None);
        let now = Instant::now();
        control.start(now);

        // Act
        control.run_once(now);

        // Assert
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(control.braille().status(), DriverStatus::Active { .. }));
    }

    #[test]
    fn test_missing_display_is_retried_on_alarm() {
        // Arrange
        let (mut control, calls) = control_loop(vec![None, Some(display(vec![]))], None);
        let start = Instant::now();
        control.start(start);
        assert_eq!(control.braille().status(), &DriverStatus::Retrying);

        // Act: a tick before the deadline changes nothing, the one at it retries.
        control.run_once(start + DEFAULT_RETRY_INTERVAL - Duration::from_millis(1));
        let calls_before_deadline = calls.load(Ordering::SeqCst);
        control.run_once(start + DEFAULT_RETRY_INTERVAL);

        // Assert
        assert_eq!(calls_before_deadline, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(control.braille().status(), DriverStatus::Active { .. }));
        assert_eq!(control.window().len(), 40);
    }

    #[test]
    fn test_write_failure_restarts_braille() {
        // Arrange
        let mut broken = MockBrailleDriver::new();
        broken.expect_geometry().return_const(GEOMETRY);
        broken.expect_name().return_const("ABT 340");
        broken.expect_set_firmness().returning(|_| Ok(()));
        broken.expect_take_resize_required().return_const(false);
        broken.expect_read_command().returning(|| None);
        broken
            .expect_write_window()
            .returning(|_| Err(DriverError::Display(DisplayError::NoResponse)));
        let (mut control, calls) = control_loop(vec![Some(broken), None], None);
        let now = Instant::now();
        control.start(now);

        // Act
        control.run_once(now);

        // Assert: the replacement failed, so a retry is pending.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(control.braille().status(), &DriverStatus::Retrying);
        assert!(control.window().is_empty());
    }

    #[test]
    fn test_mute_and_say_line_reach_speech_driver() {
        // Arrange
        let mut speech = MockSpeechDriver::new();
        speech.expect_mute().times(1).return_const(());
        speech.expect_say().withf(|text| text.is_empty()).times(1).return_const(());
        let commands = vec![Command::simple(CommandCode::Mute), Command::simple(CommandCode::SayLine)];
        let (mut control, _) = control_loop(vec![Some(display(commands))], Some(speech));
        let now = Instant::now();
        control.start(now);

        // Act
        control.run_once(now);

        // Assert
        assert!(matches!(control.speech().status(), DriverStatus::Active { code, .. } if code == "ms"));
    }

    #[test]
    fn test_slow_display_stretches_the_pause() {
        // Arrange: the first tick's writes need 120 ms on the wire.
        let mut slow = MockBrailleDriver::new();
        slow.expect_geometry().return_const(GEOMETRY);
        slow.expect_set_firmness().returning(|_| Ok(()));
        slow.expect_take_resize_required().return_const(false);
        slow.expect_read_command().returning(|| None);
        slow.expect_write_window().returning(|_| Ok(()));
        slow.expect_write_status().returning(|_| Ok(()));
        let mut delays = VecDeque::from([Duration::from_millis(120), Duration::from_millis(10)]);
        slow.expect_take_write_delay()
            .times(2)
            .returning(move || delays.pop_front().unwrap_or_default());
        let (mut control, _) = control_loop(vec![Some(slow)], None);
        let now = Instant::now();
        control.start(now);

        // Act
        let first = control.run_once(now);
        let second = control.run_once(now);

        // Assert: a short delay never shortens the poll interval.
        assert_eq!(first, Duration::from_millis(120));
        assert_eq!(second, Duration::from_millis(40));
    }

    #[test]
    fn test_failed_write_pauses_for_poll_interval() {
        let mut broken = MockBrailleDriver::new();
        broken.expect_geometry().return_const(GEOMETRY);
        broken.expect_name().return_const("ABT 340");
        broken.expect_set_firmness().returning(|_| Ok(()));
        broken.expect_take_resize_required().return_const(false);
        broken.expect_read_command().returning(|| None);
        broken.expect_write_window().returning(|_| Err(DriverError::Display(DisplayError::NoResponse)));
        broken.expect_take_write_delay().never();
        let (mut control, _) = control_loop(vec![Some(broken), None], None);
        let now = Instant::now();
        control.start(now);

        assert_eq!(control.run_once(now), Duration::from_millis(40));
    }

    #[test]
    fn test_run_returns_when_not_running() {
        let (mut control, _) = control_loop(vec![Some(display(vec![]))], None);
        let running = AtomicBool::new(false);

        control.run(&running);

        assert_eq!(control.braille().status(), &DriverStatus::Stopped);
    }
}
