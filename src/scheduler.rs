//! The jiggle scheduler: decides once per tick whether the due time has
//! passed and, if so, performs one activity action and resets the due time.

use crate::inhibitor::Inhibitor;
use crate::platform::ActivityDriver;
use crate::settings::{Settings, FALLBACK_RANGE, INHIBIT_RANGE};
use log::{debug, info, warn};
use rand::Rng;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Read-only snapshot consumed by the tray presenter and the command layer.
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub interval_secs: u64,
    pub range_px: u32,
    pub running: bool,
    pub seconds_remaining: u64,
}

pub struct JiggleScheduler<D: ActivityDriver> {
    driver: D,
    inhibitor: Inhibitor,
    settings: Settings,
    force_mouse: bool,
    running: bool,
    next_due: Option<Instant>,
}

impl<D: ActivityDriver> JiggleScheduler<D> {
    pub fn new(driver: D, inhibitor: Inhibitor, settings: Settings, force_mouse: bool) -> Self {
        Self {
            driver,
            inhibitor,
            settings,
            force_mouse,
            running: false,
            next_due: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn inhibitor_available(&self) -> bool {
        self.inhibitor.available()
    }

    pub fn status(&self) -> Status {
        self.status_at(Instant::now())
    }

    pub fn seconds_remaining(&self) -> u64 {
        self.remaining_at(Instant::now())
    }

    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.next_due = None;
        self.inhibitor.stop();
        info!("jiggling stopped");
    }

    /// Safe to call on any fixed-period timer; a no-op while stopped or
    /// before the due time.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    pub fn set_interval(&mut self, secs: u64) {
        self.set_interval_at(Instant::now(), secs);
    }

    /// Select a movement range, or the sentinel to hold a sleep inhibitor
    /// instead. Transitions onto the sentinel start the inhibitor once;
    /// transitions off it stop the inhibitor.
    pub fn set_range(&mut self, px: u32) {
        let previous = self.settings.range_px;
        if previous == px {
            return;
        }
        self.settings.range_px = px;
        info!("movement range changed from {} to {} pixels", previous, px);

        if !self.running {
            return;
        }
        if px == INHIBIT_RANGE {
            if self.inhibitor_preferred() {
                if let Err(e) = self.inhibitor.start() {
                    warn!("could not start sleep inhibitor: {}", e);
                }
            }
        } else if previous == INHIBIT_RANGE {
            self.inhibitor.stop();
        }
    }

    fn start_at(&mut self, now: Instant) {
        if self.running {
            return;
        }
        self.running = true;
        self.next_due = Some(now + Duration::from_secs(self.settings.interval_secs));

        if self.settings.range_px == INHIBIT_RANGE && self.inhibitor_preferred() {
            if let Err(e) = self.inhibitor.start() {
                warn!("could not start sleep inhibitor: {}", e);
            }
        }
        info!(
            "jiggling started with interval {}s and range {}px",
            self.settings.interval_secs, self.settings.range_px
        );
    }

    fn tick_at(&mut self, now: Instant) {
        if !self.running {
            return;
        }
        let Some(due) = self.next_due else {
            return;
        };
        if now < due {
            return;
        }
        self.fire();
        self.next_due = Some(now + Duration::from_secs(self.settings.interval_secs));
    }

    fn set_interval_at(&mut self, now: Instant, secs: u64) {
        let previous = self.settings.interval_secs;
        self.settings.interval_secs = secs;
        if self.running {
            self.next_due = Some(now + Duration::from_secs(secs));
        }
        info!("interval changed from {}s to {}s", previous, secs);
    }

    fn status_at(&self, now: Instant) -> Status {
        Status {
            interval_secs: self.settings.interval_secs,
            range_px: self.settings.range_px,
            running: self.running,
            seconds_remaining: self.remaining_at(now),
        }
    }

    fn remaining_at(&self, now: Instant) -> u64 {
        match self.next_due {
            Some(due) => due.saturating_duration_since(now).as_secs(),
            None => self.settings.interval_secs,
        }
    }

    fn inhibitor_preferred(&self) -> bool {
        self.inhibitor.available() && !self.force_mouse
    }

    /// Perform one activity action. A failure is logged and skipped; it is
    /// not retried before the next natural due time.
    fn fire(&mut self) {
        if self.settings.range_px == INHIBIT_RANGE && self.inhibitor_preferred() {
            match self.inhibitor.ensure_running() {
                Ok(()) => {
                    debug!("sleep prevention active via inhibitor");
                    return;
                }
                Err(e) => {
                    warn!(
                        "sleep inhibitor unavailable ({}), falling back to mouse movement",
                        e
                    );
                }
            }
        }

        let range = if self.settings.range_px == INHIBIT_RANGE {
            FALLBACK_RANGE
        } else {
            self.settings.range_px
        };
        self.jiggle(range);
    }

    fn jiggle(&mut self, range: u32) {
        let r = range.max(1) as i32;
        let mut rng = rand::thread_rng();
        let mut dx = rng.gen_range(-r..=r);
        let dy = rng.gen_range(-r..=r);
        // Always move at least one pixel so the jiggle registers.
        if dx == 0 && dy == 0 {
            dx = 1;
        }

        debug!("moving cursor by ({}, {})", dx, dy);
        if let Err(move_err) = self.driver.move_relative(dx, dy) {
            warn!("cursor move failed ({}), trying null click", move_err);
            if let Err(click_err) = self.driver.null_click() {
                warn!("null click failed ({}), skipping this cycle", click_err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::DriverError;

    #[derive(Default)]
    struct RecordingDriver {
        moves: Vec<(i32, i32)>,
        clicks: usize,
        fail_moves: bool,
    }

    impl ActivityDriver for RecordingDriver {
        fn cursor_position(&self) -> Result<(i32, i32), DriverError> {
            Ok((500, 500))
        }

        fn move_relative(&mut self, dx: i32, dy: i32) -> Result<(), DriverError> {
            if self.fail_moves {
                return Err(DriverError::Post("injected failure".to_string()));
            }
            self.moves.push((dx, dy));
            Ok(())
        }

        fn null_click(&mut self) -> Result<(), DriverError> {
            self.clicks += 1;
            Ok(())
        }
    }

    fn scheduler(interval_secs: u64, range_px: u32) -> JiggleScheduler<RecordingDriver> {
        JiggleScheduler::new(
            RecordingDriver::default(),
            Inhibitor::none(),
            Settings {
                interval_secs,
                range_px,
            },
            false,
        )
    }

    fn at(t0: Instant, secs: u64) -> Instant {
        t0 + Duration::from_secs(secs)
    }

    #[test]
    fn test_no_fire_before_due_then_exactly_one() {
        let t0 = Instant::now();
        let mut s = scheduler(5, 2);
        s.start_at(t0);

        s.tick_at(at(t0, 4));
        assert!(s.driver.moves.is_empty());

        s.tick_at(at(t0, 5));
        assert_eq!(s.driver.moves.len(), 1);

        let (dx, dy) = s.driver.moves[0];
        assert!(dx.abs() <= 2 && dy.abs() <= 2);
        assert!((dx, dy) != (0, 0));

        // Due reset to t0+10: nothing more fires until then.
        s.tick_at(at(t0, 6));
        s.tick_at(at(t0, 9));
        assert_eq!(s.driver.moves.len(), 1);
        s.tick_at(at(t0, 10));
        assert_eq!(s.driver.moves.len(), 2);
    }

    #[test]
    fn test_tick_is_noop_while_stopped() {
        let t0 = Instant::now();
        let mut s = scheduler(5, 2);

        s.tick_at(at(t0, 100));
        assert!(s.driver.moves.is_empty());

        s.start_at(t0);
        s.tick_at(at(t0, 5));
        assert_eq!(s.driver.moves.len(), 1);

        s.stop();
        for secs in 6..60 {
            s.tick_at(at(t0, secs));
        }
        assert_eq!(s.driver.moves.len(), 1);
    }

    #[test]
    fn test_restart_schedules_from_start_moment() {
        let t0 = Instant::now();
        let mut s = scheduler(5, 2);
        s.start_at(t0);
        s.stop();

        s.start_at(at(t0, 100));
        s.tick_at(at(t0, 104));
        assert!(s.driver.moves.is_empty());
        s.tick_at(at(t0, 105));
        assert_eq!(s.driver.moves.len(), 1);
    }

    #[test]
    fn test_interval_change_resets_due_from_change_moment() {
        let t0 = Instant::now();
        let mut s = scheduler(5, 2);
        s.start_at(t0);

        s.set_interval_at(at(t0, 3), 30);
        assert_eq!(s.settings().interval_secs, 30);

        // Old due time (t0+5) no longer applies.
        s.tick_at(at(t0, 5));
        assert!(s.driver.moves.is_empty());

        s.tick_at(at(t0, 32));
        assert!(s.driver.moves.is_empty());
        s.tick_at(at(t0, 33));
        assert_eq!(s.driver.moves.len(), 1);
    }

    #[test]
    fn test_start_is_idempotent() {
        let t0 = Instant::now();
        let mut s = scheduler(5, 2);
        s.start_at(t0);
        // A second start must not push the due time out.
        s.start_at(at(t0, 4));
        s.tick_at(at(t0, 5));
        assert_eq!(s.driver.moves.len(), 1);
    }

    #[test]
    fn test_late_tick_fires_once_and_reschedules_from_now() {
        let t0 = Instant::now();
        let mut s = scheduler(5, 2);
        s.start_at(t0);

        s.tick_at(at(t0, 47));
        assert_eq!(s.driver.moves.len(), 1);
        s.tick_at(at(t0, 51));
        assert_eq!(s.driver.moves.len(), 1);
        s.tick_at(at(t0, 52));
        assert_eq!(s.driver.moves.len(), 2);
    }

    #[test]
    #[cfg(unix)] // spawns a real `sleep` child as the inhibitor
    fn test_sentinel_starts_inhibitor_exactly_once() {
        let mut s = JiggleScheduler::new(
            RecordingDriver::default(),
            Inhibitor::with_command("sleep", &["30"]),
            Settings {
                interval_secs: 5,
                range_px: 2,
            },
            false,
        );
        s.start();
        assert!(s.inhibitor.pid().is_none());

        s.set_range(INHIBIT_RANGE);
        let pid = s.inhibitor.pid().expect("inhibitor should be running");

        // Re-selecting the sentinel is a no-op.
        s.set_range(INHIBIT_RANGE);
        assert_eq!(s.inhibitor.pid(), Some(pid));

        // Switching back to movement stops it.
        s.set_range(2);
        assert!(s.inhibitor.pid().is_none());
    }

    #[test]
    #[cfg(unix)]
    fn test_sentinel_fire_holds_inhibitor_without_moving() {
        let t0 = Instant::now();
        let mut s = JiggleScheduler::new(
            RecordingDriver::default(),
            Inhibitor::with_command("sleep", &["30"]),
            Settings {
                interval_secs: 5,
                range_px: INHIBIT_RANGE,
            },
            false,
        );
        s.start_at(t0);
        assert!(s.inhibitor.pid().is_some());

        s.tick_at(at(t0, 5));
        assert!(s.driver.moves.is_empty());
        assert!(s.inhibitor.pid().is_some());
    }

    #[test]
    #[cfg(unix)]
    fn test_stop_kills_inhibitor() {
        let mut s = JiggleScheduler::new(
            RecordingDriver::default(),
            Inhibitor::with_command("sleep", &["30"]),
            Settings {
                interval_secs: 5,
                range_px: INHIBIT_RANGE,
            },
            false,
        );
        s.start();
        assert!(s.inhibitor.pid().is_some());
        s.stop();
        assert!(s.inhibitor.pid().is_none());
    }

    #[test]
    fn test_force_mouse_bypasses_inhibitor() {
        let t0 = Instant::now();
        let mut s = JiggleScheduler::new(
            RecordingDriver::default(),
            Inhibitor::with_command("sleep", &["30"]),
            Settings {
                interval_secs: 5,
                range_px: INHIBIT_RANGE,
            },
            true,
        );
        s.start_at(t0);
        assert!(s.inhibitor.pid().is_none());

        s.tick_at(at(t0, 5));
        assert_eq!(s.driver.moves.len(), 1);
        let (dx, dy) = s.driver.moves[0];
        assert!(dx.abs() <= FALLBACK_RANGE as i32 && dy.abs() <= FALLBACK_RANGE as i32);
    }

    #[test]
    fn test_sentinel_without_inhibitor_degrades_to_movement() {
        let t0 = Instant::now();
        let mut s = scheduler(5, INHIBIT_RANGE);
        s.start_at(t0);
        s.tick_at(at(t0, 5));
        assert_eq!(s.driver.moves.len(), 1);
    }

    #[test]
    fn test_failed_move_falls_back_to_null_click() {
        let t0 = Instant::now();
        let mut s = scheduler(5, 2);
        s.driver.fail_moves = true;
        s.start_at(t0);

        s.tick_at(at(t0, 5));
        assert!(s.driver.moves.is_empty());
        assert_eq!(s.driver.clicks, 1);

        // The failure still resets the due time.
        s.tick_at(at(t0, 6));
        assert_eq!(s.driver.clicks, 1);
        s.tick_at(at(t0, 10));
        assert_eq!(s.driver.clicks, 2);
    }

    #[test]
    fn test_status_snapshot() {
        let t0 = Instant::now();
        let mut s = scheduler(5, 2);

        let status = s.status_at(t0);
        assert!(!status.running);
        assert_eq!(status.seconds_remaining, 5);
        assert_eq!(status.interval_secs, 5);
        assert_eq!(status.range_px, 2);

        s.start_at(t0);
        let status = s.status_at(at(t0, 1));
        assert!(status.running);
        assert_eq!(status.seconds_remaining, 4);

        let status = s.status_at(at(t0, 9));
        assert_eq!(status.seconds_remaining, 0);
    }
}
