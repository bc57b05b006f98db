//! Sleep and maintenance windows
//!
//! Both windows are daily ranges of minutes. A range may cross midnight;
//! a zero-length range never matches. The sleep decision additionally
//! refuses to answer while the wall clock is unsynchronised or stale: a
//! bad clock must never put the station to sleep for a day.

use crate::config::ScheduleConfig;
use crate::constants::schedule::{MAX_SLEEP_SECS, MIN_SLEEP_SECS};
use crate::constants::time::{
    MINUTES_PER_DAY, MINUTES_PER_HOUR, SECONDS_PER_DAY, SECONDS_PER_MINUTE,
};
use crate::logging::{log_debug, log_info};
use crate::time::{elapsed, ClockTime, Timestamp, WallClock};

/// Daily range of minutes, possibly crossing midnight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyWindow {
    start_min: u32,
    duration_min: u32,
}

impl DailyWindow {
    /// Window opening at `start_min` (minutes since midnight) for `duration_min`
    pub fn new(start_min: u32, duration_min: u32) -> Self {
        Self {
            start_min: start_min % MINUTES_PER_DAY,
            duration_min: duration_min.min(MINUTES_PER_DAY),
        }
    }

    /// Window from whole hours; `start == end` is empty
    pub fn from_hours(start_hour: u8, end_hour: u8) -> Self {
        let start = start_hour as u32 % 24;
        let end = end_hour as u32 % 24;
        let hours = (end + 24 - start) % 24;
        Self::new(start * MINUTES_PER_HOUR, hours * MINUTES_PER_HOUR)
    }

    /// Whether `minute_of_day` falls inside the window
    pub fn contains_minute(&self, minute_of_day: u32) -> bool {
        if self.duration_min == 0 {
            return false;
        }
        let m = minute_of_day % MINUTES_PER_DAY;
        let end = self.start_min + self.duration_min;
        if end <= MINUTES_PER_DAY {
            m >= self.start_min && m < end
        } else {
            m >= self.start_min || m < end - MINUTES_PER_DAY
        }
    }

    /// Whether `time` falls inside the window
    pub fn contains(&self, time: ClockTime) -> bool {
        self.contains_minute(time.minutes_of_day())
    }
}

/// Whether `hour` lies in the sleep window
pub fn is_sleep_window(schedule: &ScheduleConfig, hour: u8) -> bool {
    DailyWindow::from_hours(schedule.sleep_start_hour, schedule.sleep_end_hour)
        .contains_minute(hour as u32 * MINUTES_PER_HOUR)
}

/// Whether `time` lies in the scheduled maintenance window
pub fn is_ota_window(schedule: &ScheduleConfig, time: ClockTime) -> bool {
    let start = schedule.ota_hour as u32 * MINUTES_PER_HOUR + schedule.ota_minute as u32;
    DailyWindow::new(start, schedule.ota_duration_min as u32).contains(time)
}

/// Seconds from `now` until `end_hour`, clamped to the wake timer range
pub fn sleep_duration_secs(now: ClockTime, end_hour: u8) -> u32 {
    let target = (end_hour as u32 % 24) * MINUTES_PER_HOUR * SECONDS_PER_MINUTE;
    let current = now.seconds_of_day();
    let secs = if target > current {
        target - current
    } else {
        target + SECONDS_PER_DAY - current
    };
    secs.clamp(MIN_SLEEP_SECS, MAX_SLEEP_SECS)
}

/// Deep sleep length if the station should sleep at `now`
///
/// `None` when outside the window, or when the clock cannot be trusted.
pub fn sleep_plan(
    schedule: &ScheduleConfig,
    clock: &WallClock,
    now: Timestamp,
    max_clock_age_ms: u64,
) -> Option<u32> {
    let Some(time) = clock.time_of_day(now, max_clock_age_ms) else {
        log_debug!("sleep check skipped, clock not trusted");
        return None;
    };
    if !is_sleep_window(schedule, time.hour) {
        return None;
    }
    let secs = sleep_duration_secs(time, schedule.sleep_end_hour);
    log_info!("sleep window open at {}:{}, sleeping {} s", time.hour, time.minute, secs);
    Some(secs)
}

/// Why a maintenance window is open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceTrigger {
    /// Daily window from the schedule
    Scheduled,
    /// Requested by the server
    Remote,
}

/// Open maintenance window, if any
///
/// Sensor and connectivity work continues while it is open.
#[derive(Debug, Clone, Copy, Default)]
pub struct Maintenance {
    open: Option<(MaintenanceTrigger, Timestamp, u64)>,
}

impl Maintenance {
    /// Nothing open
    pub const fn new() -> Self {
        Self { open: None }
    }

    /// Whether a window is open
    pub fn is_active(&self) -> bool {
        self.open.is_some()
    }

    /// Trigger of the open window
    pub fn trigger(&self) -> Option<MaintenanceTrigger> {
        self.open.map(|(trigger, _, _)| trigger)
    }

    /// Open a window at `now` for `duration_min`
    pub fn open(&mut self, now: Timestamp, trigger: MaintenanceTrigger, duration_min: u16) {
        let duration_ms = duration_min as u64 * SECONDS_PER_MINUTE as u64 * 1000;
        log_info!("maintenance window open ({:?}, {} min)", trigger, duration_min);
        self.open = Some((trigger, now, duration_ms));
    }

    /// Whether the open window has run its course at `now`
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.open
            .map_or(false, |(_, at, duration)| elapsed(at, now) >= duration)
    }

    /// Close the window
    pub fn close(&mut self) {
        if let Some((trigger, _, _)) = self.open.take() {
            log_info!("maintenance window closed ({:?})", trigger);
        }
    }
}
