//! Time management for the station
//!
//! Two notions of time are kept apart:
//! - A monotonic millisecond counter (`TimeSource`) that starts at boot and
//!   drives every backoff, window and timeout in the engine
//! - A time of day (`WallClock`) that only exists once the modem has handed
//!   us network time, and that goes stale if it is not refreshed

use crate::constants::time::{
    MINUTES_PER_HOUR, SECONDS_PER_DAY, SECONDS_PER_HOUR, SECONDS_PER_MINUTE,
};

/// Milliseconds since device boot
pub type Timestamp = u64;

/// Milliseconds elapsed from `since` to `now`, zero if the clock went backwards
#[inline]
pub fn elapsed(since: Timestamp, now: Timestamp) -> u64 {
    now.saturating_sub(since)
}

/// Source of monotonic time for the system
pub trait TimeSource {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;

    /// Get precision in milliseconds
    fn precision_ms(&self) -> u32 {
        1
    }
}

/// Monotonic time source backed by `std::time::Instant` (requires std)
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct SystemTime {
    boot: std::time::Instant,
}

#[cfg(feature = "std")]
impl SystemTime {
    /// Start counting from now
    pub fn new() -> Self {
        Self { boot: std::time::Instant::now() }
    }
}

#[cfg(feature = "std")]
impl Default for SystemTime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl TimeSource for SystemTime {
    fn now(&self) -> Timestamp {
        self.boot.elapsed().as_millis() as Timestamp
    }
}

/// Manually driven time source for testing
#[derive(Debug, Clone, Default)]
pub struct FixedTime {
    timestamp: core::cell::Cell<Timestamp>,
}

impl FixedTime {
    /// Create a source frozen at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp: core::cell::Cell::new(timestamp) }
    }

    /// Jump to `timestamp`
    pub fn set(&self, timestamp: Timestamp) {
        self.timestamp.set(timestamp);
    }

    /// Move forward by `ms`
    pub fn advance(&self, ms: u64) {
        self.timestamp.set(self.timestamp.get() + ms);
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp.get()
    }
}

/// Time of day with second resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClockTime {
    /// Hour, 0..24
    pub hour: u8,
    /// Minute, 0..60
    pub minute: u8,
    /// Second, 0..60
    pub second: u8,
}

impl ClockTime {
    /// Build a time of day, `None` if any field is out of range
    pub fn new(hour: u8, minute: u8, second: u8) -> Option<Self> {
        if hour < 24 && minute < 60 && second < 60 {
            Some(Self { hour, minute, second })
        } else {
            None
        }
    }

    /// Seconds since midnight
    pub fn seconds_of_day(&self) -> u32 {
        self.hour as u32 * SECONDS_PER_HOUR
            + self.minute as u32 * SECONDS_PER_MINUTE
            + self.second as u32
    }

    /// Minutes since midnight
    pub fn minutes_of_day(&self) -> u32 {
        self.hour as u32 * MINUTES_PER_HOUR + self.minute as u32
    }

    fn from_seconds_of_day(secs: u32) -> Self {
        let secs = secs % SECONDS_PER_DAY;
        Self {
            hour: (secs / SECONDS_PER_HOUR) as u8,
            minute: ((secs % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE) as u8,
            second: (secs % SECONDS_PER_MINUTE) as u8,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ClockTime {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}:{}:{}", self.hour, self.minute, self.second)
    }
}

/// Time of day anchored to the monotonic clock at the last network sync
///
/// Between syncs the time of day advances with the monotonic counter. A
/// clock that was never synced, or whose last sync is older than the
/// caller's staleness limit, reports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock {
    anchor: Option<(Timestamp, u32)>,
}

impl WallClock {
    /// An unsynchronised clock
    pub const fn new() -> Self {
        Self { anchor: None }
    }

    /// Record that the time of day was `time` at monotonic `now`
    pub fn sync(&mut self, now: Timestamp, time: ClockTime) {
        self.anchor = Some((now, time.seconds_of_day()));
    }

    /// Whether any sync has happened since boot
    pub fn is_synced(&self) -> bool {
        self.anchor.is_some()
    }

    /// Monotonic timestamp of the last sync
    pub fn synced_at(&self) -> Option<Timestamp> {
        self.anchor.map(|(at, _)| at)
    }

    /// Whether the last sync is within `max_age_ms` of `now`
    pub fn is_fresh(&self, now: Timestamp, max_age_ms: u64) -> bool {
        self.synced_at()
            .map_or(false, |at| elapsed(at, now) <= max_age_ms)
    }

    /// Time of day at `now`, `None` if never synced or stale
    pub fn time_of_day(&self, now: Timestamp, max_age_ms: u64) -> Option<ClockTime> {
        if !self.is_fresh(now, max_age_ms) {
            return None;
        }
        let (at, secs) = self.anchor?;
        let drift = (elapsed(at, now) / 1000) % SECONDS_PER_DAY as u64;
        Some(ClockTime::from_seconds_of_day(secs + drift as u32))
    }
}
