//! Constants for the Aiolos resilience engine
//!
//! Every tunable number the engine uses lives here, with its unit in the
//! name and a note on where the value comes from. Runtime configuration
//! (`crate::config`) starts from these values.
//!
//! ## Organization
//!
//! - **Time**: unit conversions
//! - **Modem**: power-line pulse widths, probe timeouts, command strings
//! - **Resilience**: backoff laws, reset floors, offline and uptime limits
//! - **Schedule**: sleep window, OTA window and station task intervals
//!
//! ## Usage Guidelines
//!
//! 1. Always use these constants instead of magic numbers
//! 2. Keep the unit suffix (`_MS`, `_SECS`, `_HOUR`) on every duration
//! 3. Note the datasheet or field observation behind hardware timings

/// Time unit conversions.
pub mod time;

/// Modem power sequencing timings and AT command strings.
pub mod modem;

/// Failure tracking, backoff and safety limits.
pub mod resilience;

/// Sleep and maintenance windows, station task intervals.
pub mod schedule;

pub use time::{MS_PER_SECOND, MS_PER_MINUTE, MS_PER_HOUR, SECONDS_PER_DAY};

pub use resilience::{
    CONNECTION_BACKOFF_BASE_MS, CONNECTION_BACKOFF_MAX_MS,
    HTTP_BACKOFF_BASE_MS, HTTP_BACKOFF_MAX_MS,
    MAX_CONSECUTIVE_FAILURES, MAX_OFFLINE_TIME_MS,
};

pub use schedule::{DEFAULT_SLEEP_START_HOUR, DEFAULT_SLEEP_END_HOUR};
