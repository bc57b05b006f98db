//! Schedule Constants
//!
//! Default sleep and maintenance windows plus station task intervals. All
//! of these can be replaced at runtime by a remote configuration.

use super::time::{MS_PER_HOUR, MS_PER_MINUTE, MS_PER_SECOND};

// ===== SLEEP WINDOW =====

/// Hour the nightly sleep window opens.
pub const DEFAULT_SLEEP_START_HOUR: u8 = 22;

/// Hour the nightly sleep window closes.
pub const DEFAULT_SLEEP_END_HOUR: u8 = 9;

/// Shortest deep sleep the wake timer is armed for (s).
pub const MIN_SLEEP_SECS: u32 = 60;

/// Longest deep sleep the wake timer is armed for (s).
pub const MAX_SLEEP_SECS: u32 = 23 * 3600;

/// Age after which a synchronised clock is no longer trusted (ms).
pub const MAX_CLOCK_STALENESS_MS: u64 = 24 * MS_PER_HOUR;

// ===== OTA WINDOW =====

/// Hour the scheduled maintenance window opens.
pub const DEFAULT_OTA_HOUR: u8 = 10;

/// Minute the scheduled maintenance window opens.
pub const DEFAULT_OTA_MINUTE: u8 = 0;

/// Length of the scheduled maintenance window (minutes).
pub const DEFAULT_OTA_DURATION_MIN: u16 = 15;

/// Length of a remotely requested maintenance window (minutes).
pub const REMOTE_OTA_DURATION_MIN: u16 = 30;

/// How often the maintenance window is checked (ms).
pub const OTA_CHECK_INTERVAL_MS: u64 = MS_PER_MINUTE;

// ===== STATION TASKS =====

/// Temperature upload interval (ms).
pub const DEFAULT_TEMP_INTERVAL_MS: u64 = 5 * MS_PER_MINUTE;

/// Wind upload interval (ms).
pub const DEFAULT_WIND_SEND_INTERVAL_MS: u64 = MS_PER_MINUTE;

/// Wind sampling interval (ms).
pub const DEFAULT_WIND_SAMPLE_INTERVAL_MS: u64 = 3 * MS_PER_SECOND;

/// Diagnostics upload interval (ms).
pub const DEFAULT_DIAG_INTERVAL_MS: u64 = 15 * MS_PER_MINUTE;

/// Network time synchronisation interval (ms).
pub const DEFAULT_TIME_SYNC_INTERVAL_MS: u64 = MS_PER_HOUR;

/// Remote configuration fetch interval (ms).
pub const CONFIG_FETCH_INTERVAL_MS: u64 = 30 * MS_PER_MINUTE;
