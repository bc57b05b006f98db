//! Resilience Constants
//!
//! Backoff laws and safety limits. Two independent exponential backoffs
//! exist: one for the cellular link, one for application requests. Both use
//! `delay = min(base * 2^min(failures - 1, exponent_cap), max)`.
//!
//! The HTTP backoff is shorter in both base and cap: a live link with a
//! failing endpoint usually recovers quickly.

use super::time::{MS_PER_HOUR, MS_PER_MINUTE, MS_PER_SECOND};

// ===== CONNECTION BACKOFF =====

/// First connection retry delay (ms).
pub const CONNECTION_BACKOFF_BASE_MS: u64 = 30 * MS_PER_SECOND;

/// Longest connection retry delay (ms).
pub const CONNECTION_BACKOFF_MAX_MS: u64 = 5 * MS_PER_MINUTE;

/// Largest doubling exponent applied to the connection base delay.
pub const CONNECTION_BACKOFF_EXPONENT_CAP: u8 = 4;

// ===== HTTP BACKOFF =====

/// First request retry delay (ms).
pub const HTTP_BACKOFF_BASE_MS: u64 = 5 * MS_PER_SECOND;

/// Longest request retry delay (ms).
pub const HTTP_BACKOFF_MAX_MS: u64 = 2 * MS_PER_MINUTE;

/// Largest doubling exponent applied to the request base delay.
pub const HTTP_BACKOFF_EXPONENT_CAP: u8 = 10;

// ===== EMERGENCY RESET =====

/// Consecutive connection failures that warrant a power-line reset.
pub const MAX_CONSECUTIVE_FAILURES: u8 = 5;

/// Minimum time between two emergency resets (ms).
pub const MIN_RESET_INTERVAL_MS: u64 = 10 * MS_PER_MINUTE;

/// Continuous unresponsiveness that warrants a reset on its own (ms).
pub const UNRESPONSIVE_TIMEOUT_MS: u64 = 5 * MS_PER_MINUTE;

/// Connectivity attempts are skipped this long after a failed reset (ms).
pub const EMERGENCY_RECOVERY_DURATION_MS: u64 = 10 * MS_PER_MINUTE;

// ===== OFFLINE SAFETY =====

/// Continuous offline time after which the device restarts (ms).
pub const MAX_OFFLINE_TIME_MS: u64 = 2 * MS_PER_HOUR;

/// Interval at which both backoffs are forgiven while offline (ms).
pub const BACKOFF_RESET_INTERVAL_MS: u64 = 15 * MS_PER_MINUTE;

/// Continuous uptime after which the device restarts (ms).
///
/// Source: six hours keeps heap fragmentation in the modem stack in check
pub const UPTIME_RESTART_INTERVAL_MS: u64 = 6 * MS_PER_HOUR;

/// Pause before a restart so buffered log output drains (ms).
pub const RESTART_FLUSH_DELAY_MS: u32 = 2000;

// ===== WATCHDOG =====

/// Hardware watchdog timeout (ms).
///
/// Any blocking call that may exceed this runs under a `WatchdogGuard`.
pub const WATCHDOG_TIMEOUT_MS: u32 = 30_000;
