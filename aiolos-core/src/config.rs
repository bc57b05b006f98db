//! Runtime configuration
//!
//! Three layers:
//! - [`ResilienceConfig`]: backoff and safety limits, fixed after boot
//! - [`StationSettings`]: task intervals and the [`ScheduleConfig`], which a
//!   fetched [`RemoteConfig`] may change at runtime
//! - [`ApnConfig`]: data bearer credentials
//!
//! Every default comes from [`crate::constants`].

use heapless::String;

use crate::backoff::BackoffLaw;
use crate::constants::modem::DEFAULT_APN;
use crate::constants::resilience::*;
use crate::constants::schedule::*;
use crate::constants::time::{MINUTES_PER_DAY, MS_PER_SECOND};
use crate::logging::{log_info, log_warn};

/// Packet data bearer credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApnConfig {
    /// Access point name
    pub apn: String<32>,
    /// User name, often empty
    pub user: String<32>,
    /// Password, often empty
    pub password: String<32>,
}

impl ApnConfig {
    /// Credentials for `apn` with empty user and password
    ///
    /// Names longer than the buffer are truncated.
    pub fn new(apn: &str) -> Self {
        Self { apn: truncated(apn), user: String::new(), password: String::new() }
    }

    /// Set user name and password
    pub fn credentials(mut self, user: &str, password: &str) -> Self {
        self.user = truncated(user);
        self.password = truncated(password);
        self
    }
}

impl Default for ApnConfig {
    fn default() -> Self {
        Self::new(DEFAULT_APN)
    }
}

fn truncated<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Backoff laws and safety limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResilienceConfig {
    /// Connection retry backoff
    pub connection_backoff: BackoffLaw,
    /// Application request backoff
    pub http_backoff: BackoffLaw,
    /// Failures that warrant an emergency reset
    pub max_consecutive_failures: u8,
    /// Minimum time between emergency resets (ms)
    pub min_reset_interval_ms: u64,
    /// Continuous unresponsiveness that warrants a reset (ms)
    pub unresponsive_timeout_ms: u64,
    /// Connectivity pause after a failed reset (ms)
    pub emergency_recovery_ms: u64,
    /// Offline time that forces a restart (ms)
    pub max_offline_ms: u64,
    /// Interval of backoff amnesty while offline (ms)
    pub backoff_reset_interval_ms: u64,
    /// Pause before restarting (ms)
    pub restart_flush_delay_ms: u32,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            connection_backoff: BackoffLaw::new(
                CONNECTION_BACKOFF_BASE_MS,
                CONNECTION_BACKOFF_MAX_MS,
                CONNECTION_BACKOFF_EXPONENT_CAP,
            ),
            http_backoff: BackoffLaw::new(
                HTTP_BACKOFF_BASE_MS,
                HTTP_BACKOFF_MAX_MS,
                HTTP_BACKOFF_EXPONENT_CAP,
            ),
            max_consecutive_failures: MAX_CONSECUTIVE_FAILURES,
            min_reset_interval_ms: MIN_RESET_INTERVAL_MS,
            unresponsive_timeout_ms: UNRESPONSIVE_TIMEOUT_MS,
            emergency_recovery_ms: EMERGENCY_RECOVERY_DURATION_MS,
            max_offline_ms: MAX_OFFLINE_TIME_MS,
            backoff_reset_interval_ms: BACKOFF_RESET_INTERVAL_MS,
            restart_flush_delay_ms: RESTART_FLUSH_DELAY_MS,
        }
    }
}

impl ResilienceConfig {
    /// Replace the connection backoff law
    pub fn with_connection_backoff(mut self, law: BackoffLaw) -> Self {
        self.connection_backoff = law;
        self
    }

    /// Replace the request backoff law
    pub fn with_http_backoff(mut self, law: BackoffLaw) -> Self {
        self.http_backoff = law;
        self
    }

    /// Set the failure count that triggers an emergency reset
    pub fn with_max_consecutive_failures(mut self, failures: u8) -> Self {
        self.max_consecutive_failures = failures.max(1);
        self
    }

    /// Set the minimum time between emergency resets
    pub fn with_min_reset_interval_ms(mut self, ms: u64) -> Self {
        self.min_reset_interval_ms = ms;
        self
    }

    /// Set the unresponsive timeout
    pub fn with_unresponsive_timeout_ms(mut self, ms: u64) -> Self {
        self.unresponsive_timeout_ms = ms;
        self
    }

    /// Set the emergency recovery window
    pub fn with_emergency_recovery_ms(mut self, ms: u64) -> Self {
        self.emergency_recovery_ms = ms;
        self
    }

    /// Set the offline time that forces a restart
    pub fn with_max_offline_ms(mut self, ms: u64) -> Self {
        self.max_offline_ms = ms;
        self
    }

    /// Set the backoff amnesty interval
    pub fn with_backoff_reset_interval_ms(mut self, ms: u64) -> Self {
        self.backoff_reset_interval_ms = ms.max(1);
        self
    }

    /// Set the pause before a restart
    pub fn with_restart_flush_delay_ms(mut self, ms: u32) -> Self {
        self.restart_flush_delay_ms = ms;
        self
    }
}

/// Sleep and maintenance windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScheduleConfig {
    /// Hour the sleep window opens
    pub sleep_start_hour: u8,
    /// Hour the sleep window closes
    pub sleep_end_hour: u8,
    /// Hour the maintenance window opens
    pub ota_hour: u8,
    /// Minute the maintenance window opens
    pub ota_minute: u8,
    /// Maintenance window length (minutes)
    pub ota_duration_min: u16,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            sleep_start_hour: DEFAULT_SLEEP_START_HOUR,
            sleep_end_hour: DEFAULT_SLEEP_END_HOUR,
            ota_hour: DEFAULT_OTA_HOUR,
            ota_minute: DEFAULT_OTA_MINUTE,
            ota_duration_min: DEFAULT_OTA_DURATION_MIN,
        }
    }
}

/// Station task intervals plus the schedule, all remotely adjustable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationSettings {
    /// Temperature upload interval (ms)
    pub temp_interval_ms: u64,
    /// Wind upload interval (ms)
    pub wind_send_interval_ms: u64,
    /// Wind sampling interval (ms)
    pub wind_sample_interval_ms: u64,
    /// Diagnostics upload interval (ms)
    pub diag_interval_ms: u64,
    /// Network time sync interval (ms)
    pub time_sync_interval_ms: u64,
    /// Continuous uptime before a preventive restart (ms)
    pub restart_interval_ms: u64,
    /// Sleep and maintenance windows
    pub schedule: ScheduleConfig,
}

impl Default for StationSettings {
    fn default() -> Self {
        Self {
            temp_interval_ms: DEFAULT_TEMP_INTERVAL_MS,
            wind_send_interval_ms: DEFAULT_WIND_SEND_INTERVAL_MS,
            wind_sample_interval_ms: DEFAULT_WIND_SAMPLE_INTERVAL_MS,
            diag_interval_ms: DEFAULT_DIAG_INTERVAL_MS,
            time_sync_interval_ms: DEFAULT_TIME_SYNC_INTERVAL_MS,
            restart_interval_ms: UPTIME_RESTART_INTERVAL_MS,
            schedule: ScheduleConfig::default(),
        }
    }
}

/// Remote configuration document, every field optional
///
/// Task intervals are in milliseconds on the wire; the restart interval is
/// in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct RemoteConfig {
    /// Temperature upload interval (ms)
    pub temp_interval: Option<u64>,
    /// Wind upload interval (ms)
    pub wind_send_interval: Option<u64>,
    /// Wind sampling interval (ms)
    pub wind_sample_interval: Option<u64>,
    /// Diagnostics upload interval (ms)
    pub diag_interval: Option<u64>,
    /// Time sync interval (ms)
    pub time_interval: Option<u64>,
    /// Preventive restart interval (s)
    pub restart_interval: Option<u64>,
    /// Sleep window start hour
    pub sleep_start_hour: Option<u8>,
    /// Sleep window end hour
    pub sleep_end_hour: Option<u8>,
    /// Maintenance window hour
    pub ota_hour: Option<u8>,
    /// Maintenance window minute
    pub ota_minute: Option<u8>,
    /// Maintenance window length (minutes)
    pub ota_duration: Option<u16>,
    /// Server asks for a maintenance window now
    pub remote_ota: Option<bool>,
}

impl RemoteConfig {
    /// Whether the server requested a maintenance window
    pub fn requests_ota(&self) -> bool {
        self.remote_ota.unwrap_or(false)
    }
}

fn apply_interval(target: &mut u64, value: Option<u64>, unit_ms: u64, name: &str) -> bool {
    match value {
        Some(0) => {
            log_warn!("ignoring zero {}", name);
            false
        }
        Some(value) => {
            let ms = value.saturating_mul(unit_ms);
            if *target == ms {
                return false;
            }
            log_info!("{} -> {} ms", name, ms);
            *target = ms;
            true
        }
        None => false,
    }
}

fn apply_bounded<V: Copy + PartialOrd + PartialEq + core::fmt::Display>(
    target: &mut V,
    value: Option<V>,
    upper: V,
    name: &str,
) -> bool {
    match value {
        Some(v) if v < upper => {
            if *target == v {
                return false;
            }
            log_info!("{} -> {}", name, v);
            *target = v;
            true
        }
        Some(v) => {
            log_warn!("ignoring out-of-range {} {}", name, v);
            false
        }
        None => false,
    }
}

impl StationSettings {
    /// Apply the valid fields of `remote`, returning how many changed
    ///
    /// Zero intervals and out-of-range hours or minutes are ignored.
    pub fn apply(&mut self, remote: &RemoteConfig) -> usize {
        let s = &mut self.schedule;
        let changes = [
            apply_interval(
                &mut self.temp_interval_ms,
                remote.temp_interval,
                1,
                "temperature interval",
            ),
            apply_interval(
                &mut self.wind_send_interval_ms,
                remote.wind_send_interval,
                1,
                "wind send interval",
            ),
            apply_interval(
                &mut self.wind_sample_interval_ms,
                remote.wind_sample_interval,
                1,
                "wind sample interval",
            ),
            apply_interval(
                &mut self.diag_interval_ms,
                remote.diag_interval,
                1,
                "diagnostics interval",
            ),
            apply_interval(
                &mut self.time_sync_interval_ms,
                remote.time_interval,
                1,
                "time sync interval",
            ),
            apply_interval(
                &mut self.restart_interval_ms,
                remote.restart_interval,
                MS_PER_SECOND,
                "restart interval",
            ),
            apply_bounded(&mut s.sleep_start_hour, remote.sleep_start_hour, 24, "sleep start hour"),
            apply_bounded(&mut s.sleep_end_hour, remote.sleep_end_hour, 24, "sleep end hour"),
            apply_bounded(&mut s.ota_hour, remote.ota_hour, 24, "OTA hour"),
            apply_bounded(&mut s.ota_minute, remote.ota_minute, 60, "OTA minute"),
            apply_bounded(
                &mut s.ota_duration_min,
                remote.ota_duration.filter(|d| *d > 0),
                MINUTES_PER_DAY as u16,
                "OTA duration",
            ),
        ];
        changes.iter().filter(|changed| **changed).count()
    }
}
