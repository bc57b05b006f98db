//! Offline safety supervision
//!
//! ## State machine
//!
//! ```text
//!            link up & not throttled
//!   Offline ─────────────────────────► Online
//!      ▲  ◄─────────────────────────────┘
//!      │        link lost: firstOfflineAt = now
//!      │
//!      │ reset ok / window over / amnesty
//!      │
//!  EmergencyRecovery ◄── tracker asks for a reset
//! ```
//!
//! While offline two clocks run from the moment the link was lost:
//! - every backoff-reset interval both backoffs are forgiven ("amnesty"),
//!   so a long exponential wait never outlives a recovering network
//! - after the maximum offline time a full device restart is requested,
//!   once, as the escape from any lock-up between the trackers
//!
//! The supervisor only decides. The engine carries out resets and restarts.

use crate::config::ResilienceConfig;
use crate::errors::SafetyEvent;
use crate::logging::{log_error, log_info, log_warn};
use crate::time::{elapsed, Timestamp};

/// Connectivity mode as seen by the supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyMode {
    /// Link usable
    Online,
    /// Link unusable, attempts continue
    Offline,
    /// A reset failed, attempts paused
    EmergencyRecovery,
}

#[cfg(feature = "defmt")]
impl defmt::Format for SafetyMode {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Online => defmt::write!(fmt, "Online"),
            Self::Offline => defmt::write!(fmt, "Offline"),
            Self::EmergencyRecovery => defmt::write!(fmt, "EmergencyRecovery"),
        }
    }
}

/// Result of one observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Assessment {
    /// Link was just lost
    pub went_offline: bool,
    /// Link just came back
    pub came_online: bool,
    /// Both backoffs must be zeroed now
    pub amnesty: bool,
    /// Terminal event that requires a restart
    pub restart: Option<SafetyEvent>,
}

/// Offline duration, amnesty and emergency recovery bookkeeping
#[derive(Debug, Clone)]
pub struct OfflineSafety {
    max_offline_ms: u64,
    backoff_reset_interval_ms: u64,
    emergency_recovery_ms: u64,

    first_offline_at: Option<Timestamp>,
    was_online: bool,
    last_backoff_reset_at: Timestamp,
    emergency_recovery_active: bool,
    emergency_recovery_started_at: Timestamp,
    restart_requested: bool,
}

impl OfflineSafety {
    /// Fresh supervisor; nothing observed yet
    pub fn new(config: &ResilienceConfig) -> Self {
        Self {
            max_offline_ms: config.max_offline_ms,
            backoff_reset_interval_ms: config.backoff_reset_interval_ms.max(1),
            emergency_recovery_ms: config.emergency_recovery_ms,
            first_offline_at: None,
            was_online: false,
            last_backoff_reset_at: 0,
            emergency_recovery_active: false,
            emergency_recovery_started_at: 0,
            restart_requested: false,
        }
    }

    /// Current mode
    pub fn mode(&self) -> SafetyMode {
        if self.emergency_recovery_active {
            SafetyMode::EmergencyRecovery
        } else if self.was_online && self.first_offline_at.is_none() {
            SafetyMode::Online
        } else {
            SafetyMode::Offline
        }
    }

    /// When the current outage began
    pub fn first_offline_at(&self) -> Option<Timestamp> {
        self.first_offline_at
    }

    /// Whether the link was usable at the last observation
    pub fn was_online(&self) -> bool {
        self.was_online
    }

    /// Whether a restart has already been requested
    pub fn restart_requested(&self) -> bool {
        self.restart_requested
    }

    /// How long the current outage has lasted at `now` (ms)
    pub fn offline_for(&self, now: Timestamp) -> Option<u64> {
        self.first_offline_at.map(|at| elapsed(at, now))
    }

    /// Feed one observation of the link
    pub fn observe(&mut self, now: Timestamp, is_online: bool) -> Assessment {
        let mut assessment = Assessment::default();

        if is_online {
            if let Some(since) = self.first_offline_at.take() {
                log_info!("back online after {} s", elapsed(since, now) / 1000);
                assessment.came_online = true;
            } else if !self.was_online {
                log_info!("online");
                assessment.came_online = true;
            }
            self.was_online = true;
            return assessment;
        }

        let first = match self.first_offline_at {
            Some(at) => at,
            None => {
                if self.was_online {
                    log_warn!("connection lost");
                } else {
                    log_warn!("offline since boot");
                }
                self.first_offline_at = Some(now);
                self.last_backoff_reset_at = now;
                self.was_online = false;
                assessment.went_offline = true;
                now
            }
        };

        let offline_for = elapsed(first, now);

        if offline_for >= self.max_offline_ms && !self.restart_requested {
            log_error!("offline for {} s, restart required", offline_for / 1000);
            self.restart_requested = true;
            assessment.restart = Some(SafetyEvent::MaxOfflineExceeded);
        }

        if elapsed(self.last_backoff_reset_at, now) >= self.backoff_reset_interval_ms {
            let periods = offline_for / self.backoff_reset_interval_ms;
            self.last_backoff_reset_at = first + periods * self.backoff_reset_interval_ms;
            log_info!("backoff amnesty after {} s offline", offline_for / 1000);
            if self.emergency_recovery_active {
                self.exit_emergency();
            }
            assessment.amnesty = true;
        }

        assessment
    }

    /// Enter emergency recovery at `now`
    pub fn enter_emergency(&mut self, now: Timestamp) {
        log_warn!("entering emergency recovery");
        self.emergency_recovery_active = true;
        self.emergency_recovery_started_at = now;
    }

    /// Leave emergency recovery
    pub fn exit_emergency(&mut self) {
        if self.emergency_recovery_active {
            log_info!("leaving emergency recovery");
        }
        self.emergency_recovery_active = false;
    }

    /// Whether connectivity attempts are paused at `now`
    ///
    /// Ends emergency recovery once its window is over.
    pub fn attempts_paused(&mut self, now: Timestamp) -> bool {
        if !self.emergency_recovery_active {
            return false;
        }
        if elapsed(self.emergency_recovery_started_at, now) < self.emergency_recovery_ms {
            return true;
        }
        log_info!("emergency recovery window over");
        self.exit_emergency();
        false
    }
}
