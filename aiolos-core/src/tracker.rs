//! Connection failure tracking and the emergency reset decision
//!
//! The tracker counts consecutive failed connectivity attempts, spaces
//! further attempts with an exponential backoff, and decides when the modem
//! has to be power-cycled. It holds no hardware; the engine performs the
//! reset and reports the outcome back.
//!
//! A reset is warranted when either:
//! - enough consecutive failures piled up and the last reset is far enough
//!   in the past that resetting again is not a loop, or
//! - the modem has not answered a liveness probe for longer than the
//!   unresponsive timeout

use crate::backoff::BackoffLaw;
use crate::config::ResilienceConfig;
use crate::logging::{log_debug, log_info, log_warn};
use crate::time::{elapsed, Timestamp};

/// Consecutive failure counter with backoff and reset policy
#[derive(Debug, Clone)]
pub struct ConnectionFailureTracker {
    law: BackoffLaw,
    max_consecutive_failures: u8,
    min_reset_interval_ms: u64,
    unresponsive_timeout_ms: u64,

    consecutive_failures: u8,
    backoff_delay_ms: u64,
    last_attempt_at: Timestamp,
    last_reset_at: Option<Timestamp>,
    unresponsive_since: Option<Timestamp>,
}

impl ConnectionFailureTracker {
    /// Fresh tracker; every boot starts here
    pub fn new(config: &ResilienceConfig) -> Self {
        Self {
            law: config.connection_backoff,
            max_consecutive_failures: config.max_consecutive_failures,
            min_reset_interval_ms: config.min_reset_interval_ms,
            unresponsive_timeout_ms: config.unresponsive_timeout_ms,
            consecutive_failures: 0,
            backoff_delay_ms: 0,
            last_attempt_at: 0,
            last_reset_at: None,
            unresponsive_since: None,
        }
    }

    /// Consecutive failed attempts
    pub fn consecutive_failures(&self) -> u8 {
        self.consecutive_failures
    }

    /// Current backoff delay (ms)
    pub fn backoff_delay_ms(&self) -> u64 {
        self.backoff_delay_ms
    }

    /// When the last failed attempt was recorded
    pub fn last_attempt_at(&self) -> Timestamp {
        self.last_attempt_at
    }

    /// When the last successful reset happened
    pub fn last_reset_at(&self) -> Option<Timestamp> {
        self.last_reset_at
    }

    /// Whether the backoff delay has elapsed at `now`
    pub fn should_attempt(&self, now: Timestamp) -> bool {
        elapsed(self.last_attempt_at, now) >= self.backoff_delay_ms
    }

    /// Record a failed attempt made at `now`
    pub fn record_failure(&mut self, now: Timestamp) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.backoff_delay_ms = self.law.delay_for(self.consecutive_failures);
        self.last_attempt_at = now;
        log_warn!(
            "connection failure {} in a row, next attempt in {} s",
            self.consecutive_failures,
            self.backoff_delay_ms / 1000
        );
    }

    /// Record a successful attempt
    pub fn record_success(&mut self) {
        if self.consecutive_failures > 0 {
            log_info!("connection restored after {} failures", self.consecutive_failures);
        }
        self.clear();
    }

    /// Record whether the modem answered a liveness probe at `now`
    pub fn record_liveness(&mut self, now: Timestamp, responsive: bool) {
        match (responsive, self.unresponsive_since) {
            (true, Some(_)) => {
                log_debug!("modem responsive again");
                self.unresponsive_since = None;
            }
            (false, None) => {
                log_warn!("modem stopped answering");
                self.unresponsive_since = Some(now);
            }
            _ => {}
        }
    }

    /// How long the modem has been silent at `now` (ms)
    pub fn unresponsive_for(&self, now: Timestamp) -> Option<u64> {
        self.unresponsive_since.map(|since| elapsed(since, now))
    }

    /// Whether the modem should be power-cycled at `now`
    pub fn needs_reset(&self, now: Timestamp) -> bool {
        let reset_floor_passed = self
            .last_reset_at
            .map_or(true, |at| elapsed(at, now) >= self.min_reset_interval_ms);
        let too_many_failures =
            self.consecutive_failures >= self.max_consecutive_failures && reset_floor_passed;
        let silent_too_long = self
            .unresponsive_for(now)
            .map_or(false, |silent| silent > self.unresponsive_timeout_ms);
        too_many_failures || silent_too_long
    }

    /// Record a successful power-line reset at `now`
    pub fn record_reset(&mut self, now: Timestamp) {
        log_info!("modem reset succeeded");
        self.clear();
        self.unresponsive_since = None;
        self.last_reset_at = Some(now);
    }

    /// Zero failures and backoff
    pub fn clear(&mut self) {
        self.consecutive_failures = 0;
        self.backoff_delay_ms = 0;
    }
}
