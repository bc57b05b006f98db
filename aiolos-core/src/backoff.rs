//! Exponential backoff and the application request throttle
//!
//! ## Growth law
//!
//! Both the connection tracker and the request throttle grow their delay
//! the same way:
//!
//! ```text
//! delay(0) = 0
//! delay(n) = min(base * 2^min(n - 1, exponent_cap), max)
//! ```
//!
//! With a 30 s base, a 300 s cap and an exponent cap of 4 the sequence is
//! 30, 60, 120, 240, 300, 300, ... seconds.
//!
//! ## Request throttle
//!
//! [`HttpBackoff`] guards every outgoing request. A request obtains a
//! [`RequestPermit`] first; obtaining one fails with
//! [`HttpError::Throttled`] while the backoff delay has not elapsed. The
//! permit must then be settled with the request's outcome, which records
//! exactly one success or failure. A permit dropped without being settled
//! counts as a failure, so a request abandoned halfway through (an early
//! `?` return, say) still grows the backoff.
//!
//! Failures are stamped when the request finishes, read from the clock the
//! permit was granted with. A request that hangs for its full timeout is
//! still throttled for the whole delay afterwards.

use crate::errors::HttpError;
use crate::logging::{log_debug, log_warn};
use crate::time::{elapsed, TimeSource, Timestamp};

/// Exponential growth law shared by both backoffs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffLaw {
    /// Delay after the first failure (ms)
    pub base_ms: u64,
    /// Upper bound on the delay (ms)
    pub max_ms: u64,
    /// Largest doubling exponent
    pub exponent_cap: u8,
}

impl BackoffLaw {
    /// Create a law
    pub const fn new(base_ms: u64, max_ms: u64, exponent_cap: u8) -> Self {
        Self { base_ms, max_ms, exponent_cap }
    }

    /// Delay after `failures` consecutive failures (ms)
    pub fn delay_for(&self, failures: u8) -> u64 {
        if failures == 0 {
            return 0;
        }
        let exponent = (failures - 1).min(self.exponent_cap).min(63);
        self.base_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_ms)
    }
}

/// Backoff state for application requests
#[derive(Debug, Clone)]
pub struct HttpBackoff {
    law: BackoffLaw,
    failed_attempts: u8,
    backoff_delay_ms: u64,
    last_attempt_at: Timestamp,
}

impl HttpBackoff {
    /// Fresh state, nothing throttled
    pub fn new(law: BackoffLaw) -> Self {
        Self { law, failed_attempts: 0, backoff_delay_ms: 0, last_attempt_at: 0 }
    }

    /// Consecutive failed requests
    pub fn failed_attempts(&self) -> u8 {
        self.failed_attempts
    }

    /// Current delay (ms)
    pub fn backoff_delay_ms(&self) -> u64 {
        self.backoff_delay_ms
    }

    /// Whether a request at `now` would be refused
    pub fn is_throttled(&self, now: Timestamp) -> bool {
        self.failed_attempts > 0 && elapsed(self.last_attempt_at, now) < self.backoff_delay_ms
    }

    /// Time until requests are allowed again (ms)
    pub fn remaining_ms(&self, now: Timestamp) -> u64 {
        if self.failed_attempts == 0 {
            return 0;
        }
        self.backoff_delay_ms
            .saturating_sub(elapsed(self.last_attempt_at, now))
    }

    /// Record a failed request finished at `now`
    pub fn on_failure(&mut self, now: Timestamp) {
        self.failed_attempts = self.failed_attempts.saturating_add(1);
        self.backoff_delay_ms = self.law.delay_for(self.failed_attempts);
        self.last_attempt_at = now;
        log_warn!(
            "request failed ({} in a row), backing off {} ms",
            self.failed_attempts,
            self.backoff_delay_ms
        );
    }

    /// Record a successful request
    pub fn on_success(&mut self) {
        if self.failed_attempts > 0 {
            log_debug!("request backoff cleared after {} failures", self.failed_attempts);
        }
        self.failed_attempts = 0;
        self.backoff_delay_ms = 0;
    }

    /// Permission to send one request at `now`
    ///
    /// `clock` stamps the outcome once the request completes.
    pub fn begin<'a>(
        &'a mut self,
        now: Timestamp,
        clock: &'a dyn TimeSource,
    ) -> Result<RequestPermit<'a>, HttpError> {
        if self.is_throttled(now) {
            log_debug!("request throttled for {} ms", self.remaining_ms(now));
            return Err(HttpError::Throttled);
        }
        Ok(RequestPermit { backoff: self, clock, granted_at: now, settled: false })
    }
}

/// One request's claim on the backoff
///
/// Settle it with the request outcome; dropping it unsettled records a
/// failure.
#[must_use = "an unsettled permit records a failure when dropped"]
pub struct RequestPermit<'a> {
    backoff: &'a mut HttpBackoff,
    clock: &'a dyn TimeSource,
    granted_at: Timestamp,
    settled: bool,
}

impl RequestPermit<'_> {
    /// Timestamp the permit was granted at
    pub fn granted_at(&self) -> Timestamp {
        self.granted_at
    }

    /// Record `outcome`: 2xx success clears the backoff, anything else grows it
    pub fn settle<T>(mut self, outcome: &Result<T, HttpError>) {
        match outcome {
            Ok(_) => self.backoff.on_success(),
            Err(_) => self.fail(),
        }
        self.settled = true;
    }

    fn fail(&mut self) {
        let finished = self.clock.now().max(self.granted_at);
        self.backoff.on_failure(finished);
    }
}

impl Drop for RequestPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.fail();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::resilience::*;
    use crate::time::FixedTime;

    fn connection_law() -> BackoffLaw {
        BackoffLaw::new(
            CONNECTION_BACKOFF_BASE_MS,
            CONNECTION_BACKOFF_MAX_MS,
            CONNECTION_BACKOFF_EXPONENT_CAP,
        )
    }

    #[test]
    fn connection_schedule_saturates() {
        let law = connection_law();
        let secs: [u64; 6] = core::array::from_fn(|i| law.delay_for(i as u8) / 1000);
        assert_eq!(secs, [0, 30, 60, 120, 240, 300]);
        assert_eq!(law.delay_for(u8::MAX), CONNECTION_BACKOFF_MAX_MS);
    }

    #[test]
    fn large_exponent_cap_does_not_overflow() {
        let law = BackoffLaw::new(u64::MAX / 2, u64::MAX, u8::MAX);
        assert_eq!(law.delay_for(200), u64::MAX);
    }

    #[test]
    fn no_failures_never_throttles() {
        let backoff = HttpBackoff::new(connection_law());
        assert!(!backoff.is_throttled(0));
        assert_eq!(backoff.remaining_ms(0), 0);
    }

    #[test]
    fn throttle_lifts_exactly_at_delay() {
        let mut backoff = HttpBackoff::new(BackoffLaw::new(5_000, 120_000, 10));
        backoff.on_failure(1_000);

        assert!(backoff.is_throttled(5_999));
        assert!(!backoff.is_throttled(6_000));
        assert_eq!(backoff.remaining_ms(2_000), 4_000);
    }

    #[test]
    fn success_clears_everything() {
        let mut backoff = HttpBackoff::new(BackoffLaw::new(5_000, 120_000, 10));
        for t in 0..4 {
            backoff.on_failure(t);
        }
        backoff.on_success();
        assert_eq!(backoff.failed_attempts(), 0);
        assert_eq!(backoff.backoff_delay_ms(), 0);
        assert!(!backoff.is_throttled(4));
    }

    #[test]
    fn failures_saturate_count() {
        let mut backoff = HttpBackoff::new(BackoffLaw::new(5_000, 120_000, 10));
        for _ in 0..300 {
            backoff.on_failure(0);
        }
        assert_eq!(backoff.failed_attempts(), u8::MAX);
        assert_eq!(backoff.backoff_delay_ms(), 120_000);
    }

    #[test]
    fn permit_records_outcome_once() {
        let mut backoff = HttpBackoff::new(BackoffLaw::new(5_000, 120_000, 10));
        let clock = FixedTime::new(0);

        let permit = backoff.begin(0, &clock).unwrap();
        permit.settle::<()>(&Err(HttpError::Status(500)));
        assert_eq!(backoff.failed_attempts(), 1);

        assert_eq!(backoff.begin(1_000, &clock).err(), Some(HttpError::Throttled));
        assert_eq!(backoff.failed_attempts(), 1);

        let permit = backoff.begin(5_000, &clock).unwrap();
        permit.settle(&Ok(()));
        assert_eq!(backoff.failed_attempts(), 0);
    }

    #[test]
    fn abandoned_permit_counts_as_failure() {
        let mut backoff = HttpBackoff::new(BackoffLaw::new(5_000, 120_000, 10));
        let clock = FixedTime::new(0);
        {
            let _permit = backoff.begin(0, &clock).unwrap();
        }
        assert_eq!(backoff.failed_attempts(), 1);
    }

    #[test]
    fn slow_failure_is_stamped_at_completion() {
        let mut backoff = HttpBackoff::new(BackoffLaw::new(5_000, 120_000, 10));
        let clock = FixedTime::new(0);

        let permit = backoff.begin(0, &clock).unwrap();
        clock.set(15_000);
        permit.settle::<()>(&Err(HttpError::Transport));

        assert!(backoff.is_throttled(15_000));
        assert!(backoff.is_throttled(19_999));
        assert!(!backoff.is_throttled(20_000));
    }

    #[test]
    fn abandoned_slow_request_is_stamped_at_drop() {
        let mut backoff = HttpBackoff::new(BackoffLaw::new(5_000, 120_000, 10));
        let clock = FixedTime::new(1_000);
        {
            let _permit = backoff.begin(1_000, &clock).unwrap();
            clock.advance(9_000);
        }
        assert_eq!(backoff.remaining_ms(10_000), 5_000);
    }

    #[test]
    fn clock_behind_grant_uses_grant_time() {
        let mut backoff = HttpBackoff::new(BackoffLaw::new(5_000, 120_000, 10));
        let clock = FixedTime::new(0);

        let permit = backoff.begin(2_000, &clock).unwrap();
        permit.settle::<()>(&Err(HttpError::Status(503)));
        assert!(backoff.is_throttled(6_999));
        assert!(!backoff.is_throttled(7_000));
    }
}
