//! The resilience engine
//!
//! [`ResilienceEngine`] is built once at startup and owns the modem, the
//! watchdog, the system controls and all four pieces of resilience state:
//! the connection failure tracker, the request backoff, the offline
//! supervisor and the uptime limit. Nothing else mutates them. The rest of
//! the firmware reads predicates (`is_online`, `http_backoff`) and obtains
//! request permits.
//!
//! The engine also holds the monotonic clock. `tick` is handed the time the
//! iteration started, but modem calls block for up to a minute, so every
//! outcome recorded after one is stamped with a fresh clock reading.
//!
//! ## One iteration
//!
//! ```text
//! tick(now)
//!  ├─ restart interval elapsed ──────────────────► restart
//!  ├─ poll link, observe offline supervisor
//!  │    ├─ amnesty ─► zero both backoffs
//!  │    └─ max offline ─────────────────────────► restart
//!  ├─ online ─► done
//!  ├─ emergency recovery window open ─► skip attempts
//!  ├─ tracker needs reset ─► hard reset modem
//!  │    ├─ ok   ─► clear tracker, leave recovery
//!  │    └─ fail ─► stay in recovery
//!  └─ backoff elapsed ─► one maintain attempt, record outcome
//! ```

use crate::backoff::{HttpBackoff, RequestPermit};
use crate::config::ResilienceConfig;
use crate::constants::resilience::UPTIME_RESTART_INTERVAL_MS;
use crate::errors::{HttpError, PowerResult, SafetyEvent};
use crate::logging::{log_error, log_info, log_warn};
use crate::safety::{OfflineSafety, SafetyMode};
use crate::time::{elapsed, TimeSource, Timestamp, WallClock};
use crate::tracker::ConnectionFailureTracker;
use crate::traits::{ModemLink, SystemControl, Watchdog};

/// Why the engine restarted the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartReason {
    /// Offline supervisor gave up
    Safety(SafetyEvent),
    /// Routine restart after the uptime limit
    UptimeLimit,
}

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Link up and requests not throttled
    pub online: bool,
    /// Supervisor mode after the tick
    pub mode: SafetyMode,
    /// Both backoffs were forgiven
    pub amnesty: bool,
    /// A connectivity attempt was made
    pub attempted: bool,
    /// Outcome of an emergency reset, if one ran
    pub reset: Option<PowerResult>,
    /// Restart issued during this tick
    pub restart: Option<RestartReason>,
}

/// Owner of the modem and all resilience state
pub struct ResilienceEngine<M, W, S, C> {
    modem: M,
    watchdog: W,
    system: S,
    clock: C,
    config: ResilienceConfig,
    tracker: ConnectionFailureTracker,
    http: HttpBackoff,
    safety: OfflineSafety,
    booted_at: Timestamp,
    restart_interval_ms: u64,
    restart_armed_at: Timestamp,
    uptime_restart_issued: bool,
}

impl<M, W, S, C> ResilienceEngine<M, W, S, C>
where
    M: ModemLink,
    W: Watchdog,
    S: SystemControl,
    C: TimeSource,
{
    /// Build the engine; the clock's current reading is the boot time
    pub fn new(modem: M, watchdog: W, system: S, clock: C, config: ResilienceConfig) -> Self {
        let now = clock.now();
        Self {
            tracker: ConnectionFailureTracker::new(&config),
            http: HttpBackoff::new(config.http_backoff),
            safety: OfflineSafety::new(&config),
            modem,
            watchdog,
            system,
            clock,
            config,
            booted_at: now,
            restart_interval_ms: UPTIME_RESTART_INTERVAL_MS,
            restart_armed_at: now,
            uptime_restart_issued: false,
        }
    }

    /// Change the preventive restart interval at `now`
    ///
    /// A new value re-arms the countdown from `now`; repeating the current
    /// value leaves it running.
    pub fn set_restart_interval_ms(&mut self, ms: u64, now: Timestamp) {
        if ms == self.restart_interval_ms {
            return;
        }
        log_info!("restart interval {} s, re-armed", ms / 1000);
        self.restart_interval_ms = ms;
        self.restart_armed_at = now;
    }

    /// Preventive restart interval (ms)
    pub fn restart_interval_ms(&self) -> u64 {
        self.restart_interval_ms
    }

    /// Current reading of the engine clock
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// The monotonic clock
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The modem
    pub fn modem(&self) -> &M {
        &self.modem
    }

    /// The modem, mutably
    pub fn modem_mut(&mut self) -> &mut M {
        &mut self.modem
    }

    /// The system controls
    pub fn system(&self) -> &S {
        &self.system
    }

    /// The watchdog
    pub fn watchdog(&self) -> &W {
        &self.watchdog
    }

    /// Acknowledge the watchdog
    pub fn feed_watchdog(&mut self) {
        self.watchdog.feed();
    }

    /// Connection failure tracker
    pub fn tracker(&self) -> &ConnectionFailureTracker {
        &self.tracker
    }

    /// Request backoff
    pub fn http_backoff(&self) -> &HttpBackoff {
        &self.http
    }

    /// Offline supervisor
    pub fn safety(&self) -> &OfflineSafety {
        &self.safety
    }

    /// Milliseconds since boot
    pub fn uptime_ms(&self, now: Timestamp) -> u64 {
        elapsed(self.booted_at, now)
    }

    /// Whether requests are currently refused
    pub fn is_throttled(&self, now: Timestamp) -> bool {
        self.http.is_throttled(now)
    }

    /// Link up and requests not throttled
    pub fn is_online(&mut self, now: Timestamp) -> bool {
        !self.http.is_throttled(now) && self.modem.is_link_up()
    }

    /// Claim the request backoff for one request
    pub fn request_permit(&mut self, now: Timestamp) -> Result<RequestPermit<'_>, HttpError> {
        self.http.begin(now, &self.clock)
    }

    /// Bring the modem up at boot
    pub fn start(&mut self, now: Timestamp) -> PowerResult {
        let result = self.modem.power_on(&mut self.watchdog);
        let responsive = result.is_ok();
        let done = self.finished(now);
        self.tracker.record_liveness(done, responsive);
        if let Err(e) = result {
            log_warn!("modem power-on at boot failed: {}", e);
        }
        result
    }

    /// Run one supervision step at `now`
    pub fn tick(&mut self, now: Timestamp) -> TickReport {
        let mut report = TickReport {
            online: false,
            mode: self.safety.mode(),
            amnesty: false,
            attempted: false,
            reset: None,
            restart: None,
        };

        let since_armed = elapsed(self.restart_armed_at, now);
        if !self.uptime_restart_issued && since_armed >= self.restart_interval_ms {
            self.uptime_restart_issued = true;
            log_info!("uptime {} s, routine restart", self.uptime_ms(now) / 1000);
            report.restart = Some(self.restart(RestartReason::UptimeLimit));
            return report;
        }

        let link_up = self.modem.is_link_up();
        let online = link_up && !self.http.is_throttled(now);
        report.online = online;

        let assessment = self.safety.observe(now, online);
        if assessment.amnesty {
            self.tracker.clear();
            self.http.on_success();
            report.amnesty = true;
        }
        if let Some(event) = assessment.restart {
            report.restart = Some(self.restart(RestartReason::Safety(event)));
            report.mode = self.safety.mode();
            return report;
        }

        if link_up {
            // link is up, possibly throttled: nothing to reconnect
            self.tracker.record_success();
            self.tracker.record_liveness(now, true);
            report.mode = self.safety.mode();
            return report;
        }

        if self.safety.attempts_paused(now) {
            report.mode = self.safety.mode();
            return report;
        }

        if self.tracker.needs_reset(now) {
            self.safety.enter_emergency(now);
            let result = self.reset_modem(now);
            match result {
                Ok(()) => self.safety.exit_emergency(),
                Err(e) => log_error!("{}: {}", SafetyEvent::EmergencyResetFailed, e),
            }
            report.reset = Some(result);
            report.mode = self.safety.mode();
            return report;
        }

        if self.tracker.should_attempt(now) {
            report.attempted = true;
            self.attempt_connection(now);
        }

        report.mode = self.safety.mode();
        report
    }

    /// Power-cycle the modem, updating the tracker on success
    pub fn reset_modem(&mut self, now: Timestamp) -> PowerResult {
        let result = self.modem.hard_reset(&mut self.watchdog);
        if result.is_ok() {
            let done = self.finished(now);
            self.tracker.record_reset(done);
        }
        result
    }

    /// Refresh `clock` from network time
    pub fn sync_clock(&mut self, clock: &mut WallClock, now: Timestamp) -> bool {
        match self.modem.network_time() {
            Some(time) => {
                clock.sync(now, time);
                log_info!("clock synced to {}:{}:{}", time.hour, time.minute, time.second);
                true
            }
            None => {
                log_warn!("network time unavailable");
                false
            }
        }
    }

    /// Drop the bearer, power the modem off and deep sleep for `seconds`
    ///
    /// On hardware this does not return; the wake is a fresh boot.
    pub fn enter_deep_sleep(&mut self, seconds: u32) {
        log_info!("entering deep sleep for {} s", seconds);
        if let Err(e) = self.modem.maintain(&mut self.watchdog, false) {
            log_warn!("bearer teardown before sleep: {}", e);
        }
        if let Err(e) = self.modem.power_off(&mut self.watchdog) {
            log_warn!("modem power-off before sleep: {}", e);
        }
        self.modem.pause_ms(self.config.restart_flush_delay_ms);
        self.system.arm_wake_timer(seconds);
        self.system.enter_deep_sleep();
    }

    /// Log, let output drain, and restart the device
    pub fn restart(&mut self, reason: RestartReason) -> RestartReason {
        log_error!("restarting device: {:?}", reason);
        self.modem.pause_ms(self.config.restart_flush_delay_ms);
        self.system.restart();
        reason
    }

    fn attempt_connection(&mut self, now: Timestamp) {
        let result = self.modem.maintain(&mut self.watchdog, true);
        let done = self.finished(now);
        match result {
            Ok(()) => {
                self.tracker.record_success();
                self.tracker.record_liveness(done, true);
            }
            Err(e) => {
                log_warn!("connectivity attempt failed: {}", e);
                self.tracker.record_failure(done);

                let responsive = self.modem.is_responsive();
                self.tracker.record_liveness(done, responsive);
                if !responsive {
                    match self.modem.power_on(&mut self.watchdog) {
                        Ok(()) => {
                            let done = self.finished(now);
                            self.tracker.record_liveness(done, true);
                        }
                        Err(e) => log_warn!("modem power-on failed: {}", e),
                    }
                }
            }
        }
    }

    /// Completion time of a blocking call started at `started`
    fn finished(&self, started: Timestamp) -> Timestamp {
        self.clock.now().max(started)
    }
}
