//! Station main loop
//!
//! [`StationLoop`] is the cooperative loop body of a station. Each call to
//! [`StationLoop::run_once`] performs at most one pass over every task:
//!
//! ```text
//! feed watchdog
//! engine tick ───────────────────────────────► Restarted
//! service open maintenance window
//! maintenance window check (once a minute)
//! time sync ─► sleep window open ────────────► Slept
//! wind sampling
//! online?
//!  ├─ diagnostics
//!  ├─ configuration fetch (may open a remote maintenance window)
//!  ├─ wind upload
//!  └─ temperature upload
//! ```
//!
//! Uploads stop for the rest of the pass as soon as the request backoff
//! throttles. A task whose interval elapsed is considered done for that
//! interval whether or not its request succeeded.

use aiolos_core::constants::schedule::{
    CONFIG_FETCH_INTERVAL_MS, MAX_CLOCK_STALENESS_MS, OTA_CHECK_INTERVAL_MS,
    REMOTE_OTA_DURATION_MIN,
};
use aiolos_core::constants::time::{MS_PER_MINUTE, MS_PER_SECOND};
use aiolos_core::engine::{ResilienceEngine, RestartReason};
use aiolos_core::errors::HttpError;
use aiolos_core::schedule::{is_ota_window, sleep_plan, Maintenance, MaintenanceTrigger};
use aiolos_core::time::{elapsed, TimeSource, Timestamp, WallClock};
use aiolos_core::traits::{ModemLink, SystemControl, Watchdog};
use aiolos_core::StationSettings;
use log::{debug, info, warn};

use crate::api::StationClient;
use crate::payload::{BoardReadings, DiagnosticsReport, TemperatureReport, WindReport};
use crate::HttpTransport;

/// Sensor readings the loop uploads
pub trait Sensors {
    /// Battery, solar and enclosure readings
    fn board(&mut self) -> BoardReadings;

    /// Take one wind sample; called on the sampling interval
    fn sample_wind(&mut self) {}

    /// Wind figure to upload, typically averaged over the samples so far
    fn wind(&mut self) -> WindReport;

    /// Air temperature
    fn temperature(&mut self) -> TemperatureReport;
}

/// Firmware update service run inside a maintenance window
pub trait OtaService {
    /// Start serving; `false` if the service could not start
    fn begin(&mut self, trigger: MaintenanceTrigger) -> bool;

    /// Serve pending work; `false` once the service has finished
    fn service(&mut self) -> bool;

    /// Stop serving
    fn end(&mut self);
}

/// Outcome of one loop pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iteration {
    /// The engine restarted the device
    Restarted(RestartReason),
    /// The station entered deep sleep for this many seconds
    Slept(u32),
    /// A normal pass
    Ran {
        /// Connectivity was usable
        online: bool,
        /// Requests that succeeded
        sent: u8,
    },
}

/// Last run of each periodic task; `None` means due now
#[derive(Debug, Clone, Copy)]
struct Timers {
    ota_check: Option<Timestamp>,
    time_sync: Option<Timestamp>,
    config: Option<Timestamp>,
    wind_sample: Option<Timestamp>,
    wind_send: Option<Timestamp>,
    temperature: Option<Timestamp>,
    diagnostics: Option<Timestamp>,
}

impl Timers {
    fn new(now: Timestamp) -> Self {
        Self {
            ota_check: None,
            time_sync: None,
            config: None,
            wind_sample: Some(now),
            wind_send: Some(now),
            temperature: Some(now),
            diagnostics: Some(now),
        }
    }
}

/// Claim `last` at `now` if `interval_ms` has passed
fn claim(last: &mut Option<Timestamp>, now: Timestamp, interval_ms: u64) -> bool {
    if last.map_or(true, |at| elapsed(at, now) >= interval_ms) {
        *last = Some(now);
        true
    } else {
        false
    }
}

/// Fold one request outcome into the pass; `false` stops further uploads
fn tally(sent: &mut u8, task: &str, result: Result<(), HttpError>) -> bool {
    match result {
        Ok(()) => {
            *sent = sent.saturating_add(1);
            true
        }
        Err(HttpError::Throttled) => {
            debug!("{} deferred, requests throttled", task);
            false
        }
        Err(e) => {
            warn!("{} failed: {}", task, e);
            true
        }
    }
}

/// The station's cooperative main loop
pub struct StationLoop<M, W, S, C, T, Z, O> {
    engine: ResilienceEngine<M, W, S, C>,
    client: StationClient<T>,
    sensors: Z,
    ota: O,
    settings: StationSettings,
    clock: WallClock,
    maintenance: Maintenance,
    scheduled_opened_at: Option<Timestamp>,
    timers: Timers,
}

impl<M, W, S, C, T, Z, O> StationLoop<M, W, S, C, T, Z, O>
where
    M: ModemLink,
    W: Watchdog,
    S: SystemControl,
    C: TimeSource,
    T: HttpTransport,
    Z: Sensors,
    O: OtaService,
{
    /// Assemble the loop at `now`; sensor tasks first run one interval later
    pub fn new(
        mut engine: ResilienceEngine<M, W, S, C>,
        client: StationClient<T>,
        sensors: Z,
        ota: O,
        settings: StationSettings,
        now: Timestamp,
    ) -> Self {
        engine.set_restart_interval_ms(settings.restart_interval_ms, now);
        Self {
            engine,
            client,
            sensors,
            ota,
            settings,
            clock: WallClock::new(),
            maintenance: Maintenance::new(),
            scheduled_opened_at: None,
            timers: Timers::new(now),
        }
    }

    /// The engine
    pub fn engine(&self) -> &ResilienceEngine<M, W, S, C> {
        &self.engine
    }

    /// The engine, mutably
    pub fn engine_mut(&mut self) -> &mut ResilienceEngine<M, W, S, C> {
        &mut self.engine
    }

    /// The API client
    pub fn client(&self) -> &StationClient<T> {
        &self.client
    }

    /// Current settings
    pub fn settings(&self) -> &StationSettings {
        &self.settings
    }

    /// Wall clock
    pub fn clock(&self) -> &WallClock {
        &self.clock
    }

    /// Maintenance window state
    pub fn maintenance(&self) -> &Maintenance {
        &self.maintenance
    }

    /// The sensors
    pub fn sensors(&self) -> &Z {
        &self.sensors
    }

    /// The update service
    pub fn ota(&self) -> &O {
        &self.ota
    }

    /// Run passes until the device restarts or sleeps
    pub fn run<Src: TimeSource>(&mut self, time: &Src) -> Iteration {
        loop {
            match self.run_once(time.now()) {
                Iteration::Ran { .. } => continue,
                done => return done,
            }
        }
    }

    /// One pass of the loop at `now`
    pub fn run_once(&mut self, now: Timestamp) -> Iteration {
        self.engine.feed_watchdog();

        let report = self.engine.tick(now);
        if let Some(reason) = report.restart {
            return Iteration::Restarted(reason);
        }

        self.service_maintenance(now);
        self.check_maintenance_window(now);

        if claim(&mut self.timers.time_sync, now, self.settings.time_sync_interval_ms) {
            self.engine.sync_clock(&mut self.clock, now);
            if let Some(secs) = self.sleep_due(now) {
                self.engine.enter_deep_sleep(secs);
                return Iteration::Slept(secs);
            }
        }

        if claim(&mut self.timers.wind_sample, now, self.settings.wind_sample_interval_ms) {
            self.sensors.sample_wind();
        }

        if !self.engine.is_online(now) {
            return Iteration::Ran { online: false, sent: 0 };
        }
        let sent = self.uplink(now);
        Iteration::Ran { online: true, sent }
    }

    fn sleep_due(&self, now: Timestamp) -> Option<u32> {
        if self.maintenance.is_active() {
            debug!("sleep check skipped during maintenance");
            return None;
        }
        sleep_plan(&self.settings.schedule, &self.clock, now, MAX_CLOCK_STALENESS_MS)
    }

    fn service_maintenance(&mut self, now: Timestamp) {
        if !self.maintenance.is_active() {
            return;
        }
        if self.maintenance.is_expired(now) {
            info!("maintenance window elapsed");
        } else if self.ota.service() {
            return;
        } else {
            info!("update service finished");
        }
        self.ota.end();
        self.maintenance.close();
    }

    fn check_maintenance_window(&mut self, now: Timestamp) {
        let due = claim(&mut self.timers.ota_check, now, OTA_CHECK_INTERVAL_MS);
        if !due || self.maintenance.is_active() {
            return;
        }
        let Some(time) = self.clock.time_of_day(now, MAX_CLOCK_STALENESS_MS) else {
            return;
        };
        if !is_ota_window(&self.settings.schedule, time) {
            return;
        }
        // once per daily window, even if the service finished early
        let window_ms = self.settings.schedule.ota_duration_min as u64 * MS_PER_MINUTE;
        if self.scheduled_opened_at.map_or(false, |at| elapsed(at, now) < window_ms) {
            return;
        }
        if self.ota.begin(MaintenanceTrigger::Scheduled) {
            self.scheduled_opened_at = Some(now);
            self.maintenance
                .open(now, MaintenanceTrigger::Scheduled, self.settings.schedule.ota_duration_min);
        } else {
            warn!("scheduled maintenance could not start");
        }
    }

    fn uplink(&mut self, now: Timestamp) -> u8 {
        let mut sent = 0;

        if self.engine.is_throttled(now) {
            return sent;
        }
        if claim(&mut self.timers.diagnostics, now, self.settings.diag_interval_ms) {
            let result = self.send_diagnostics(now);
            if !tally(&mut sent, "diagnostics upload", result) {
                return sent;
            }
        }

        if self.engine.is_throttled(now) {
            return sent;
        }
        if claim(&mut self.timers.config, now, CONFIG_FETCH_INTERVAL_MS) {
            let result = self.refresh_config(now);
            if !tally(&mut sent, "configuration fetch", result) {
                return sent;
            }
        }

        if self.engine.is_throttled(now) {
            return sent;
        }
        if claim(&mut self.timers.wind_send, now, self.settings.wind_send_interval_ms) {
            let report = self.sensors.wind();
            let result = self
                .engine
                .request_permit(now)
                .and_then(|permit| self.client.push_wind(permit, &report));
            if !tally(&mut sent, "wind upload", result) {
                return sent;
            }
        }

        if self.engine.is_throttled(now) {
            return sent;
        }
        if claim(&mut self.timers.temperature, now, self.settings.temp_interval_ms) {
            let report = self.sensors.temperature();
            let result = self
                .engine
                .request_permit(now)
                .and_then(|permit| self.client.push_temperature(permit, &report));
            tally(&mut sent, "temperature upload", result);
        }

        sent
    }

    fn send_diagnostics(&mut self, now: Timestamp) -> Result<(), HttpError> {
        let signal = self.engine.modem_mut().signal_quality();
        let uptime_secs = self.engine.uptime_ms(now) / MS_PER_SECOND;
        let report = DiagnosticsReport::new(self.sensors.board(), signal, uptime_secs);
        let permit = self.engine.request_permit(now)?;
        self.client.push_diagnostics(permit, &report)
    }

    fn refresh_config(&mut self, now: Timestamp) -> Result<(), HttpError> {
        let permit = self.engine.request_permit(now)?;
        let remote = self.client.fetch_config(permit)?;

        let changes = self.settings.apply(&remote);
        if changes > 0 {
            info!("{} settings changed", changes);
        }
        // the fetch may have blocked; a new interval counts from when it lands
        let applied_at = self.engine.now().max(now);
        self.engine
            .set_restart_interval_ms(self.settings.restart_interval_ms, applied_at);

        if remote.requests_ota() && !self.maintenance.is_active() {
            if !self.ota.begin(MaintenanceTrigger::Remote) {
                warn!("remote maintenance could not start");
                return Ok(());
            }
            self.maintenance.open(now, MaintenanceTrigger::Remote, REMOTE_OTA_DURATION_MIN);
            let permit = self.engine.request_permit(now)?;
            self.client.confirm_ota(permit)?;
        }
        Ok(())
    }
}
