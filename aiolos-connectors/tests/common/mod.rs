//! Shared doubles for connector tests
#![allow(dead_code)]

use std::collections::VecDeque;
use std::rc::Rc;

use aiolos_connectors::payload::{BoardReadings, TemperatureReport, WindReport};
use aiolos_connectors::station::{OtaService, Sensors};
use aiolos_connectors::{HttpMethod, HttpResponse, HttpTransport, Request};
use aiolos_core::errors::{HttpError, NetResult, PowerResult};
use aiolos_core::schedule::MaintenanceTrigger;
use aiolos_core::time::{ClockTime, FixedTime};
use aiolos_core::traits::{ModemLink, SystemControl, Watchdog};

/// A request as the transport saw it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<String>,
    pub read_body: bool,
}

/// Transport that records requests and replays scripted responses
///
/// Once the script runs out every request gets an empty 200. A transport
/// built with [`MemoryTransport::slow`] advances its clock on every send.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    pub sent: Vec<Sent>,
    pub script: VecDeque<Result<HttpResponse, HttpError>>,
    pub clock: Option<Rc<FixedTime>>,
    pub latency_ms: u64,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, status: u16, body: Option<&str>) -> Self {
        self.script.push_back(Ok(HttpResponse { status, body: body.map(str::to_string) }));
        self
    }

    pub fn fail(mut self, error: HttpError) -> Self {
        self.script.push_back(Err(error));
        self
    }

    pub fn slow(mut self, clock: &Rc<FixedTime>, latency_ms: u64) -> Self {
        self.clock = Some(Rc::clone(clock));
        self.latency_ms = latency_ms;
        self
    }

    pub fn paths(&self) -> Vec<&str> {
        self.sent.iter().map(|s| s.path.as_str()).collect()
    }

    pub fn count(&self, suffix: &str) -> usize {
        self.sent.iter().filter(|s| s.path.ends_with(suffix)).count()
    }
}

impl HttpTransport for MemoryTransport {
    fn send(&mut self, request: Request<'_>) -> Result<HttpResponse, HttpError> {
        self.sent.push(Sent {
            method: request.method,
            path: request.path.to_string(),
            body: request.body.map(str::to_string),
            read_body: request.read_body,
        });
        if let Some(clock) = &self.clock {
            clock.advance(self.latency_ms);
        }
        self.script
            .pop_front()
            .unwrap_or(Ok(HttpResponse { status: 200, body: None }))
    }
}

/// Sensors returning fixed readings and counting samples
#[derive(Debug, Default)]
pub struct FakeSensors {
    pub samples: u32,
}

impl Sensors for FakeSensors {
    fn board(&mut self) -> BoardReadings {
        BoardReadings { battery_voltage: 4.0, solar_voltage: 5.5, internal_temperature: 18.0 }
    }

    fn sample_wind(&mut self) {
        self.samples += 1;
    }

    fn wind(&mut self) -> WindReport {
        WindReport { wind_speed: 3.5, wind_direction: 180.0 }
    }

    fn temperature(&mut self) -> TemperatureReport {
        TemperatureReport { temperature: 12.5 }
    }
}

/// Update service that serves a fixed number of passes
#[derive(Debug)]
pub struct FakeOta {
    pub accepts: bool,
    pub passes_left: u32,
    pub begun: Vec<MaintenanceTrigger>,
    pub ended: u32,
}

impl Default for FakeOta {
    fn default() -> Self {
        Self { accepts: true, passes_left: u32::MAX, begun: Vec::new(), ended: 0 }
    }
}

impl OtaService for FakeOta {
    fn begin(&mut self, trigger: MaintenanceTrigger) -> bool {
        if self.accepts {
            self.begun.push(trigger);
        }
        self.accepts
    }

    fn service(&mut self) -> bool {
        self.passes_left = self.passes_left.saturating_sub(1);
        self.passes_left > 0
    }

    fn end(&mut self) {
        self.ended += 1;
    }
}

#[derive(Debug, Default)]
pub struct NullWatchdog {
    pub feeds: u32,
}

impl Watchdog for NullWatchdog {
    fn feed(&mut self) {
        self.feeds += 1;
    }

    fn suspend(&mut self) {}

    fn resume(&mut self) {}
}

#[derive(Debug, Default)]
pub struct RecordingSystem {
    pub restarts: u32,
    pub wake_timer_secs: Option<u32>,
    pub deep_sleeps: u32,
}

impl SystemControl for RecordingSystem {
    fn restart(&mut self) {
        self.restarts += 1;
    }

    fn arm_wake_timer(&mut self, seconds: u32) {
        self.wake_timer_secs = Some(seconds);
    }

    fn enter_deep_sleep(&mut self) {
        self.deep_sleeps += 1;
    }
}

/// Link whose state the test sets directly
#[derive(Debug)]
pub struct StaticLink {
    pub link_up: bool,
    pub time: Option<ClockTime>,
    pub signal: Option<u8>,
    pub powered_off: bool,
}

impl StaticLink {
    pub fn up() -> Self {
        Self { link_up: true, time: None, signal: Some(17), powered_off: false }
    }

    pub fn down() -> Self {
        Self { link_up: false, ..Self::up() }
    }

    pub fn at(mut self, hour: u8, minute: u8) -> Self {
        self.time = ClockTime::new(hour, minute, 0);
        self
    }
}

impl ModemLink for StaticLink {
    fn power_on<W: Watchdog>(&mut self, _watchdog: &mut W) -> PowerResult {
        self.powered_off = false;
        Ok(())
    }

    fn power_off<W: Watchdog>(&mut self, _watchdog: &mut W) -> PowerResult {
        self.powered_off = true;
        self.link_up = false;
        Ok(())
    }

    fn hard_reset<W: Watchdog>(&mut self, _watchdog: &mut W) -> PowerResult {
        Ok(())
    }

    fn maintain<W: Watchdog>(&mut self, _watchdog: &mut W, _active: bool) -> NetResult {
        Ok(())
    }

    fn is_link_up(&mut self) -> bool {
        self.link_up
    }

    fn is_responsive(&mut self) -> bool {
        true
    }

    fn signal_quality(&mut self) -> Option<u8> {
        self.signal
    }

    fn network_time(&mut self) -> Option<ClockTime> {
        self.time
    }

    fn pause_ms(&mut self, _ms: u32) {}
}
