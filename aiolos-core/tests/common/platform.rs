//! Watchdog, system, clock and link doubles for orchestration tests

use std::cell::Cell;
use std::rc::Rc;

use aiolos_core::errors::{NetError, NetResult, PowerError, PowerResult};
use aiolos_core::time::{ClockTime, TimeSource, Timestamp};
use aiolos_core::traits::{ModemLink, SystemControl, Watchdog};

/// Clock shared between the engine and a link that blocks
#[derive(Debug, Clone, Default)]
pub struct SharedClock(Rc<Cell<Timestamp>>);

impl SharedClock {
    pub fn set(&self, now: Timestamp) {
        self.0.set(now);
    }

    pub fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }
}

impl TimeSource for SharedClock {
    fn now(&self) -> Timestamp {
        self.0.get()
    }
}

/// Watchdog that counts every call
#[derive(Debug, Default)]
pub struct RecordingWatchdog {
    pub suspended: bool,
    pub suspends: u32,
    pub resumes: u32,
    pub feeds: u32,
}

impl Watchdog for RecordingWatchdog {
    fn feed(&mut self) {
        self.feeds += 1;
    }

    fn suspend(&mut self) {
        self.suspended = true;
        self.suspends += 1;
    }

    fn resume(&mut self) {
        self.suspended = false;
        self.resumes += 1;
    }
}

/// System controls that record instead of rebooting
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

/// What the fake link was asked to do, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkCall {
    PowerOn,
    PowerOff,
    HardReset,
    Maintain(bool),
    Pause(u32),
}

/// Modem link with programmable outcomes
///
/// A successful active `maintain` brings the link up. Every blocking call
/// (power-on, hard reset, active maintain) advances `clock` by `call_ms`.
#[derive(Debug)]
pub struct FakeLink {
    pub link_up: bool,
    pub responsive: bool,
    pub maintain_result: NetResult,
    pub power_on_result: PowerResult,
    pub reset_result: PowerResult,
    pub time: Option<ClockTime>,
    pub signal: Option<u8>,
    pub calls: Vec<LinkCall>,
    pub clock: SharedClock,
    pub call_ms: u64,
}

impl Default for FakeLink {
    fn default() -> Self {
        Self {
            link_up: false,
            responsive: true,
            maintain_result: Err(NetError::RegistrationTimeout),
            power_on_result: Ok(()),
            reset_result: Ok(()),
            time: None,
            signal: None,
            calls: Vec::new(),
            clock: SharedClock::default(),
            call_ms: 0,
        }
    }
}

impl FakeLink {
    /// Link that never comes up and a modem that does not answer
    pub fn dead() -> Self {
        Self {
            responsive: false,
            power_on_result: Err(PowerError::Unresponsive),
            reset_result: Err(PowerError::Unresponsive),
            ..Self::default()
        }
    }

    pub fn count(&self, call: LinkCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    pub fn maintain_attempts(&self) -> usize {
        self.count(LinkCall::Maintain(true))
    }

    /// Link whose blocking calls each take `call_ms` on `clock`
    pub fn slow(clock: &SharedClock, call_ms: u64) -> Self {
        Self { clock: clock.clone(), call_ms, ..Self::default() }
    }

    fn block(&self) {
        self.clock.advance(self.call_ms);
    }
}

impl ModemLink for FakeLink {
    fn power_on<W: Watchdog>(&mut self, watchdog: &mut W) -> PowerResult {
        watchdog.suspend();
        self.calls.push(LinkCall::PowerOn);
        self.block();
        watchdog.resume();
        self.power_on_result
    }

    fn power_off<W: Watchdog>(&mut self, _watchdog: &mut W) -> PowerResult {
        self.calls.push(LinkCall::PowerOff);
        self.link_up = false;
        Ok(())
    }

    fn hard_reset<W: Watchdog>(&mut self, watchdog: &mut W) -> PowerResult {
        watchdog.suspend();
        self.calls.push(LinkCall::HardReset);
        self.block();
        watchdog.resume();
        if self.reset_result.is_ok() {
            self.responsive = true;
        }
        self.reset_result
    }

    fn maintain<W: Watchdog>(&mut self, _watchdog: &mut W, active: bool) -> NetResult {
        self.calls.push(LinkCall::Maintain(active));
        if !active {
            self.link_up = false;
            return Ok(());
        }
        self.block();
        if self.maintain_result.is_ok() {
            self.link_up = true;
        }
        self.maintain_result
    }

    fn is_link_up(&mut self) -> bool {
        self.link_up
    }

    fn is_responsive(&mut self) -> bool {
        self.responsive
    }

    fn signal_quality(&mut self) -> Option<u8> {
        self.signal
    }

    fn network_time(&mut self) -> Option<ClockTime> {
        self.time
    }

    fn pause_ms(&mut self, ms: u32) {
        self.calls.push(LinkCall::Pause(ms));
    }
}
