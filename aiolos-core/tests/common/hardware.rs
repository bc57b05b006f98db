//! Recording doubles for the modem's driver, control lines and delay

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};

use aiolos_core::config::ApnConfig;
use aiolos_core::modem::SimStatus;
use aiolos_core::time::ClockTime;
use aiolos_core::traits::{AtReply, AtStatus, LatchablePin, Liveness, ModemDriver};

/// Something a double observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Line(&'static str, bool),
    Hold(&'static str, bool),
    Delay(u32),
    Probe(u32),
    Command(String),
    ReinitSerial,
    Flush,
    SleepMode(bool),
    WaitForNetwork,
    BearerConnect,
    BearerDisconnect,
}

/// Shared, ordered record of everything the doubles saw
pub type Timeline = Rc<RefCell<Vec<Event>>>;

pub fn timeline() -> Timeline {
    Rc::new(RefCell::new(Vec::new()))
}

/// Snapshot of the timeline
pub fn events(timeline: &Timeline) -> Vec<Event> {
    timeline.borrow().clone()
}

/// Position of the first event matching `pred`
pub fn position(timeline: &Timeline, pred: impl Fn(&Event) -> bool) -> Option<usize> {
    timeline.borrow().iter().position(pred)
}

/// Number of events matching `pred`
pub fn count(timeline: &Timeline, pred: impl Fn(&Event) -> bool) -> usize {
    timeline.borrow().iter().filter(|e| pred(e)).count()
}

/// Sum of all recorded delays (ms)
pub fn total_delay_ms(timeline: &Timeline) -> u64 {
    timeline
        .borrow()
        .iter()
        .map(|e| match e {
            Event::Delay(ms) => *ms as u64,
            _ => 0,
        })
        .sum()
}

/// AT driver answering from a script
///
/// Probes pop from `probes` and fall back to `fallback` once it is empty.
/// Commands answer from `replies`, bare `OK` otherwise.
pub struct ScriptedDriver {
    timeline: Timeline,
    pub probes: VecDeque<Liveness>,
    pub fallback: Liveness,
    pub replies: HashMap<String, AtReply>,
    pub builtin_sim: SimStatus,
    pub registered: bool,
    pub registers_on_wait: bool,
    pub bearer_up: bool,
    pub bearer_connects: bool,
    pub accepts_sleep: bool,
    pub signal: Option<u8>,
    pub time: Option<ClockTime>,
    pub last_apn: Option<String>,
}

impl ScriptedDriver {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            timeline,
            probes: VecDeque::new(),
            fallback: Liveness::Silent,
            replies: HashMap::new(),
            builtin_sim: SimStatus::Error,
            registered: false,
            registers_on_wait: false,
            bearer_up: false,
            bearer_connects: false,
            accepts_sleep: true,
            signal: None,
            time: None,
            last_apn: None,
        }
    }

    /// Every probe answers `OK`
    pub fn answering(&mut self) -> &mut Self {
        self.fallback = Liveness::Ok;
        self
    }

    /// Queue probe answers ahead of the fallback
    pub fn script_probes(&mut self, answers: &[Liveness]) -> &mut Self {
        self.probes.extend(answers.iter().copied());
        self
    }

    /// `+CPIN?` answers `text`
    pub fn pin_reply(&mut self, text: &str) -> &mut Self {
        self.replies.insert("+CPIN?".into(), AtReply::with_text(AtStatus::Ok, text));
        self
    }

    /// SIM reports ready through `+CPIN?`
    pub fn sim_ready(&mut self) -> &mut Self {
        self.pin_reply("+CPIN: READY")
    }

    fn record(&self, event: Event) {
        self.timeline.borrow_mut().push(event);
    }
}

impl ModemDriver for ScriptedDriver {
    fn probe(&mut self, timeout_ms: u32) -> Liveness {
        self.record(Event::Probe(timeout_ms));
        self.probes.pop_front().unwrap_or(self.fallback)
    }

    fn command(&mut self, command: &str, _timeout_ms: u32) -> AtReply {
        self.record(Event::Command(command.to_string()));
        self.replies
            .get(command)
            .cloned()
            .unwrap_or_else(|| AtReply::bare(AtStatus::Ok))
    }

    fn flush_input(&mut self) {
        self.record(Event::Flush);
    }

    fn reinit_serial(&mut self) {
        self.record(Event::ReinitSerial);
    }

    fn builtin_sim_status(&mut self) -> SimStatus {
        self.builtin_sim
    }

    fn is_network_registered(&mut self) -> bool {
        self.registered
    }

    fn wait_for_network(&mut self, _timeout_ms: u32) -> bool {
        self.record(Event::WaitForNetwork);
        if self.registers_on_wait {
            self.registered = true;
        }
        self.registered
    }

    fn is_bearer_up(&mut self) -> bool {
        self.bearer_up
    }

    fn bearer_connect(&mut self, apn: &ApnConfig) -> bool {
        self.record(Event::BearerConnect);
        self.last_apn = Some(apn.apn.as_str().to_string());
        if self.bearer_connects {
            self.bearer_up = true;
        }
        self.bearer_connects
    }

    fn bearer_disconnect(&mut self) -> bool {
        self.record(Event::BearerDisconnect);
        self.bearer_up = false;
        true
    }

    fn set_sleep_mode(&mut self, enabled: bool) -> bool {
        self.record(Event::SleepMode(enabled));
        !enabled || self.accepts_sleep
    }

    fn signal_quality(&mut self) -> Option<u8> {
        self.signal
    }

    fn network_time(&mut self) -> Option<ClockTime> {
        self.time
    }
}

/// Output pin logging every level change
pub struct RecordingPin {
    name: &'static str,
    timeline: Timeline,
    pub high: bool,
    pub held: bool,
}

impl RecordingPin {
    pub fn new(name: &'static str, timeline: Timeline) -> Self {
        Self { name, timeline, high: false, held: false }
    }
}

impl ErrorType for RecordingPin {
    type Error = Infallible;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        self.timeline.borrow_mut().push(Event::Line(self.name, false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        self.timeline.borrow_mut().push(Event::Line(self.name, true));
        Ok(())
    }
}

impl LatchablePin for RecordingPin {
    fn set_hold(&mut self, hold: bool) {
        self.held = hold;
        self.timeline.borrow_mut().push(Event::Hold(self.name, hold));
    }
}

/// Output pin that refuses every level change
pub struct BrokenPin;

impl ErrorType for BrokenPin {
    type Error = ErrorKind;
}

impl OutputPin for BrokenPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Err(ErrorKind::Other)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Err(ErrorKind::Other)
    }
}

/// Delay that returns immediately and logs the requested wait
pub struct RecordingDelay {
    timeline: Timeline,
}

impl RecordingDelay {
    pub fn new(timeline: Timeline) -> Self {
        Self { timeline }
    }
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        if ns >= 1_000_000 {
            self.timeline.borrow_mut().push(Event::Delay(ns / 1_000_000));
        }
    }

    fn delay_ms(&mut self, ms: u32) {
        self.timeline.borrow_mut().push(Event::Delay(ms));
    }
}
