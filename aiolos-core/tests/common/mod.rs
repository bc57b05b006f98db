//! Shared test doubles for integration tests
//!
//! - `hardware`: scripted AT driver, recording pins and delay, all writing
//!   into one shared [`hardware::Timeline`] so tests can assert ordering
//!   across the driver and the control lines
//! - `platform`: watchdog, system controls and a fake link for engine tests

#![allow(dead_code)]

pub mod hardware;
pub mod platform;

use aiolos_core::config::ApnConfig;
use aiolos_core::modem::Modem;

use hardware::{timeline, RecordingDelay, RecordingPin, ScriptedDriver, Timeline};

/// Modem built entirely from recording doubles
pub type TestModem = Modem<ScriptedDriver, RecordingPin, RecordingPin, RecordingDelay>;

/// Modem plus the timeline its parts write to
pub fn test_modem(configure: impl FnOnce(&mut ScriptedDriver)) -> (TestModem, Timeline) {
    let events = timeline();
    let mut driver = ScriptedDriver::new(events.clone());
    configure(&mut driver);
    let modem = Modem::new(
        driver,
        RecordingPin::new("pwrkey", events.clone()),
        RecordingPin::new("dtr", events.clone()),
        RecordingDelay::new(events.clone()),
        ApnConfig::default(),
    );
    (modem, events)
}
