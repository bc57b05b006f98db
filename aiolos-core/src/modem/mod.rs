//! Cellular modem lifecycle
//!
//! [`Modem`] owns the modem's AT driver, its two control lines (power key
//! and DTR) and the delay provider used for sequencing. It is the only
//! thing in the firmware allowed to touch any of them.
//!
//! - `power` drives the power-on/off, sleep and wake sequences
//! - `network` handles SIM detection, registration and the data bearer
//!
//! Long sequences are described as [`RetryPolicy`] ladders and run with
//! [`crate::retry::execute`]; each public blocking entry point holds a
//! [`crate::watchdog::WatchdogGuard`] for its whole duration.
//!
//! [`RetryPolicy`]: crate::retry::RetryPolicy

mod network;
mod power;

pub use network::{classify_iccid_reply, classify_pin_reply, SIM_LADDER};
pub use power::{BOOT_LADDER, INITIAL_PROBE, WAKE_FIRST_PROBE, WAKE_LADDER};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::ApnConfig;
use crate::constants::modem::{
    CMD_PREFERRED_MODE_AUTO, INITIAL_PROBE_TIMEOUT_MS, SIM_QUERY_TIMEOUT_MS,
};
use crate::errors::{NetResult, PowerResult};
use crate::logging::{log_info, log_warn};
use crate::time::ClockTime;
use crate::traits::{LatchablePin, Liveness, ModemDriver, ModemLink, Watchdog};
use crate::watchdog::WatchdogGuard;

/// SIM card state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SimStatus {
    /// Missing, unreadable, or state unknown
    Error,
    /// Waiting for a PIN or PUK
    Locked,
    /// Usable
    Ready,
}

#[cfg(feature = "defmt")]
impl defmt::Format for SimStatus {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Error => defmt::write!(fmt, "Error"),
            Self::Locked => defmt::write!(fmt, "Locked"),
            Self::Ready => defmt::write!(fmt, "Ready"),
        }
    }
}

/// Snapshot of how far up the stack the modem currently is
///
/// Derived by polling, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ModemLinkStatus {
    /// No answer to a liveness probe
    PoweredOff,
    /// UART answers but the AT stack is not ready
    Booting,
    /// Answers, but no usable SIM
    ResponsiveNoSim,
    /// SIM waits for a PIN
    SimLocked,
    /// SIM ready, not registered
    SimReady,
    /// Registered, no packet data
    NetworkRegistered,
    /// Packet data bearer up
    DataBearerUp,
}

/// Escalation actions available to modem retry ladders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Short power-key pulse, then wait
    NudgePulse {
        /// Wait after the pulse (ms)
        settle_ms: u32,
    },
    /// Turn DTR slow clock mode off
    DisableSleepMode,
    /// Full-functionality restart command
    SoftRestart,
    /// Radio off, radio on
    RadioCycle,
}

/// Cellular modem with its control lines
pub struct Modem<D, P, R, T> {
    driver: D,
    power_line: P,
    dtr_line: R,
    delay: T,
    apn: ApnConfig,
}

impl<D, P, R, T> Modem<D, P, R, T>
where
    D: ModemDriver,
    P: OutputPin,
    R: OutputPin + LatchablePin,
    T: DelayNs,
{
    /// Take ownership of the driver, power-key line, DTR line and delay
    pub fn new(driver: D, power_line: P, dtr_line: R, delay: T, apn: ApnConfig) -> Self {
        Self { driver, power_line, dtr_line, delay, apn }
    }

    /// Underlying AT driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Underlying AT driver, mutably
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Data bearer configuration
    pub fn apn(&self) -> &ApnConfig {
        &self.apn
    }

    /// Release the owned parts
    pub fn release(self) -> (D, P, R, T) {
        (self.driver, self.power_line, self.dtr_line, self.delay)
    }

    /// Bring the modem up at boot: lines to rest, power on, wait for a SIM
    ///
    /// Never fails; the returned status tells the caller how far it got and
    /// the main loop's recovery takes over from there.
    pub fn init<W: Watchdog>(&mut self, watchdog: &mut W) -> ModemLinkStatus {
        let _guard = WatchdogGuard::suspend(watchdog);

        if self.dtr_line.set_low().is_err() || self.power_line.set_low().is_err() {
            log_warn!("modem control lines refused rest level");
        }

        if let Err(e) = self.power_on_sequence() {
            log_warn!("modem init: {}", e);
            return ModemLinkStatus::PoweredOff;
        }

        let sim = self.acquire_sim();
        if sim == SimStatus::Ready {
            let reply = self.driver.command(CMD_PREFERRED_MODE_AUTO, SIM_QUERY_TIMEOUT_MS);
            if !reply.is_ok() {
                log_warn!("preferred network mode not accepted");
            }
        } else {
            log_warn!("modem init: SIM {:?}", sim);
        }

        let status = self.link_status();
        log_info!("modem init complete: {:?}", status);
        status
    }

    /// Poll the modem and report how far up the stack it is
    pub fn link_status(&mut self) -> ModemLinkStatus {
        match self.driver.probe(INITIAL_PROBE_TIMEOUT_MS) {
            Liveness::Silent => return ModemLinkStatus::PoweredOff,
            Liveness::Busy => return ModemLinkStatus::Booting,
            Liveness::Ok => {}
        }

        match self.read_sim_status() {
            SimStatus::Error => ModemLinkStatus::ResponsiveNoSim,
            SimStatus::Locked => ModemLinkStatus::SimLocked,
            SimStatus::Ready if self.driver.is_bearer_up() => ModemLinkStatus::DataBearerUp,
            SimStatus::Ready if self.driver.is_network_registered() => {
                ModemLinkStatus::NetworkRegistered
            }
            SimStatus::Ready => ModemLinkStatus::SimReady,
        }
    }
}

impl<D, P, R, T> ModemLink for Modem<D, P, R, T>
where
    D: ModemDriver,
    P: OutputPin,
    R: OutputPin + LatchablePin,
    T: DelayNs,
{
    fn power_on<W: Watchdog>(&mut self, watchdog: &mut W) -> PowerResult {
        Modem::power_on(self, watchdog)
    }

    fn power_off<W: Watchdog>(&mut self, watchdog: &mut W) -> PowerResult {
        Modem::power_off(self, watchdog)
    }

    fn hard_reset<W: Watchdog>(&mut self, watchdog: &mut W) -> PowerResult {
        Modem::hard_reset(self, watchdog)
    }

    fn maintain<W: Watchdog>(&mut self, watchdog: &mut W, active: bool) -> NetResult {
        Modem::maintain(self, watchdog, active)
    }

    fn is_link_up(&mut self) -> bool {
        self.driver.is_network_registered() && self.driver.is_bearer_up()
    }

    fn is_responsive(&mut self) -> bool {
        Modem::is_responsive(self)
    }

    fn signal_quality(&mut self) -> Option<u8> {
        self.driver.signal_quality()
    }

    fn network_time(&mut self) -> Option<ClockTime> {
        self.driver.network_time()
    }

    fn pause_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}
