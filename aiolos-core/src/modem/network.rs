//! SIM detection, network registration and the packet data bearer
//!
//! SIM state is read three ways because no single method is right on every
//! modem firmware revision: `+CPIN?`, then the ICCID, then whatever the
//! driver's own query reports. The first conclusive answer wins.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use super::{Modem, Recovery, SimStatus};
use crate::constants::modem::*;
use crate::errors::{NetError, NetResult};
use crate::logging::{log_debug, log_info, log_warn};
use crate::retry::{execute, Escalation, RetryPolicy};
use crate::traits::{AtReply, LatchablePin, ModemDriver, Watchdog};
use crate::watchdog::WatchdogGuard;

/// SIM reads at initialisation, cycling the radio from the fourth read on
pub const SIM_LADDER: RetryPolicy<Recovery> = RetryPolicy {
    attempts: SIM_READ_ATTEMPTS,
    timeout_ms: SIM_QUERY_TIMEOUT_MS,
    pause_ms: SIM_READ_PAUSE_MS,
    escalations: &[
        Escalation { before_attempt: 3, action: Recovery::RadioCycle },
        Escalation { before_attempt: 4, action: Recovery::RadioCycle },
    ],
};

/// Interpret a `+CPIN?` reply
pub fn classify_pin_reply(reply: &AtReply) -> Option<SimStatus> {
    if !reply.is_ok() {
        return None;
    }
    let text = reply.text.as_str();
    if text.contains("READY") {
        Some(SimStatus::Ready)
    } else if text.contains("SIM PIN") || text.contains("SIM PUK") {
        Some(SimStatus::Locked)
    } else {
        None
    }
}

/// Interpret a `+CCID` reply; a plausible ICCID proves a readable SIM
pub fn classify_iccid_reply(reply: &AtReply) -> Option<SimStatus> {
    let iccid = reply.text.trim();
    let plausible = iccid.len() > MIN_ICCID_REPLY_LEN
        && iccid.bytes().all(|b| b.is_ascii_alphanumeric());
    if reply.is_ok() && plausible {
        Some(SimStatus::Ready)
    } else {
        None
    }
}

impl<D, P, R, T> Modem<D, P, R, T>
where
    D: ModemDriver,
    P: OutputPin,
    R: OutputPin + LatchablePin,
    T: DelayNs,
{
    /// Read the SIM state, trying each detection method in turn
    pub fn read_sim_status(&mut self) -> SimStatus {
        let pin = self.driver.command(CMD_SIM_PIN, SIM_QUERY_TIMEOUT_MS);
        if let Some(status) = classify_pin_reply(&pin) {
            log_debug!("SIM via PIN query: {:?}", status);
            return status;
        }

        let iccid = self.driver.command(CMD_SIM_ICCID, SIM_QUERY_TIMEOUT_MS);
        if let Some(status) = classify_iccid_reply(&iccid) {
            log_debug!("SIM via ICCID: {:?}", status);
            return status;
        }

        let status = self.driver.builtin_sim_status();
        log_debug!("SIM via driver: {:?}", status);
        status
    }

    /// Register on the network, at most `max_retries` waits
    pub fn connect_network<W: Watchdog>(&mut self, watchdog: &mut W, max_retries: u8) -> NetResult {
        let _guard = WatchdogGuard::suspend(watchdog);
        self.register(max_retries)
    }

    /// Bring up the packet data bearer, registering first if needed
    pub fn connect_data_bearer<W: Watchdog>(
        &mut self,
        watchdog: &mut W,
        max_retries: u8,
    ) -> NetResult {
        let _guard = WatchdogGuard::suspend(watchdog);
        self.activate_bearer(max_retries)
    }

    /// Per-iteration upkeep
    ///
    /// With `active` a single registration and bearer attempt is made; any
    /// escalation is the caller's business. Without it only the bearer is
    /// torn down and the modem stays on.
    pub fn maintain<W: Watchdog>(&mut self, watchdog: &mut W, active: bool) -> NetResult {
        let _guard = WatchdogGuard::suspend(watchdog);

        if active {
            self.register(1)?;
            self.activate_bearer(1)
        } else {
            if self.driver.is_bearer_up() && !self.driver.bearer_disconnect() {
                log_warn!("bearer teardown failed");
            }
            Ok(())
        }
    }

    pub(super) fn acquire_sim(&mut self) -> SimStatus {
        let mut last = SimStatus::Error;
        let found = execute(
            self,
            &SIM_LADDER,
            |modem, _timeout| {
                last = modem.read_sim_status();
                last == SimStatus::Ready
            },
            |modem, action| {
                if let Err(e) = modem.recover(action) {
                    log_warn!("SIM escalation failed: {}", e);
                }
            },
            |modem, ms| modem.delay.delay_ms(ms),
        );
        if let Some(attempt) = found {
            log_info!("SIM ready after {} reads", attempt + 1);
        }
        last
    }

    fn register(&mut self, max_retries: u8) -> NetResult {
        if self.driver.is_network_registered() {
            return Ok(());
        }

        let sim = self.read_sim_status();
        if sim != SimStatus::Ready {
            log_warn!("registration skipped, SIM {:?}", sim);
            return Err(NetError::SimUnavailable(sim));
        }

        for attempt in 0..max_retries {
            log_info!("network registration attempt {}/{}", attempt + 1, max_retries);
            if self.driver.wait_for_network(REGISTRATION_TIMEOUT_MS) {
                self.delay.delay_ms(REGISTRATION_SETTLE_MS);
                if self.driver.is_network_registered() {
                    log_info!("network registered");
                    return Ok(());
                }
            }
            if attempt + 1 < max_retries {
                self.delay.delay_ms(
                    REGISTRATION_RETRY_BASE_MS + attempt as u32 * REGISTRATION_RETRY_STEP_MS,
                );
            }
        }
        log_warn!("network registration timed out");
        Err(NetError::RegistrationTimeout)
    }

    fn activate_bearer(&mut self, max_retries: u8) -> NetResult {
        if self.driver.is_bearer_up() {
            return Ok(());
        }
        if !self.driver.is_network_registered() {
            self.register(1)?;
        }

        for attempt in 0..max_retries {
            let apn = self.apn.apn.as_str();
            log_info!("bearer attempt {}/{} on {}", attempt + 1, max_retries, apn);
            if self.driver.bearer_connect(&self.apn) && self.driver.is_bearer_up() {
                log_info!("bearer up");
                return Ok(());
            }
            if attempt + 1 < max_retries {
                self.delay.delay_ms(BEARER_RETRY_PAUSE_MS);
            }
        }
        log_warn!("bearer activation timed out");
        Err(NetError::BearerTimeout)
    }
}
