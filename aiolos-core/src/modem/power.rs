//! Modem power state machine
//!
//! ## Power key polarity
//!
//! The power key is driven through an inverting transistor. A HIGH level on
//! the GPIO pulls PWRKEY low, which is what the modem treats as a key press.
//! LOW is the resting level and the level that keeps a powered-down modem
//! off, so every sequence below ends with the line LOW.
//!
//! ## Power-on ladder
//!
//! ```text
//! probe x3 (1 s) ──ok──► done
//!      │ silent
//!      ▼
//! line LOW 2 s ─► pulse HIGH 1.5 s ─► settle 8 s
//!      ▼
//! probe x6 (3 s, 1 s apart)
//!   before #3: nudge pulse 100 ms, settle 2 s
//!   before #5: AT+CFUN=1,1, settle 5 s
//!      │ all silent
//!      ▼
//! PowerError::Unresponsive
//! ```
//!
//! Power-off never probes after the power-down command: a probe can wake
//! a modem that has just started shutting down.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use super::{Modem, Recovery};
use crate::constants::modem::*;
use crate::errors::{PowerError, PowerResult};
use crate::logging::{log_debug, log_error, log_info, log_warn};
use crate::retry::{execute, Escalation, RetryPolicy};
use crate::traits::{LatchablePin, ModemDriver, Watchdog};
use crate::watchdog::WatchdogGuard;

/// Probes that detect an already running modem
pub const INITIAL_PROBE: RetryPolicy<Recovery> = RetryPolicy {
    attempts: INITIAL_PROBE_ATTEMPTS,
    timeout_ms: INITIAL_PROBE_TIMEOUT_MS,
    pause_ms: INITIAL_PROBE_PAUSE_MS,
    escalations: &[],
};

/// Probes after the power-on pulse, escalating to a nudge and a soft restart
pub const BOOT_LADDER: RetryPolicy<Recovery> = RetryPolicy {
    attempts: BOOT_PROBE_ATTEMPTS + 1,
    timeout_ms: BOOT_PROBE_TIMEOUT_MS,
    pause_ms: BOOT_PROBE_PAUSE_MS,
    escalations: &[
        Escalation {
            before_attempt: BOOT_NUDGE_BEFORE_ATTEMPT,
            action: Recovery::NudgePulse { settle_ms: NUDGE_SETTLE_MS },
        },
        Escalation {
            before_attempt: BOOT_PROBE_ATTEMPTS,
            action: Recovery::SoftRestart,
        },
    ],
};

/// First probe after DTR is released
pub const WAKE_FIRST_PROBE: RetryPolicy<Recovery> = RetryPolicy::once(WAKE_FIRST_PROBE_TIMEOUT_MS);

/// Wake escalation: disable slow clock, then nudge the power key
pub const WAKE_LADDER: RetryPolicy<Recovery> = RetryPolicy {
    attempts: 2 * WAKE_TIER_PROBE_ATTEMPTS,
    timeout_ms: WAKE_TIER_PROBE_TIMEOUT_MS,
    pause_ms: WAKE_TIER_PROBE_PAUSE_MS,
    escalations: &[
        Escalation { before_attempt: 0, action: Recovery::DisableSleepMode },
        Escalation {
            before_attempt: WAKE_TIER_PROBE_ATTEMPTS,
            action: Recovery::NudgePulse { settle_ms: WAKE_NUDGE_SETTLE_MS },
        },
    ],
};

impl<D, P, R, T> Modem<D, P, R, T>
where
    D: ModemDriver,
    P: OutputPin,
    R: OutputPin + LatchablePin,
    T: DelayNs,
{
    /// Bring the modem to a responsive state
    ///
    /// Returns immediately if the modem already answers.
    pub fn power_on<W: Watchdog>(&mut self, watchdog: &mut W) -> PowerResult {
        let _guard = WatchdogGuard::suspend(watchdog);
        self.power_on_sequence()
    }

    /// Reach a verified off state
    pub fn power_off<W: Watchdog>(&mut self, watchdog: &mut W) -> PowerResult {
        let _guard = WatchdogGuard::suspend(watchdog);

        if self.driver.probe(INITIAL_PROBE_TIMEOUT_MS).is_responsive() {
            log_info!("modem power-down command");
            for _ in 0..POWER_DOWN_REPEATS {
                self.driver.command(CMD_POWER_DOWN, POWER_DOWN_TIMEOUT_MS);
            }
            // pin the line before any further traffic reaches the modem
            self.set_power_line(false)?;
            self.delay.delay_ms(SHUTDOWN_SETTLE_MS);
        } else {
            log_warn!("modem silent, hardware power-off pulse");
            self.set_power_line(false)?;
            self.delay.delay_ms(POWER_OFF_PRE_PULSE_MS);
            self.pulse_power_line(POWER_OFF_PULSE_MS)?;
            self.delay.delay_ms(SHUTDOWN_SETTLE_MS);
        }
        Ok(())
    }

    /// Ask the modem for low-power idle via DTR
    ///
    /// With `hold_across_deep_sleep` the DTR level is latched so it survives
    /// the host's own deep sleep.
    pub fn sleep(&mut self, hold_across_deep_sleep: bool) -> PowerResult {
        self.dtr_line.set_high().map_err(|_| PowerError::ControlLine)?;
        if hold_across_deep_sleep {
            self.dtr_line.set_hold(true);
        }

        if !self.driver.set_sleep_mode(true) {
            log_warn!("modem rejected sleep mode");
            return Err(PowerError::SleepRejected);
        }
        self.delay.delay_ms(SLEEP_SETTLE_MS);
        log_debug!("modem sleeping");
        Ok(())
    }

    /// Bring the modem back from low-power idle
    pub fn wake<W: Watchdog>(&mut self, watchdog: &mut W, from_deep_sleep: bool) -> PowerResult {
        let _guard = WatchdogGuard::suspend(watchdog);

        if from_deep_sleep {
            self.dtr_line.set_hold(false);
            self.driver.reinit_serial();
        }
        self.dtr_line.set_low().map_err(|_| PowerError::ControlLine)?;
        self.delay.delay_ms(WAKE_DTR_SETTLE_MS);
        self.driver.flush_input();

        if self.probe_ladder(&WAKE_FIRST_PROBE).is_some() {
            log_debug!("modem awake");
            return Ok(());
        }

        match self.probe_ladder(&WAKE_LADDER) {
            Some(attempt) => {
                log_info!("modem awake after {} escalated probes", attempt + 1);
                Ok(())
            }
            None => {
                log_error!("modem did not wake");
                Err(PowerError::Unresponsive)
            }
        }
    }

    /// Force the line off, reopen the serial link and power on again
    pub fn hard_reset<W: Watchdog>(&mut self, watchdog: &mut W) -> PowerResult {
        let _guard = WatchdogGuard::suspend(watchdog);

        log_warn!("modem hard reset");
        self.set_power_line(false)?;
        self.delay.delay_ms(RESET_OFF_HOLD_MS);
        self.driver.reinit_serial();
        self.power_on_sequence()
    }

    /// Whether the modem answers a liveness probe, `ERROR` included
    pub fn is_responsive(&mut self) -> bool {
        self.driver.probe(INITIAL_PROBE_TIMEOUT_MS).is_responsive()
    }

    pub(super) fn power_on_sequence(&mut self) -> PowerResult {
        if self.probe_ladder(&INITIAL_PROBE).is_some() {
            log_debug!("modem already on");
            return Ok(());
        }

        log_info!("modem power-on pulse");
        self.driver.reinit_serial();
        self.set_power_line(false)?;
        self.delay.delay_ms(POWER_LINE_SETTLE_MS);
        self.pulse_power_line(POWER_ON_PULSE_MS)?;
        self.delay.delay_ms(BOOT_SETTLE_MS);
        self.driver.flush_input();

        match self.probe_ladder(&BOOT_LADDER) {
            Some(attempt) => {
                log_info!("modem responsive after {} boot probes", attempt + 1);
                Ok(())
            }
            None => {
                log_error!("modem unresponsive after all power-on tiers");
                Err(PowerError::Unresponsive)
            }
        }
    }

    pub(super) fn probe_ladder(&mut self, policy: &RetryPolicy<Recovery>) -> Option<u8> {
        execute(
            self,
            policy,
            |modem, timeout| modem.driver.probe(timeout).is_responsive(),
            |modem, action| {
                if let Err(e) = modem.recover(action) {
                    log_warn!("escalation {:?} failed: {}", action, e);
                }
            },
            |modem, ms| modem.delay.delay_ms(ms),
        )
    }

    pub(super) fn recover(&mut self, action: Recovery) -> PowerResult {
        log_debug!("modem escalation {:?}", action);
        match action {
            Recovery::NudgePulse { settle_ms } => {
                self.pulse_power_line(NUDGE_PULSE_MS)?;
                self.delay.delay_ms(settle_ms);
            }
            Recovery::DisableSleepMode => {
                self.driver.set_sleep_mode(false);
                self.delay.delay_ms(SLEEP_SETTLE_MS);
            }
            Recovery::SoftRestart => {
                self.driver.command(CMD_SOFT_RESTART, SOFT_RESTART_TIMEOUT_MS);
                self.delay.delay_ms(SOFT_RESTART_SETTLE_MS);
            }
            Recovery::RadioCycle => {
                self.driver.command(CMD_RADIO_OFF, SIM_QUERY_TIMEOUT_MS);
                self.delay.delay_ms(RF_CYCLE_SETTLE_MS);
                self.driver.command(CMD_RADIO_ON, SIM_QUERY_TIMEOUT_MS);
                self.delay.delay_ms(RF_CYCLE_SETTLE_MS);
            }
        }
        Ok(())
    }

    fn set_power_line(&mut self, pressed: bool) -> PowerResult {
        let result = if pressed {
            self.power_line.set_high()
        } else {
            self.power_line.set_low()
        };
        result.map_err(|_| PowerError::ControlLine)
    }

    fn pulse_power_line(&mut self, width_ms: u32) -> PowerResult {
        self.set_power_line(true)?;
        self.delay.delay_ms(width_ms);
        self.set_power_line(false)
    }
}
