//! Modem Power Sequencing Constants
//!
//! Timings for the SIM7000-class modem fitted to the station board. The
//! power-key line is driven through an inverting transistor, so "pulse"
//! below means the GPIO is HIGH and the modem's PWRKEY is pulled low.
//! The resting level of the GPIO is LOW; that is also the level that keeps
//! a powered-down modem off.

// ===== POWER-KEY PULSES =====

/// Settle time with the power line at rest before a power-on pulse (ms).
///
/// Source: field observation, shorter settles occasionally missed the edge
pub const POWER_LINE_SETTLE_MS: u32 = 2000;

/// Power-on pulse width (ms).
///
/// Source: SIM7000 hardware design guide, Ton >= 1 s
pub const POWER_ON_PULSE_MS: u32 = 1500;

/// Hardware power-off pulse width (ms).
///
/// Source: SIM7000 hardware design guide, Toff >= 1.2 s
pub const POWER_OFF_PULSE_MS: u32 = 1500;

/// Short secondary pulse used to nudge a modem stuck mid-boot (ms).
pub const NUDGE_PULSE_MS: u32 = 100;

/// Boot settle time after a power-on pulse before probing (ms).
///
/// Source: SIM7000 datasheet, UART ready after ~4.5 s; doubled for cold starts
pub const BOOT_SETTLE_MS: u32 = 8000;

/// Time the line is held at rest before a hardware power-off pulse (ms).
pub const POWER_OFF_PRE_PULSE_MS: u32 = 1000;

/// Time allowed for the modem to finish shutting down (ms).
pub const SHUTDOWN_SETTLE_MS: u32 = 5000;

// ===== LIVENESS PROBES =====

/// Probes sent before any pulse to detect an already running modem.
pub const INITIAL_PROBE_ATTEMPTS: u8 = 3;

/// Timeout of each initial probe (ms).
pub const INITIAL_PROBE_TIMEOUT_MS: u32 = 1000;

/// Pause between initial probes (ms).
pub const INITIAL_PROBE_PAUSE_MS: u32 = 500;

/// Probes sent after the boot settle time.
pub const BOOT_PROBE_ATTEMPTS: u8 = 5;

/// Timeout of each post-boot probe (ms).
pub const BOOT_PROBE_TIMEOUT_MS: u32 = 3000;

/// Pause between post-boot probes (ms).
pub const BOOT_PROBE_PAUSE_MS: u32 = 1000;

/// Post-boot probe index before which the nudge pulse is sent.
pub const BOOT_NUDGE_BEFORE_ATTEMPT: u8 = 3;

/// Wait after the nudge pulse (ms).
pub const NUDGE_SETTLE_MS: u32 = 2000;

/// Timeout granted to the full-functionality restart command (ms).
pub const SOFT_RESTART_TIMEOUT_MS: u32 = 10_000;

/// Wait after a software restart before the final probe (ms).
pub const SOFT_RESTART_SETTLE_MS: u32 = 5000;

/// Timeout granted to the software power-down command (ms).
pub const POWER_DOWN_TIMEOUT_MS: u32 = 10_000;

/// Number of times the software power-down command is sent.
pub const POWER_DOWN_REPEATS: u8 = 2;

// ===== SLEEP / WAKE =====

/// Wait after toggling DTR or sleep mode (ms).
pub const SLEEP_SETTLE_MS: u32 = 2000;

/// Wait after DTR is released on wake before the first probe (ms).
pub const WAKE_DTR_SETTLE_MS: u32 = 1000;

/// Timeout of the first probe after wake (ms).
pub const WAKE_FIRST_PROBE_TIMEOUT_MS: u32 = 3000;

/// Probes per wake escalation tier.
pub const WAKE_TIER_PROBE_ATTEMPTS: u8 = 5;

/// Timeout of each wake tier probe (ms).
pub const WAKE_TIER_PROBE_TIMEOUT_MS: u32 = 2000;

/// Pause between wake tier probes (ms).
pub const WAKE_TIER_PROBE_PAUSE_MS: u32 = 1000;

/// Wait after the wake nudge pulse (ms).
pub const WAKE_NUDGE_SETTLE_MS: u32 = 3000;

// ===== EMERGENCY RESET =====

/// Time the power line is held off during an emergency reset (ms).
pub const RESET_OFF_HOLD_MS: u32 = 3000;

// ===== SIM & NETWORK =====

/// SIM reads during initialisation.
pub const SIM_READ_ATTEMPTS: u8 = 5;

/// Pause between SIM reads (ms).
pub const SIM_READ_PAUSE_MS: u32 = 2000;


/// Timeout of a SIM status query (ms).
pub const SIM_QUERY_TIMEOUT_MS: u32 = 5000;

/// Minimum ICCID reply length that proves a SIM is present.
pub const MIN_ICCID_REPLY_LEN: usize = 10;

/// Wait after each half of an RF cycle (ms).
pub const RF_CYCLE_SETTLE_MS: u32 = 2000;

/// Registration wait per attempt (ms).
pub const REGISTRATION_TIMEOUT_MS: u32 = 60_000;

/// Settle after a registration wait before re-checking (ms).
pub const REGISTRATION_SETTLE_MS: u32 = 1000;

/// Base pause between registration attempts (ms).
pub const REGISTRATION_RETRY_BASE_MS: u32 = 5000;

/// Extra pause added per registration attempt (ms).
pub const REGISTRATION_RETRY_STEP_MS: u32 = 1000;

/// Pause between data bearer attempts (ms).
pub const BEARER_RETRY_PAUSE_MS: u32 = 5000;

/// Default access point name.
pub const DEFAULT_APN: &str = "simbase";

// ===== AT COMMANDS =====

/// Full-functionality restart.
pub const CMD_SOFT_RESTART: &str = "+CFUN=1,1";

/// Normal power-down.
pub const CMD_POWER_DOWN: &str = "+CPOWD=1";

/// SIM PIN state query.
pub const CMD_SIM_PIN: &str = "+CPIN?";

/// SIM ICCID query.
pub const CMD_SIM_ICCID: &str = "+CCID";

/// Radio off.
pub const CMD_RADIO_OFF: &str = "+CFUN=0";

/// Radio on.
pub const CMD_RADIO_ON: &str = "+CFUN=1";

/// Preferred mode: automatic LTE/GSM selection.
pub const CMD_PREFERRED_MODE_AUTO: &str = "+CNMP=2";
