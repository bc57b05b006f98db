//! Error Types for Modem, Network, and Uplink Failures
//!
//! ## Design Philosophy
//!
//! The resilience engine runs inside a single cooperative loop on a device
//! nobody will ever attach a debugger to. Errors therefore follow the same
//! rules as everything else on the hot path:
//!
//! 1. **Small Size**: every variant is a few bytes and `Copy`, so results can
//!    be stored in trackers and logged after the fact.
//! 2. **No Heap Allocation**: no `String` payloads, only codes and enums.
//! 3. **Folded, not thrown**: a single failed connect or request is a
//!    transient event. Callers fold it into a backoff tracker; nothing here is
//!    fatal on its own.
//!
//! ## Error Categories
//!
//! ### Power sequencing
//! - `PowerError::Unresponsive`: every escalation tier was exhausted
//! - `PowerError::ControlLine`: a GPIO refused a level change
//!
//! ### Cellular acquisition
//! - `NetError::RegistrationTimeout`, `NetError::BearerTimeout`
//! - `NetError::SimUnavailable`: the SIM was not `Ready`
//!
//! ### Application uplink
//! - `HttpError::Throttled`: refused locally, no I/O was attempted
//! - `HttpError::Status`, `HttpError::Transport`, `HttpError::MalformedBody`
//!
//! ### Safety events
//! `SafetyEvent` is not an error a caller handles; it names the two outcomes
//! of the orchestrator that end in a log line and, for one of them, a restart.

use thiserror_no_std::Error;

use crate::modem::SimStatus;

/// Result type for modem power operations
pub type PowerResult<T = ()> = Result<T, PowerError>;

/// Result type for network acquisition
pub type NetResult<T = ()> = Result<T, NetError>;

/// Failures of the modem power state machine
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerError {
    /// Modem never answered a liveness probe after all escalation tiers
    #[error("modem unresponsive after all escalation tiers")]
    Unresponsive,

    /// A control line could not be driven
    #[error("modem control line refused level change")]
    ControlLine,

    /// Modem rejected the sleep-mode command
    #[error("modem rejected sleep request")]
    SleepRejected,
}

/// Failures while bringing up the cellular link
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetError {
    /// Network registration did not complete within the retry budget
    #[error("network registration timed out")]
    RegistrationTimeout,

    /// Packet data bearer did not come up within the retry budget
    #[error("data bearer activation timed out")]
    BearerTimeout,

    /// Registration needs a ready SIM
    #[error("SIM not ready: {0:?}")]
    SimUnavailable(SimStatus),
}

/// Failures of a single application-level request
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    /// Request refused locally because the uplink is backing off
    #[error("request throttled by backoff")]
    Throttled,

    /// Server answered with a non-2xx status
    #[error("server returned status {0}")]
    Status(u16),

    /// Connection, TLS or timeout failure below HTTP
    #[error("transport failure")]
    Transport,

    /// Response body could not be decoded
    #[error("malformed response body")]
    MalformedBody,
}

impl HttpError {
    /// Whether the failure happened before any I/O
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Throttled)
    }
}

/// Terminal outcomes raised by the offline safety orchestrator
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyEvent {
    /// Emergency power-line reset did not bring the modem back
    #[error("emergency modem reset failed")]
    EmergencyResetFailed,

    /// Device stayed offline longer than the configured maximum
    #[error("maximum offline time exceeded")]
    MaxOfflineExceeded,
}

#[cfg(feature = "defmt")]
impl defmt::Format for PowerError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Unresponsive => defmt::write!(fmt, "Modem unresponsive"),
            Self::ControlLine => defmt::write!(fmt, "Control line fault"),
            Self::SleepRejected => defmt::write!(fmt, "Sleep rejected"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for NetError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::RegistrationTimeout => defmt::write!(fmt, "Registration timeout"),
            Self::BearerTimeout => defmt::write!(fmt, "Bearer timeout"),
            Self::SimUnavailable(status) => defmt::write!(fmt, "SIM not ready: {}", status),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for HttpError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Throttled => defmt::write!(fmt, "Throttled"),
            Self::Status(code) => defmt::write!(fmt, "HTTP status {}", code),
            Self::Transport => defmt::write!(fmt, "Transport failure"),
            Self::MalformedBody => defmt::write!(fmt, "Malformed body"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for SafetyEvent {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::EmergencyResetFailed => defmt::write!(fmt, "Emergency reset failed"),
            Self::MaxOfflineExceeded => defmt::write!(fmt, "Max offline exceeded"),
        }
    }
}
