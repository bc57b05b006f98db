//! AT-command modem driver seam
//!
//! A thin view of what the firmware's modem library already offers. All
//! calls block for at most their timeout; none of them can be cancelled.

use heapless::String;

use crate::config::ApnConfig;
use crate::modem::SimStatus;
use crate::time::ClockTime;

/// Capacity of a captured command reply
pub const AT_REPLY_CAPACITY: usize = 64;

/// Answer to a bare `AT` liveness probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Modem answered `OK`
    Ok,
    /// Modem answered, but with `ERROR` (UART up, AT stack not ready)
    Busy,
    /// No answer within the timeout
    Silent,
}

impl Liveness {
    /// Any answer at all proves the modem is powered
    pub fn is_responsive(self) -> bool {
        !matches!(self, Self::Silent)
    }
}

/// Final result code of an AT command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtStatus {
    /// `OK`
    Ok,
    /// `ERROR` or `+CME ERROR`
    Error,
    /// No final result code within the timeout
    Timeout,
}

/// Final result code plus the information text that preceded it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtReply {
    /// Final result code
    pub status: AtStatus,
    /// Information response, truncated to [`AT_REPLY_CAPACITY`]
    pub text: String<AT_REPLY_CAPACITY>,
}

impl AtReply {
    /// Reply with a status and no text
    pub fn bare(status: AtStatus) -> Self {
        Self { status, text: String::new() }
    }

    /// Reply with a status and text, truncating text that does not fit
    pub fn with_text(status: AtStatus, text: &str) -> Self {
        let mut reply = Self::bare(status);
        for c in text.chars() {
            if reply.text.push(c).is_err() {
                break;
            }
        }
        reply
    }

    /// Final result code was `OK`
    pub fn is_ok(&self) -> bool {
        self.status == AtStatus::Ok
    }
}

/// AT-level modem access
pub trait ModemDriver {
    /// Send a bare `AT` and classify the answer
    fn probe(&mut self, timeout_ms: u32) -> Liveness;

    /// Send `AT<command>` and collect the reply
    fn command(&mut self, command: &str, timeout_ms: u32) -> AtReply;

    /// Discard pending input on the serial link
    fn flush_input(&mut self);

    /// Re-open the serial port (after a power-line reset or deep sleep)
    fn reinit_serial(&mut self);

    /// SIM state as reported by the driver's own query
    fn builtin_sim_status(&mut self) -> SimStatus;

    /// Whether the modem is registered on a cellular network
    fn is_network_registered(&mut self) -> bool;

    /// Block until registered or `timeout_ms` elapses
    fn wait_for_network(&mut self, timeout_ms: u32) -> bool;

    /// Whether the packet data bearer is up
    fn is_bearer_up(&mut self) -> bool;

    /// Activate the packet data bearer
    fn bearer_connect(&mut self, apn: &ApnConfig) -> bool;

    /// Deactivate the packet data bearer
    fn bearer_disconnect(&mut self) -> bool;

    /// Enable or disable DTR-controlled slow clock mode
    fn set_sleep_mode(&mut self, enabled: bool) -> bool;

    /// Received signal strength on the 0..=31 CSQ scale, `None` if unknown
    fn signal_quality(&mut self) -> Option<u8>;

    /// Local time reported by the network
    fn network_time(&mut self) -> Option<ClockTime>;
}
