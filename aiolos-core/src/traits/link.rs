//! Orchestrator-facing modem seam

use crate::errors::{NetResult, PowerResult};
use crate::time::ClockTime;
use crate::traits::Watchdog;

/// What the resilience engine needs from a cellular modem
///
/// Every method that may block past the watchdog timeout takes the watchdog
/// so the implementation can suspend it for exactly the blocking span.
pub trait ModemLink {
    /// Bring the modem to a responsive state, idempotent
    fn power_on<W: Watchdog>(&mut self, watchdog: &mut W) -> PowerResult;

    /// Reach a verified off state
    fn power_off<W: Watchdog>(&mut self, watchdog: &mut W) -> PowerResult;

    /// Force the power line off, reopen the serial link and power on again
    fn hard_reset<W: Watchdog>(&mut self, watchdog: &mut W) -> PowerResult;

    /// Keep network and bearer up (`active`) or drop only the bearer
    fn maintain<W: Watchdog>(&mut self, watchdog: &mut W, active: bool) -> NetResult;

    /// Network registered and bearer up, polled fresh
    fn is_link_up(&mut self) -> bool;

    /// Whether the modem answers a liveness probe
    fn is_responsive(&mut self) -> bool;

    /// Signal strength on the CSQ scale
    fn signal_quality(&mut self) -> Option<u8>;

    /// Local time reported by the network
    fn network_time(&mut self) -> Option<ClockTime>;

    /// Block the loop for `ms`
    fn pause_ms(&mut self, ms: u32);
}
