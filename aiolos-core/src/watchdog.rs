//! Scoped watchdog suspension
//!
//! Modem power sequencing and network registration block the loop for far
//! longer than the hardware watchdog timeout. The guard suspends the
//! watchdog on construction and resumes it when dropped, so every exit path
//! (early `return`, `?`, panic unwinding on host) re-arms it.
//!
//! ```
//! use aiolos_core::traits::Watchdog;
//! use aiolos_core::watchdog::WatchdogGuard;
//!
//! struct Wdt { armed: bool }
//! impl Watchdog for Wdt {
//!     fn feed(&mut self) {}
//!     fn suspend(&mut self) { self.armed = false; }
//!     fn resume(&mut self) { self.armed = true; }
//! }
//!
//! let mut wdt = Wdt { armed: true };
//! {
//!     let _guard = WatchdogGuard::suspend(&mut wdt);
//!     // long blocking modem work
//! }
//! assert!(wdt.armed);
//! ```

use core::ops::{Deref, DerefMut};

use crate::traits::Watchdog;

/// Keeps the watchdog suspended for as long as it lives
///
/// Take one guard per blocking operation at its public entry point. Guards
/// do not count: dropping an inner guard re-arms the watchdog even while an
/// outer one is alive.
#[must_use = "the watchdog resumes as soon as the guard is dropped"]
pub struct WatchdogGuard<'a, W: Watchdog> {
    watchdog: &'a mut W,
}

impl<'a, W: Watchdog> WatchdogGuard<'a, W> {
    /// Suspend `watchdog` until the guard is dropped
    pub fn suspend(watchdog: &'a mut W) -> Self {
        watchdog.suspend();
        Self { watchdog }
    }
}

impl<W: Watchdog> Deref for WatchdogGuard<'_, W> {
    type Target = W;

    fn deref(&self) -> &W {
        self.watchdog
    }
}

impl<W: Watchdog> DerefMut for WatchdogGuard<'_, W> {
    fn deref_mut(&mut self) -> &mut W {
        self.watchdog
    }
}

impl<W: Watchdog> Drop for WatchdogGuard<'_, W> {
    fn drop(&mut self) {
        self.watchdog.resume();
        self.watchdog.feed();
    }
}
