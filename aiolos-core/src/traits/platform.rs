//! Host platform services

/// Hardware watchdog control
///
/// Prefer [`crate::watchdog::WatchdogGuard`] over calling `suspend` and
/// `resume` by hand.
pub trait Watchdog {
    /// Acknowledge the watchdog
    fn feed(&mut self);

    /// Stop the watchdog from firing
    fn suspend(&mut self);

    /// Re-arm the watchdog
    fn resume(&mut self);
}

/// Restart and deep sleep
pub trait SystemControl {
    /// Reboot the device
    ///
    /// On hardware this does not return. Host doubles record the call and
    /// return so tests can observe it.
    fn restart(&mut self);

    /// Arm the wake timer for `seconds`
    fn arm_wake_timer(&mut self, seconds: u32);

    /// Enter deep sleep until the wake timer fires
    fn enter_deep_sleep(&mut self);
}

/// Output pin whose level can be latched through host deep sleep
pub trait LatchablePin {
    /// Hold (or release) the current level
    fn set_hold(&mut self, hold: bool);
}
