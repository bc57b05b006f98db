//! Interrupt-safe pulse counter
//!
//! The anemometer reed switch fires an interrupt per revolution. The ISR
//! only increments; the main loop periodically takes the count and resets
//! it in one atomic swap, so no pulse is lost or counted twice between the
//! read and the reset.
//!
//! ## Memory Ordering
//!
//! - **Release** on increment: the count is published with everything the
//!   ISR wrote before it
//! - **AcqRel** on take: the swap observes every released increment and
//!   publishes the reset
//! - **Acquire** on peek

use core::sync::atomic::{AtomicU32, Ordering};

/// Pulse count shared between an interrupt handler and the main loop
///
/// Usable as a `static`:
///
/// ```
/// use aiolos_core::pulse::PulseCounter;
///
/// static ANEMOMETER: PulseCounter = PulseCounter::new();
///
/// ANEMOMETER.record();
/// ANEMOMETER.record();
/// assert_eq!(ANEMOMETER.take(), 2);
/// assert_eq!(ANEMOMETER.take(), 0);
/// ```
#[derive(Debug, Default)]
pub struct PulseCounter {
    count: AtomicU32,
}

impl PulseCounter {
    /// Zeroed counter
    pub const fn new() -> Self {
        Self { count: AtomicU32::new(0) }
    }

    /// Count one pulse; call from interrupt context
    #[inline]
    pub fn record(&self) {
        self.count.fetch_add(1, Ordering::Release);
    }

    /// Current count without resetting
    pub fn peek(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }

    /// Return the count and reset it to zero
    pub fn take(&self) -> u32 {
        self.count.swap(0, Ordering::AcqRel)
    }
}
