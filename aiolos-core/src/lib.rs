//! Connectivity and power resilience engine for Aiolos weather stations
//!
//! Keeps an unattended, solar-powered station reachable over a cellular
//! link without anyone on site: sequences the modem's power lines, brings
//! up network and packet data, backs off when the link or the server keeps
//! failing, power-cycles a wedged modem, and restarts the whole device when
//! nothing else helps.
//!
//! Key constraints:
//! - Single cooperative loop, no RTOS
//! - Hardware watchdog that must never stay suspended by accident
//! - No heap allocation; all state is reset on every boot
//!
//! ```no_run
//! # use aiolos_core::{ResilienceEngine, ResilienceConfig};
//! # use aiolos_core::time::TimeSource;
//! # fn station<M, W, S, C>(modem: M, wdt: W, sys: S, clock: C)
//! # where M: aiolos_core::traits::ModemLink, W: aiolos_core::traits::Watchdog,
//! #       S: aiolos_core::traits::SystemControl, C: TimeSource {
//! let mut engine = ResilienceEngine::new(modem, wdt, sys, clock, ResilienceConfig::default());
//! let _ = engine.start(engine.now());
//!
//! loop {
//!     engine.feed_watchdog();
//!     let report = engine.tick(engine.now());
//!     if report.online {
//!         // upload diagnostics and samples through `engine.request_permit(now)`
//!     }
//! }
//! # }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod logging;

pub mod backoff;
pub mod config;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod modem;
pub mod pulse;
pub mod retry;
pub mod safety;
pub mod schedule;
pub mod time;
pub mod tracker;
pub mod traits;
pub mod watchdog;

// Public API
pub use backoff::{BackoffLaw, HttpBackoff, RequestPermit};
pub use config::{ApnConfig, RemoteConfig, ResilienceConfig, ScheduleConfig, StationSettings};
pub use engine::{ResilienceEngine, RestartReason, TickReport};
pub use errors::{HttpError, NetError, PowerError, SafetyEvent};
pub use modem::{Modem, ModemLinkStatus, SimStatus};
pub use safety::{OfflineSafety, SafetyMode};
pub use time::{ClockTime, Timestamp, WallClock};
pub use tracker::ConnectionFailureTracker;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
