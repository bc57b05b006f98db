//! Hardware and collaborator seams
//!
//! The engine never talks to a UART, a GPIO register or a watchdog
//! peripheral directly. Each of those sits behind a small trait here so the
//! same state machines run on the station board and in host tests.
//!
//! - [`ModemDriver`]: AT-command level modem access
//! - [`Watchdog`], [`SystemControl`], [`LatchablePin`]: host platform services
//! - [`ModemLink`]: what the orchestrator needs from a modem, implemented by
//!   [`crate::modem::Modem`]
//!
//! Control lines and blocking waits use `embedded-hal` 1.0 traits directly
//! (`OutputPin`, `DelayNs`).

pub mod driver;
pub mod link;
pub mod platform;

pub use driver::{AtReply, AtStatus, Liveness, ModemDriver, AT_REPLY_CAPACITY};
pub use link::ModemLink;
pub use platform::{LatchablePin, SystemControl, Watchdog};
