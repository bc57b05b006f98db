//! Feature-gated logging macros.
//!
//! With the `log` feature enabled these forward to the `log` facade; without
//! it they expand to nothing so `no_std` builds carry no formatting code.
//! Arguments are still type-checked in the disabled form.

#[cfg(feature = "log")]
macro_rules! log_error { ($($arg:tt)*) => { log::error!($($arg)*) }; }
#[cfg(not(feature = "log"))]
macro_rules! log_error { ($($arg:tt)*) => { if false { let _ = core::format_args!($($arg)*); } }; }

#[cfg(feature = "log")]
macro_rules! log_warn { ($($arg:tt)*) => { log::warn!($($arg)*) }; }
#[cfg(not(feature = "log"))]
macro_rules! log_warn { ($($arg:tt)*) => { if false { let _ = core::format_args!($($arg)*); } }; }

#[cfg(feature = "log")]
macro_rules! log_info { ($($arg:tt)*) => { log::info!($($arg)*) }; }
#[cfg(not(feature = "log"))]
macro_rules! log_info { ($($arg:tt)*) => { if false { let _ = core::format_args!($($arg)*); } }; }

#[cfg(feature = "log")]
macro_rules! log_debug { ($($arg:tt)*) => { log::debug!($($arg)*) }; }
#[cfg(not(feature = "log"))]
macro_rules! log_debug { ($($arg:tt)*) => { if false { let _ = core::format_args!($($arg)*); } }; }

pub(crate) use {log_debug, log_error, log_info, log_warn};
