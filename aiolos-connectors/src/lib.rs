//! Station uplink for the Aiolos resilience engine
//!
//! ## Overview
//!
//! The core crate decides *whether* the station may talk to its server. This
//! crate does the talking: it defines the HTTP transport seam, the station
//! API on top of it, the JSON payloads, and the main loop that runs sensor
//! uploads, configuration fetches and maintenance windows behind the
//! engine's gates.
//!
//! ## Layers
//!
//! ```text
//! StationLoop ─── ResilienceEngine (tick, is_online, request_permit)
//!      │
//!      ▼
//! StationClient ── one RequestPermit per request, settled with the outcome
//!      │
//!      ▼
//! HttpTransport ── UreqTransport (feature "http") or an in-memory double
//! ```
//!
//! ## Request Classification
//!
//! Every request ends in exactly one backoff record:
//! - any 2xx status is a success, unless the caller needs the body and it
//!   does not parse (the configuration fetch)
//! - any other status, and any transport failure, is a failure
//! - a request refused by the throttle never reaches the transport and
//!   records nothing
//!
//! Telemetry posts (wind, temperature) are fire-and-forget: the transport is
//! told not to read the response body.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! # #[cfg(feature = "http")]
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use aiolos_connectors::api::StationClient;
//! use aiolos_connectors::http::{HttpConfig, UreqTransport};
//!
//! let config = HttpConfig::new("https://aiolos.example.net/api").timeout_secs(20);
//! let transport = UreqTransport::new(config)?;
//! let client = StationClient::new(transport, "station-042")?;
//! # let _ = client;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "http")]
pub mod http;

pub mod api;
pub mod payload;
pub mod station;

pub use api::StationClient;
pub use payload::{BoardReadings, DiagnosticsReport, TemperatureReport, WindReport};
pub use station::{Iteration, OtaService, Sensors, StationLoop};

use aiolos_core::errors::HttpError;
use thiserror::Error;

/// Connector setup errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Base URL is not http(s)
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// Station id is empty or not path-safe
    #[error("Invalid station id: {0}")]
    InvalidStationId(String),

    /// Any other configuration problem
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Request method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
}

impl HttpMethod {
    /// Method name on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// One outgoing request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request<'a> {
    /// Method
    pub method: HttpMethod,
    /// Path below the base URL
    pub path: &'a str,
    /// JSON body
    pub body: Option<&'a str>,
    /// Whether the caller needs the response body
    pub read_body: bool,
}

/// Status and, when requested, the body of a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Body, if it was read
    pub body: Option<String>,
}

impl HttpResponse {
    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking HTTP exchange
///
/// Any status the server sends is an `Ok` response. Only failures below
/// HTTP (connect, TLS, timeout, unreadable body) are errors, reported as
/// [`HttpError::Transport`].
pub trait HttpTransport {
    /// Perform `request`
    fn send(&mut self, request: Request<'_>) -> Result<HttpResponse, HttpError>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for &mut T {
    fn send(&mut self, request: Request<'_>) -> Result<HttpResponse, HttpError> {
        (**self).send(request)
    }
}
