//! Blocking transport for the station server
//!
//! One request at a time, each bounded by a hard timeout so a dead bearer
//! cannot hold the loop past the watchdog. Nothing is retried here; the
//! request backoff decides when the next attempt happens.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use aiolos_connectors::http::{HttpConfig, UreqTransport};
//!
//! let config = HttpConfig::new("https://aiolos.example.net/api")
//!     .bearer_token("station-token")
//!     .timeout_secs(20)
//!     .header("X-Firmware", "2.4.1");
//! let transport = UreqTransport::new(config)?;
//! # let _ = transport;
//! # Ok::<(), aiolos_connectors::ConnectorError>(())
//! ```

use std::time::Duration;

use aiolos_core::errors::HttpError;
use log::{debug, warn};

use crate::{ConnectorError, HttpResponse, HttpTransport, Request};

/// Default request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// How the station proves who it is
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StationAuth {
    /// Open server
    Anonymous,
    /// `Authorization: Bearer <token>`
    Token(String),
    /// Key sent in a named header
    HeaderKey {
        /// Header name
        name: String,
        /// Key value
        key: String,
    },
}

/// Where and how to reach the station server
#[derive(Clone, Debug)]
pub struct HttpConfig {
    /// Server root without a trailing slash; request paths are appended
    pub base_url: String,
    /// Upper bound on one whole exchange
    pub timeout: Duration,
    /// Station credentials
    pub auth: StationAuth,
    /// Extra headers, sent in insertion order
    pub headers: Vec<(String, String)>,
    /// Sent as `User-Agent`
    pub user_agent: String,
}

impl HttpConfig {
    /// Configuration for the server at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            auth: StationAuth::Anonymous,
            headers: Vec::new(),
            user_agent: format!("Aiolos/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Authenticate with a bearer token
    pub fn bearer_token(self, token: impl Into<String>) -> Self {
        Self { auth: StationAuth::Token(token.into()), ..self }
    }

    /// Authenticate with a key in header `name`
    pub fn api_key(self, name: impl Into<String>, key: impl Into<String>) -> Self {
        Self { auth: StationAuth::HeaderKey { name: name.into(), key: key.into() }, ..self }
    }

    /// Bound one whole exchange to `secs` seconds
    pub fn timeout_secs(self, secs: u64) -> Self {
        Self { timeout: Duration::from_secs(secs), ..self }
    }

    /// Send `name: value` with every request
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    fn validate(&self) -> Result<(), ConnectorError> {
        let has_scheme = ["http://", "https://"]
            .iter()
            .any(|scheme| self.base_url.starts_with(scheme));
        if !has_scheme {
            return Err(ConnectorError::InvalidBaseUrl(self.base_url.clone()));
        }
        if self.timeout.is_zero() {
            return Err(ConnectorError::ConfigError("timeout must be non-zero".into()));
        }
        Ok(())
    }
}

/// Blocking transport on a `ureq` agent
pub struct UreqTransport {
    agent: ureq::Agent,
    config: HttpConfig,
}

impl UreqTransport {
    /// Create a transport, validating the configuration
    pub fn new(config: HttpConfig) -> Result<Self, ConnectorError> {
        config.validate()?;

        let agent = ureq::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build();
        Ok(Self { agent, config })
    }

    /// Active configuration
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    fn prepare(&self, request: &Request<'_>) -> ureq::Request {
        let url = format!("{}{}", self.config.base_url, request.path);
        let mut prepared = self
            .agent
            .request(request.method.as_str(), &url)
            .set("Accept", "application/json");
        if request.body.is_some() {
            prepared = prepared.set("Content-Type", "application/json");
        }

        prepared = match &self.config.auth {
            StationAuth::Anonymous => prepared,
            StationAuth::Token(token) => {
                prepared.set("Authorization", &format!("Bearer {}", token))
            }
            StationAuth::HeaderKey { name, key } => prepared.set(name, key),
        };

        self.config
            .headers
            .iter()
            .fold(prepared, |prepared, (name, value)| prepared.set(name, value))
    }
}

impl HttpTransport for UreqTransport {
    fn send(&mut self, request: Request<'_>) -> Result<HttpResponse, HttpError> {
        let prepared = self.prepare(&request);
        debug!("{} {}", request.method.as_str(), request.path);

        let outcome = match request.body {
            Some(body) => prepared.send_string(body),
            None => prepared.call(),
        };

        match outcome {
            Ok(response) => {
                let status = response.status();
                if !request.read_body {
                    return Ok(HttpResponse { status, body: None });
                }
                match response.into_string() {
                    Ok(body) => Ok(HttpResponse { status, body: Some(body) }),
                    Err(e) => {
                        warn!("{} body unreadable: {}", request.path, e);
                        Err(HttpError::Transport)
                    }
                }
            }
            // non-2xx is still an answer; the caller classifies it
            Err(ureq::Error::Status(status, response)) => {
                let body = request.read_body.then(|| response.into_string().ok()).flatten();
                Ok(HttpResponse { status, body })
            }
            Err(ureq::Error::Transport(failure)) => {
                warn!("{} unreachable: {}", request.path, failure);
                Err(HttpError::Transport)
            }
        }
    }
}
