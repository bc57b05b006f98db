//! Station API client
//!
//! Every call takes a [`RequestPermit`] from the engine's request backoff and
//! settles it with the outcome, so no request can bypass the throttle or
//! leave it unrecorded.
//!
//! | Call | Request |
//! |---|---|
//! | [`StationClient::fetch_config`] | `GET /stations/{id}/config` |
//! | [`StationClient::push_diagnostics`] | `POST /stations/{id}/diagnostics` |
//! | [`StationClient::push_wind`] | `POST /stations/{id}/wind` |
//! | [`StationClient::push_temperature`] | `POST /stations/{id}/temperature` |
//! | [`StationClient::confirm_ota`] | `POST /stations/{id}/ota-confirm` |

use aiolos_core::backoff::RequestPermit;
use aiolos_core::config::RemoteConfig;
use aiolos_core::errors::HttpError;
use log::{info, warn};

use crate::payload::{
    parse_remote_config, to_body, DiagnosticsReport, TemperatureReport, WindReport,
};
use crate::{ConnectorError, HttpMethod, HttpTransport, Request};

/// Client for one station's endpoints
pub struct StationClient<T> {
    transport: T,
    station_id: String,
}

impl<T: HttpTransport> StationClient<T> {
    /// Client for `station_id`, which must be non-empty and path-safe
    pub fn new(transport: T, station_id: impl Into<String>) -> Result<Self, ConnectorError> {
        let station_id = station_id.into();
        let path_safe = station_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if station_id.is_empty() || !path_safe {
            return Err(ConnectorError::InvalidStationId(station_id));
        }
        Ok(Self { transport, station_id })
    }

    /// Station id
    pub fn station_id(&self) -> &str {
        &self.station_id
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Underlying transport, mutably
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Fetch the remote configuration
    ///
    /// The body is parsed before the permit is settled: a 2xx carrying a
    /// body that does not parse is a failed request.
    pub fn fetch_config(&mut self, permit: RequestPermit<'_>) -> Result<RemoteConfig, HttpError> {
        let path = self.path("config");
        let outcome = self
            .send(HttpMethod::Get, &path, None, true)
            .and_then(|body| parse_remote_config(body.as_deref().unwrap_or("{}")));
        permit.settle(&outcome);
        let config = outcome?;
        info!("configuration received");
        Ok(config)
    }

    /// Upload board diagnostics
    pub fn push_diagnostics(
        &mut self,
        permit: RequestPermit<'_>,
        report: &DiagnosticsReport,
    ) -> Result<(), HttpError> {
        let path = self.path("diagnostics");
        self.post_json(permit, &path, report, true)
    }

    /// Upload a wind sample, without reading the response
    pub fn push_wind(
        &mut self,
        permit: RequestPermit<'_>,
        report: &WindReport,
    ) -> Result<(), HttpError> {
        let path = self.path("wind");
        self.post_json(permit, &path, report, false)
    }

    /// Upload a temperature sample, without reading the response
    pub fn push_temperature(
        &mut self,
        permit: RequestPermit<'_>,
        report: &TemperatureReport,
    ) -> Result<(), HttpError> {
        let path = self.path("temperature");
        self.post_json(permit, &path, report, false)
    }

    /// Tell the server a requested maintenance window has started
    pub fn confirm_ota(&mut self, permit: RequestPermit<'_>) -> Result<(), HttpError> {
        let path = self.path("ota-confirm");
        let outcome = self.send(HttpMethod::Post, &path, None, true).map(|_| ());
        permit.settle(&outcome);
        outcome
    }

    fn path(&self, endpoint: &str) -> String {
        format!("/stations/{}/{}", self.station_id, endpoint)
    }

    fn post_json<P: serde::Serialize>(
        &mut self,
        permit: RequestPermit<'_>,
        path: &str,
        payload: &P,
        read_body: bool,
    ) -> Result<(), HttpError> {
        let outcome = to_body(payload).and_then(|body| {
            self.send(HttpMethod::Post, path, Some(&body), read_body)
                .map(|_| ())
        });
        permit.settle(&outcome);
        outcome
    }

    /// One round trip; any non-2xx status becomes [`HttpError::Status`]
    fn send(
        &mut self,
        method: HttpMethod,
        path: &str,
        body: Option<&str>,
        read_body: bool,
    ) -> Result<Option<String>, HttpError> {
        let request = Request { method, path, body, read_body };
        self.transport.send(request).and_then(|response| {
            if response.is_success() {
                Ok(response.body)
            } else {
                warn!("{} {} answered {}", method.as_str(), path, response.status);
                Err(HttpError::Status(response.status))
            }
        })
    }
}
