//! JSON bodies exchanged with the station server

use aiolos_core::config::RemoteConfig;
use aiolos_core::errors::HttpError;
use log::warn;
use serde::Serialize;

/// CSQ value meaning "not known or not detectable"
pub const SIGNAL_UNKNOWN: u8 = 99;

/// Board health readings supplied by the sensors
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoardReadings {
    /// Battery voltage (V)
    pub battery_voltage: f32,
    /// Solar panel voltage (V)
    pub solar_voltage: f32,
    /// Enclosure temperature (°C)
    pub internal_temperature: f32,
}

/// Body of `POST /stations/{id}/diagnostics`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiagnosticsReport {
    /// Battery voltage (V)
    pub battery_voltage: f32,
    /// Solar panel voltage (V)
    pub solar_voltage: f32,
    /// Enclosure temperature (°C)
    pub internal_temperature: f32,
    /// CSQ scale, [`SIGNAL_UNKNOWN`] when the modem did not say
    pub signal_quality: u8,
    /// Seconds since boot
    pub uptime: u64,
}

impl DiagnosticsReport {
    /// Combine board readings with link and uptime figures
    pub fn new(board: BoardReadings, signal_quality: Option<u8>, uptime_secs: u64) -> Self {
        Self {
            battery_voltage: board.battery_voltage,
            solar_voltage: board.solar_voltage,
            internal_temperature: board.internal_temperature,
            signal_quality: signal_quality.unwrap_or(SIGNAL_UNKNOWN),
            uptime: uptime_secs,
        }
    }
}

/// Body of `POST /stations/{id}/wind`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindReport {
    /// Wind speed (m/s)
    pub wind_speed: f32,
    /// Direction the wind blows from (degrees)
    pub wind_direction: f32,
}

/// Body of `POST /stations/{id}/temperature`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TemperatureReport {
    /// Air temperature (°C)
    pub temperature: f32,
}

/// Serialize a request body
pub fn to_body<T: Serialize>(payload: &T) -> Result<String, HttpError> {
    serde_json::to_string(payload).map_err(|e| {
        warn!("payload serialization failed: {}", e);
        HttpError::MalformedBody
    })
}

/// Parse a fetched configuration document
pub fn parse_remote_config(body: &str) -> Result<RemoteConfig, HttpError> {
    serde_json::from_str(body).map_err(|e| {
        warn!("configuration rejected: {}", e);
        HttpError::MalformedBody
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn diagnostics_wire_names() {
        let board = BoardReadings {
            battery_voltage: 3.9,
            solar_voltage: 5.25,
            internal_temperature: 21.5,
        };
        let report = DiagnosticsReport::new(board, None, 3_600);
        let value: serde_json::Value = serde_json::from_str(&to_body(&report).unwrap()).unwrap();

        assert_eq!(value["signal_quality"], json!(SIGNAL_UNKNOWN));
        assert_eq!(value["uptime"], json!(3_600));
        assert_eq!(value["solar_voltage"], json!(5.25));
        assert!(value.get("battery_voltage").is_some());
        assert!(value.get("internal_temperature").is_some());
    }

    #[test]
    fn telemetry_wire_names() {
        let wind = to_body(&WindReport { wind_speed: 4.5, wind_direction: 270.0 }).unwrap();
        assert_eq!(wind, r#"{"wind_speed":4.5,"wind_direction":270.0}"#);

        let temp = to_body(&TemperatureReport { temperature: -2.5 }).unwrap();
        assert_eq!(temp, r#"{"temperature":-2.5}"#);
    }

    #[test]
    fn config_with_partial_fields() {
        let body = r#"{"tempInterval":600000,"sleepStartHour":21,"remoteOta":true}"#;
        let config = parse_remote_config(body).unwrap();
        assert_eq!(config.temp_interval, Some(600_000));
        assert_eq!(config.sleep_start_hour, Some(21));
        assert!(config.requests_ota());
        assert_eq!(config.ota_hour, None);
    }

    #[test]
    fn config_ignores_unknown_fields() {
        let config = parse_remote_config(r#"{"firmwareChannel":"beta"}"#).unwrap();
        assert_eq!(config, RemoteConfig::default());
    }

    #[test]
    fn malformed_config_is_rejected() {
        assert_eq!(parse_remote_config("{not json"), Err(HttpError::MalformedBody));
        assert_eq!(parse_remote_config(r#"{"sleepStartHour":-1}"#), Err(HttpError::MalformedBody));
    }
}
