//! Readout settings lookup
//!
//! Before a device can be read, the gateway asks the metering backend how:
//! which credentials to use, which archive to read, from when and in which
//! time zone the meter keeps its clock.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use chrono_tz::Tz;
use elgas_core::{Archive, ElgasError, ElgasResult};
use elgas_security::Credentials;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Per-device readout settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReadoutSettings {
    pub password: String,
    pub password_id: u8,
    /// Hex encoded AES key
    pub encryption_key: String,
    pub encryption_key_id: u8,
    /// IANA time zone name, e.g. `Europe/Stockholm`
    pub meter_timezone: String,
    /// Length of one archive record in bytes
    pub archive_record_length: usize,
    pub archive: Archive,
    /// Records requested per page
    pub amount_to_read: u16,
    /// Start of the readout window
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub oldest_timestamp: DateTime<FixedOffset>,
    /// End of the readout window; the current time when absent
    #[serde(default, deserialize_with = "timestamp::deserialize_optional")]
    pub read_until_timestamp: Option<DateTime<FixedOffset>>,
}

impl ReadoutSettings {
    /// Parse settings from a backend JSON document
    pub fn from_json(body: &str) -> ElgasResult<Self> {
        serde_json::from_str(body)
            .map_err(|e| ElgasError::InvalidData(format!("Invalid readout settings: {}", e)))
    }

    /// Time zone of the meter clock
    pub fn timezone(&self) -> ElgasResult<Tz> {
        self.meter_timezone.parse::<Tz>().map_err(|_| {
            ElgasError::InvalidData(format!("Unknown meter time zone: {}", self.meter_timezone))
        })
    }

    /// Credentials for the device session
    pub fn credentials(&self) -> ElgasResult<Credentials> {
        Credentials::new(
            self.password_id,
            &self.password,
            self.encryption_key_id,
            &self.encryption_key,
        )
    }
}

mod timestamp {
    use super::*;

    /// Parse an ISO 8601 timestamp; one without an offset is taken as UTC
    pub(super) fn parse(value: &str) -> Result<DateTime<FixedOffset>, String> {
        if let Ok(aware) = DateTime::parse_from_rfc3339(value) {
            return Ok(aware);
        }
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
            .map(|naive| naive.and_utc().fixed_offset())
            .map_err(|e| format!("invalid timestamp {:?}: {}", value, e))
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        parse(&value).map_err(serde::de::Error::custom)
    }

    pub(super) fn deserialize_optional<'de, D>(
        deserializer: D,
    ) -> Result<Option<DateTime<FixedOffset>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(value) => parse(&value).map(Some).map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

/// Source of readout settings
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    /// Fetch the settings for the device with the given serial number
    async fn fetch(&self, serial_number: u32) -> ElgasResult<ReadoutSettings>;
}

/// Settings from the metering backend over HTTP
#[derive(Debug, Clone)]
pub struct HttpSettingsProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpSettingsProvider {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> ElgasResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ElgasError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn settings_url(&self, serial_number: u32) -> String {
        format!(
            "{}/v1/metering/edge/elgas/readout-settings/{}",
            self.base_url, serial_number
        )
    }
}

#[async_trait]
impl SettingsProvider for HttpSettingsProvider {
    async fn fetch(&self, serial_number: u32) -> ElgasResult<ReadoutSettings> {
        let url = self.settings_url(serial_number);
        log::info!("Requesting readout settings from {}", url);

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Token {}", self.api_key))
            .send()
            .await
            .map_err(|e| ElgasError::Http(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ElgasError::Http(format!("Failed to read response from {}: {}", url, e)))?;

        if status != reqwest::StatusCode::OK {
            log::info!(
                "Failed to get readout settings for device {}: {} {}",
                serial_number,
                status,
                body
            );
            return Err(ElgasError::Settings {
                status: status.as_u16(),
                body,
            });
        }

        log::debug!("Received readout settings for device {}", serial_number);
        ReadoutSettings::from_json(&body)
    }
}
