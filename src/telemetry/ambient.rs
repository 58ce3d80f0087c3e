// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the envsensor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Ambient HTTP client
//!
//! Data points are posted as JSON to
//! `{endpoint}/api/v2/channels/{channel_id}/data` with the channel write key
//! in the body. The eCO2 value goes to field `d1`.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local, Utc};
use log::debug;
use serde::Serialize;
use url::Url;

use crate::acquisition::TimestampedReading;
use crate::config::TelemetryConfig;

/// Timestamp layout accepted in the `created` field
const CREATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

#[derive(Debug, Serialize)]
struct AmbientDataPoint<'a> {
    #[serde(rename = "writeKey")]
    write_key: &'a str,
    d1: u16,
    created: String,
}

/// Client for one Ambient channel
#[derive(Debug, Clone)]
pub struct AmbientClient {
    http: reqwest::Client,
    url: Url,
    write_key: String,
}

impl AmbientClient {
    pub fn new(endpoint: &str, channel_id: &str, write_key: &str) -> Result<Self> {
        let mut url =
            Url::parse(endpoint).with_context(|| format!("Invalid Ambient endpoint {}", endpoint))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Ambient endpoint {} cannot be a base URL", endpoint))?
            .pop_if_empty()
            .extend(["api", "v2", "channels", channel_id, "data"]);

        Ok(Self {
            http: reqwest::Client::new(),
            url,
            write_key: write_key.to_string(),
        })
    }

    pub fn from_config(config: &TelemetryConfig) -> Result<Self> {
        Self::new(&config.endpoint, &config.channel_id, &config.write_key)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Push the eCO2 value of `reading` to the channel
    pub async fn send(&self, reading: &TimestampedReading) -> Result<()> {
        let point = AmbientDataPoint {
            write_key: &self.write_key,
            d1: reading.reading.co2_ppm,
            created: format_created(reading.timestamp),
        };

        self.http
            .post(self.url.clone())
            .json(&point)
            .send()
            .await
            .with_context(|| format!("Failed to reach Ambient at {}", self.url))?
            .error_for_status()
            .context("Ambient rejected the data point")?;

        debug!("Sent eCO2 {} ppm to Ambient", point.d1);
        Ok(())
    }
}

fn format_created(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format(CREATED_FORMAT)
        .to_string()
}
