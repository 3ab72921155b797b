use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, StatusCode};

use crate::config::Config;
use crate::types::SensorPayload;

pub const API_KEY_HEADER: &str = "X-Guardian-API-Key";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// What the backend made of one transmission. Rejections carry the response
/// body so the caller can log an excerpt; nothing is ever retried.
#[derive(Debug)]
pub enum TransmitOutcome {
    Accepted(StatusCode),
    Rejected(StatusCode, String),
}

pub async fn send_reading(
    client: &Client,
    config: &Config,
    payload: &SensorPayload,
) -> Result<TransmitOutcome> {
    let response = client
        .post(&config.endpoint)
        .header(API_KEY_HEADER, &config.api_key)
        .timeout(REQUEST_TIMEOUT)
        .json(payload)
        .send()
        .await?;

    let status = response.status();
    if matches!(status.as_u16(), 200 | 201 | 202) {
        Ok(TransmitOutcome::Accepted(status))
    } else {
        let body = response.text().await.unwrap_or_default();
        Ok(TransmitOutcome::Rejected(status, body))
    }
}
