//! API client for communicating with the Fleet Advisor service

use advisor_lib::{scan::ScanReport, RiskEntry};
use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Non-2xx answer from the service
#[derive(Debug, Error)]
#[error("API error ({status}): {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

/// API client for the Fleet Advisor service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        // Relative joins replace the last path segment unless it ends in '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(ApiError { status, message }.into());
        }

        response.json().await.context("Failed to parse response")
    }

    /// Latest scan report, or `None` when the service has not scanned yet
    pub async fn latest_report(&self) -> Result<Option<ScanReport>> {
        match self.get("api/v1/plan").await {
            Ok(report) => Ok(Some(report)),
            Err(e) => match e.downcast_ref::<ApiError>() {
                Some(api) if api.status == StatusCode::NOT_FOUND => Ok(None),
                _ => Err(e),
            },
        }
    }

    pub async fn risk_snapshot(&self) -> Result<Vec<RiskEntry>> {
        self.get("api/v1/risk").await
    }

    pub async fn record_interruption(
        &self,
        zone: &str,
        instance_type: &str,
    ) -> Result<InterruptionResponse> {
        let body = InterruptionRequest {
            zone: zone.to_string(),
            instance_type: instance_type.to_string(),
        };
        self.post("api/v1/risk/interruptions", &body).await
    }
}

// API request/response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterruptionRequest {
    pub zone: String,
    pub instance_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterruptionResponse {
    pub key: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
