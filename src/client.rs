//! Comparison service client.
//!
//! Endpoints, relative to the configured base URL:
//! - `POST /run-test`: submit a run, receive matched elements and differences
//! - `POST /store-differences`: hand differences to the report backend
//! - `GET /generate-pdf`: the report itself (only its URL is used here)
//! - `GET /ping`: liveness check

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::ServiceSettings;
use crate::model::{ComparisonResult, Difference, RunTestRequest, StoreDifferencesRequest};

/// Result type for service calls
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors from talking to the comparison service
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Connection, timeout or other transport failure
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-2xx status
    #[error("service returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    /// The response body was not the expected shape
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The remote side of a run: comparison and report storage.
#[async_trait]
pub trait ComparisonService: Send + Sync {
    /// Submit one comparison run
    async fn run_test(&self, request: &RunTestRequest) -> ServiceResult<ComparisonResult>;

    /// Store differences for later report generation
    async fn store_differences(&self, differences: &[Difference]) -> ServiceResult<()>;

    /// Location of the generated report
    fn report_url(&self) -> String;

    /// Check whether the service answers at all
    async fn ping(&self) -> ServiceResult<bool>;
}

/// HTTP implementation of [`ComparisonService`]
#[derive(Debug, Clone)]
pub struct HttpComparisonClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpComparisonClient {
    pub fn new(settings: &ServiceSettings) -> ServiceResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.request_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: settings.api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL with any trailing slash removed
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

/// Error body the service sends alongside a 5xx
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    detail: Option<serde_json::Value>,
}

async fn check_status(response: reqwest::Response) -> ServiceResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|e| e.message.or_else(|| e.detail.map(|d| d.to_string())))
        .unwrap_or(body);
    Err(ServiceError::Status { status, message })
}

#[async_trait]
impl ComparisonService for HttpComparisonClient {
    async fn run_test(&self, request: &RunTestRequest) -> ServiceResult<ComparisonResult> {
        let url = self.endpoint("run-test");
        debug!(%url, website = %request.website_url, "submitting run");

        let response = self.http.post(&url).json(request).send().await?;
        let bytes = check_status(response).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn store_differences(&self, differences: &[Difference]) -> ServiceResult<()> {
        let url = self.endpoint("store-differences");
        debug!(%url, count = differences.len(), "storing differences");

        let response = self
            .http
            .post(&url)
            .json(&StoreDifferencesRequest { differences })
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    fn report_url(&self) -> String {
        self.endpoint("generate-pdf")
    }

    async fn ping(&self) -> ServiceResult<bool> {
        let response = self.http.get(self.endpoint("ping")).send().await?;
        Ok(response.status().is_success())
    }
}
