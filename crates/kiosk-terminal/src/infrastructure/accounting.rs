//! Cash deposit submission to the terminal backend.
//!
//! One accepted note becomes one `POST <base_url><deposit_path>` carrying a
//! [`DepositCashRequest`].  Failures are reported to the caller, who logs
//! them; nothing is retried or queued.

use std::time::Duration;

use kiosk_core::DepositCashRequest;
use thiserror::Error;
use tracing::{debug, info};

/// Request timeout for the deposit endpoint.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Error type for deposit submission.
#[derive(Debug, Error)]
pub enum AccountingError {
    #[error("deposit endpoint is not configured")]
    NotConfigured,
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("deposit request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("deposit rejected with HTTP {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Posts accepted notes to the backend.
#[derive(Debug, Clone)]
pub struct HttpDepositClient {
    http: reqwest::Client,
    endpoint: String,
    terminal_id: String,
}

impl HttpDepositClient {
    /// Creates a client posting to `base_url` + `deposit_path`.
    ///
    /// # Errors
    ///
    /// [`AccountingError::NotConfigured`] when `base_url` is empty;
    /// [`AccountingError::Client`] when the TLS backend cannot initialise.
    pub fn new(
        base_url: &str,
        deposit_path: &str,
        terminal_id: impl Into<String>,
    ) -> Result<Self, AccountingError> {
        if base_url.trim().is_empty() {
            return Err(AccountingError::NotConfigured);
        }
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(AccountingError::Client)?;
        Ok(Self {
            http,
            endpoint: deposit_endpoint(base_url, deposit_path),
            terminal_id: terminal_id.into(),
        })
    }

    /// The full deposit URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Submits a single note of `amount`.
    pub async fn submit(&self, amount: u32) -> Result<(), AccountingError> {
        let body = DepositCashRequest::single_note(amount, self.terminal_id.clone());
        debug!(endpoint = %self.endpoint, ?body, "posting deposit");

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(AccountingError::Request)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AccountingError::Rejected { status, body });
        }
        info!(amount, %status, "deposit accepted by backend");
        Ok(())
    }
}

/// Joins base URL and path with exactly one slash between them.
pub fn deposit_endpoint(base_url: &str, deposit_path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        deposit_path.trim_start_matches('/')
    )
}
