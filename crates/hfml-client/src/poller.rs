//! Long-running operation polling.
//!
//! A create-or-update `PUT` either finishes inline or returns a status URL:
//! `Azure-AsyncOperation` (a status document) or `Location` (`202` until
//! done). The poller follows whichever is present, sleeping for `Retry-After`
//! or the configured interval between polls, then reads the final resource.
//! An inline response still in a non-terminal `provisioningState` is followed
//! by polling the resource until that state settles. There is no overall
//! timeout.

use std::time::Duration;

use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::{MlClient, check};
use crate::errors::{ClientError, Result};

const ASYNC_OPERATION: &str = "azure-asyncoperation";

/// Status of a long-running operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationStatus {
    /// Not yet terminal (`InProgress`, `Creating`, `Updating`, ...).
    InProgress(String),
    /// Completed successfully.
    Succeeded,
    /// Completed with an error.
    Failed,
    /// Canceled by the service or another caller.
    Canceled,
}

impl OperationStatus {
    /// Parse a status string, case-insensitively.
    pub fn parse(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            "canceled" | "cancelled" => Self::Canceled,
            _ => Self::InProgress(status.to_string()),
        }
    }

    /// Whether polling should stop.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress(_))
    }

    fn label(&self) -> &str {
        match self {
            Self::InProgress(s) => s,
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Canceled => "Canceled",
        }
    }
}

#[derive(Deserialize)]
struct StatusDocument {
    #[serde(default)]
    status: String,
    #[serde(default)]
    error: Option<StatusError>,
}

#[derive(Deserialize)]
struct StatusError {
    #[serde(default)]
    message: Option<String>,
}

enum Monitor {
    AsyncOperation(String),
    Location(String),
    Done(Value),
}

/// Handle to an in-flight create-or-update.
pub struct Poller<'a> {
    client: &'a MlClient,
    resource_url: String,
    monitor: Monitor,
    delay: Duration,
}

impl<'a> Poller<'a> {
    pub(crate) async fn from_response(
        client: &'a MlClient,
        resource_url: String,
        resp: reqwest::Response,
    ) -> Result<Self> {
        let headers = resp.headers().clone();
        let delay = retry_after(&headers).unwrap_or(client.options().poll_interval);

        let monitor = if let Some(url) = header_str(&headers, ASYNC_OPERATION) {
            Monitor::AsyncOperation(url)
        } else if let Some(url) = header_str(&headers, LOCATION.as_str()) {
            Monitor::Location(url)
        } else {
            let text = resp.text().await?;
            let body = if text.trim().is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&text)?
            };
            Monitor::Done(body)
        };

        Ok(Self {
            client,
            resource_url,
            monitor,
            delay,
        })
    }

    /// Whether the service finished the operation inline.
    pub fn is_done(&self) -> bool {
        matches!(self.monitor, Monitor::Done(_))
    }

    /// Wait for completion and return the final resource.
    ///
    /// An inline response whose `provisioningState` is not terminal is
    /// followed by polling the resource itself.
    pub async fn wait(self) -> Result<Value> {
        match &self.monitor {
            Monitor::AsyncOperation(url) => self.poll_async_operation(url).await?,
            Monitor::Location(url) => self.poll_location(url).await?,
            Monitor::Done(body) => match provisioning_state(body) {
                Some(OperationStatus::InProgress(_)) => return self.poll_resource().await,
                Some(state @ (OperationStatus::Failed | OperationStatus::Canceled)) => {
                    return Err(provisioning_failed(&state));
                }
                _ => {}
            },
        }

        let resp = self
            .client
            .arm_request(Method::GET, &self.resource_url)
            .await?
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    async fn poll_resource(&self) -> Result<Value> {
        let mut delay = self.delay;
        loop {
            tokio::time::sleep(delay).await;
            let resp = self
                .client
                .arm_request(Method::GET, &self.resource_url)
                .await?
                .send()
                .await?;
            let resp = check(resp).await?;
            delay = retry_after(resp.headers()).unwrap_or(self.client.options().poll_interval);

            let body: Value = resp.json().await?;
            match provisioning_state(&body) {
                Some(OperationStatus::InProgress(state)) => {
                    debug!(status = %state, "resource still provisioning");
                }
                Some(state @ (OperationStatus::Failed | OperationStatus::Canceled)) => {
                    warn!(status = state.label(), "provisioning did not succeed");
                    return Err(provisioning_failed(&state));
                }
                _ => return Ok(body),
            }
        }
    }

    async fn poll_async_operation(&self, url: &str) -> Result<()> {
        let mut delay = self.delay;
        loop {
            tokio::time::sleep(delay).await;
            let resp = self.client.arm_request(Method::GET, url).await?.send().await?;
            let resp = check(resp).await?;
            delay = retry_after(resp.headers()).unwrap_or(self.client.options().poll_interval);

            let doc: StatusDocument = resp.json().await?;
            let status = OperationStatus::parse(&doc.status);
            debug!(status = status.label(), "operation status");
            match status {
                OperationStatus::Succeeded => return Ok(()),
                OperationStatus::Failed | OperationStatus::Canceled => {
                    let message = doc
                        .error
                        .and_then(|e| e.message)
                        .unwrap_or_else(|| "no error detail".to_string());
                    warn!(status = status.label(), message = %message, "operation did not succeed");
                    return Err(ClientError::OperationFailed {
                        status: status.label().to_string(),
                        message,
                    });
                }
                OperationStatus::InProgress(_) => {}
            }
        }
    }

    async fn poll_location(&self, url: &str) -> Result<()> {
        let mut delay = self.delay;
        loop {
            tokio::time::sleep(delay).await;
            let resp = self.client.arm_request(Method::GET, url).await?.send().await?;
            if resp.status() == StatusCode::ACCEPTED {
                delay = retry_after(resp.headers()).unwrap_or(self.client.options().poll_interval);
                debug!("operation still running");
                continue;
            }
            let _ = check(resp).await?;
            return Ok(());
        }
    }
}

fn provisioning_state(body: &Value) -> Option<OperationStatus> {
    body.pointer("/properties/provisioningState")
        .and_then(Value::as_str)
        .map(OperationStatus::parse)
}

fn provisioning_failed(state: &OperationStatus) -> ClientError {
    ClientError::OperationFailed {
        status: state.label().to_string(),
        message: "provisioning did not succeed".to_string(),
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// `Retry-After` in delta-seconds form.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
