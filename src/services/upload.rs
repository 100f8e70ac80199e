//! Bounded-retry request execution.
//!
//! Every network path in the pipeline goes through this one coordinator,
//! so retry semantics cannot drift between document types. Attempts are
//! strictly sequential within a call; separate calls are independent.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::api::{ApiError, ApiRequest, ApiTransport, RawResponse};

/// Attempt budget per call.
pub const MAX_RETRIES: u32 = 3;

/// Stand-in payload when a success status carries a non-JSON body.
const NON_JSON_SUCCESS_MESSAGE: &str = "Operation completed, but response was empty or non-JSON.";

enum Outcome {
    Done(Value),
    Retry(ApiError),
    Fatal(ApiError),
}

/// Executes backend requests with bounded retry and exponential backoff.
pub struct UploadCoordinator {
    transport: Arc<dyn ApiTransport>,
}

impl UploadCoordinator {
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        Self { transport }
    }

    /// Backoff before attempt `attempt` (0-indexed): nothing before the
    /// first attempt, then 2^attempt seconds.
    pub fn backoff_delay(attempt: u32) -> Duration {
        if attempt == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(2u64.pow(attempt) * 1000)
        }
    }

    /// Run a request to completion: up to [`MAX_RETRIES`] attempts, with
    /// the parsed JSON payload on success and the last error on
    /// exhaustion. Malformed failure bodies and business rejections end
    /// the call immediately.
    pub async fn execute(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        let mut last_error = ApiError::Transport("request was never attempted".to_string());

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = Self::backoff_delay(attempt);
                debug!(attempt, ?delay, url = %request.url, "backing off before retry");
                tokio::time::sleep(delay).await;
            }

            match self.transport.execute(request).await {
                Ok(raw) => match interpret(&raw) {
                    Outcome::Done(value) => return Ok(value),
                    Outcome::Fatal(error) => {
                        debug!(url = %request.url, %error, "fatal response, not retrying");
                        return Err(error);
                    }
                    Outcome::Retry(error) => {
                        warn!(attempt, url = %request.url, %error, "attempt failed");
                        last_error = error;
                    }
                },
                Err(error) => {
                    warn!(attempt, url = %request.url, %error, "transport error");
                    last_error = error;
                }
            }
        }

        Err(last_error)
    }
}

/// Classify one response. A failure status with a JSON body is worth
/// retrying; a failure status with junk in the body is not (the server
/// side is replying with an error page, not the API). A success status
/// wins immediately unless the body itself says the request was refused.
fn interpret(raw: &RawResponse) -> Outcome {
    match serde_json::from_str::<Value>(&raw.body) {
        Ok(value) => {
            if raw.is_success() {
                if let Some(message) = rejection_message(&value) {
                    Outcome::Fatal(ApiError::Rejected(message))
                } else {
                    Outcome::Done(value)
                }
            } else {
                let message =
                    error_message(&value).unwrap_or_else(|| format!("HTTP {}", raw.status));
                Outcome::Retry(ApiError::Http {
                    status: raw.status,
                    message,
                })
            }
        }
        Err(_) => {
            if raw.is_success() {
                Outcome::Done(serde_json::json!({
                    "success": true,
                    "message": NON_JSON_SUCCESS_MESSAGE,
                }))
            } else {
                Outcome::Fatal(ApiError::Malformed {
                    status: raw.status,
                    snippet: raw.snippet(),
                })
            }
        }
    }
}

/// A refusal carried inside a 2xx body, in either envelope dialect.
fn rejection_message(value: &Value) -> Option<String> {
    let object = value.as_object()?;
    if object.get("success") == Some(&Value::Bool(false)) {
        return Some(
            error_message(value).unwrap_or_else(|| "request failed on server".to_string()),
        );
    }
    if let Some(Value::String(status)) = object.get("status") {
        if status != "success" {
            return Some(
                error_message(value).unwrap_or_else(|| "request failed on server".to_string()),
            );
        }
    }
    None
}

fn error_message(value: &Value) -> Option<String> {
    let object = value.as_object()?;
    for key in ["message", "error"] {
        if let Some(Value::String(s)) = object.get(key) {
            if !s.is_empty() {
                return Some(s.clone());
            }
        }
    }
    None
}
