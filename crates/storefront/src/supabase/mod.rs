//! Supabase REST client for auth and storage.
//!
//! # Architecture
//!
//! - Catalogue tables are read straight from Postgres (see [`crate::db`]);
//!   this client only covers what Postgres cannot: GoTrue auth and Storage
//! - One shared `reqwest::Client` behind an `Arc`, cheap to clone
//! - No automatic retries; callers surface failures to the shopper
//!
//! # APIs
//!
//! ## Auth (`/auth/v1`)
//! - `request_login_code` - email a one-time code (`POST /otp`)
//! - `verify_login_code` - exchange the code for the user (`POST /verify`)
//!
//! ## Storage (`/storage/v1`)
//! - `upload_object` - store a cash photo (`POST /object/{bucket}/{path}`)
//! - `delete_object` - remove a discarded photo (`DELETE /object/{bucket}/{path}`)

mod auth;
mod storage;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::SupabaseConfig;

pub use auth::AuthUser;
pub use storage::photo_path;

/// Errors that can occur when talking to Supabase.
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Supabase answered with a non-success status.
    #[error("Supabase returned {status}: {message}")]
    Api { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint URL could not be built.
    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),

    /// Rate limited by Supabase.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

impl SupabaseError {
    /// Whether Supabase rejected the request itself (4xx other than 429).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status >= 400 && *status < 500)
    }
}

/// Client for the Supabase auth and storage APIs.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    client: reqwest::Client,
    config: SupabaseConfig,
}

impl SupabaseClient {
    /// Create a new Supabase client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &SupabaseConfig) -> Result<Self, SupabaseError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(SupabaseClientInner {
                client,
                config: config.clone(),
            }),
        })
    }

    fn config(&self) -> &SupabaseConfig {
        &self.inner.config
    }

    fn http(&self) -> &reqwest::Client {
        &self.inner.client
    }
}

/// Check the status of a Supabase response and return its body.
async fn read_body(response: reqwest::Response, what: &str) -> Result<String, SupabaseError> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60);
        return Err(SupabaseError::RateLimited(retry_after));
    }

    let body = response.text().await?;

    if !status.is_success() {
        let message = api_message(&body);
        if status.is_server_error() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Supabase {what} failed"
            );
        } else {
            tracing::warn!(status = %status, message = %message, "Supabase {what} rejected");
        }
        return Err(SupabaseError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(body)
}

/// Pull a human-readable message out of a Supabase error body.
///
/// GoTrue uses `msg` or `error_description`, Storage uses `message`.
fn api_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["msg", "error_description", "message", "error"] {
            if let Some(message) = value.get(key).and_then(serde_json::Value::as_str) {
                return message.to_string();
            }
        }
    }
    body.chars().take(200).collect()
}
