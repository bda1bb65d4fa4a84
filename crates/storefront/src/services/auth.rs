//! Email one-time-code authentication.
//!
//! Identity lives in Supabase; the storefront only validates input, relays
//! the code exchange and keeps the resulting [`CurrentUser`] in the session.

use thiserror::Error;

use canopy_core::{Email, EmailError, UserId};

use crate::models::CurrentUser;
use crate::supabase::{SupabaseClient, SupabaseError};

/// Length of the emailed login code.
pub const CODE_LENGTH: usize = 6;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// The code is not six digits.
    #[error("verification code must be {CODE_LENGTH} digits")]
    InvalidCode,

    /// Supabase refused the code (wrong or expired).
    #[error("verification code rejected: {0}")]
    CodeRejected(String),

    /// Too many attempts.
    #[error("too many attempts, retry after {0} seconds")]
    RateLimited(u64),

    /// No login is in progress for this session.
    #[error("no login in progress")]
    NoPendingLogin,

    /// Supabase could not be reached or failed.
    #[error("auth backend error: {0}")]
    Backend(SupabaseError),
}

impl From<SupabaseError> for AuthError {
    fn from(err: SupabaseError) -> Self {
        match err {
            SupabaseError::RateLimited(secs) => Self::RateLimited(secs),
            other => Self::Backend(other),
        }
    }
}

/// Authentication service.
pub struct AuthService<'a> {
    supabase: &'a SupabaseClient,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(supabase: &'a SupabaseClient) -> Self {
        Self { supabase }
    }

    /// Validate the email and send it a login code.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` for a malformed address, and
    /// `AuthError::Backend` or `AuthError::RateLimited` if sending fails.
    pub async fn request_code(&self, email: &str) -> Result<Email, AuthError> {
        let email = Email::parse(email)?;
        self.supabase.request_login_code(&email).await?;
        tracing::info!(email_domain = %email.domain(), "Login code sent");
        Ok(email)
    }

    /// Check the code and return the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCode` if the code is not six digits and
    /// `AuthError::CodeRejected` if Supabase does not accept it.
    pub async fn verify_code(&self, email: &Email, code: &str) -> Result<CurrentUser, AuthError> {
        let code = normalize_code(code)?;
        let user = self
            .supabase
            .verify_login_code(email, &code)
            .await
            .map_err(|e| match e {
                SupabaseError::Api { status, message } if (400..500).contains(&status) => {
                    AuthError::CodeRejected(message)
                }
                other => AuthError::from(other),
            })?;

        let email = user
            .email
            .as_deref()
            .and_then(|e| Email::parse(e).ok())
            .unwrap_or_else(|| email.clone());

        Ok(CurrentUser {
            id: UserId::new(user.id),
            email,
        })
    }
}

/// Strip whitespace and require exactly six ASCII digits.
fn normalize_code(code: &str) -> Result<String, AuthError> {
    let code: String = code.chars().filter(|c| !c.is_whitespace()).collect();
    if code.len() == CODE_LENGTH && code.chars().all(|c| c.is_ascii_digit()) {
        Ok(code)
    } else {
        Err(AuthError::InvalidCode)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("123456").unwrap(), "123456");
        assert_eq!(normalize_code(" 123 456 ").unwrap(), "123456");
        assert!(matches!(normalize_code("12345"), Err(AuthError::InvalidCode)));
        assert!(matches!(normalize_code("1234567"), Err(AuthError::InvalidCode)));
        assert!(matches!(normalize_code("12a456"), Err(AuthError::InvalidCode)));
        assert!(matches!(normalize_code("１２３４５６"), Err(AuthError::InvalidCode)));
    }

    #[tokio::test]
    async fn test_verify_rejects_before_calling_backend() {
        let router = axum::Router::new().route(
            "/auth/v1/verify",
            axum::routing::post(|| async { axum::http::StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let client = crate::supabase::tests::client_for(router).await;
        let email = Email::parse("buyer@example.com").unwrap();

        let result = AuthService::new(&client).verify_code(&email, "12").await;
        assert!(matches!(result, Err(AuthError::InvalidCode)));
    }

    #[tokio::test]
    async fn test_rejected_code_maps_to_code_rejected() {
        let router = axum::Router::new().route(
            "/auth/v1/verify",
            axum::routing::post(|| async {
                (
                    axum::http::StatusCode::FORBIDDEN,
                    r#"{"msg":"Token has expired or is invalid"}"#,
                )
            }),
        );
        let client = crate::supabase::tests::client_for(router).await;
        let email = Email::parse("buyer@example.com").unwrap();

        let result = AuthService::new(&client).verify_code(&email, "654321").await;
        assert!(matches!(result, Err(AuthError::CodeRejected(msg)) if msg.contains("expired")));
    }

    #[test]
    fn test_rate_limit_maps_through() {
        assert!(matches!(
            AuthError::from(SupabaseError::RateLimited(30)),
            AuthError::RateLimited(30)
        ));
    }
}
