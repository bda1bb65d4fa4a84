//! GoTrue email one-time-code login.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use canopy_core::Email;

use super::{SupabaseClient, SupabaseError, read_body};

/// The user returned by a successful code verification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Serialize)]
struct OtpRequest<'a> {
    email: &'a str,
    create_user: bool,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    email: &'a str,
    token: &'a str,
}

#[derive(Deserialize)]
struct VerifyResponse {
    user: AuthUser,
}

impl SupabaseClient {
    /// Email a one-time login code, creating the user on first sign-in.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError` if the request fails or is rejected.
    #[instrument(skip(self, email), fields(email_domain = %email.domain()))]
    pub async fn request_login_code(&self, email: &Email) -> Result<(), SupabaseError> {
        let url = self.config().endpoint("auth/v1/otp")?;
        let response = self
            .http()
            .post(url)
            .header("apikey", &self.config().anon_key)
            .json(&OtpRequest {
                email: email.as_str(),
                create_user: true,
            })
            .send()
            .await?;

        read_body(response, "login code request").await?;
        Ok(())
    }

    /// Exchange an emailed code for the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError::Api` with a 4xx status when the code is wrong
    /// or expired, and other variants for transport failures.
    #[instrument(skip(self, email, code), fields(email_domain = %email.domain()))]
    pub async fn verify_login_code(&self, email: &Email, code: &str) -> Result<AuthUser, SupabaseError> {
        let url = self.config().endpoint("auth/v1/verify")?;
        let response = self
            .http()
            .post(url)
            .header("apikey", &self.config().anon_key)
            .json(&VerifyRequest {
                kind: "email",
                email: email.as_str(),
                token: code,
            })
            .send()
            .await?;

        let body = read_body(response, "login code verification").await?;
        let parsed: VerifyResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "Failed to parse GoTrue verify response");
            SupabaseError::Parse(e)
        })?;
        Ok(parsed.user)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;
    use crate::supabase::tests::client_for;

    fn gotrue() -> Router {
        Router::new()
            .route(
                "/auth/v1/otp",
                post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                    assert_eq!(headers.get("apikey").unwrap(), "anon");
                    assert_eq!(body["create_user"], json!(true));
                    Json(json!({}))
                }),
            )
            .route(
                "/auth/v1/verify",
                post(|Json(body): Json<Value>| async move {
                    assert_eq!(body["type"], json!("email"));
                    if body["token"] == json!("123456") {
                        (
                            StatusCode::OK,
                            Json(json!({
                                "access_token": "jwt",
                                "user": {"id": "8d0c-user", "email": body["email"]}
                            })),
                        )
                    } else {
                        (
                            StatusCode::FORBIDDEN,
                            Json(json!({"code": 403, "msg": "Token has expired or is invalid"})),
                        )
                    }
                }),
            )
    }

    #[tokio::test]
    async fn test_request_and_verify_code() {
        let client = client_for(gotrue()).await;
        let email = Email::parse("buyer@example.com").unwrap();

        client.request_login_code(&email).await.unwrap();
        let user = client.verify_login_code(&email, "123456").await.unwrap();
        assert_eq!(user.id, "8d0c-user");
        assert_eq!(user.email.as_deref(), Some("buyer@example.com"));
    }

    #[tokio::test]
    async fn test_wrong_code_is_client_error() {
        let client = client_for(gotrue()).await;
        let email = Email::parse("buyer@example.com").unwrap();

        let err = client.verify_login_code(&email, "000000").await.unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("Token has expired"));
    }
}
