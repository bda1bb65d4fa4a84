//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use canopy_core::checkout::{CheckoutError, PhotoError};

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::checkout::CheckoutServiceError;
use crate::supabase::SupabaseError;

/// Message shown for failures the shopper can only retry.
const RETRY_MESSAGE: &str = "Something went wrong on our side. Please try again.";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Supabase auth or storage call failed.
    #[error("Supabase error: {0}")]
    Supabase(#[from] SupabaseError),

    /// Sign-in failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Checkout precondition not met.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Cash photo could not be decoded.
    #[error("Photo error: {0}")]
    Photo(#[from] PhotoError),

    /// Session store read or write failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CheckoutServiceError> for AppError {
    fn from(err: CheckoutServiceError) -> Self {
        match err {
            CheckoutServiceError::Checkout(e) => Self::Checkout(e),
            CheckoutServiceError::Repository(e) => Self::Database(e),
            CheckoutServiceError::Storage(e) => Self::Supabase(e),
        }
    }
}

impl AppError {
    /// Whether this is our fault rather than the shopper's.
    const fn is_server_error(&self) -> bool {
        match self {
            Self::Database(_) | Self::Supabase(_) | Self::Session(_) | Self::Internal(_) => true,
            Self::Auth(err) => matches!(err, AuthError::Backend(_)),
            _ => false,
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Supabase(SupabaseError::RateLimited(_))
            | Self::Auth(AuthError::RateLimited(_))
            | Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Supabase(_) | Self::Auth(AuthError::Backend(_)) => StatusCode::BAD_GATEWAY,
            Self::Auth(AuthError::CodeRejected(_)) => StatusCode::UNAUTHORIZED,
            Self::Auth(_) | Self::Photo(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Checkout(CheckoutError::NotAuthenticated) | Self::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Checkout(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    /// Message safe to show the shopper.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Supabase(SupabaseError::RateLimited(secs))
            | Self::Auth(AuthError::RateLimited(secs)) => {
                format!("Too many attempts. Please wait {secs} seconds and try again.")
            }
            _ if self.is_server_error() => RETRY_MESSAGE.to_string(),
            Self::Auth(err) => err.to_string(),
            Self::Checkout(err) => err.to_string(),
            Self::Photo(err) => err.to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        (self.status(), self.public_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_checkout_errors_are_client_errors() {
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::CashPhotoRequired)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::NotAuthenticated)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(get_status(AppError::Photo(PhotoError::Empty)), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Checkout(CheckoutError::CashPhotoRequired).public_message(),
            CheckoutError::CashPhotoRequired.to_string()
        );
    }

    #[test]
    fn test_backend_errors_hide_details() {
        let err = AppError::Supabase(SupabaseError::Api {
            status: 500,
            message: "relation \"secret\" does not exist".to_string(),
        });
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.public_message(), RETRY_MESSAGE);

        let err = AppError::Database(RepositoryError::DataCorruption("bad row".to_string()));
        assert_eq!(err.public_message(), RETRY_MESSAGE);
    }

    #[test]
    fn test_rate_limits_pass_through() {
        let err = AppError::Auth(AuthError::RateLimited(30));
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(err.public_message().contains("30 seconds"));
    }

    #[test]
    fn test_checkout_service_errors_convert() {
        let err: AppError = CheckoutServiceError::Checkout(CheckoutError::EmptyCart).into();
        assert!(matches!(err, AppError::Checkout(CheckoutError::EmptyCart)));
        let err: AppError = CheckoutServiceError::Repository(RepositoryError::NotFound).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
