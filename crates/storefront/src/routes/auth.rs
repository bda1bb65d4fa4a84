//! Authentication route handlers.
//!
//! Shoppers sign in with an emailed one-time code: the first form asks for
//! an email and sends the code, the second checks it. The pending email is
//! kept in the session between the two steps.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use canopy_core::Email;

use crate::error::{AppError, Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalUser, clear_current_user, set_current_user};
use crate::models::{CurrentUser, keys};
use crate::routes::cart::load_cart;
use crate::routes::is_htmx;
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Email step form data.
#[derive(Debug, Deserialize)]
pub struct RequestCodeForm {
    pub email: String,
}

/// Code step form data.
#[derive(Debug, Deserialize)]
pub struct VerifyForm {
    pub code: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub user: Option<CurrentUser>,
    pub email: String,
    pub code_sent: bool,
    pub error: Option<String>,
}

/// Email step fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/login_email.html")]
pub struct LoginEmailTemplate {
    pub email: String,
    pub error: Option<String>,
}

/// Code step fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/login_code.html")]
pub struct LoginCodeTemplate {
    pub email: String,
    pub error: Option<String>,
}

/// Render one login step: the fragment for htmx, the page otherwise.
fn login_step(headers: &HeaderMap, email: String, code_sent: bool, error: Option<String>) -> Response {
    if !is_htmx(headers) {
        return LoginTemplate {
            user: None,
            email,
            code_sent,
            error,
        }
        .into_response();
    }
    if code_sent {
        LoginCodeTemplate { email, error }.into_response()
    } else {
        LoginEmailTemplate { email, error }.into_response()
    }
}

/// Send the browser to `path` after a form post.
fn redirect(headers: &HeaderMap, path: &'static str) -> Response {
    if is_htmx(headers) {
        [("HX-Redirect", path)].into_response()
    } else {
        Redirect::to(path).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the login page, or go home if already signed in.
pub async fn login_page(session: Session, OptionalUser(user): OptionalUser) -> Result<Response> {
    if user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let pending = session.get::<Email>(keys::LOGIN_EMAIL).await?;
    Ok(LoginTemplate {
        user: None,
        code_sent: pending.is_some(),
        email: pending.map(|e| e.to_string()).unwrap_or_default(),
        error: None,
    }
    .into_response())
}

/// Validate the email and send a login code.
///
/// Input problems and rate limits are shown on the form; backend failures
/// become error responses.
#[instrument(skip_all)]
pub async fn request_code(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<RequestCodeForm>,
) -> Result<Response> {
    match AuthService::new(state.supabase()).request_code(&form.email).await {
        Ok(email) => {
            session.insert(keys::LOGIN_EMAIL, &email).await?;
            add_breadcrumb("auth", "Login code requested", None);
            Ok(login_step(&headers, email.to_string(), true, None))
        }
        Err(e @ (AuthError::InvalidEmail(_) | AuthError::RateLimited(_))) => {
            let message = AppError::from(e).public_message();
            Ok(login_step(&headers, form.email.trim().to_string(), false, Some(message)))
        }
        Err(e) => Err(e.into()),
    }
}

/// Check the code and sign the shopper in.
///
/// Goes to checkout when the cart has items, home otherwise.
#[instrument(skip_all)]
pub async fn verify(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<VerifyForm>,
) -> Result<Response> {
    let Some(email) = session.get::<Email>(keys::LOGIN_EMAIL).await? else {
        let message = AppError::from(AuthError::NoPendingLogin).public_message();
        return Ok(login_step(&headers, String::new(), false, Some(message)));
    };

    let user = match AuthService::new(state.supabase())
        .verify_code(&email, &form.code)
        .await
    {
        Ok(user) => user,
        Err(e @ (AuthError::InvalidCode | AuthError::CodeRejected(_) | AuthError::RateLimited(_))) => {
            tracing::info!(error = %e, "Login code not accepted");
            let message = AppError::from(e).public_message();
            return Ok(login_step(&headers, email.to_string(), true, Some(message)));
        }
        Err(e) => return Err(e.into()),
    };

    set_current_user(&session, &user).await?;
    session.remove::<serde_json::Value>(keys::LOGIN_EMAIL).await?;
    session.remove::<serde_json::Value>(keys::CHECKOUT).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    add_breadcrumb("auth", "Signed in", None);
    tracing::info!(user_id = %user.id, "User signed in");

    let destination = if load_cart(&session).await?.is_empty() {
        "/"
    } else {
        "/checkout"
    };
    Ok(redirect(&headers, destination))
}

/// Start over with a different email.
pub async fn restart(session: Session, headers: HeaderMap) -> Result<Response> {
    session.remove::<serde_json::Value>(keys::LOGIN_EMAIL).await?;
    Ok(login_step(&headers, String::new(), false, None))
}

/// Sign out. The cart is kept.
pub async fn logout(session: Session, headers: HeaderMap) -> Result<Response> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    add_breadcrumb("auth", "Signed out", None);
    Ok(redirect(&headers, "/"))
}
