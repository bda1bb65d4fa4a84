//! Checkout route handlers.
//!
//! The checkout form lives in the session next to the cart. Every step posts
//! one change; the handler applies it to the [`CheckoutForm`] and re-renders
//! the form fragment (htmx) or the whole page (no JavaScript). Validation
//! failures are shown inline on the form rather than as error pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use canopy_core::checkout::{
    CashPhoto, CheckoutForm, CheckoutStep, NewAddress, OrderSubmission, PhotoError,
};
use canopy_core::{AddressId, FulfillmentMethod, PaymentMethod, format_usd};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireUser;
use crate::models::{CurrentUser, keys};
use crate::routes::cart::{CartView, load_cart};
use crate::routes::is_htmx;
use crate::services::{CheckoutService, CheckoutServiceError};
use crate::state::AppState;

// =============================================================================
// View Models
// =============================================================================

/// Address option for templates.
#[derive(Clone)]
pub struct AddressView {
    pub id: String,
    pub company: Option<String>,
    pub one_line: String,
    pub is_default: bool,
    pub selected: bool,
}

/// Radio option for fulfillment and payment choices.
#[derive(Clone)]
pub struct ChoiceView {
    pub value: String,
    pub label: &'static str,
    pub hint: &'static str,
    pub selected: bool,
}

/// Attached cash photo for templates.
#[derive(Clone)]
pub struct PhotoView {
    pub format: String,
    pub size: usize,
    pub captured_at: String,
}

/// Checkout form display data for templates.
#[derive(Clone)]
pub struct CheckoutView {
    pub contact_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub addresses: Vec<AddressView>,
    pub fulfillment: Vec<ChoiceView>,
    pub payment: Vec<ChoiceView>,
    pub paying_cash: bool,
    pub photo: Option<PhotoView>,
    /// `address`, `fulfillment`, `payment`, `cash-photo` or `ready`.
    pub step: &'static str,
    pub ready: bool,
}

impl From<&CheckoutForm> for CheckoutView {
    fn from(form: &CheckoutForm) -> Self {
        let selected_address = form.selected_address().map(|a| a.id.clone());
        let step = form.step();

        Self {
            contact_name: form.contact().display_name(),
            email: form.contact().email.to_string(),
            phone: form.contact().phone.clone(),
            addresses: form
                .addresses()
                .iter()
                .map(|a| AddressView {
                    id: a.id.to_string(),
                    company: a.company.clone(),
                    one_line: a.one_line(),
                    is_default: a.is_default,
                    selected: selected_address.as_ref() == Some(&a.id),
                })
                .collect(),
            fulfillment: FulfillmentMethod::ALL
                .iter()
                .map(|m| ChoiceView {
                    value: m.to_string(),
                    label: m.label(),
                    hint: m.estimate(),
                    selected: form.fulfillment_method() == Some(*m),
                })
                .collect(),
            payment: PaymentMethod::ALL
                .iter()
                .map(|m| ChoiceView {
                    value: m.to_string(),
                    label: m.label(),
                    hint: m.description(),
                    selected: form.payment_method() == Some(*m),
                })
                .collect(),
            paying_cash: form.payment_method().is_some_and(PaymentMethod::requires_photo),
            photo: form.cash_photo().map(|p| PhotoView {
                format: p.format.extension().to_uppercase(),
                size: p.size,
                captured_at: p.captured_at.format("%b %-d, %Y %-I:%M %p UTC").to_string(),
            }),
            step: step_name(step),
            ready: step == CheckoutStep::ReadyToSubmit,
        }
    }
}

const fn step_name(step: CheckoutStep) -> &'static str {
    match step {
        CheckoutStep::AddressSelect => "address",
        CheckoutStep::FulfillmentSelect => "fulfillment",
        CheckoutStep::PaymentSelect => "payment",
        CheckoutStep::CashVerification => "cash-photo",
        CheckoutStep::ReadyToSubmit => "ready",
    }
}

/// Order line on the confirmation.
#[derive(Clone)]
pub struct OrderLineView {
    pub name: String,
    pub quantity: u32,
    pub line_price: String,
}

/// Submitted order display data for templates.
#[derive(Clone)]
pub struct OrderView {
    pub id: String,
    pub item_count: u32,
    pub total: String,
    pub fulfillment: &'static str,
    pub payment: &'static str,
    pub address: String,
    pub cash_photo: bool,
    pub lines: Vec<OrderLineView>,
}

impl From<&OrderSubmission> for OrderView {
    fn from(order: &OrderSubmission) -> Self {
        Self {
            id: order.id.to_string(),
            item_count: order.item_count,
            total: order.total_display(),
            fulfillment: order.fulfillment.label(),
            payment: order.payment.label(),
            address: order.address.one_line(),
            cash_photo: order.cash_photo.is_some(),
            lines: order
                .lines
                .iter()
                .map(|line| OrderLineView {
                    name: line.name.clone(),
                    quantity: line.quantity,
                    line_price: format_usd(line.line_total()),
                })
                .collect(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutPageTemplate {
    pub user: Option<CurrentUser>,
    pub checkout: CheckoutView,
    pub cart: CartView,
    pub error: Option<String>,
}

/// Checkout form fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/checkout_form.html")]
pub struct CheckoutFormTemplate {
    pub checkout: CheckoutView,
    pub cart: CartView,
    pub error: Option<String>,
}

/// Order confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/confirmation.html")]
pub struct ConfirmationPageTemplate {
    pub user: Option<CurrentUser>,
    pub order: OrderView,
}

/// Order confirmation fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/order_confirmation.html")]
pub struct ConfirmationTemplate {
    pub order: OrderView,
}

// =============================================================================
// Form Data
// =============================================================================

/// Address selection form data.
#[derive(Debug, Deserialize)]
pub struct SelectAddressForm {
    pub address_id: String,
}

/// Fulfillment or payment choice form data.
#[derive(Debug, Deserialize)]
pub struct MethodForm {
    pub method: String,
}

/// Camera capture form data.
#[derive(Deserialize)]
pub struct CapturedPhotoForm {
    /// `data:image/jpeg;base64,...` from the canvas.
    pub photo: String,
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Get the user's checkout form from the session, starting one if needed.
async fn load_form(state: &AppState, session: &Session, user: &CurrentUser) -> Result<CheckoutForm> {
    if let Some(form) = session.get::<CheckoutForm>(keys::CHECKOUT).await?
        && form.contact().email == user.email
    {
        return Ok(form);
    }

    let form = CheckoutService::new(state.pool(), state.supabase())
        .start(user)
        .await?;
    save_form(session, &form).await?;
    Ok(form)
}

async fn save_form(session: &Session, form: &CheckoutForm) -> Result<()> {
    session.insert(keys::CHECKOUT, form).await?;
    Ok(())
}

/// Render the form: the fragment for htmx, the full page otherwise.
async fn render(
    session: &Session,
    headers: &HeaderMap,
    user: CurrentUser,
    form: &CheckoutForm,
    error: Option<String>,
) -> Result<Response> {
    let cart = CartView::from(&load_cart(session).await?);
    let checkout = CheckoutView::from(form);

    if is_htmx(headers) {
        return Ok(CheckoutFormTemplate {
            checkout,
            cart,
            error,
        }
        .into_response());
    }
    Ok(CheckoutPageTemplate {
        user: Some(user),
        checkout,
        cart,
        error,
    }
    .into_response())
}

/// Save the form after a successful step, or turn a checkout error into an
/// inline message. Backend failures propagate.
async fn finish_step(
    session: &Session,
    form: &CheckoutForm,
    result: std::result::Result<(), AppError>,
) -> Result<Option<String>> {
    match result {
        Ok(()) => {
            save_form(session, form).await?;
            Ok(None)
        }
        Err(AppError::Checkout(e)) => Ok(Some(e.to_string())),
        Err(AppError::Photo(e)) => Ok(Some(e.to_string())),
        Err(e) => Err(e),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the checkout page.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireUser(user): RequireUser,
) -> Result<Response> {
    let form = load_form(&state, &session, &user).await?;
    add_breadcrumb("checkout", "Viewed checkout", None);
    render(&session, &headers, user, &form, None).await
}

/// Add a new shipping address and select it.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn add_address(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireUser(user): RequireUser,
    Form(address): Form<NewAddress>,
) -> Result<Response> {
    let mut form = load_form(&state, &session, &user).await?;
    let result = form.add_address(address).map(|_| ()).map_err(AppError::from);
    let error = finish_step(&session, &form, result).await?;
    render(&session, &headers, user, &form, error).await
}

/// Select one of the listed addresses.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn select_address(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireUser(user): RequireUser,
    Form(input): Form<SelectAddressForm>,
) -> Result<Response> {
    let mut form = load_form(&state, &session, &user).await?;
    let result = form
        .select_address(&AddressId::new(input.address_id))
        .map_err(AppError::from);
    let error = finish_step(&session, &form, result).await?;
    render(&session, &headers, user, &form, error).await
}

/// Choose standard or express fulfillment.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn set_fulfillment(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireUser(user): RequireUser,
    Form(input): Form<MethodForm>,
) -> Result<Response> {
    let method: FulfillmentMethod = input.method.parse().map_err(AppError::BadRequest)?;
    let mut form = load_form(&state, &session, &user).await?;
    form.set_fulfillment_method(method);
    save_form(&session, &form).await?;
    render(&session, &headers, user, &form, None).await
}

/// Choose the payment method. Leaving cash discards the cash photo.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn set_payment(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireUser(user): RequireUser,
    Form(input): Form<MethodForm>,
) -> Result<Response> {
    let method: PaymentMethod = input.method.parse().map_err(AppError::BadRequest)?;
    let mut form = load_form(&state, &session, &user).await?;
    CheckoutService::new(state.pool(), state.supabase())
        .set_payment_method(&mut form, method)
        .await;
    save_form(&session, &form).await?;
    add_breadcrumb(
        "checkout",
        "Chose payment method",
        Some(&[("method", &method.to_string())]),
    );
    render(&session, &headers, user, &form, None).await
}

/// Store a photo taken with the in-page camera.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn capture_photo(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireUser(user): RequireUser,
    Form(input): Form<CapturedPhotoForm>,
) -> Result<Response> {
    let mut form = load_form(&state, &session, &user).await?;
    let result = match CashPhoto::from_data_url(&input.photo) {
        Ok(photo) => attach(&state, &user, &mut form, photo).await,
        Err(e) => Err(AppError::Photo(e)),
    };
    let error = finish_step(&session, &form, result).await?;
    render(&session, &headers, user, &form, error).await
}

/// Store a photo chosen with the file picker (camera fallback).
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn upload_photo(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireUser(user): RequireUser,
    mut multipart: Multipart,
) -> Result<Response> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() == Some("photo") {
            let content_type = field.content_type().map(str::to_owned);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            upload = Some((content_type, bytes.to_vec()));
            break;
        }
    }

    let mut form = load_form(&state, &session, &user).await?;
    let result = match upload {
        None => Err(AppError::Photo(PhotoError::Empty)),
        Some((content_type, bytes)) => match CashPhoto::from_upload(content_type.as_deref(), bytes) {
            Ok(photo) => attach(&state, &user, &mut form, photo).await,
            Err(e) => Err(AppError::Photo(e)),
        },
    };
    let error = finish_step(&session, &form, result).await?;
    render(&session, &headers, user, &form, error).await
}

async fn attach(
    state: &AppState,
    user: &CurrentUser,
    form: &mut CheckoutForm,
    photo: CashPhoto,
) -> std::result::Result<(), AppError> {
    let receipt = CheckoutService::new(state.pool(), state.supabase())
        .attach_photo(user, form, photo)
        .await?;
    add_breadcrumb(
        "checkout",
        "Attached cash photo",
        Some(&[("path", receipt.path.as_str())]),
    );
    Ok(())
}

/// Discard the attached photo so it can be retaken.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn clear_photo(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireUser(user): RequireUser,
) -> Result<Response> {
    let mut form = load_form(&state, &session, &user).await?;
    if let Some(receipt) = form.clear_cash_photo() {
        save_form(&session, &form).await?;
        CheckoutService::new(state.pool(), state.supabase())
            .discard_photo(&receipt)
            .await;
    }
    render(&session, &headers, user, &form, None).await
}

/// Place the order.
///
/// On success the cart and checkout are cleared and the confirmation is
/// shown. An unmet precondition re-renders the form with the reason.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireUser(user): RequireUser,
) -> Result<Response> {
    let form = load_form(&state, &session, &user).await?;
    let cart = load_cart(&session).await?;

    let order = match CheckoutService::new(state.pool(), state.supabase())
        .submit(Some(&user), &form, &cart)
        .await
    {
        Ok(order) => order,
        Err(CheckoutServiceError::Checkout(e)) => {
            tracing::info!(reason = %e, "Checkout not ready");
            return render(&session, &headers, user, &form, Some(e.to_string())).await;
        }
        Err(e) => return Err(e.into()),
    };

    session.remove::<serde_json::Value>(keys::CHECKOUT).await?;
    session.remove::<serde_json::Value>(keys::CART).await?;
    add_breadcrumb(
        "checkout",
        "Order submitted",
        Some(&[("order_id", &order.id.to_string())]),
    );

    let view = OrderView::from(&order);
    if is_htmx(&headers) {
        return Ok((
            [("HX-Trigger", r#"{"cart-updated":{"count":0}}"#)],
            ConfirmationTemplate { order: view },
        )
            .into_response());
    }
    Ok(ConfirmationPageTemplate {
        user: Some(user),
        order: view,
    }
    .into_response())
}

/// Abandon checkout, keeping the cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireUser(user): RequireUser,
) -> Result<Response> {
    if let Some(form) = session.remove::<CheckoutForm>(keys::CHECKOUT).await?
        && let Some(receipt) = form.cash_photo()
    {
        CheckoutService::new(state.pool(), state.supabase())
            .discard_photo(receipt)
            .await;
    }
    add_breadcrumb("checkout", "Cancelled checkout", None);

    if is_htmx(&headers) {
        return Ok([("HX-Redirect", "/cart")].into_response());
    }
    Ok(Redirect::to("/cart").into_response())
}
