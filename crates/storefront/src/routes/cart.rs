//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! The cart itself lives in the session; each mutation reports a
//! [`CartEvent`] which is turned into `HX-Trigger` events for the page
//! (badge refresh, toast, opening the drawer).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tower_sessions::Session;
use tracing::instrument;

use canopy_core::ProductId;
use canopy_core::cart::{Cart, CartEvent, CartLine};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::OptionalUser;
use crate::models::{CurrentUser, keys};
use crate::routes::is_htmx;
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub product_id: String,
    pub name: String,
    pub image_url: String,
    pub pack_unit: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

impl From<&CartLine> for CartItemView {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product.id.to_string(),
            name: line.product.name.clone(),
            image_url: line.product.image_url().to_string(),
            pack_unit: line.product.pack_unit_label(),
            quantity: line.quantity,
            price: line.product.price.to_string(),
            line_price: canopy_core::format_usd(line.line_total()),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u32,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        let snapshot = cart.snapshot();
        Self {
            items: cart.lines().iter().map(CartItemView::from).collect(),
            subtotal: snapshot.total_display(),
            item_count: snapshot.item_count,
        }
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Get the cart from the session, or an empty one.
///
/// # Errors
///
/// Returns `AppError::Session` if the session store fails.
pub async fn load_cart(session: &Session) -> Result<Cart> {
    Ok(session.get::<Cart>(keys::CART).await?.unwrap_or_default())
}

/// Store the cart in the session.
///
/// # Errors
///
/// Returns `AppError::Session` if the session store fails.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<()> {
    session.insert(keys::CART, cart).await?;
    Ok(())
}

/// Build the `HX-Trigger` payload for a cart mutation.
///
/// Returns `None` when nothing changed, so the page is left alone.
#[must_use]
pub fn cart_triggers(event: &CartEvent, cart: &Cart) -> Option<String> {
    let count = cart.snapshot().item_count;
    let mut triggers = Map::new();
    triggers.insert("cart-updated".to_string(), json!({ "count": count }));

    match event {
        CartEvent::Unchanged => return None,
        CartEvent::Added { name, quantity, .. } => {
            triggers.insert(
                "show-toast".to_string(),
                json!({ "message": format!("Added {quantity} × {name} to your cart") }),
            );
            triggers.insert("open-cart".to_string(), Value::Null);
        }
        CartEvent::Removed { name, .. } => {
            triggers.insert(
                "show-toast".to_string(),
                json!({ "message": format!("Removed {name} from your cart") }),
            );
        }
        CartEvent::QuantityChanged { .. } | CartEvent::Cleared => {}
    }

    Some(header_json(&Value::Object(triggers)))
}

/// A toast-only trigger for requests that were refused.
fn error_trigger(message: &str) -> String {
    header_json(&json!({ "show-toast": { "message": message, "level": "error" } }))
}

/// Serialize JSON for a header value, escaping non-ASCII as `\uXXXX`.
///
/// Non-ASCII can only occur inside JSON strings, so the result is still
/// valid JSON and decodes to the same value.
#[must_use]
pub fn header_json(value: &Value) -> String {
    let raw = value.to_string();
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    out
}

/// Clamp a submitted quantity into the cart's range.
///
/// Zero and negative values become `0`, which the cart treats as a no-op
/// on add and as a removal on update. Huge values saturate.
#[must_use]
pub fn clamp_quantity(quantity: i64) -> u32 {
    u32::try_from(quantity.max(0)).unwrap_or(u32::MAX)
}

/// Attach the triggers for `event` (if any) to a response.
fn with_triggers(event: &CartEvent, cart: &Cart, body: impl IntoResponse) -> Response {
    match cart_triggers(event, cart) {
        Some(triggers) => (AppendHeaders([("HX-Trigger", triggers)]), body).into_response(),
        None => body.into_response(),
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub quantity: Option<i64>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: String,
    pub quantity: i64,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub user: Option<CurrentUser>,
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Display the cart: the drawer contents for HTMX, a full page otherwise.
#[instrument(skip(session, headers, user))]
pub async fn show(
    session: Session,
    headers: HeaderMap,
    OptionalUser(user): OptionalUser,
) -> Result<Response> {
    let cart = CartView::from(&load_cart(&session).await?);
    if is_htmx(&headers) {
        return Ok(CartItemsTemplate { cart }.into_response());
    }
    Ok(CartShowTemplate { user, cart }.into_response())
}

/// Add item to cart (HTMX).
///
/// Returns the new count badge and triggers `cart-updated`.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let product_id = ProductId::new(form.product_id);
    let product = state
        .catalog()
        .product(&product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;

    let mut cart = load_cart(&session).await?;
    if !product.is_available() {
        let count = cart.snapshot().item_count;
        return Ok((
            AppendHeaders([(
                "HX-Trigger",
                error_trigger(&format!("{} is backordered", product.name)),
            )]),
            CartCountTemplate { count },
        )
            .into_response());
    }

    let event = cart.add(product, form.quantity.map_or(1, clamp_quantity));
    if event.is_change() {
        save_cart(&session, &cart).await?;
        add_breadcrumb(
            "cart",
            "Added to cart",
            Some(&[("product_id", product_id.as_str())]),
        );
    }

    let count = cart.snapshot().item_count;
    Ok(with_triggers(&event, &cart, CartCountTemplate { count }))
}

/// Update cart item quantity (HTMX). Zero removes the line.
#[instrument(skip(session))]
pub async fn update(session: Session, Form(form): Form<UpdateCartForm>) -> Result<Response> {
    let product_id = ProductId::new(form.product_id);
    let mut cart = load_cart(&session).await?;
    let event = cart.update_quantity(&product_id, clamp_quantity(form.quantity));
    if event.is_change() {
        save_cart(&session, &cart).await?;
        add_breadcrumb(
            "cart",
            "Updated cart quantity",
            Some(&[("product_id", product_id.as_str())]),
        );
    }

    let view = CartView::from(&cart);
    Ok(with_triggers(&event, &cart, CartItemsTemplate { cart: view }))
}

/// Remove item from cart (HTMX).
#[instrument(skip(session))]
pub async fn remove(session: Session, Form(form): Form<RemoveFromCartForm>) -> Result<Response> {
    let product_id = ProductId::new(form.product_id);
    let mut cart = load_cart(&session).await?;
    let event = cart.remove(&product_id);
    if event.is_change() {
        save_cart(&session, &cart).await?;
        add_breadcrumb(
            "cart",
            "Removed from cart",
            Some(&[("product_id", product_id.as_str())]),
        );
    }

    let view = CartView::from(&cart);
    Ok(with_triggers(&event, &cart, CartItemsTemplate { cart: view }))
}

/// Get cart count badge (HTMX).
#[instrument(skip(session))]
pub async fn count(session: Session) -> Result<impl IntoResponse> {
    let count = load_cart(&session).await?.snapshot().item_count;
    Ok(CartCountTemplate { count })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use canopy_core::Price;
    use canopy_core::catalog::Product;

    use super::*;

    fn cart_with(qty: u32) -> (Cart, CartEvent) {
        let mut cart = Cart::new();
        let event = cart.add(Product::new("p1", "OG Kush", Price::from_cents(3500)), qty);
        (cart, event)
    }

    #[test]
    fn test_added_opens_drawer_with_toast() {
        let (cart, event) = cart_with(2);
        let triggers: Value = serde_json::from_str(&cart_triggers(&event, &cart).unwrap()).unwrap();
        assert_eq!(triggers["cart-updated"]["count"], json!(2));
        assert_eq!(
            triggers["show-toast"]["message"],
            json!("Added 2 × OG Kush to your cart")
        );
        assert!(triggers.get("open-cart").is_some());
    }

    #[test]
    fn test_quantity_change_only_refreshes() {
        let (mut cart, _) = cart_with(1);
        let event = cart.update_quantity(&ProductId::from("p1"), 5);
        let triggers: Value = serde_json::from_str(&cart_triggers(&event, &cart).unwrap()).unwrap();
        assert_eq!(triggers["cart-updated"]["count"], json!(5));
        assert!(triggers.get("show-toast").is_none());
    }

    #[test]
    fn test_header_json_is_ascii() {
        let value = json!({ "show-toast": { "message": "Added 1 × Crème Brûlée 🍮" } });
        let header = header_json(&value);
        assert!(header.is_ascii());
        assert_eq!(serde_json::from_str::<Value>(&header).unwrap(), value);
    }

    #[test]
    fn test_clamp_quantity() {
        assert_eq!(clamp_quantity(3), 3);
        assert_eq!(clamp_quantity(0), 0);
        assert_eq!(clamp_quantity(-3), 0);
        assert_eq!(clamp_quantity(i64::MIN), 0);
        assert_eq!(clamp_quantity(i64::MAX), u32::MAX);
    }

    #[test]
    fn test_non_positive_quantities() {
        let (mut cart, _) = cart_with(2);
        let product = cart.lines()[0].product.clone();
        assert_eq!(cart.add(product, clamp_quantity(-1)), CartEvent::Unchanged);
        assert_eq!(cart.snapshot().item_count, 2);

        let event = cart.update_quantity(&ProductId::from("p1"), clamp_quantity(-3));
        assert!(matches!(event, CartEvent::Removed { .. }));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_unchanged_sends_nothing() {
        let (mut cart, _) = cart_with(1);
        let event = cart.remove(&ProductId::from("missing"));
        assert!(cart_triggers(&event, &cart).is_none());
    }

    #[test]
    fn test_cart_view_totals() {
        let (mut cart, _) = cart_with(3);
        cart.add(Product::new("p2", "Gummies", Price::from_cents(1999)), 1);
        let view = CartView::from(&cart);
        assert_eq!(view.item_count, 4);
        assert_eq!(view.subtotal, "$124.99");
        assert_eq!(view.items[0].line_price, "$105.00");
    }
}
