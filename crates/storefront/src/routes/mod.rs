//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Catalogue (q=, category= repeated)
//! GET  /health                 - Health check
//!
//! # Products
//! GET  /products/{id}          - Product detail
//! POST /products/{id}/notify   - Back-in-stock request (HTMX)
//! GET  /brands                 - Brand listing
//! GET  /brands/{id}            - One brand's products (q=)
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart drawer (page without HTMX)
//! POST /cart/add               - Add to cart (returns count, triggers cart-updated)
//! POST /cart/update            - Update quantity (returns cart_items fragment)
//! POST /cart/remove            - Remove item (returns cart_items fragment)
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout (requires auth, HTMX fragments after the first load)
//! GET  /checkout                       - Checkout page
//! POST /checkout/address               - Add and select an address
//! POST /checkout/address/select        - Select an existing address
//! POST /checkout/fulfillment           - Choose fulfillment
//! POST /checkout/payment               - Choose payment
//! POST /checkout/cash-photo            - Camera capture (data URL)
//! POST /checkout/cash-photo/upload     - File picker fallback (multipart)
//! POST /checkout/cash-photo/clear      - Discard the photo to retake it
//! POST /checkout/submit                - Place the order
//! POST /checkout/cancel                - Abandon checkout
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/code              - Email a login code
//! POST /auth/verify            - Check the code and sign in
//! POST /auth/restart           - Use a different email
//! POST /auth/logout            - Logout action
//! ```

pub mod auth;
pub mod brands;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod products;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderMap,
    routing::{get, post},
};

use canopy_core::checkout::MAX_PHOTO_BYTES;

use crate::middleware::{auth_rate_limiter, upload_rate_limiter};
use crate::state::AppState;

/// Request body limit for photo routes: the photo plus base64 and form overhead.
const PHOTO_BODY_LIMIT: usize = MAX_PHOTO_BYTES * 2;

/// Whether the request was made by htmx (and wants a fragment back).
pub(crate) fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("HX-Request")
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/code", post(auth::request_code))
        .route("/verify", post(auth::verify))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/restart", post(auth::restart))
        .route("/logout", post(auth::logout))
        .merge(limited)
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(products::show))
        .route("/{id}/notify", post(products::notify))
}

/// Create the brand routes router.
pub fn brand_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(brands::index))
        .route("/{id}", get(brands::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    let photo = Router::new()
        .route("/cash-photo", post(checkout::capture_photo))
        .route("/cash-photo/upload", post(checkout::upload_photo))
        .layer(DefaultBodyLimit::max(PHOTO_BODY_LIMIT))
        .layer(upload_rate_limiter());

    Router::new()
        .route("/", get(checkout::show))
        .route("/address", post(checkout::add_address))
        .route("/address/select", post(checkout::select_address))
        .route("/fulfillment", post(checkout::set_fulfillment))
        .route("/payment", post(checkout::set_payment))
        .route("/cash-photo/clear", post(checkout::clear_photo))
        .route("/submit", post(checkout::submit))
        .route("/cancel", post(checkout::cancel))
        .merge(photo)
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Catalogue
        .route("/", get(catalog::index))
        .nest("/products", product_routes())
        .nest("/brands", brand_routes())
        // Cart and checkout
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        // Auth routes
        .nest("/auth", auth_routes())
}
