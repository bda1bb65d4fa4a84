//! Session-related types.
//!
//! Types stored in the session for authentication, cart and checkout state.

use serde::{Deserialize, Serialize};

use canopy_core::{Email, UserId};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Supabase auth user ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the shopper's cart.
    pub const CART: &str = "cart";

    /// Key for the in-progress checkout form.
    pub const CHECKOUT: &str = "checkout";

    /// Key for the email a login code was sent to.
    pub const LOGIN_EMAIL: &str = "login_email";
}
