//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Email one-time-code sign-in via Supabase
//! - `catalog` - Cached catalogue snapshot and filtering
//! - `checkout` - Profile pre-fill, cash photo storage and order writes

pub mod auth;
pub mod catalog;
pub mod checkout;

pub use auth::{AuthError, AuthService};
pub use catalog::{Catalog, CatalogService};
pub use checkout::{CheckoutService, CheckoutServiceError};
