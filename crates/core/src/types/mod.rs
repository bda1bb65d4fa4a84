//! Core types for the Canopy storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod methods;
pub mod price;

pub use email::{Email, EmailError};
pub use id::*;
pub use methods::{FulfillmentMethod, PaymentMethod};
pub use price::{Price, PriceError, format_usd};
