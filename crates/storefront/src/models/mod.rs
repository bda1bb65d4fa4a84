//! Domain models for storefront.
//!
//! Most domain types live in `canopy_core`; this module holds the few that
//! only make sense inside a web session.

pub mod session;

pub use session::{CurrentUser, keys};
