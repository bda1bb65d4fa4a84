//! Canopy Core - Domain types and storefront logic.
//!
//! This crate provides the pieces of the storefront that do not touch the
//! network or the database:
//! - `storefront` - Public-facing catalogue, cart and checkout (axum)
//! - `cli` - Command-line tools for migrations
//!
//! # Architecture
//!
//! The core crate contains only types, traits and pure functions - no I/O, no
//! database access, no HTTP clients. Everything here can be exercised from a
//! plain `#[test]`.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails and enums
//! - [`catalog`] - Products, categories, the category hierarchy and filtering
//! - [`cart`] - The cart aggregate and its derived snapshot
//! - [`checkout`] - The checkout form, cash-photo capture and order submission

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod types;

pub use types::*;
