//! The shopping cart aggregate.
//!
//! A [`Cart`] is a plain value held in the shopper's session. Every mutation
//! is total and returns a [`CartEvent`] describing what changed, so the web
//! layer decides how to present it (toast, drawer, badge refresh).
//! Totals are derived on demand and never stored.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::types::{ProductId, format_usd};

/// One product and how many of it the shopper wants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: Product,
    /// Always at least 1.
    pub quantity: u32,
}

impl CartLine {
    /// Unrounded `price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price.times(self.quantity)
    }
}

/// Totals derived from the cart's lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartSnapshot {
    pub item_count: u32,
    /// Unrounded; format with [`CartSnapshot::total_display`].
    pub total_price: Decimal,
}

impl CartSnapshot {
    #[must_use]
    pub fn total_display(&self) -> String {
        format_usd(self.total_price)
    }
}

/// What a cart mutation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    /// `quantity` units were added; the line now holds `line_quantity`.
    Added {
        product_id: ProductId,
        name: String,
        quantity: u32,
        line_quantity: u32,
    },
    Removed {
        product_id: ProductId,
        name: String,
    },
    QuantityChanged {
        product_id: ProductId,
        quantity: u32,
    },
    Cleared,
    /// The request changed nothing.
    Unchanged,
}

impl CartEvent {
    #[must_use]
    pub const fn is_change(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// The shopper's cart: at most one line per product, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.product.id == product_id)
    }

    /// Add `quantity` of `product`, merging into an existing line.
    ///
    /// A zero quantity is ignored. Merged quantities saturate at `u32::MAX`.
    pub fn add(&mut self, product: Product, quantity: u32) -> CartEvent {
        if quantity == 0 {
            return CartEvent::Unchanged;
        }

        let product_id = product.id.clone();
        let name = product.name.clone();

        let line_quantity = if let Some(line) = self.lines.iter_mut().find(|l| l.product.id == product_id) {
            line.quantity = line.quantity.saturating_add(quantity);
            line.quantity
        } else {
            self.lines.push(CartLine { product, quantity });
            quantity
        };

        CartEvent::Added {
            product_id,
            name,
            quantity,
            line_quantity,
        }
    }

    /// Remove the product's line. Absent products are ignored.
    pub fn remove(&mut self, product_id: &ProductId) -> CartEvent {
        let Some(pos) = self.lines.iter().position(|l| &l.product.id == product_id) else {
            return CartEvent::Unchanged;
        };
        let line = self.lines.remove(pos);
        CartEvent::Removed {
            product_id: line.product.id,
            name: line.product.name,
        }
    }

    /// Overwrite the product's quantity; zero removes the line.
    ///
    /// Products not already in the cart are ignored.
    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: u32) -> CartEvent {
        if quantity == 0 {
            return self.remove(product_id);
        }
        match self.lines.iter_mut().find(|l| &l.product.id == product_id) {
            Some(line) if line.quantity != quantity => {
                line.quantity = quantity;
                CartEvent::QuantityChanged {
                    product_id: product_id.clone(),
                    quantity,
                }
            }
            _ => CartEvent::Unchanged,
        }
    }

    /// Remove every line.
    pub fn clear(&mut self) -> CartEvent {
        if self.lines.is_empty() {
            return CartEvent::Unchanged;
        }
        self.lines.clear();
        CartEvent::Cleared
    }

    /// Derived totals, recomputed from the lines.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.lines
            .iter()
            .fold(CartSnapshot::default(), |acc, line| CartSnapshot {
                item_count: acc.item_count.saturating_add(line.quantity),
                total_price: acc.total_price + line.line_total(),
            })
    }
}
