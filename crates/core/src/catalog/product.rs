//! Products and brands.

use serde::{Deserialize, Serialize};
use url::Url;

use super::category::{CategoryCrumb, CategoryHierarchy};
use crate::types::{BrandId, CategoryId, Price, ProductId};

/// Image shown for products that have none.
pub const PLACEHOLDER_IMAGE_URL: &str = "https://images.pexels.com/photos/4068314/pexels-photo-4068314.jpeg?auto=compress&cs=tinysrgb&w=600";

/// A brand that products can belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    pub description: Option<String>,
    pub logo: Option<Url>,
}

/// Free-form physical details attached to a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub material: Option<String>,
    pub dimensions: Option<String>,
    pub weight: Option<String>,
    #[serde(default)]
    pub color: Vec<String>,
}

impl ProductDetails {
    /// Decode the backend's JSON details blob.
    ///
    /// Anything that is not a JSON object yields empty details, and fields of
    /// the wrong type are skipped individually.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };

        let text = |key: &str| {
            object
                .get(key)
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned)
        };

        let color = object
            .get("color")
            .and_then(serde_json::Value::as_array)
            .map(|colors| {
                colors
                    .iter()
                    .filter_map(serde_json::Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            material: text("material"),
            dimensions: text("dimensions"),
            weight: text("weight"),
            color,
        }
    }

    /// Whether there is nothing to show.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.material.is_none()
            && self.dimensions.is_none()
            && self.weight.is_none()
            && self.color.is_empty()
    }
}

/// A sellable catalogue item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    /// Product image; `None` renders [`PLACEHOLDER_IMAGE_URL`].
    pub image: Option<Url>,
    pub featured: bool,
    pub category_id: Option<CategoryId>,
    /// Name of the product's own category, filled from the hierarchy.
    pub category_name: Option<String>,
    /// Root-to-leaf breadcrumb ending at the product's own category.
    #[serde(default)]
    pub category_path: Vec<CategoryCrumb>,
    pub brand_id: Option<BrandId>,
    pub pack_unit: Option<String>,
    /// Items per pack. Always at least 1 when present.
    pub package_quantity: Option<u32>,
    pub inventory: Option<i32>,
    pub backordered: bool,
    pub strain_type: Option<String>,
    pub thc_content: Option<String>,
    pub weight: Option<String>,
    #[serde(default)]
    pub details: ProductDetails,
}

impl Product {
    /// A product with only the required fields set.
    #[must_use]
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: Price) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            price,
            image: None,
            featured: false,
            category_id: None,
            category_name: None,
            category_path: Vec::new(),
            brand_id: None,
            pack_unit: None,
            package_quantity: None,
            inventory: None,
            backordered: false,
            strain_type: None,
            thc_content: None,
            weight: None,
            details: ProductDetails::default(),
        }
    }

    /// Fill `category_name` and `category_path` from the hierarchy.
    ///
    /// A product whose category is unknown keeps no name and an empty path.
    pub fn resolve_category(&mut self, hierarchy: &CategoryHierarchy) {
        let Some(category_id) = &self.category_id else {
            return;
        };
        if let Some(category) = hierarchy.get(category_id) {
            self.category_name = Some(category.name.clone());
            self.category_path = hierarchy.category_path(category_id);
        }
    }

    /// Image URL to render.
    #[must_use]
    pub fn image_url(&self) -> &str {
        self.image.as_ref().map_or(PLACEHOLDER_IMAGE_URL, Url::as_str)
    }

    /// Price of one item inside the pack, if sold in packs of more than one.
    #[must_use]
    pub fn price_per_item(&self) -> Option<Price> {
        self.price.per_item(self.package_quantity)
    }

    /// Unit the price refers to, e.g. `box`, `case` or `single`.
    #[must_use]
    pub fn pack_unit_label(&self) -> String {
        match &self.pack_unit {
            Some(unit) if !unit.trim().is_empty() => unit.to_lowercase(),
            _ if self.package_quantity.is_some_and(|qty| qty > 1) => "case".to_string(),
            _ => "single".to_string(),
        }
    }

    /// Strain type with its first letter capitalised.
    #[must_use]
    pub fn strain_label(&self) -> Option<String> {
        self.strain_type.as_deref().map(capitalize)
    }

    /// Whether the product can be added to a cart.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        !self.backordered
    }
}

/// Uppercase the first character, leaving the rest untouched.
#[must_use]
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
