//! Catalogue domain: categories, products and filtering.

pub mod category;
pub mod filter;
pub mod product;

pub use category::{
    Category, CategoryCrumb, CategoryHierarchy, CategoryNode, build_hierarchy, is_descendant_of,
    subcategories_of,
};
pub use filter::{CategoryBadge, ProductFilter, filter_products, matches_category, matches_text};
pub use product::{Brand, PLACEHOLDER_IMAGE_URL, Product, ProductDetails, capitalize};
