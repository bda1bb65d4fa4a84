//! Catalogue repository: products, categories and brands.
//!
//! These tables belong to the Supabase project and are read-only here. Rows
//! decode through typed row structs; a product row that fails validation is
//! skipped with a warning rather than failing the whole catalogue.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;
use url::Url;

use canopy_core::catalog::{Brand, Category, Product, ProductDetails};
use canopy_core::{BrandId, CategoryId, Price, ProductId};

use super::RepositoryError;

// =============================================================================
// Internal Row Types
// =============================================================================

const PRODUCT_COLUMNS: &str = r"
    p.id::text AS id,
    p.name,
    p.description,
    p.price,
    p.image,
    p.featured,
    p.brand_id::text AS brand_id,
    p.category_id::text AS category_id,
    p.thc_content,
    p.weight,
    p.package_quantity,
    p.type AS strain_type,
    p.details,
    pu.name AS pack_unit,
    p.backordered,
    p.inventory
";

/// Internal row type for product queries.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ProductRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image: Option<String>,
    pub featured: Option<bool>,
    pub brand_id: Option<String>,
    pub category_id: Option<String>,
    pub thc_content: Option<String>,
    pub weight: Option<String>,
    pub package_quantity: Option<i32>,
    pub strain_type: Option<String>,
    pub details: Option<serde_json::Value>,
    pub pack_unit: Option<String>,
    pub backordered: Option<bool>,
    pub inventory: Option<i32>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("product {}: {e}", row.id))
        })?;

        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            description: row.description.unwrap_or_default(),
            price,
            image: row.image.as_deref().and_then(parse_image_url),
            featured: row.featured.unwrap_or(false),
            category_id: row.category_id.map(CategoryId::new),
            category_name: None,
            category_path: Vec::new(),
            brand_id: row.brand_id.map(BrandId::new),
            pack_unit: non_blank(row.pack_unit),
            package_quantity: row
                .package_quantity
                .and_then(|qty| u32::try_from(qty).ok())
                .filter(|&qty| qty >= 1),
            inventory: row.inventory,
            backordered: row.backordered.unwrap_or(false),
            strain_type: non_blank(row.strain_type),
            thc_content: non_blank(row.thc_content),
            weight: non_blank(row.weight),
            details: row
                .details
                .as_ref()
                .map(ProductDetails::from_json)
                .unwrap_or_default(),
        })
    }
}

/// Internal row type for category queries.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct CategoryRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            name: row.name,
            description: non_blank(row.description),
            parent_id: row.parent_id.map(CategoryId::new),
        }
    }
}

/// Internal row type for brand queries.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct BrandRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub logo: Option<String>,
}

impl From<BrandRow> for Brand {
    fn from(row: BrandRow) -> Self {
        Self {
            id: BrandId::new(row.id),
            name: row.name,
            description: non_blank(row.description),
            logo: row.logo.as_deref().and_then(parse_image_url),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_image_url(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
        _ => {
            tracing::debug!(url = raw, "Ignoring unusable image URL");
            None
        }
    }
}

fn decode_products(rows: Vec<ProductRow>) -> Vec<Product> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            match Product::try_from(row) {
                Ok(product) => Some(product),
                Err(e) => {
                    tracing::warn!(product_id = %id, error = %e, "Skipping invalid product row");
                    None
                }
            }
        })
        .collect()
}

// =============================================================================
// Repository
// =============================================================================

/// Everything needed to render the catalogue.
#[derive(Debug, Clone, Default)]
pub struct CatalogRows {
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    pub brands: Vec<Brand>,
}

/// Repository for catalogue reads.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalogue repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load products, categories and brands concurrently.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any query fails.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<CatalogRows, RepositoryError> {
        let (products, categories, brands) = tokio::try_join!(
            self.list_products(),
            self.list_categories(),
            self.list_brands()
        )?;
        Ok(CatalogRows {
            products,
            categories,
            brands,
        })
    }

    /// All products ordered by name. Invalid rows are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS}
             FROM public.products p
             LEFT JOIN public.pack_units pu ON pu.id = p.pack_unit_id
             ORDER BY p.name"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(self.pool)
            .await?;
        Ok(decode_products(rows))
    }

    /// Every category, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            r"
            SELECT id::text AS id, name, description, parent_id::text AS parent_id
            FROM public.categories
            ORDER BY name
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    /// Every brand, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_brands(&self) -> Result<Vec<Brand>, RepositoryError> {
        let rows = sqlx::query_as::<_, BrandRow>(
            r"
            SELECT id::text AS id, name, description, logo
            FROM public.brands
            ORDER BY name
            ",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Brand::from).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row() -> ProductRow {
        ProductRow {
            id: "p1".to_string(),
            name: "Blue Dream 3.5g".to_string(),
            description: None,
            price: Decimal::new(3500, 2),
            image: Some("https://cdn.example.com/blue-dream.jpg".to_string()),
            featured: None,
            brand_id: Some("b1".to_string()),
            category_id: Some("c1".to_string()),
            thc_content: Some("22%".to_string()),
            weight: Some(" ".to_string()),
            package_quantity: Some(12),
            strain_type: Some("hybrid".to_string()),
            details: Some(json!({"material": "glass", "color": ["green", 7]})),
            pack_unit: Some("Box".to_string()),
            backordered: None,
            inventory: Some(40),
        }
    }

    #[test]
    fn test_product_row_decodes() {
        let product = Product::try_from(row()).unwrap();
        assert_eq!(product.id.as_str(), "p1");
        assert_eq!(product.description, "");
        assert_eq!(product.package_quantity, Some(12));
        assert_eq!(product.details.material.as_deref(), Some("glass"));
        assert_eq!(product.details.color, vec!["green".to_string()]);
        assert!(product.weight.is_none());
        assert!(!product.featured);
        assert!(!product.backordered);
        assert_eq!(product.brand_id, Some(BrandId::from("b1")));
    }

    #[test]
    fn test_negative_price_is_rejected() {
        let mut bad = row();
        bad.price = Decimal::new(-100, 2);
        assert!(matches!(
            Product::try_from(bad),
            Err(RepositoryError::DataCorruption(_))
        ));
    }

    #[test]
    fn test_package_quantity_below_one_is_dropped() {
        for qty in [0, -3] {
            let mut r = row();
            r.package_quantity = Some(qty);
            assert_eq!(Product::try_from(r).unwrap().package_quantity, None);
        }
    }

    #[test]
    fn test_malformed_details_default() {
        let mut r = row();
        r.details = Some(json!(["not", "an", "object"]));
        assert!(Product::try_from(r).unwrap().details.is_empty());
    }

    #[test]
    fn test_bad_image_url_falls_back() {
        let mut r = row();
        r.image = Some("not a url".to_string());
        let product = Product::try_from(r).unwrap();
        assert!(product.image.is_none());
        assert_eq!(product.image_url(), canopy_core::catalog::PLACEHOLDER_IMAGE_URL);

        assert!(parse_image_url("javascript:alert(1)").is_none());
        assert!(parse_image_url("").is_none());
    }

    #[test]
    fn test_decode_products_skips_invalid_rows() {
        let mut bad = row();
        bad.id = "p2".to_string();
        bad.price = Decimal::new(-1, 0);
        let products = decode_products(vec![row(), bad]);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id.as_str(), "p1");
    }

    #[test]
    fn test_category_row_blank_description() {
        let category = Category::from(CategoryRow {
            id: "c2".to_string(),
            name: "Edibles".to_string(),
            description: Some(String::new()),
            parent_id: Some("c1".to_string()),
        });
        assert!(category.description.is_none());
        assert_eq!(category.parent_id, Some(CategoryId::from("c1")));
    }
}
