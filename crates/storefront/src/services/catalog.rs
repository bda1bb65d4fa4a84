//! Cached catalogue snapshot.
//!
//! The whole catalogue (products, categories, brands) is small enough to hold
//! in memory, so it is loaded in one go, categories are resolved onto each
//! product, and the result is cached in `moka` for the configured TTL.
//! Filtering then runs over the snapshot without touching the database.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::{debug, instrument};

use canopy_core::catalog::{Brand, CategoryHierarchy, Product, ProductFilter};
use canopy_core::{BrandId, ProductId};

use crate::db::{CatalogRepository, CatalogRows, RepositoryError};

/// Cache key for catalogue data.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Catalog,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Catalog(Arc<Catalog>),
}

/// An immutable, fully resolved catalogue.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
    hierarchy: CategoryHierarchy,
    brands: Vec<Brand>,
}

impl Catalog {
    /// Build the hierarchy and resolve every product's category path.
    #[must_use]
    pub fn from_rows(rows: CatalogRows) -> Self {
        let hierarchy = CategoryHierarchy::build(&rows.categories);
        let mut products = rows.products;
        for product in &mut products {
            product.resolve_category(&hierarchy);
        }
        Self {
            products,
            hierarchy,
            brands: rows.brands,
        }
    }

    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    #[must_use]
    pub const fn hierarchy(&self) -> &CategoryHierarchy {
        &self.hierarchy
    }

    #[must_use]
    pub fn brands(&self) -> &[Brand] {
        &self.brands
    }

    #[must_use]
    pub fn product(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == id)
    }

    #[must_use]
    pub fn brand(&self, id: &BrandId) -> Option<&Brand> {
        self.brands.iter().find(|b| &b.id == id)
    }

    /// Products passing `filter`, in catalogue order.
    #[must_use]
    pub fn search(&self, filter: &ProductFilter) -> Vec<&Product> {
        filter.apply(&self.products, &self.hierarchy)
    }

    /// Featured products, falling back to the first few when none are flagged.
    #[must_use]
    pub fn featured(&self, limit: usize) -> Vec<&Product> {
        let featured: Vec<&Product> = self.products.iter().filter(|p| p.featured).take(limit).collect();
        if featured.is_empty() {
            self.products.iter().take(limit).collect()
        } else {
            featured
        }
    }
}

/// Loads and caches the catalogue.
#[derive(Clone)]
pub struct CatalogService {
    pool: PgPool,
    cache: Cache<CacheKey, CacheValue>,
}

impl CatalogService {
    /// Create a catalogue service whose snapshot lives for `ttl`.
    #[must_use]
    pub fn new(pool: PgPool, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(4).time_to_live(ttl).build();
        Self { pool, cache }
    }

    /// The current catalogue, loading it if the cache is cold.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the catalogue cannot be loaded.
    #[instrument(skip(self))]
    pub async fn catalog(&self) -> Result<Arc<Catalog>, RepositoryError> {
        if let Some(CacheValue::Catalog(catalog)) = self.cache.get(&CacheKey::Catalog).await {
            debug!("Cache hit for catalogue");
            return Ok(catalog);
        }

        let rows = CatalogRepository::new(&self.pool).load().await?;
        let catalog = Arc::new(Catalog::from_rows(rows));
        tracing::info!(
            products = catalog.products().len(),
            categories = catalog.hierarchy().len(),
            brands = catalog.brands().len(),
            "Catalogue loaded"
        );

        self.cache
            .insert(CacheKey::Catalog, CacheValue::Catalog(Arc::clone(&catalog)))
            .await;
        Ok(catalog)
    }

    /// A single product from the cached catalogue.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the catalogue cannot be loaded.
    pub async fn product(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.catalog().await?.product(id).cloned())
    }

    /// Replace the cached catalogue, e.g. to warm it at startup.
    pub async fn prime(&self, catalog: Catalog) {
        self.cache
            .insert(CacheKey::Catalog, CacheValue::Catalog(Arc::new(catalog)))
            .await;
    }

    /// Drop the cached catalogue so the next request reloads it.
    pub async fn invalidate(&self) {
        self.cache.invalidate(&CacheKey::Catalog).await;
    }
}
