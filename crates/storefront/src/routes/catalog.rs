//! Catalogue route handlers.
//!
//! The catalogue page filters the cached snapshot by free text and by any
//! number of category names. Filters live in the query string, so every
//! filtered view is a shareable URL, and htmx swaps just the product grid.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{RawQuery, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use canopy_core::catalog::{CategoryHierarchy, Product, ProductFilter};

use crate::error::Result;
use crate::filters;
use crate::middleware::OptionalUser;
use crate::models::CurrentUser;
use crate::routes::is_htmx;
use crate::state::AppState;

/// Product card display data for templates.
#[derive(Clone)]
pub struct ProductCardView {
    pub id: String,
    pub name: String,
    pub image_url: String,
    pub price: String,
    pub pack_unit: String,
    pub price_per_item: Option<String>,
    pub category: Option<String>,
    pub strain: Option<String>,
    pub backordered: bool,
}

impl From<&Product> for ProductCardView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            image_url: product.image_url().to_string(),
            price: product.price.to_string(),
            pack_unit: product.pack_unit_label(),
            price_per_item: product.price_per_item().map(|p| p.to_string()),
            category: product.category_name.clone(),
            strain: product.strain_label(),
            backordered: product.backordered,
        }
    }
}

/// One category toggle in the filter bar.
#[derive(Clone)]
pub struct CategoryBadgeView {
    pub name: String,
    pub selected: bool,
    /// Catalogue URL with this category toggled.
    pub href: String,
}

/// Catalogue query string: `q` once, `category` any number of times.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub q: String,
    pub categories: Vec<String>,
}

impl CatalogQuery {
    /// Parse a raw query string, ignoring unknown keys.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        let mut query = Self::default();
        for (key, value) in url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
            match key.as_ref() {
                "q" => query.q = value.trim().to_string(),
                "category" => query.categories.push(value.into_owned()),
                _ => {}
            }
        }
        query
    }

    /// The filter this query describes.
    #[must_use]
    pub fn filter(&self) -> ProductFilter {
        ProductFilter::new()
            .with_search(self.q.clone())
            .with_categories(self.categories.iter().cloned())
    }
}

/// Serialize a filter back into a catalogue URL.
#[must_use]
pub fn catalog_href(base: &str, filter: &ProductFilter) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    if !filter.search.is_empty() {
        query.append_pair("q", &filter.search);
    }
    for category in &filter.categories {
        query.append_pair("category", category);
    }
    let query = query.finish();
    if query.is_empty() {
        base.to_string()
    } else {
        format!("{base}?{query}")
    }
}

/// Category badges with toggle links for `filter`.
#[must_use]
pub fn badge_views(base: &str, filter: &ProductFilter, hierarchy: &CategoryHierarchy) -> Vec<CategoryBadgeView> {
    filter
        .badges(hierarchy)
        .into_iter()
        .map(|badge| {
            let mut toggled = filter.clone();
            toggled.toggle_category(&badge.name);
            CategoryBadgeView {
                href: catalog_href(base, &toggled),
                name: badge.name,
                selected: badge.selected,
            }
        })
        .collect()
}

/// Catalogue page template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/index.html")]
pub struct CatalogIndexTemplate {
    pub user: Option<CurrentUser>,
    pub search: String,
    pub badges: Vec<CategoryBadgeView>,
    pub products: Vec<ProductCardView>,
    pub featured: Vec<ProductCardView>,
    pub filtering: bool,
}

/// Product grid fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/product_grid.html")]
pub struct ProductGridTemplate {
    pub products: Vec<ProductCardView>,
    pub filtering: bool,
    pub clear_href: String,
}

/// Number of featured products above the grid.
const FEATURED_LIMIT: usize = 4;

/// Display the catalogue, filtered by the query string.
#[instrument(skip(state, headers, user))]
pub async fn index(
    State(state): State<AppState>,
    headers: HeaderMap,
    OptionalUser(user): OptionalUser,
    RawQuery(raw): RawQuery,
) -> Result<Response> {
    let catalog = state.catalog().catalog().await?;
    let filter = CatalogQuery::parse(raw.as_deref()).filter();

    let products: Vec<ProductCardView> = catalog
        .search(&filter)
        .into_iter()
        .map(ProductCardView::from)
        .collect();
    tracing::debug!(
        search = %filter.search,
        categories = filter.categories.len(),
        results = products.len(),
        "Catalogue filtered"
    );

    if is_htmx(&headers) {
        return Ok(ProductGridTemplate {
            products,
            filtering: filter.is_active(),
            clear_href: "/".to_string(),
        }
        .into_response());
    }

    Ok(CatalogIndexTemplate {
        user,
        search: filter.search.clone(),
        badges: badge_views("/", &filter, catalog.hierarchy()),
        featured: if filter.is_active() {
            Vec::new()
        } else {
            catalog
                .featured(FEATURED_LIMIT)
                .into_iter()
                .map(ProductCardView::from)
                .collect()
        },
        products,
        filtering: filter.is_active(),
    }
    .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use canopy_core::catalog::Category;
    use canopy_core::{CategoryId, Price};

    use super::*;

    #[test]
    fn test_parse_repeated_categories() {
        let query = CatalogQuery::parse(Some("q=+kush+&category=Flower&category=Pre-Rolls&page=2"));
        assert_eq!(query.q, "kush");
        assert_eq!(query.categories, ["Flower", "Pre-Rolls"]);
        assert_eq!(CatalogQuery::parse(None), CatalogQuery::default());
    }

    #[test]
    fn test_filter_drops_blank_and_duplicate_categories() {
        let query = CatalogQuery::parse(Some("category=Flower&category=&category=Flower"));
        assert_eq!(query.filter().categories, ["Flower"]);
    }

    #[test]
    fn test_catalog_href_round_trips_selection() {
        let filter = ProductFilter::new()
            .with_search("og kush")
            .with_categories(["Flower & Co"]);
        let href = catalog_href("/", &filter);
        assert_eq!(href, "/?q=og+kush&category=Flower+%26+Co");

        let parsed = CatalogQuery::parse(href.split_once('?').map(|(_, q)| q));
        assert_eq!(parsed.filter(), filter);
        assert_eq!(catalog_href("/brands/b1", &ProductFilter::new()), "/brands/b1");
    }

    #[test]
    fn test_badges_toggle_their_category() {
        let hierarchy = CategoryHierarchy::build(&[
            Category::new("c1", "Flower", None),
            Category::new("c2", "Edibles", None),
            Category::new("c3", "Indoor", Some(CategoryId::from("c1"))),
        ]);
        let filter = ProductFilter::new().with_categories(["Flower"]);
        let badges = badge_views("/", &filter, &hierarchy);

        let flower = badges.iter().find(|b| b.name == "Flower").unwrap();
        assert!(flower.selected);
        assert_eq!(flower.href, "/");

        let edibles = badges.iter().find(|b| b.name == "Edibles").unwrap();
        assert!(!edibles.selected);
        assert_eq!(edibles.href, "/?category=Flower&category=Edibles");
    }

    #[test]
    fn test_product_card_view() {
        let mut product = Product::new("p1", "Gummies", Price::from_cents(2400));
        product.package_quantity = Some(12);
        product.strain_type = Some("indica".to_string());
        let view = ProductCardView::from(&product);
        assert_eq!(view.price, "$24.00");
        assert_eq!(view.price_per_item.as_deref(), Some("$2.00"));
        assert_eq!(view.pack_unit, "case");
        assert_eq!(view.strain.as_deref(), Some("Indica"));
    }
}
