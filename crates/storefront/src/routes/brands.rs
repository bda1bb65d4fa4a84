//! Brand route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, RawQuery, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use canopy_core::BrandId;
use canopy_core::catalog::Brand;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::OptionalUser;
use crate::models::CurrentUser;
use crate::routes::catalog::{CatalogQuery, ProductCardView, ProductGridTemplate};
use crate::routes::is_htmx;
use crate::state::AppState;

/// Brand display data for templates.
#[derive(Clone)]
pub struct BrandView {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub product_count: usize,
}

impl BrandView {
    fn new(brand: &Brand, product_count: usize) -> Self {
        Self {
            id: brand.id.to_string(),
            name: brand.name.clone(),
            description: brand.description.clone(),
            logo_url: brand.logo.as_ref().map(ToString::to_string),
            product_count,
        }
    }
}

/// Brand listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "brands/index.html")]
pub struct BrandsIndexTemplate {
    pub user: Option<CurrentUser>,
    pub brands: Vec<BrandView>,
}

/// Brand detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "brands/show.html")]
pub struct BrandShowTemplate {
    pub user: Option<CurrentUser>,
    pub brand: BrandView,
    pub search: String,
    pub products: Vec<ProductCardView>,
    pub filtering: bool,
    pub clear_href: String,
}

/// Display all brands, alphabetically.
#[instrument(skip(state, user))]
pub async fn index(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
) -> Result<impl IntoResponse> {
    let catalog = state.catalog().catalog().await?;
    let mut brands: Vec<BrandView> = catalog
        .brands()
        .iter()
        .map(|brand| {
            let count = catalog
                .products()
                .iter()
                .filter(|p| p.brand_id.as_ref() == Some(&brand.id))
                .count();
            BrandView::new(brand, count)
        })
        .collect();
    brands.sort_by_key(|b| b.name.to_lowercase());

    Ok(BrandsIndexTemplate { user, brands })
}

/// Display one brand's products, optionally searched.
///
/// Category selections in the query string are ignored: brand pages only
/// offer text search.
#[instrument(skip(state, headers, user))]
pub async fn show(
    State(state): State<AppState>,
    headers: HeaderMap,
    OptionalUser(user): OptionalUser,
    Path(id): Path<String>,
    RawQuery(raw): RawQuery,
) -> Result<Response> {
    let catalog = state.catalog().catalog().await?;
    let brand_id = BrandId::new(id);
    let brand = catalog
        .brand(&brand_id)
        .ok_or_else(|| AppError::NotFound(format!("brand {brand_id}")))?;

    let query = CatalogQuery::parse(raw.as_deref());
    let filter = canopy_core::catalog::ProductFilter::new()
        .with_search(query.q)
        .with_brand(brand_id.clone());
    let products: Vec<ProductCardView> = catalog
        .search(&filter)
        .into_iter()
        .map(ProductCardView::from)
        .collect();
    let clear_href = format!("/brands/{brand_id}");

    if is_htmx(&headers) {
        return Ok(ProductGridTemplate {
            products,
            filtering: filter.is_active(),
            clear_href,
        }
        .into_response());
    }

    let total = catalog
        .products()
        .iter()
        .filter(|p| p.brand_id.as_ref() == Some(&brand_id))
        .count();

    Ok(BrandShowTemplate {
        user,
        brand: BrandView::new(brand, total),
        search: filter.search.clone(),
        products,
        filtering: filter.is_active(),
        clear_href,
    }
    .into_response())
}
