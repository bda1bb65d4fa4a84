//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use canopy_core::catalog::Product;
use canopy_core::{Email, ProductId};

use crate::db::BackorderRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::OptionalUser;
use crate::models::CurrentUser;
use crate::state::AppState;

/// Breadcrumb link for templates.
#[derive(Clone)]
pub struct CrumbView {
    pub name: String,
    pub href: String,
}

/// Label/value pair for the product details table.
#[derive(Clone)]
pub struct SpecView {
    pub label: &'static str,
    pub value: String,
}

/// Product detail display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub price: String,
    pub pack_unit: String,
    pub package_quantity: Option<u32>,
    pub price_per_item: Option<String>,
    pub brand: Option<String>,
    pub brand_href: Option<String>,
    pub breadcrumb: Vec<CrumbView>,
    pub specs: Vec<SpecView>,
    pub colors: Vec<String>,
    pub backordered: bool,
}

impl ProductView {
    fn new(product: &Product, brand: Option<&canopy_core::catalog::Brand>) -> Self {
        let mut specs = Vec::new();
        let mut push = |label: &'static str, value: Option<&String>| {
            if let Some(value) = value {
                specs.push(SpecView {
                    label,
                    value: value.clone(),
                });
            }
        };
        push("Strain", product.strain_label().as_ref());
        push("THC", product.thc_content.as_ref());
        push("Weight", product.weight.as_ref().or(product.details.weight.as_ref()));
        push("Material", product.details.material.as_ref());
        push("Dimensions", product.details.dimensions.as_ref());

        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            description: product.description.clone(),
            image_url: product.image_url().to_string(),
            price: product.price.to_string(),
            pack_unit: product.pack_unit_label(),
            package_quantity: product.package_quantity,
            price_per_item: product.price_per_item().map(|p| p.to_string()),
            brand: brand.map(|b| b.name.clone()),
            brand_href: brand.map(|b| format!("/brands/{}", b.id)),
            breadcrumb: product
                .category_path
                .iter()
                .map(|crumb| CrumbView {
                    href: format!(
                        "/?{}",
                        url::form_urlencoded::Serializer::new(String::new())
                            .append_pair("category", &crumb.name)
                            .finish()
                    ),
                    name: crumb.name.clone(),
                })
                .collect(),
            specs,
            colors: product.details.color.clone(),
            backordered: product.backordered,
        }
    }
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub user: Option<CurrentUser>,
    pub product: ProductView,
}

/// Back-in-stock result fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/notify_result.html")]
pub struct NotifyResultTemplate {
    pub product_id: String,
    pub email: String,
    pub error: Option<String>,
}

/// Back-in-stock form data.
#[derive(Debug, Deserialize)]
pub struct NotifyForm {
    pub email: String,
}

/// Display product detail page.
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let catalog = state.catalog().catalog().await?;
    let product = catalog
        .product(&ProductId::new(id.clone()))
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    let brand = product.brand_id.as_ref().and_then(|b| catalog.brand(b));

    Ok(ProductShowTemplate {
        user,
        product: ProductView::new(product, brand),
    })
}

/// Record a back-in-stock request (HTMX).
///
/// Signed-in shoppers may leave the email blank to use their account email.
/// Asking twice for the same product is not an error.
#[instrument(skip(state, user, form))]
pub async fn notify(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    Path(id): Path<String>,
    Form(form): Form<NotifyForm>,
) -> Result<impl IntoResponse> {
    let product_id = ProductId::new(id);
    if state.catalog().product(&product_id).await?.is_none() {
        return Err(AppError::NotFound(format!("product {product_id}")));
    }

    let entered = form.email.trim();
    let email = match (entered.is_empty(), user) {
        (true, Some(user)) => user.email,
        _ => match Email::parse(entered) {
            Ok(email) => email,
            Err(e) => {
                return Ok(NotifyResultTemplate {
                    product_id: product_id.to_string(),
                    email: entered.to_string(),
                    error: Some(e.to_string()),
                });
            }
        },
    };

    let created = BackorderRepository::new(state.pool())
        .request(&product_id, &email)
        .await?;
    add_breadcrumb(
        "catalog",
        "Back-in-stock request",
        Some(&[("product_id", product_id.as_str())]),
    );
    tracing::info!(product_id = %product_id, created, "Back-in-stock request recorded");

    Ok(NotifyResultTemplate {
        product_id: product_id.to_string(),
        email: email.to_string(),
        error: None,
    })
}
