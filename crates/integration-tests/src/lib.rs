//! Integration test harness for the Canopy storefront.
//!
//! [`TestApp::spawn`] serves the real router on an ephemeral port with an
//! in-memory session store, a primed catalogue and a fake Supabase. The
//! database pool is lazy and points nowhere, so anything that reaches
//! Postgres fails; those tests are `#[ignore]`d and run against a real
//! server via `STOREFRONT_BASE_URL`.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests
//! cargo test -p canopy-integration-tests
//!
//! # Including tests that need a running storefront and database
//! STOREFRONT_BASE_URL=http://localhost:3000 cargo test -p canopy-integration-tests -- --ignored
//! ```

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use reqwest::{Client, RequestBuilder};
use secrecy::SecretString;
use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;
use tower_sessions::MemoryStore;
use url::Url;

use canopy_core::catalog::{Brand, Category, Product};
use canopy_core::{BrandId, CategoryId, Price};
use canopy_storefront::config::{StorefrontConfig, SupabaseConfig};
use canopy_storefront::db::CatalogRows;
use canopy_storefront::middleware::configure_session_layer;
use canopy_storefront::services::Catalog;
use canopy_storefront::state::AppState;

/// The one-time code the fake Supabase accepts.
pub const VALID_CODE: &str = "123456";

/// A storefront served in-process.
pub struct TestApp {
    pub base_url: String,
    /// Cookie-keeping client that does not follow redirects.
    pub client: Client,
}

impl TestApp {
    /// Serve the storefront with [`sample_catalog`] and [`fake_supabase`].
    pub async fn spawn() -> Self {
        Self::spawn_with(sample_catalog(), fake_supabase()).await
    }

    /// Serve the storefront with the given catalogue and Supabase stand-in.
    pub async fn spawn_with(catalog: Catalog, supabase: Router) -> Self {
        let supabase_addr = serve(supabase).await;
        let supabase_url = Url::parse(&format!("http://{supabase_addr}/")).expect("supabase url");
        let config = test_config(supabase_url);

        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://invalid@127.0.0.1:1/none")
            .expect("lazy pool");
        let state = AppState::new(config.clone(), pool).expect("app state");
        state.catalog().prime(catalog).await;

        let session_layer = configure_session_layer(MemoryStore::default(), &config);
        let addr = serve(canopy_storefront::app(state, session_layer)).await;

        let client = Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: format!("http://{addr}"),
            client,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET as a plain browser navigation.
    #[must_use]
    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    /// GET as htmx, asking for a fragment.
    #[must_use]
    pub fn hx_get(&self, path: &str) -> RequestBuilder {
        self.get(path).header("HX-Request", "true")
    }

    /// POST a form as htmx.
    #[must_use]
    pub fn hx_post(&self, path: &str, form: &[(&str, &str)]) -> RequestBuilder {
        self.client
            .post(self.url(path))
            .header("HX-Request", "true")
            .form(form)
    }
}

/// Serve `router` on an ephemeral local port.
async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("test server");
    });
    addr
}

/// Configuration pointing at `supabase_url`, with no Sentry.
#[must_use]
pub fn test_config(supabase_url: Url) -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://invalid@127.0.0.1:1/none"),
        host: IpAddr::from([127, 0, 0, 1]),
        port: 0,
        base_url: "http://127.0.0.1".to_string(),
        session_secret: SecretString::from("kR7#vQ2!pL9@xW4$mN8^zT1&bH6*cJ3%"),
        supabase: SupabaseConfig {
            url: supabase_url,
            anon_key: "anon".to_string(),
            service_role_key: SecretString::from("service-role"),
            photo_bucket: "cash-photos".to_string(),
        },
        catalog_cache_ttl: Duration::from_secs(300),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Supabase auth and storage stand-in.
///
/// Sends codes to anyone, accepts [`VALID_CODE`] and stores any object.
#[must_use]
pub fn fake_supabase() -> Router {
    Router::new()
        .route("/auth/v1/otp", post(|| async { Json(json!({})) }))
        .route(
            "/auth/v1/verify",
            post(|Json(body): Json<Value>| async move {
                if body["token"] == json!(VALID_CODE) {
                    (
                        StatusCode::OK,
                        Json(json!({
                            "access_token": "jwt",
                            "user": {"id": "0b6f-buyer", "email": body["email"]}
                        })),
                    )
                } else {
                    (
                        StatusCode::FORBIDDEN,
                        Json(json!({"code": 403, "msg": "Token has expired or is invalid"})),
                    )
                }
            }),
        )
        .route(
            "/storage/v1/object/{bucket}/{*path}",
            post(|| async { Json(json!({"Key": "ok"})) }).delete(|| async { StatusCode::OK }),
        )
}

/// A small catalogue:
///
/// ```text
/// Flower            OG Kush (featured)
///   Pre-Rolls       Sunset Pre-Roll (10 per case)
/// Edibles           Camino Gummies (Kiva), Kiva Bar (Kiva, backordered)
/// ```
#[must_use]
pub fn sample_catalog() -> Catalog {
    let categories = vec![
        Category::new("c-flower", "Flower", None),
        Category::new("c-preroll", "Pre-Rolls", Some(CategoryId::from("c-flower"))),
        Category::new("c-edibles", "Edibles", None),
    ];
    let brands = vec![Brand {
        id: BrandId::from("b-kiva"),
        name: "Kiva".to_string(),
        description: Some("Chocolate and gummies".to_string()),
        logo: None,
    }];

    let mut og = Product::new("p-og", "OG Kush", Price::from_cents(3500));
    og.category_id = Some(CategoryId::from("c-flower"));
    og.featured = true;
    og.strain_type = Some("hybrid".to_string());

    let mut preroll = Product::new("p-preroll", "Sunset Pre-Roll", Price::from_cents(4000));
    preroll.category_id = Some(CategoryId::from("c-preroll"));
    preroll.package_quantity = Some(10);

    let mut gummies = Product::new("p-gummies", "Camino Gummies", Price::from_cents(2400));
    gummies.category_id = Some(CategoryId::from("c-edibles"));
    gummies.brand_id = Some(BrandId::from("b-kiva"));

    let mut bar = Product::new("p-bar", "Kiva Bar", Price::from_cents(1800));
    bar.category_id = Some(CategoryId::from("c-edibles"));
    bar.brand_id = Some(BrandId::from("b-kiva"));
    bar.backordered = true;

    Catalog::from_rows(CatalogRows {
        products: vec![og, preroll, gummies, bar],
        categories,
        brands,
    })
}

/// Base URL of a separately running storefront, for `#[ignore]`d tests.
#[must_use]
pub fn running_storefront_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}
