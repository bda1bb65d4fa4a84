//! Catalogue, product and brand pages against an in-process storefront.

use reqwest::StatusCode;

use canopy_integration_tests::{TestApp, running_storefront_url};

#[tokio::test]
async fn test_health_and_readiness() {
    let app = TestApp::spawn().await;

    let resp = app.get("/health").send().await.expect("health");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("body"), "ok");

    // The test pool points nowhere
    let resp = app.get("/health/ready").send().await.expect("ready");
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_pages_carry_security_headers_and_request_id() {
    let app = TestApp::spawn().await;
    let resp = app.get("/").send().await.expect("catalogue");

    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers();
    assert!(headers.contains_key("content-security-policy"));
    assert!(
        headers["permissions-policy"]
            .to_str()
            .expect("ascii")
            .contains("camera=(self)")
    );
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_catalogue_lists_everything_with_badges() {
    let app = TestApp::spawn().await;
    let body = app.get("/").send().await.expect("catalogue").text().await.expect("body");

    for name in ["OG Kush", "Sunset Pre-Roll", "Camino Gummies", "Kiva Bar"] {
        assert!(body.contains(name), "missing {name}");
    }
    for badge in ["Flower", "Pre-Rolls", "Edibles"] {
        assert!(body.contains(badge), "missing badge {badge}");
    }
    assert!(body.contains("$4.00 each"));
}

#[tokio::test]
async fn test_search_returns_matching_grid_fragment() {
    let app = TestApp::spawn().await;
    let body = app
        .hx_get("/?q=GUMM")
        .send()
        .await
        .expect("search")
        .text()
        .await
        .expect("body");

    assert!(body.contains("id=\"product-grid\""));
    assert!(!body.contains("<html"));
    assert!(body.contains("Camino Gummies"));
    assert!(!body.contains("OG Kush"));
}

#[tokio::test]
async fn test_category_drills_down_and_narrows() {
    let app = TestApp::spawn().await;

    let parent = app
        .hx_get("/?category=Flower")
        .send()
        .await
        .expect("flower")
        .text()
        .await
        .expect("body");
    assert!(parent.contains("OG Kush"));
    assert!(parent.contains("Sunset Pre-Roll"));
    assert!(!parent.contains("Camino Gummies"));

    let narrowed = app
        .hx_get("/?category=Flower&category=Pre-Rolls")
        .send()
        .await
        .expect("narrowed")
        .text()
        .await
        .expect("body");
    assert!(narrowed.contains("Sunset Pre-Roll"));
    assert!(!narrowed.contains("OG Kush"));
}

#[tokio::test]
async fn test_no_matches_offers_clear() {
    let app = TestApp::spawn().await;
    let body = app
        .hx_get("/?q=nothing-sells-this")
        .send()
        .await
        .expect("search")
        .text()
        .await
        .expect("body");

    assert!(body.contains("No products match your filters."));
    assert!(body.contains("Clear filters"));
}

#[tokio::test]
async fn test_product_page_and_missing_product() {
    let app = TestApp::spawn().await;

    let body = app
        .get("/products/p-preroll")
        .send()
        .await
        .expect("product")
        .text()
        .await
        .expect("body");
    assert!(body.contains("Sunset Pre-Roll"));
    assert!(body.contains("/?category=Flower"));
    assert!(body.contains("10 per case"));

    let resp = app.get("/products/nope").send().await.expect("missing");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.text().await.expect("body"), "Not found");
}

#[tokio::test]
async fn test_backordered_product_offers_notify_form() {
    let app = TestApp::spawn().await;
    let body = app
        .get("/products/p-bar")
        .send()
        .await
        .expect("product")
        .text()
        .await
        .expect("body");

    assert!(body.contains("/products/p-bar/notify"));
    assert!(!body.contains("action=\"/cart/add\""));
}

#[tokio::test]
async fn test_notify_rejects_invalid_email_without_storing() {
    let app = TestApp::spawn().await;
    let resp = app
        .hx_post("/products/p-bar/notify", &[("email", "not-an-email")])
        .send()
        .await
        .expect("notify");

    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("body");
    assert!(body.contains("aria-invalid"));
    assert!(body.contains("not-an-email"));
}

#[tokio::test]
async fn test_brand_pages() {
    let app = TestApp::spawn().await;

    let index = app.get("/brands").send().await.expect("brands").text().await.expect("body");
    assert!(index.contains("Kiva"));
    assert!(index.contains("2 products"));

    let brand = app
        .get("/brands/b-kiva")
        .send()
        .await
        .expect("brand")
        .text()
        .await
        .expect("body");
    assert!(brand.contains("Camino Gummies"));
    assert!(!brand.contains("OG Kush"));

    let searched = app
        .hx_get("/brands/b-kiva?q=bar")
        .send()
        .await
        .expect("brand search")
        .text()
        .await
        .expect("body");
    assert!(searched.contains("Kiva Bar"));
    assert!(!searched.contains("Camino Gummies"));

    let resp = app.get("/brands/nope").send().await.expect("missing");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires a running storefront with a populated catalogue"]
async fn test_running_storefront_serves_catalogue() {
    let base_url = running_storefront_url();
    let resp = reqwest::get(format!("{base_url}/")).await.expect("catalogue");
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.expect("body").contains("product-grid"));

    let resp = reqwest::get(format!("{base_url}/health/ready")).await.expect("ready");
    assert_eq!(resp.status(), StatusCode::OK);
}
