//! Email-code login and the checkout entry points.

use reqwest::StatusCode;

use canopy_integration_tests::{TestApp, VALID_CODE, running_storefront_url};

#[tokio::test]
async fn test_checkout_requires_login() {
    let app = TestApp::spawn().await;

    let resp = app.get("/checkout").send().await.expect("checkout");
    assert!(resp.status().is_redirection());
    assert_eq!(resp.headers()["location"], "/auth/login");

    let resp = app.hx_get("/checkout").send().await.expect("checkout htmx");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers()["hx-redirect"], "/auth/login");
}

#[tokio::test]
async fn test_email_code_login_and_logout() {
    let app = TestApp::spawn().await;

    let body = app
        .hx_post("/auth/code", &[("email", "not-an-email")])
        .send()
        .await
        .expect("bad email")
        .text()
        .await
        .expect("body");
    assert!(body.contains("form-error"));

    let body = app
        .hx_post("/auth/code", &[("email", "Buyer@Store.com")])
        .send()
        .await
        .expect("code")
        .text()
        .await
        .expect("body");
    assert!(body.contains("We sent a 6-digit code"));
    // Only the domain is case-folded
    assert!(body.contains("Buyer@store.com"));

    let body = app
        .hx_post("/auth/verify", &[("code", "12345")])
        .send()
        .await
        .expect("short code")
        .text()
        .await
        .expect("body");
    assert!(body.contains("must be 6 digits"));

    let resp = app
        .hx_post("/auth/verify", &[("code", VALID_CODE)])
        .send()
        .await
        .expect("verify");
    assert_eq!(resp.headers()["hx-redirect"], "/");

    let home = app.get("/").send().await.expect("home").text().await.expect("body");
    assert!(home.contains("Buyer@store.com"));
    assert!(home.contains("Sign out"));

    let resp = app.hx_post("/auth/logout", &[]).send().await.expect("logout");
    assert_eq!(resp.headers()["hx-redirect"], "/");
    let home = app.get("/").send().await.expect("home").text().await.expect("body");
    assert!(home.contains("Sign in"));
}

#[tokio::test]
async fn test_rejected_code_stays_on_code_step() {
    let app = TestApp::spawn().await;
    app.hx_post("/auth/code", &[("email", "buyer@store.com")])
        .send()
        .await
        .expect("code");

    let body = app
        .hx_post("/auth/verify", &[("code", "654321")])
        .send()
        .await
        .expect("verify")
        .text()
        .await
        .expect("body");
    assert!(body.contains("verification code rejected"));
    assert!(body.contains("name=\"code\""));
}

#[tokio::test]
async fn test_verify_without_pending_login() {
    let app = TestApp::spawn().await;
    let body = app
        .hx_post("/auth/verify", &[("code", VALID_CODE)])
        .send()
        .await
        .expect("verify")
        .text()
        .await
        .expect("body");
    assert!(body.contains("no login in progress"));
    assert!(body.contains("name=\"email\""));
}

#[tokio::test]
async fn test_login_with_cart_goes_to_checkout() {
    let app = TestApp::spawn().await;
    app.hx_post("/cart/add", &[("product_id", "p-og")])
        .send()
        .await
        .expect("add");
    app.hx_post("/auth/code", &[("email", "buyer@store.com")])
        .send()
        .await
        .expect("code");

    let resp = app
        .hx_post("/auth/verify", &[("code", VALID_CODE)])
        .send()
        .await
        .expect("verify");
    assert_eq!(resp.headers()["hx-redirect"], "/checkout");

    // The cart survives the session id change on login
    let count = app.hx_get("/cart/count").send().await.expect("count").text().await.expect("body");
    assert!(count.contains(">1</span>"));
}

#[tokio::test]
async fn test_auth_endpoints_are_rate_limited() {
    let app = TestApp::spawn().await;
    let mut limited = false;
    for _ in 0..10 {
        let resp = app
            .hx_post("/auth/code", &[("email", "not-an-email")])
            .send()
            .await
            .expect("code");
        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            limited = true;
            break;
        }
    }
    assert!(limited);
}

#[tokio::test]
#[ignore = "Requires a running storefront, database and Supabase project"]
async fn test_running_storefront_login_page() {
    let base_url = running_storefront_url();
    let resp = reqwest::get(format!("{base_url}/auth/login")).await.expect("login");
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.expect("body").contains("Email me a code"));
}
