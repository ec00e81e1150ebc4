//! Integration tests for the ordering-session bootstrap against a mock
//! commerce API.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::time::Duration;

use crave_core::{CartId, LocationId};
use crave_integration_tests::TestContext;
use crave_storefront::commerce::{CommerceApi, CommerceClient};
use crave_storefront::config::CommerceApiConfig;
use crave_storefront::session::{OrderingSession, SessionStatus};
use secrecy::SecretString;
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, token: Option<String>) -> CommerceClient {
    let config = CommerceApiConfig {
        base_url: Url::parse(&format!("{}/", server.uri())).unwrap(),
        api_key: SecretString::from("ck_7Hq2Wz9Lm4Xp1Rt8"),
        cache_ttl: Duration::from_secs(60),
    };
    CommerceClient::new(&config, token).unwrap()
}

fn downtown() -> LocationId {
    LocationId::new("downtown")
}

// =============================================================================
// Fresh visitor
// =============================================================================

#[tokio::test]
async fn test_new_visitor_gets_cart_and_binding_is_stored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/locations/downtown/ordering-session"))
        .and(body_partial_json(serde_json::json!({
            "searchParams": { "table": "12" },
            "existingCartId": null
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "cartId": "cart-1" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let ctx = TestContext::new();
    let mut session = OrderingSession::new(ctx.gateway());
    let params = BTreeMap::from([("table".to_string(), "12".to_string())]);

    let status = session
        .bootstrap(&client(&server, None), &downtown(), params)
        .await;

    assert_eq!(status, SessionStatus::Resolved);
    assert_eq!(session.cart_id(), Some(&CartId::new("cart-1")));

    // A new process sees the binding.
    let stored = ctx.gateway().load_session(&downtown()).unwrap();
    assert_eq!(stored.cart_id, CartId::new("cart-1"));
}

// =============================================================================
// Returning visitor
// =============================================================================

#[tokio::test]
async fn test_returning_visitor_sends_stored_cart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({ "existingCartId": "cart-1" })))
        .and(header("authorization", "Bearer tok_visitor"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "cartId": "cart-1" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let ctx = TestContext::new();
    ctx.gateway().save_session(&downtown(), &CartId::new("cart-1"));
    ctx.gateway().set_auth_token("tok_visitor");
    ctx.advance(Duration::from_secs(12 * 3600));

    let api = client(&server, ctx.gateway().auth_token());
    let mut session = OrderingSession::new(ctx.gateway());
    session.bootstrap(&api, &downtown(), BTreeMap::new()).await;

    // The reply refreshed the 24 hour window.
    ctx.advance(Duration::from_secs(20 * 3600));
    assert!(ctx.gateway().load_session(&downtown()).is_some());
}

#[tokio::test]
async fn test_expired_binding_is_not_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({ "existingCartId": null })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "cartId": "cart-2" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let ctx = TestContext::new();
    ctx.gateway().save_session(&downtown(), &CartId::new("cart-1"));
    ctx.advance(Duration::from_secs(24 * 3600 + 60));

    let mut session = OrderingSession::new(ctx.gateway());
    session
        .bootstrap(&client(&server, None), &downtown(), BTreeMap::new())
        .await;
    assert_eq!(session.cart_id(), Some(&CartId::new("cart-2")));
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_soft_error_is_a_notice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "errorMessage": "Ordering is paused" })),
        )
        .mount(&server)
        .await;

    let ctx = TestContext::new();
    let mut session = OrderingSession::new(ctx.gateway());
    let status = session
        .bootstrap(&client(&server, None), &downtown(), BTreeMap::new())
        .await;

    assert_eq!(status, SessionStatus::Resolved);
    assert_eq!(session.cart_id(), None);
    assert_eq!(session.notice(), Some("Ordering is paused"));
    assert!(session.error().is_none());
}

#[tokio::test]
async fn test_backend_failure_keeps_stored_binding() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = TestContext::new();
    ctx.gateway().save_session(&downtown(), &CartId::new("cart-1"));

    let mut session = OrderingSession::new(ctx.gateway());
    let status = session
        .bootstrap(&client(&server, None), &downtown(), BTreeMap::new())
        .await;

    assert_eq!(status, SessionStatus::Failed);
    assert!(session.error().unwrap().contains("500"));
    assert!(ctx.gateway().load_session(&downtown()).is_some());
}

#[tokio::test]
async fn test_cancelled_request_result_is_ignored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "cartId": "cart-late" })),
        )
        .mount(&server)
        .await;

    let ctx = TestContext::new();
    let api = client(&server, None);
    let mut session = OrderingSession::new(ctx.gateway());

    let ticket = session.begin(&downtown(), BTreeMap::new()).unwrap();
    session.cancel();

    let result = api.start_ordering_session(&ticket.request).await;
    assert!(result.is_ok());
    assert!(!session.complete(ticket, result));

    assert_eq!(session.status(), SessionStatus::Idle);
    assert!(ctx.gateway().load_session(&downtown()).is_none());
}

// =============================================================================
// Remote cart
// =============================================================================

#[tokio::test]
async fn test_remote_cart_summary() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/locations/downtown/carts/cart-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "cart-1",
            "subtotal": 30.0,
            "tax": 2.66,
            "deliveryFee": 2.99,
            "total": 35.65,
            "itemCount": 3
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server, None);
    let cart = api.get_cart(&downtown(), &CartId::new("cart-1")).await.unwrap();
    assert_eq!(cart.item_count, 3);

    api.get_cart(&downtown(), &CartId::new("cart-1")).await.unwrap();
}
