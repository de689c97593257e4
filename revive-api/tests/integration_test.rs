use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use revive_api::middleware::issue_token;
use revive_api::{app, AppState, AuthConfig, Repositories};
use revive_core::repository::{ListingRepository, UserRepository};
use revive_shared::models::{Listing, ListingDraft, ListingStatus, Role, User};
use revive_store::app_config::BusinessRules;
use revive_store::{BroadcastPublisher, MemoryStore};

const SECRET: &str = "integration-secret";

fn test_app(store: &MemoryStore) -> Router {
    let rules = BusinessRules { payment_latency_ms: 0, ..BusinessRules::default() };
    let state = AppState::new(
        Repositories::in_memory(store),
        Arc::new(BroadcastPublisher::new(16)),
        &rules,
        AuthConfig { secret: SECRET.to_string() },
    );
    app(state)
}

async fn user(store: &MemoryStore, name: &str, role: Role) -> (Uuid, String) {
    let user = User::new(name, name, &format!("{}@example.com", name), role);
    store.create_user(&user).await.unwrap();
    let token = issue_token(SECRET, user.id, role, chrono::Duration::minutes(10)).unwrap();
    (user.id, token)
}

async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let req = match body {
        Some(body) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn bundle_body(price_cents: i64) -> Value {
    json!({
        "title": "Mixed denim lot",
        "description": "Jeans and jackets",
        "sample_image": "https://img.example.com/denim.jpg",
        "grade": "A",
        "sorting_level": "sorted",
        "declared_rating": 4,
        "price_cents": price_cents,
        "quantity": 25
    })
}

#[tokio::test]
async fn test_health_is_public_and_routes_need_a_token() {
    let store = MemoryStore::new();
    let app = test_app(&store);

    let (status, _) = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, Method::GET, "/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = call(&app, Method::GET, "/orders", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bundle_purchase_flow() {
    let store = MemoryStore::new();
    let app = test_app(&store);
    let (_, supplier) = user(&store, "selam", Role::Supplier).await;
    let (reseller_id, reseller) = user(&store, "abel", Role::Reseller).await;
    let (_, rival) = user(&store, "hana", Role::Reseller).await;

    let (status, bundle) = call(&app, Method::POST, "/supplier/bundles", Some(&supplier), Some(bundle_body(10_000))).await;
    assert_eq!(status, StatusCode::CREATED);
    let bundle_id = bundle["id"].as_str().unwrap().to_string();

    let (status, listed) = call(&app, Method::GET, "/bundles", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let uri = format!("/reseller/bundles/{}/purchase", bundle_id);
    let (status, receipt) = call(&app, Method::POST, &uri, Some(&reseller), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["order"]["status"], "completed");
    assert_eq!(receipt["payment"]["platform_fee_cents"], 200);
    assert_eq!(receipt["payment"]["seller_earning_cents"], 9_800);
    assert_eq!(receipt["warehouse_item"]["status"], "pending");
    assert_eq!(receipt["order"]["buyer_id"], reseller_id.to_string());

    let (status, _) = call(&app, Method::POST, &uri, Some(&rival), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, orders) = call(&app, Method::GET, "/orders", Some(&supplier), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().unwrap().len(), 1);

    let order_uri = format!("/orders/{}", receipt["order"]["id"].as_str().unwrap());
    let (status, _) = call(&app, Method::GET, &order_uri, Some(&rival), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_roles_are_enforced() {
    let store = MemoryStore::new();
    let app = test_app(&store);
    let (_, consumer) = user(&store, "liya", Role::Consumer).await;

    let (status, _) = call(&app, Method::POST, "/supplier/bundles", Some(&consumer), Some(bundle_body(5_000))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, Method::GET, "/admin/dashboard", Some(&consumer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_checkout_reports_every_unavailable_item() {
    let store = MemoryStore::new();
    let app = test_app(&store);
    let (_, consumer) = user(&store, "yonas", Role::Consumer).await;
    let reseller_id = Uuid::new_v4();

    let mut listings = Vec::new();
    for (title, price_cents) in [("Linen shirt", 1_200), ("Suede boots", 4_500), ("Canvas tote", 900)] {
        let listing = Listing::unpacked(
            reseller_id,
            Uuid::new_v4(),
            ListingDraft {
                bundle_id: Uuid::new_v4(),
                title: title.to_string(),
                description: String::new(),
                size: "M".to_string(),
                kind: "apparel".to_string(),
                grade: "A".to_string(),
                price_cents,
                image_url: String::new(),
                rating: 90.0,
            },
        );
        store.create_listing(&listing).await.unwrap();
        let (status, _) = call(
            &app,
            Method::POST,
            "/cart/items",
            Some(&consumer),
            Some(json!({ "listing_id": listing.id })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        listings.push(listing);
    }
    store.set_listing_status(listings[1].id, ListingStatus::Sold).await;

    let (status, body) = call(&app, Method::POST, "/cart/checkout", Some(&consumer), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let unavailable = body["unavailable_items"].as_array().unwrap();
    assert_eq!(unavailable.len(), 1);
    assert_eq!(unavailable[0]["listing_id"], listings[1].id.to_string());

    let (_, cart) = call(&app, Method::GET, "/cart", Some(&consumer), None).await;
    assert_eq!(cart.as_array().unwrap().len(), 3);

    let uri = format!("/cart/items/{}", listings[1].id);
    let (status, _) = call(&app, Method::DELETE, &uri, Some(&consumer), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, receipt) = call(&app, Method::POST, "/cart/checkout", Some(&consumer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["total_cents"], 2_100);
    assert_eq!(receipt["platform_fee_cents"], 42);
    assert_eq!(receipt["net_payable_cents"], 2_058);
}
