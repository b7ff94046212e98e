//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use api::{AppState, HttpOptions};
use argon2::Params;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use doc_store::InMemoryDocumentStore;
use domain::{Identity, PasswordHasher, Role, SessionIssuer, UserId};
use metrics_exporter_prometheus::PrometheusHandle;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "api-test-secret";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

async fn setup() -> Router {
    let store = InMemoryDocumentStore::new();
    domain::ensure_indexes(&store).await.unwrap();
    let state = AppState::with_hasher(
        store,
        SessionIssuer::new(SecretString::from(SECRET)),
        PasswordHasher::new(Params::new(Params::MIN_M_COST, 1, 1, None).unwrap()),
    );
    api::create_app(
        Arc::new(state),
        get_metrics_handle(),
        HttpOptions::default(),
    )
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn get_with_header(app: &Router, uri: &str, header: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .header("authorization", header)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

/// Registers and logs in a user, returning (token, user id).
async fn sign_up(app: &Router, email: &str, role: &str) -> (String, String) {
    let (status, _) = send(
        app,
        "POST",
        "/register",
        None,
        Some(json!({"name": "Test", "email": email, "password": "pw-123", "role": role})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = send(
        app,
        "POST",
        "/login",
        None,
        Some(json!({"email": email, "password": "pw-123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    (
        json["token"].as_str().unwrap().to_string(),
        json["user"]["id"].as_str().unwrap().to_string(),
    )
}

async fn add_product(app: &Router, token: &str, name: &str, price: f64) -> String {
    let (status, json) = send(
        app,
        "POST",
        "/add_products",
        Some(token),
        Some(json!({"name": name, "price": price, "category": "stationery"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["product"]["id"].as_str().unwrap().to_string()
}

mod public_routes {
    use super::*;

    #[tokio::test]
    async fn test_home_and_health() {
        let app = setup().await;

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Home route is running");

        let (status, json) = send(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = setup().await;
        sign_up(&app, "metrics@example.com", "buyer").await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("users_registered_total"));
    }
}

mod access_gate {
    use super::*;

    #[tokio::test]
    async fn test_profile_without_token() {
        let app = setup().await;
        let (status, json) = send(&app, "GET", "/profile", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "NoToken");
        assert_eq!(json["message"], "No token provided");
    }

    #[tokio::test]
    async fn test_profile_with_expired_token() {
        let app = setup().await;
        let issuer = SessionIssuer::new(SecretString::from(SECRET));
        let identity = Identity {
            id: UserId::new(),
            name: "Old".to_string(),
            email: "old@example.com".to_string(),
            role: Role::Buyer,
        };
        let expired = issuer
            .issue_at(&identity, Utc::now() - Duration::hours(2))
            .unwrap();

        let (status, json) = send(&app, "GET", "/profile", Some(&expired), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "InvalidToken");
    }

    #[tokio::test]
    async fn test_malformed_and_foreign_tokens() {
        let app = setup().await;

        let (status, json) = get_with_header(&app, "/profile", "Bearer ").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "MalformedHeader");

        let foreign = SessionIssuer::new(SecretString::from("someone-else"))
            .issue(&Identity {
                id: UserId::new(),
                name: "Eve".to_string(),
                email: "eve@example.com".to_string(),
                role: Role::Seller,
            })
            .unwrap();
        let (status, json) = send(&app, "GET", "/profile", Some(&foreign), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "InvalidToken");
    }

    #[tokio::test]
    async fn test_bare_and_bearer_tokens_resolve_identity() {
        let app = setup().await;
        let (token, id) = sign_up(&app, "seller@example.com", "seller").await;

        let (status, json) = get_with_header(&app, "/profile", &token).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["user"]["id"], id);
        assert_eq!(json["user"]["role"], "seller");

        let (status, json) = send(&app, "GET", "/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "User Profile");
        assert!(json["user"].get("password").is_none());
    }
}

mod accounts {
    use super::*;

    #[tokio::test]
    async fn test_register_hides_password_and_defaults_role() {
        let app = setup().await;
        let (status, json) = send(
            &app,
            "POST",
            "/register",
            None,
            Some(json!({"name": "Bo", "email": "bo@example.com", "password": "pw"})),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["message"], "User registered successfully");
        assert_eq!(json["user"]["role"], "buyer");
        assert!(json["user"].get("password").is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let app = setup().await;
        sign_up(&app, "dup@example.com", "buyer").await;

        let (status, json) = send(
            &app,
            "POST",
            "/register",
            None,
            Some(json!({"name": "X", "email": "dup@example.com", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Conflict");
        assert_eq!(json["message"], "Email already registered");
    }

    #[tokio::test]
    async fn test_register_validation() {
        let app = setup().await;

        let (status, json) = send(
            &app,
            "POST",
            "/register",
            None,
            Some(json!({"email": "x@example.com", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "ValidationError");

        let (status, json) = send(
            &app,
            "POST",
            "/register",
            None,
            Some(json!({"name": "X", "email": "x@example.com", "password": "pw", "admin": true})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "ValidationError");
    }

    #[tokio::test]
    async fn test_login_failures() {
        let app = setup().await;
        sign_up(&app, "lo@example.com", "buyer").await;

        let (status, json) = send(
            &app,
            "POST",
            "/login",
            None,
            Some(json!({"email": "lo@example.com", "password": "nope"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["message"], "Invalid password");
        assert!(json.get("token").is_none());

        let (status, json) = send(
            &app,
            "POST",
            "/login",
            None,
            Some(json!({"email": "ghost@example.com", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["message"], "User not found");

        let (status, _) = send(&app, "POST", "/login", None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

mod catalog {
    use super::*;

    #[tokio::test]
    async fn test_buyer_cannot_add_products() {
        let app = setup().await;
        let (token, _) = sign_up(&app, "buyer@example.com", "buyer").await;

        let (status, json) = send(
            &app,
            "POST",
            "/add_products",
            Some(&token),
            Some(json!({"name": "Pen", "price": 10})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"], "Forbidden");
    }

    #[tokio::test]
    async fn test_seller_products_listing() {
        let app = setup().await;
        let (token, seller_id) = sign_up(&app, "seller@example.com", "seller").await;
        let pen = add_product(&app, &token, "Pen", 10.0).await;

        let (status, json) = send(&app, "POST", "/add_products", Some(&token), Some(json!({"name": "Nameless"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "name and price are required");

        let (status, json) = send(
            &app,
            "GET",
            &format!("/products?sellerId={seller_id}"),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["products"][0]["id"], pen);
        assert_eq!(json["products"][0]["sellerId"], seller_id);
        assert_eq!(json["products"][0]["price"].as_f64(), Some(10.0));

        let (status, json) = send(&app, "GET", "/products", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "sellerId is required");

        let (status, json) = send(&app, "GET", "/all_products", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["products"].as_array().unwrap().len(), 1);
    }
}

mod cart_and_orders {
    use super::*;

    #[tokio::test]
    async fn test_pen_scenario() {
        let app = setup().await;
        let (seller, _) = sign_up(&app, "a@example.com", "seller").await;
        let (buyer, _) = sign_up(&app, "b@example.com", "buyer").await;
        let pen = add_product(&app, &seller, "Pen", 10.0).await;

        let (status, json) = send(
            &app,
            "POST",
            "/add_to_cart",
            Some(&buyer),
            Some(json!({"productId": pen, "quantity": 3})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Product added to cart");
        assert_eq!(json["cart"]["items"][0]["product"]["name"], "Pen");

        let (_, json) = send(&app, "GET", "/view_cart", Some(&buyer), None).await;
        assert_eq!(json["totalPrice"].as_f64(), Some(30.0));

        let (status, json) = send(&app, "POST", "/place_order", Some(&buyer), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Order placed successfully");
        assert_eq!(json["order"]["total"].as_f64(), Some(30.0));
        assert_eq!(json["order"]["status"], "placed");
        assert_eq!(json["order"]["items"][0]["productId"], pen);
        assert_eq!(json["order"]["items"][0]["quantity"], 3);
        assert_eq!(json["droppedItems"], json!([]));

        let (status, json) = send(&app, "GET", "/view_cart", Some(&buyer), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Cart is empty");
        assert_eq!(json["cart"]["items"], json!([]));
        assert_eq!(json["totalPrice"].as_f64(), Some(0.0));

        let (status, json) = send(&app, "GET", "/view_orders", Some(&buyer), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["orders"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_quantity_forms() {
        let app = setup().await;
        let (seller, _) = sign_up(&app, "s@example.com", "seller").await;
        let (buyer, _) = sign_up(&app, "b@example.com", "buyer").await;
        let pen = add_product(&app, &seller, "Pen", 1.0).await;

        // Absent means one, numeric strings are parsed.
        send(&app, "POST", "/add_to_cart", Some(&buyer), Some(json!({"productId": pen}))).await;
        let (_, json) = send(
            &app,
            "POST",
            "/add_to_cart",
            Some(&buyer),
            Some(json!({"productId": pen, "quantity": "4"})),
        )
        .await;
        assert_eq!(json["cart"]["items"][0]["quantity"], 5);

        let (status, json) = send(
            &app,
            "POST",
            "/add_to_cart",
            Some(&buyer),
            Some(json!({"productId": pen, "quantity": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "ValidationError");

        let (_, json) = send(&app, "GET", "/view_cart", Some(&buyer), None).await;
        assert_eq!(json["cart"]["items"][0]["quantity"], 5);
    }

    #[tokio::test]
    async fn test_unknown_product_and_missing_id() {
        let app = setup().await;
        let (buyer, _) = sign_up(&app, "b@example.com", "buyer").await;

        let (status, json) = send(
            &app,
            "POST",
            "/add_to_cart",
            Some(&buyer),
            Some(json!({"productId": UserId::new().to_string()})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "ProductNotFound");

        let (status, json) = send(&app, "POST", "/add_to_cart", Some(&buyer), Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "productId is required");
    }

    #[tokio::test]
    async fn test_cart_total_too_large_is_rejected() {
        let app = setup().await;
        let (seller, _) = sign_up(&app, "s@example.com", "seller").await;
        let (buyer, _) = sign_up(&app, "b@example.com", "buyer").await;
        let yacht = add_product(&app, &seller, "Yacht", 9.0e16).await;
        let jet = add_product(&app, &seller, "Jet", 9.0e16).await;

        let (status, _) = send(
            &app,
            "POST",
            "/add_to_cart",
            Some(&buyer),
            Some(json!({"productId": yacht})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = send(
            &app,
            "POST",
            "/add_to_cart",
            Some(&buyer),
            Some(json!({"productId": jet})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "ValidationError");
        assert_eq!(json["message"], "cart total is too large");

        let (status, json) = send(&app, "GET", "/view_cart", Some(&buyer), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["cart"]["items"].as_array().unwrap().len(), 1);
        assert_eq!(json["totalPrice"].as_f64(), Some(9.0e16));
    }

    #[tokio::test]
    async fn test_empty_cart_cannot_be_ordered() {
        let app = setup().await;
        let (buyer, _) = sign_up(&app, "b@example.com", "buyer").await;

        let (status, json) = send(
            &app,
            "POST",
            "/place_order",
            Some(&buyer),
            Some(json!({"address": "1 Main St"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "EmptyCart");
        assert_eq!(json["message"], "Cart is empty");
    }

    #[tokio::test]
    async fn test_idempotency_key_replays_order() {
        let app = setup().await;
        let (seller, _) = sign_up(&app, "s@example.com", "seller").await;
        let (buyer, _) = sign_up(&app, "b@example.com", "buyer").await;
        let pen = add_product(&app, &seller, "Pen", 2.5).await;
        send(
            &app,
            "POST",
            "/add_to_cart",
            Some(&buyer),
            Some(json!({"productId": pen, "quantity": 2})),
        )
        .await;

        let place = || async {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/place_order")
                        .header("authorization", format!("Bearer {buyer}"))
                        .header("idempotency-key", "checkout-42")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            (status, serde_json::from_slice::<Value>(&bytes).unwrap())
        };

        let (status, first) = place().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["replayed"], false);
        assert_eq!(first["order"]["total"].as_f64(), Some(5.0));

        let (status, second) = place().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["replayed"], true);
        assert_eq!(second["order"]["id"], first["order"]["id"]);

        let (_, json) = send(&app, "GET", "/view_orders", Some(&buyer), None).await;
        assert_eq!(json["orders"].as_array().unwrap().len(), 1);
    }
}
