use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use aerolux_api::state::{AppState, AuthConfig};
use aerolux_api::app;
use aerolux_booking::{BookingService, MemoryStore, PaymentGate};
use aerolux_core::catalog::{Flight, Hotel};
use aerolux_core::clock::{Clock, SystemClock};
use aerolux_core::notify::NotificationSink;

struct NoopSink;

#[async_trait]
impl NotificationSink for NoopSink {
    async fn publish(
        &self,
        _topic: &str,
        _key: &str,
        _payload: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

struct TestApp {
    app: Router,
    store: Arc<MemoryStore>,
}

async fn spawn_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let bookings = Arc::new(BookingService::new(
        store.clone(),
        store.clone(),
        clock.clone(),
    ));
    let payments = Arc::new(PaymentGate::new(store.clone(), store.clone(), clock));

    let redis = Arc::new(
        aerolux_store::RedisClient::new("redis://127.0.0.1:6379")
            .await
            .expect("redis client"),
    );

    let state = AppState {
        bookings,
        payments,
        redis,
        notifier: Arc::new(NoopSink),
        auth: AuthConfig {
            secret: "test-secret".to_string(),
            expiration: 3600,
        },
    };

    TestApp {
        app: app(state),
        store,
    }
}

fn request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("request")
}

async fn send(app: &Router, mut req: Request<Body>) -> (StatusCode, serde_json::Value) {
    req.extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 9000))));
    let response = app.clone().oneshot(req).await.expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, json)
}

async fn token_for(app: &Router, user_id: Uuid, role: &str) -> String {
    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/v1/auth/token",
            None,
            Some(serde_json::json!({ "user_id": user_id, "role": role })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().expect("token").to_string()
}

fn seed_flight(store: &MemoryStore, capacity: i32, available: i32) -> Uuid {
    let id = Uuid::new_v4();
    store.insert_flight(Flight {
        id,
        flight_number: "AL210".to_string(),
        capacity,
        seats_available: available,
        scheduled_departure: Utc::now() + Duration::days(3),
    });
    id
}

fn booking_body(flight_id: Uuid, passengers: i32) -> serde_json::Value {
    serde_json::json!({
        "kind": "FLIGHT",
        "reference_code": "AL-API-1",
        "travel_date": (Utc::now() + Duration::days(3)).to_rfc3339(),
        "amount": 42000,
        "currency": "USD",
        "flight_id": flight_id,
        "passengers": passengers,
    })
}

#[tokio::test]
async fn create_and_fetch_booking() {
    let t = spawn_app().await;
    let flight_id = seed_flight(&t.store, 4, 4);
    let user = Uuid::new_v4();
    let token = token_for(&t.app, user, "customer").await;

    let (status, created) = send(
        &t.app,
        request(
            Method::POST,
            "/v1/bookings",
            Some(&token),
            Some(booking_body(flight_id, 2)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "PENDING");
    assert_eq!(created["payment_status"], "UNPAID");
    assert_eq!(t.store.flight(flight_id).unwrap().seats_available, 2);

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = send(
        &t.app,
        request(
            Method::GET,
            &format!("/v1/bookings/{}", id),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], created["id"]);

    // Another customer cannot read it.
    let other = token_for(&t.app, Uuid::new_v4(), "customer").await;
    let (status, _) = send(
        &t.app,
        request(
            Method::GET,
            &format!("/v1/bookings/{}", id),
            Some(&other),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn inventory_and_catalog_errors_map_to_http() {
    let t = spawn_app().await;
    let flight_id = seed_flight(&t.store, 1, 1);
    let token = token_for(&t.app, Uuid::new_v4(), "customer").await;

    let (status, _) = send(
        &t.app,
        request(
            Method::POST,
            "/v1/bookings",
            Some(&token),
            Some(booking_body(flight_id, 2)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &t.app,
        request(
            Method::POST,
            "/v1/bookings",
            Some(&token),
            Some(booking_body(Uuid::new_v4(), 1)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("flight"));
}

#[tokio::test]
async fn cancellation_returns_advisory_message() {
    let t = spawn_app().await;
    let flight_id = seed_flight(&t.store, 4, 4);
    let user = Uuid::new_v4();
    let token = token_for(&t.app, user, "customer").await;

    let (_, created) = send(
        &t.app,
        request(
            Method::POST,
            "/v1/bookings",
            Some(&token),
            Some(booking_body(flight_id, 1)),
        ),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = send(
        &t.app,
        request(
            Method::POST,
            &format!("/v1/bookings/{}/cancel", id),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("24 hours"));
    assert!(body["booking"]["cancellation_effective_at"].is_string());
    // The request alone does not cancel or release anything.
    assert_eq!(body["booking"]["status"], "PENDING");
    assert_eq!(t.store.flight(flight_id).unwrap().seats_available, 3);
}

#[tokio::test]
async fn hotel_bookings_skip_inventory() {
    let t = spawn_app().await;
    let hotel_id = Uuid::new_v4();
    t.store.insert_hotel(Hotel {
        id: hotel_id,
        name: "AeroLux Marina".to_string(),
        city: Some("Porto".to_string()),
    });
    let token = token_for(&t.app, Uuid::new_v4(), "customer").await;

    let (status, created) = send(
        &t.app,
        request(
            Method::POST,
            "/v1/bookings",
            Some(&token),
            Some(serde_json::json!({
                "kind": "HOTEL",
                "reference_code": "HX-API-1",
                "travel_date": (Utc::now() + Duration::days(10)).to_rfc3339(),
                "amount": 90000,
                "hotel_id": hotel_id,
                "metadata": {"nights": 4},
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["kind"], "HOTEL");
}

#[tokio::test]
async fn admin_status_update_requires_the_role() {
    let t = spawn_app().await;
    let flight_id = seed_flight(&t.store, 4, 4);
    let user = Uuid::new_v4();
    let token = token_for(&t.app, user, "customer").await;

    let (_, created) = send(
        &t.app,
        request(
            Method::POST,
            "/v1/bookings",
            Some(&token),
            Some(booking_body(flight_id, 2)),
        ),
    )
    .await;
    let id = created["id"].as_str().unwrap();
    let uri = format!("/v1/admin/bookings/{}/status", id);

    let (status, _) = send(
        &t.app,
        request(
            Method::PATCH,
            &uri,
            Some(&token),
            Some(serde_json::json!({"status": "CANCELLED"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The admin path finalizes: seats come back immediately.
    let admin = token_for(&t.app, Uuid::new_v4(), "admin").await;
    let (status, body) = send(
        &t.app,
        request(
            Method::PATCH,
            &uri,
            Some(&admin),
            Some(serde_json::json!({"status": "CANCELLED"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "CANCELLED");
    assert_eq!(t.store.flight(flight_id).unwrap().seats_available, 4);
}

#[tokio::test]
async fn payment_confirmation_completes_the_booking() {
    let t = spawn_app().await;
    let flight_id = seed_flight(&t.store, 4, 4);
    let user = Uuid::new_v4();
    let token = token_for(&t.app, user, "customer").await;

    let (_, created) = send(
        &t.app,
        request(
            Method::POST,
            "/v1/bookings",
            Some(&token),
            Some(booking_body(flight_id, 1)),
        ),
    )
    .await;
    let booking_id = created["id"].as_str().unwrap();

    let (status, payment) = send(
        &t.app,
        request(
            Method::POST,
            "/v1/payments",
            Some(&token),
            Some(serde_json::json!({
                "booking_id": booking_id,
                "amount": 42000,
                "method": "card",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(payment["status"], "pending");

    let payment_id = payment["id"].as_str().unwrap();
    let (status, body) = send(
        &t.app,
        request(
            Method::POST,
            &format!("/v1/payments/{}/confirm", payment_id),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment"]["status"], "paid");
    assert_eq!(body["booking"]["status"], "COMPLETED");
    assert_eq!(body["booking"]["payment_status"], "PAID");
}
