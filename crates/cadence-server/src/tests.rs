//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

fn setup_test_app() -> Router {
    let db = Database::in_memory().unwrap();
    create_router(db, ClassifierConfig::default())
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn netflix_batch() -> serde_json::Value {
    serde_json::json!([
        {"trans_id": "t1", "user_id": "u1", "name": "Netflix 1", "amount": 15.99, "date": "2024-01-01"},
        {"trans_id": "t2", "user_id": "u1", "name": "Netflix 2", "amount": 15.99, "date": "2024-02-01"},
        {"trans_id": "t3", "user_id": "u1", "name": "Netflix 3", "amount": 15.99, "date": "2024-03-01"}
    ])
}

fn post_transactions(body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/transactions")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_ingest_returns_recurring_groups() {
    let app = setup_test_app();

    let response = app.oneshot(post_transactions(&netflix_batch())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["created"], 3);
    assert_eq!(json["updated"], 0);
    assert!(json["rejected"].as_array().unwrap().is_empty());

    let recurring = json["recurring"].as_array().unwrap();
    assert_eq!(recurring.len(), 1);
    assert_eq!(recurring[0]["name"], "Netflix");
    assert_eq!(recurring[0]["recurring"], true);
    assert_eq!(recurring[0]["members"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_recurring_listing_after_ingest() {
    let db = Database::in_memory().unwrap();
    let app = create_router(db, ClassifierConfig::default());

    let response = app
        .clone()
        .oneshot(post_transactions(&netflix_batch()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/recurring")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    let groups = json.as_array().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["name"], "Netflix");
}

#[tokio::test]
async fn test_recurring_listing_empty_database() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/recurring")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_ingest_reports_rejected_items() {
    let app = setup_test_app();

    let body = serde_json::json!([
        {"trans_id": "t1", "user_id": "u1", "name": "Netflix 1", "amount": 15.99, "date": "2024-01-01"},
        {"trans_id": "t2", "user_id": "u1", "name": "Netflix 2", "amount": 15.99, "date": "not a date"},
        {"trans_id": "t3", "user_id": "u1", "name": "", "amount": 15.99, "date": "2024-03-01"}
    ]);

    let response = app.oneshot(post_transactions(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["created"], 1);

    let rejected = json["rejected"].as_array().unwrap();
    assert_eq!(rejected.len(), 2);
    assert_eq!(rejected[0]["trans_id"], "t2");
    assert_eq!(rejected[1]["trans_id"], "t3");
}

#[tokio::test]
async fn test_reingest_updates_in_place() {
    let db = Database::in_memory().unwrap();
    let app = create_router(db, ClassifierConfig::default());

    app.clone()
        .oneshot(post_transactions(&netflix_batch()))
        .await
        .unwrap();
    let response = app
        .oneshot(post_transactions(&netflix_batch()))
        .await
        .unwrap();

    let json = get_body_json(response).await;
    assert_eq!(json["created"], 0);
    assert_eq!(json["updated"], 3);
    assert_eq!(json["recurring"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_route_returns_404_json() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Route not found");
}
