//! HTTP contract for the read-only stats endpoints.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use serde_json::Value;
use tower::ServiceExt;

use lease_ledger::ledger::{
    stats_router, MemoryStore, PropertyId, ReputationService, Review, ReviewId, ReviewType, Role,
    ScoringWeights, User, UserId,
};

fn service() -> Arc<ReputationService<MemoryStore>> {
    let store = MemoryStore::new();
    store.add_user(User {
        id: UserId(1),
        role: Role::Landlord,
    });
    store.add_user(User {
        id: UserId(2),
        role: Role::Tenant,
    });
    store.add_review(Review {
        id: ReviewId(1),
        review_type: ReviewType::TenantToLandlord,
        landlord_id: UserId(1),
        tenant_id: UserId(2),
        property_id: PropertyId(5),
        rating: 4,
    });
    Arc::new(ReputationService::new(
        Arc::new(store),
        ScoringWeights::default(),
    ))
}

async fn get(service: Arc<ReputationService<MemoryStore>>, uri: &str) -> (StatusCode, Value) {
    let response = stats_router(service)
        .oneshot(Request::get(uri).body(Body::empty()).expect("request builds"))
        .await
        .expect("router responds");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    let body = serde_json::from_slice(&bytes).expect("json body");
    (status, body)
}

fn refreshed_at() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .expect("valid timestamp")
}

#[tokio::test]
async fn missing_snapshots_are_not_found() {
    let service = service();

    let (status, body) = get(service.clone(), "/api/v1/stats/landlords/1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["error"],
        "ledger error: landlord stats 1 not found"
    );

    let (status, _) = get(service.clone(), "/api/v1/stats/tenants/2").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(service, "/api/v1/stats/tenants").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Array(Vec::new()));
}

#[tokio::test]
async fn refreshed_snapshots_are_served_as_json() {
    let service = service();
    service
        .update_landlord_score(UserId(1), refreshed_at())
        .expect("landlord refresh");
    service
        .update_tenant_score(UserId(2), refreshed_at())
        .expect("tenant refresh");

    let (status, body) = get(service.clone(), "/api/v1/stats/landlords/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["landlord_id"], 1);
    assert_eq!(body["rating_score"], 4.0);
    assert_eq!(body["version"], 1);

    let (status, body) = get(service.clone(), "/api/v1/stats/tenants/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tenant_id"], 2);
    assert_eq!(body["total_payments"], 0);

    let (status, body) = get(service, "/api/v1/stats/landlords").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn non_numeric_ids_are_rejected() {
    let response = stats_router(service())
        .oneshot(
            Request::get("/api/v1/stats/tenants/abc")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
