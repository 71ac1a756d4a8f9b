mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use common::TestApp;
use sales_backend::domain::models::subscription::{Subscription, SubscriptionStatus};
use sales_backend::domain::models::tenant::Tenant;
use sales_backend::domain::models::user::User;
use sales_backend::error::AppError;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn parse_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    serde_json::from_slice(&bytes).expect("Response body was not valid JSON")
}

/// Inserts a tenant with a bound owner, bypassing signup.
async fn seed_tenant(app: &TestApp) -> (Tenant, User) {
    let (tenant, created) = app.state.tenant_repo
        .create_if_absent(&Tenant::provisional(None))
        .await
        .unwrap();
    assert!(created);

    let user = app.state.user_repo
        .create(&User::new(
            tenant.id.clone(),
            "Owner".to_string(),
            format!("owner-{}@test.example", tenant.id),
        ))
        .await
        .unwrap();

    (tenant, user)
}

#[tokio::test]
async fn test_trial_runs_ninety_days() {
    let app = TestApp::new().await;
    let (tenant, user) = seed_tenant(&app).await;

    let sub = app.state.ledger.create(&tenant.id, &user.id, "trial", None).await.unwrap();

    assert_eq!(sub.status, SubscriptionStatus::Active);
    assert!(sub.is_free_trial_used);
    let days = (sub.end_date - sub.start_date).num_days();
    assert_eq!(days, 90);
}

#[tokio::test]
async fn test_second_trial_is_rejected() {
    let app = TestApp::new().await;
    let (tenant, user) = seed_tenant(&app).await;

    let trial = app.state.ledger.create(&tenant.id, &user.id, "trial", None).await.unwrap();
    app.state.ledger.cancel(&tenant.id, &trial.id).await.unwrap();

    let err = app.state.ledger.create(&tenant.id, &user.id, "trial", None).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn test_concurrent_creates_yield_single_active_subscription() {
    let app = TestApp::new().await;
    let (tenant, user) = seed_tenant(&app).await;

    let (a, b) = tokio::join!(
        app.state.ledger.create(&tenant.id, &user.id, "starter", Some("pay_a".into())),
        app.state.ledger.create(&tenant.id, &user.id, "business", Some("pay_b".into())),
    );

    let succeeded = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1, "exactly one creator may win: {:?} / {:?}", a, b);

    let active: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM subscriptions WHERE tenant_id = ? AND status IN ('active', 'renewed')",
    )
        .bind(&tenant.id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(active, 1);
}

#[tokio::test]
async fn test_unknown_plan_is_rejected() {
    let app = TestApp::new().await;
    let (tenant, user) = seed_tenant(&app).await;

    let response = app.router.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/{}/subscriptions", tenant.id))
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "user_id": user.id, "plan": "platinum" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cancel_is_terminal() {
    let app = TestApp::new().await;
    let (tenant, user) = seed_tenant(&app).await;

    let sub = app.state.ledger.create(&tenant.id, &user.id, "starter", None).await.unwrap();

    let response = app.router.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/{}/subscriptions/{}/cancel", tenant.id, sub.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert_eq!(body["status"], "cancelled");

    // No active subscription left, so an upgrade has nothing to act on.
    let upgrade = app.router.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/{}/subscriptions/upgrade", tenant.id))
                .header("content-type", "application/json")
                .body(Body::from(json!({ "plan": "business" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(upgrade.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_of_unknown_subscription_is_not_found() {
    let app = TestApp::new().await;
    let (tenant, _user) = seed_tenant(&app).await;

    let response = app.router.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/{}/subscriptions/{}/cancel", tenant.id, "does-not-exist"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_for_unknown_tenant_is_not_found() {
    let app = TestApp::new().await;

    let plan = app.state.catalog.find_by_name("starter").unwrap();
    let sub = Subscription::new(
        uuid::Uuid::new_v4().to_string(),
        uuid::Uuid::new_v4().to_string(),
        plan,
        None,
    );

    let err = app.state.subscription_repo.create_exclusive(&sub).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_cancelled_subscription_cannot_be_revived() {
    let app = TestApp::new().await;
    let (tenant, user) = seed_tenant(&app).await;

    let sub = app.state.ledger.create(&tenant.id, &user.id, "starter", None).await.unwrap();
    app.state.ledger.cancel(&tenant.id, &sub.id).await.unwrap();

    // Status-guarded transitions treat cancelled as terminal.
    let revived = app.state.subscription_repo
        .transition(&sub.id, SubscriptionStatus::Active, SubscriptionStatus::Expired)
        .await
        .unwrap();
    assert!(!revived);

    let after = app.state.subscription_repo
        .find_by_id(&tenant.id, &sub.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.status, SubscriptionStatus::Cancelled);
}

#[tokio::test]
async fn test_upgrade_resets_the_subscription_window() {
    let app = TestApp::new().await;
    let (tenant, user) = seed_tenant(&app).await;

    // Mid-term starter with roughly 300 days left.
    let plan = app.state.catalog.find_by_name("starter").unwrap();
    let mut sub = Subscription::new(tenant.id.clone(), user.id.clone(), plan, Some("pay_1".into()));
    sub.start_date = Utc::now() - Duration::days(65);
    sub.end_date = Utc::now() + Duration::days(300);
    app.state.subscription_repo.create_exclusive(&sub).await.unwrap();

    let upgraded = app.state.ledger.upgrade(&tenant.id, "business").await.unwrap();

    // The old remaining time is discarded; the window restarts at upgrade time.
    let days_left = (upgraded.end_date - Utc::now()).num_days();
    assert!((364..=365).contains(&days_left), "got {} days", days_left);
    assert_eq!(upgraded.status, SubscriptionStatus::Active);
    assert_eq!(upgraded.plan.as_str(), "business");
}

#[tokio::test]
async fn test_current_subscription_endpoint() {
    let app = TestApp::new().await;
    let (tenant, user) = seed_tenant(&app).await;
    app.state.ledger.create(&tenant.id, &user.id, "enterprise", Some("pay_9".into())).await.unwrap();

    let response = app.router.clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/v1/{}/subscriptions/current", tenant.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert_eq!(body["plan"], "enterprise");
    assert_eq!(body["status"], "active");
    assert_eq!(body["payment_ref"], "pay_9");
}

#[tokio::test]
async fn test_payment_confirmation_creates_paid_subscription() {
    let app = TestApp::new().await;
    let (tenant, _user) = seed_tenant(&app).await;

    let response = app.router.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/payments/confirm")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "tenant_id": tenant.id,
                        "plan": "starter",
                        "payment_ref": "pay_webhook_1"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert_eq!(body["plan"], "starter");
    assert_eq!(body["payment_ref"], "pay_webhook_1");
}

#[tokio::test]
async fn test_payment_confirmation_upgrades_running_subscription() {
    let app = TestApp::new().await;
    let (tenant, user) = seed_tenant(&app).await;
    app.state.ledger.create(&tenant.id, &user.id, "trial", None).await.unwrap();

    let response = app.router.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/payments/confirm")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "tenant_id": tenant.id,
                        "plan": "business",
                        "payment_ref": "pay_webhook_2"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert_eq!(body["plan"], "business");

    // Still exactly one active-like subscription for the tenant.
    let active: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM subscriptions WHERE tenant_id = ? AND status IN ('active', 'renewed')",
    )
        .bind(&tenant.id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(active, 1);
}
