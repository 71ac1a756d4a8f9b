mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::TestApp;
use sales_backend::domain::services::directory::Resolution;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

async fn parse_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    serde_json::from_slice(&bytes).expect("Response body was not valid JSON")
}

#[tokio::test]
async fn test_concurrent_resolve_creates_single_tenant() {
    let app = TestApp::new().await;
    let id = Uuid::new_v4().to_string();

    let (a, b) = tokio::join!(
        app.state.directory.resolve(Some(&id)),
        app.state.directory.resolve(Some(&id)),
    );
    a.expect("first resolve failed");
    b.expect("second resolve failed");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tenants WHERE id = ?")
        .bind(&id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_resolve_returns_existing_tenant_unchanged() {
    let app = TestApp::new().await;
    let id = Uuid::new_v4().to_string();

    let first = app.state.directory.resolve(Some(&id)).await.unwrap();
    let created_email = match first {
        Resolution::Created(t) => t.email,
        other => panic!("expected Created, got {:?}", other),
    };

    let second = app.state.directory.resolve(Some(&id)).await.unwrap();
    match second {
        Resolution::Existing(t) => {
            assert_eq!(t.id, id);
            assert_eq!(t.email, created_email);
        }
        other => panic!("expected Existing, got {:?}", other),
    }
}

#[tokio::test]
async fn test_resolve_without_hint_creates_fresh_tenant() {
    let app = TestApp::new().await;

    let resolution = app.state.directory.resolve(None).await.unwrap();
    let tenant = match resolution {
        Resolution::Created(t) => t,
        other => panic!("expected Created, got {:?}", other),
    };

    assert!(Uuid::parse_str(&tenant.id).is_ok());
    assert!(tenant.name.starts_with("tenant-"));
}

#[tokio::test]
async fn test_malformed_tenant_hint_is_rejected() {
    let app = TestApp::new().await;

    let response = app.router.clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/tenants/current")
                .header("x-tenant-id", "not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing was created for the bad hint.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tenants")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_header_hint_resolves_and_sets_cookies() {
    let app = TestApp::new().await;
    let id = Uuid::new_v4().to_string();

    let response = app.router.clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/tenants/current")
                .header("x-tenant-id", id.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let cookies: Vec<String> = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("tenant_id=")));
    assert!(cookies.iter().any(|c| c.starts_with("sales_session=")));

    let body = parse_body(response).await;
    assert_eq!(body["tenant_id"], id);
    assert_eq!(body["subscription_active"], false);
}

#[tokio::test]
async fn test_query_hint_resolves_when_no_header() {
    let app = TestApp::new().await;
    let id = Uuid::new_v4().to_string();

    let response = app.router.clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/v1/tenants/current?tenant_id={}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert_eq!(body["tenant_id"], id);
}

#[tokio::test]
async fn test_header_hint_outranks_query_hint() {
    let app = TestApp::new().await;
    let header_id = Uuid::new_v4().to_string();
    let query_id = Uuid::new_v4().to_string();

    let response = app.router.clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/v1/tenants/current?tenant_id={}", query_id))
                .header("x-tenant-id", header_id.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert_eq!(body["tenant_id"], header_id);
}

#[tokio::test]
async fn test_signup_claims_tenant_and_starts_trial() {
    let app = TestApp::new().await;

    let response = app.router.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/tenants")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "name": "Acme Trading",
                        "email": "owner@acme.example",
                        "phone": "+49123456"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert_eq!(body["status"], "pending_activation");
    assert_eq!(body["plan"], "trial");
    let tenant_id = body["tenant_id"].as_str().unwrap().to_string();

    // The owner account was bound and an activation mail went out.
    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE tenant_id = ?")
        .bind(&tenant_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(users, 1);

    let sent = app.emails.sent.lock().unwrap();
    assert!(sent.iter().any(|(to, kind)| to == "owner@acme.example" && *kind == "activation"));
}

#[tokio::test]
async fn test_signup_rejects_already_bound_tenant() {
    let app = TestApp::new().await;
    let id = Uuid::new_v4().to_string();

    let signup = |email: &str| {
        Request::builder()
            .method("POST")
            .uri("/api/v1/tenants")
            .header("content-type", "application/json")
            .header("x-tenant-id", id.as_str())
            .body(Body::from(
                json!({ "name": "Acme", "email": email }).to_string(),
            ))
            .unwrap()
    };

    let first = app.router.clone().oneshot(signup("first@acme.example")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.router.clone().oneshot(signup("second@acme.example")).await.unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_signup_rejects_reused_contact_email() {
    let app = TestApp::new().await;

    app.state.directory
        .claim(None, "Acme", "shared@acme.example", None, None)
        .await
        .unwrap();

    let err = app.state.directory
        .claim(None, "Other Corp", "shared@acme.example", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, sales_backend::error::AppError::Conflict(_)));
}

#[tokio::test]
async fn test_delete_tenant_cascades() {
    let app = TestApp::new().await;
    let id = Uuid::new_v4().to_string();

    app.state.directory
        .claim(Some(&id), "Acme", "owner@acme.example", None, None)
        .await
        .unwrap();

    let store_name = format!("tenant_{}", id.replace('-', "_"));
    let handle = app.state.provisioner.get_handle(&store_name).await.unwrap();

    let response = app.router.clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/tenants/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The cached store handle was evicted along with the rows.
    assert!(handle.is_closed());

    for table in ["tenants", "users", "one_time_codes"] {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ?",
            table,
            if table == "tenants" { "id" } else { "tenant_id" },
        ))
            .bind(&id)
            .fetch_one(&app.pool)
            .await
            .unwrap();
        assert_eq!(count, 0, "{} rows left behind", table);
    }
}

#[tokio::test]
async fn test_list_users_returns_the_owner() {
    let app = TestApp::new().await;
    let id = Uuid::new_v4().to_string();

    app.state.directory
        .claim(Some(&id), "Acme", "owner@acme.example", None, None)
        .await
        .unwrap();

    let response = app.router.clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/v1/{}/users", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_body(response).await;
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["email"], "owner@acme.example");
}

#[tokio::test]
async fn test_activation_consumes_code_and_activates_tenant() {
    let app = TestApp::new().await;
    let id = Uuid::new_v4().to_string();

    app.state.directory
        .claim(Some(&id), "Acme", "owner@acme.example", None, None)
        .await
        .unwrap();

    let code: String = sqlx::query_scalar(
        "SELECT code FROM one_time_codes WHERE tenant_id = ? AND purpose = 'activation'",
    )
        .bind(&id)
        .fetch_one(&app.pool)
        .await
        .unwrap();

    let response = app.router.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/tenants/activate")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "tenant_id": &id, "code": &code }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_body(response).await;
    assert_eq!(body["status"], "active");

    // A consumed code cannot be replayed.
    let replay = app.router.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/tenants/activate")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "tenant_id": &id, "code": &code }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_ne!(replay.status(), StatusCode::OK);
}
