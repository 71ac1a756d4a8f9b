use axum::{
    body::Body,
    extract::Request,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::extractors::tenant::tenant_context;
use crate::api::handlers::{health, payment, subscription, tenant};
use tower_http::{
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tower_cookies::CookieManagerLayer;
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Routes behind the tenant-context middleware: the tenant is resolved
    // (and created/provisioned on first contact) before the handler runs.
    let resolved_routes = Router::new()
        .route("/api/v1/tenants/current", get(tenant::get_current_tenant))
        .layer(middleware::from_fn_with_state(state.clone(), tenant_context));

    Router::new()
        .route("/health", get(health::health_check))

        // Tenant lifecycle
        .route("/api/v1/tenants", post(tenant::signup))
        .route("/api/v1/tenants/activate", post(tenant::activate))

        // Payment provider webhook
        .route("/api/v1/payments/confirm", post(payment::confirm_payment))

        // Tenant administration
        .route("/api/v1/{tenant_id}/users", get(tenant::list_users))
        .route("/api/v1/tenants/{tenant_id}", axum::routing::delete(tenant::delete_tenant))

        // Subscription administration
        .route("/api/v1/{tenant_id}/subscriptions", post(subscription::create_subscription).get(subscription::list_subscriptions))
        .route("/api/v1/{tenant_id}/subscriptions/current", get(subscription::get_current_subscription))
        .route("/api/v1/{tenant_id}/subscriptions/{subscription_id}/cancel", post(subscription::cancel_subscription))
        .route("/api/v1/{tenant_id}/subscriptions/upgrade", post(subscription::upgrade_subscription))
        .route("/api/v1/admin/sweep", post(subscription::run_sweep))

        .merge(resolved_routes)

        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                        tenant_id = tracing::field::Empty,
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .layer(CookieManagerLayer::new())
        .with_state(state)
}
