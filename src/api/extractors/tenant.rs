use axum::{
    extract::{FromRequestParts, Path, Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tower_cookies::{cookie::time::Duration as CookieDuration, Cookie, Cookies};
use tracing::Span;

use crate::domain::models::{plan::PlanKind, tenant::Tenant};
use crate::domain::services::directory::{RejectReason, Resolution};
use crate::error::AppError;
use crate::state::AppState;

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const TENANT_QUERY_PARAM: &str = "tenant_id";
pub const TENANT_COOKIE: &str = "tenant_id";
pub const TENANT_SESSION_COOKIE: &str = "sales_session";

/// The resolved per-request tenant view handed to downstream handlers.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant_id: String,
    pub tenant: Tenant,
    pub subscription_active: bool,
    pub plan: Option<PlanKind>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Middleware composing directory, provisioner and ledger: resolves the
/// tenant hint, guarantees its store exists, attaches a `TenantContext` and
/// refreshes the hint cookies. Binding conflicts and provisioning failures
/// reject the request instead of letting it through unresolved.
pub async fn tenant_context(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let hint = extract_hint(&req, &cookies, &state);

    let resolution = state.directory.resolve(hint.as_deref()).await?;
    let tenant = match resolution {
        Resolution::Existing(t) | Resolution::Created(t) => t,
        Resolution::Rejected(RejectReason::AlreadyBound(msg)) => {
            return Err(AppError::DuplicateBinding(msg));
        }
    };

    Span::current().record("tenant_id", tracing::field::display(&tenant.id));

    // PartialProvision and Infrastructure short-circuit here; nothing is
    // cached, so the next request retries provisioning cleanly.
    state.provisioner.get_handle(&tenant.db_name()).await?;

    let (subscription_active, plan, expires_at) = match state.ledger.get_status(&tenant.id).await {
        Ok(sub) => (
            sub.status.grants_access() && sub.end_date > Utc::now(),
            Some(sub.plan),
            Some(sub.end_date),
        ),
        Err(AppError::NotFound(_)) => (false, None, None),
        Err(e) => return Err(e),
    };

    // Re-resolution in the same browser session should not depend on the
    // client echoing headers: a short-lived plain cookie plus a longer-lived
    // signed session value.
    cookies.add(
        Cookie::build((TENANT_COOKIE, tenant.id.clone()))
            .path("/")
            .max_age(CookieDuration::hours(1))
            .http_only(true)
            .build(),
    );
    cookies.signed(&state.session_key).add(
        Cookie::build((TENANT_SESSION_COOKIE, tenant.id.clone()))
            .path("/")
            .max_age(CookieDuration::days(30))
            .http_only(true)
            .build(),
    );

    let context = TenantContext {
        tenant_id: tenant.id.clone(),
        tenant,
        subscription_active,
        plan,
        expires_at,
    };
    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}

/// Hint priority: explicit header > query parameter > plain cookie > signed
/// session cookie. Body-level hints are handled by the signup handler,
/// which receives them as an explicit JSON field.
fn extract_hint(req: &Request, cookies: &Cookies, state: &AppState) -> Option<String> {
    if let Some(value) = req.headers().get(TENANT_HEADER) {
        if let Ok(s) = value.to_str() {
            if !s.trim().is_empty() {
                return Some(s.trim().to_string());
            }
        }
    }

    if let Some(query) = req.uri().query() {
        for pair in query.split('&') {
            let mut parts = pair.splitn(2, '=');
            if parts.next() == Some(TENANT_QUERY_PARAM) {
                if let Some(v) = parts.next() {
                    if !v.is_empty() {
                        return Some(v.to_string());
                    }
                }
            }
        }
    }

    if let Some(cookie) = cookies.get(TENANT_COOKIE) {
        let v = cookie.value().to_string();
        if !v.is_empty() {
            return Some(v);
        }
    }

    if let Some(cookie) = cookies.signed(&state.session_key).get(TENANT_SESSION_COOKIE) {
        let v = cookie.value().to_string();
        if !v.is_empty() {
            return Some(v);
        }
    }

    None
}

impl FromRequestParts<Arc<AppState>> for TenantContext {
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<TenantContext>()
            .cloned()
            // Route is missing the tenant_context middleware layer.
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Path-level tenant extractor for admin routes of the form
/// `/api/v1/{tenant_id}/...`; validates the id and that the tenant exists.
pub struct TenantId(pub String);

impl FromRequestParts<Arc<AppState>> for TenantId {
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let params: Path<HashMap<String, String>> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| StatusCode::BAD_REQUEST)?;

        let tenant_id = params.get("tenant_id").ok_or(StatusCode::BAD_REQUEST)?;

        match state.tenant_repo.find_by_id(tenant_id).await {
            Ok(Some(_)) => Ok(TenantId(tenant_id.clone())),
            Ok(None) => Err(StatusCode::NOT_FOUND),
            Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}
