use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::info;

use crate::api::dtos::{
    requests::{ActivateRequest, SignupRequest},
    responses::{ResolvedTenantResponse, SignupResponse},
};
use crate::api::extractors::tenant::{TenantContext, TenantId, TENANT_HEADER};
use crate::domain::services::directory::{RejectReason, Resolution};
use crate::error::AppError;
use crate::state::AppState;

/// Signup: claims (or creates) the tenant, provisions its store and starts
/// the free trial in one pass.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Header hint outranks the body-level one.
    let hint = headers
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| payload.tenant_id.clone());

    let resolution = state.directory
        .claim(hint.as_deref(), &payload.name, &payload.email, payload.phone, payload.address)
        .await?;

    let tenant = match resolution {
        Resolution::Existing(t) | Resolution::Created(t) => t,
        Resolution::Rejected(RejectReason::AlreadyBound(msg)) => {
            return Err(AppError::DuplicateBinding(msg));
        }
    };

    state.provisioner.get_handle(&tenant.db_name()).await?;

    let owner = state.user_repo.find_owner(&tenant.id).await?
        .ok_or(AppError::Internal)?;
    let subscription = state.ledger.create(&tenant.id, &owner.id, "trial", None).await?;

    info!(tenant_id = %tenant.id, "Signup completed, trial started");

    Ok(Json(SignupResponse {
        tenant_id: tenant.id,
        status: "pending_activation".to_string(),
        plan: subscription.plan.as_str().to_string(),
        subscription_end_date: subscription.end_date,
    }))
}

pub async fn activate(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ActivateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tenant = state.directory.activate(&payload.tenant_id, &payload.code).await?;
    Ok(Json(tenant))
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    tenant: TenantId,
) -> Result<impl IntoResponse, AppError> {
    let users = state.user_repo.list_by_tenant(&tenant.0).await?;
    Ok(Json(users))
}

/// Cascade delete: removes the tenant row with its users, subscriptions and
/// codes, and releases the cached store handle.
pub async fn delete_tenant(
    State(state): State<Arc<AppState>>,
    tenant: TenantId,
) -> Result<impl IntoResponse, AppError> {
    let row = state.tenant_repo.find_by_id(&tenant.0).await?
        .ok_or_else(|| AppError::NotFound("Tenant not found".to_string()))?;
    let db_name = row.db_name();

    state.tenant_repo.delete(&tenant.0).await?;
    state.provisioner.close_handle(&db_name).await?;

    info!(tenant_id = %tenant.0, "Tenant deleted");
    Ok(Json(serde_json::json!({ "deleted": tenant.0 })))
}

pub async fn get_current_tenant(ctx: TenantContext) -> impl IntoResponse {
    Json(ResolvedTenantResponse {
        tenant_id: ctx.tenant_id,
        tenant: ctx.tenant,
        subscription_active: ctx.subscription_active,
        plan: ctx.plan,
        expires_at: ctx.expires_at,
    })
}
