use axum::{extract::{Path, State}, response::IntoResponse, Json};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::api::dtos::{
    requests::{CreateSubscriptionRequest, UpgradeSubscriptionRequest},
    responses::SweepResponse,
};
use crate::api::extractors::tenant::TenantId;
use crate::error::AppError;
use crate::state::AppState;

pub async fn create_subscription(
    State(state): State<Arc<AppState>>,
    tenant: TenantId,
    Json(payload): Json<CreateSubscriptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let subscription = state.ledger
        .create(&tenant.0, &payload.user_id, &payload.plan, payload.payment_ref)
        .await?;
    Ok(Json(subscription))
}

pub async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
    tenant: TenantId,
) -> Result<impl IntoResponse, AppError> {
    let subscriptions = state.ledger.list(&tenant.0).await?;
    Ok(Json(subscriptions))
}

pub async fn get_current_subscription(
    State(state): State<Arc<AppState>>,
    tenant: TenantId,
) -> Result<impl IntoResponse, AppError> {
    let subscription = state.ledger.get_status(&tenant.0).await?;
    Ok(Json(subscription))
}

pub async fn cancel_subscription(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, subscription_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let subscription = state.ledger.cancel(&tenant_id, &subscription_id).await?;
    Ok(Json(subscription))
}

pub async fn upgrade_subscription(
    State(state): State<Arc<AppState>>,
    tenant: TenantId,
    Json(payload): Json<UpgradeSubscriptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let subscription = state.ledger.upgrade(&tenant.0, &payload.plan).await?;
    Ok(Json(subscription))
}

/// Administrative: runs the expiry sweep outside its schedule.
pub async fn run_sweep(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let transitioned = state.ledger.check_and_deactivate_expired(Utc::now()).await?;
    info!("Forced expiry sweep transitioned {} subscriptions", transitioned);
    Ok(Json(SweepResponse { transitioned }))
}
