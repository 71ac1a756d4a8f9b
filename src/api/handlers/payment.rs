use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::info;

use crate::api::dtos::requests::ConfirmPaymentRequest;
use crate::domain::services::directory::validate_tenant_id;
use crate::error::AppError;
use crate::state::AppState;

/// Payment-provider webhook: a confirmed payment either starts or upgrades
/// the tenant's subscription.
pub async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ConfirmPaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_tenant_id(&payload.tenant_id)?;

    let subscription = state.ledger
        .confirm_payment(&payload.tenant_id, &payload.plan, &payload.payment_ref)
        .await?;

    info!(tenant_id = %payload.tenant_id, plan = %payload.plan, "Payment confirmed");
    Ok(Json(subscription))
}
