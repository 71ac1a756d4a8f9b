use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::models::{plan::PlanKind, tenant::Tenant};

#[derive(Serialize)]
pub struct SignupResponse {
    pub tenant_id: String,
    pub status: String,
    pub plan: String,
    pub subscription_end_date: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct ResolvedTenantResponse {
    pub tenant_id: String,
    pub tenant: Tenant,
    pub subscription_active: bool,
    pub plan: Option<PlanKind>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct SweepResponse {
    pub transitioned: u64,
}
