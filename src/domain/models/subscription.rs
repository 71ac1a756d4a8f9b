use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::models::plan::{Plan, PlanKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Cancelled,
    Renewed,
}

impl SubscriptionStatus {
    /// `renewed` behaves exactly like `active` for access control.
    pub fn grants_access(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Renewed)
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Subscription {
    pub id: String,
    pub tenant_id: String,
    pub user_id: String,
    pub plan: PlanKind,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: SubscriptionStatus,
    pub is_free_trial_used: bool,
    pub payment_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    pub fn new(tenant_id: String, user_id: String, plan: &Plan, payment_ref: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id,
            user_id,
            plan: plan.kind,
            start_date: now,
            end_date: now + plan.duration(),
            status: SubscriptionStatus::Active,
            is_free_trial_used: plan.kind == PlanKind::Trial,
            payment_ref,
            created_at: now,
            updated_at: now,
        }
    }
}
