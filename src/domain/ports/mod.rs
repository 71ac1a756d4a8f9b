use crate::domain::models::{
    code::OneTimeCode,
    plan::PlanKind,
    subscription::{Subscription, SubscriptionStatus},
    tenant::{Tenant, TenantStatus},
    user::User,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

#[async_trait]
pub trait TenantRepository: Send + Sync {
    /// Idempotent insert keyed by the tenant id. Returns the persisted row
    /// and whether this call actually created it (false = lost the race or
    /// the row already existed).
    async fn create_if_absent(&self, tenant: &Tenant) -> Result<(Tenant, bool), AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Tenant>, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Tenant>, AppError>;
    async fn update(&self, tenant: &Tenant) -> Result<Tenant, AppError>;
    async fn set_status(&self, id: &str, status: TenantStatus) -> Result<(), AppError>;
    /// Refresh the denormalized subscription snapshot on the tenant row.
    async fn update_subscription_snapshot(
        &self,
        id: &str,
        plan_label: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), AppError>;
    /// Cascade delete: removes the tenant's users, subscriptions and codes.
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<User, AppError>;
    async fn find_by_id(&self, tenant_id: &str, id: &str) -> Result<Option<User>, AppError>;
    /// The first user created for a tenant is its owner.
    async fn find_owner(&self, tenant_id: &str) -> Result<Option<User>, AppError>;
    async fn list_by_tenant(&self, tenant_id: &str) -> Result<Vec<User>, AppError>;
    async fn count_by_tenant(&self, tenant_id: &str) -> Result<i64, AppError>;
}

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Transactional check-then-insert: fails with Conflict if the tenant
    /// already holds an active or renewed subscription.
    async fn create_exclusive(&self, sub: &Subscription) -> Result<Subscription, AppError>;
    async fn find_by_id(&self, tenant_id: &str, id: &str) -> Result<Option<Subscription>, AppError>;
    async fn find_active(&self, tenant_id: &str) -> Result<Option<Subscription>, AppError>;
    async fn list_by_tenant(&self, tenant_id: &str) -> Result<Vec<Subscription>, AppError>;
    async fn count_by_tenant(&self, tenant_id: &str) -> Result<i64, AppError>;
    async fn has_used_trial(&self, tenant_id: &str) -> Result<bool, AppError>;
    /// active/renewed -> expired, guarded by the current status. Returns
    /// false when another writer already transitioned the row.
    async fn mark_expired(&self, id: &str) -> Result<bool, AppError>;
    /// expired -> renewed with a fresh end date.
    async fn mark_renewed(&self, id: &str, new_end: DateTime<Utc>, payment_ref: &str) -> Result<bool, AppError>;
    /// active/renewed -> cancelled. None when no matching row was active.
    async fn mark_cancelled(&self, tenant_id: &str, id: &str) -> Result<Option<Subscription>, AppError>;
    /// Re-point the active-like subscription at a new plan with a reset
    /// window. None when the tenant has no active-like subscription.
    async fn update_plan(
        &self,
        tenant_id: &str,
        plan: PlanKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        payment_ref: Option<&str>,
    ) -> Result<Option<Subscription>, AppError>;
    async fn find_expired_active(&self, now: DateTime<Utc>) -> Result<Vec<Subscription>, AppError>;
    async fn transition(
        &self,
        id: &str,
        from: SubscriptionStatus,
        to: SubscriptionStatus,
    ) -> Result<bool, AppError>;
}

#[async_trait]
pub trait CodeRepository: Send + Sync {
    async fn create(&self, code: &OneTimeCode) -> Result<OneTimeCode, AppError>;
    async fn find_valid(&self, tenant_id: &str, code: &str, now: DateTime<Utc>) -> Result<Option<OneTimeCode>, AppError>;
    async fn consume(&self, id: &str) -> Result<bool, AppError>;
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailKind {
    Activation,
    ExpiryNotice,
    RenewalConfirmation,
}

impl MailKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MailKind::Activation => "activation",
            MailKind::ExpiryNotice => "expiry_notice",
            MailKind::RenewalConfirmation => "renewal_confirmation",
        }
    }
}

#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send(&self, recipient: &str, kind: MailKind, context: &Value) -> Result<(), AppError>;
}

/// Abstracts the external payment provider for sweep-driven renewals.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Attempts to charge the instrument on file for the tenant. Returns the
    /// payment reference on success, None when nothing is on file or the
    /// charge was declined.
    async fn charge_on_file(&self, tenant_id: &str, plan: PlanKind, amount_cents: i64) -> Result<Option<String>, AppError>;
}
