use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{error, info, warn};

use crate::domain::models::{plan::PlanCatalog, subscription::Subscription};
use crate::domain::ports::{EmailService, MailKind, PaymentService, SubscriptionRepository, TenantRepository, UserRepository};
use crate::error::AppError;

/// Owns the subscription state machine:
/// active -> expired (clock), active -> cancelled (explicit),
/// expired -> renewed (payment on file). cancelled is terminal.
/// Every transition is a conditional update guarded by the prior status, so
/// concurrent sweeps and request-triggered checks commute.
pub struct SubscriptionLedger {
    subscription_repo: Arc<dyn SubscriptionRepository>,
    tenant_repo: Arc<dyn TenantRepository>,
    user_repo: Arc<dyn UserRepository>,
    email_service: Arc<dyn EmailService>,
    payment_service: Arc<dyn PaymentService>,
    catalog: Arc<PlanCatalog>,
}

impl SubscriptionLedger {
    pub fn new(
        subscription_repo: Arc<dyn SubscriptionRepository>,
        tenant_repo: Arc<dyn TenantRepository>,
        user_repo: Arc<dyn UserRepository>,
        email_service: Arc<dyn EmailService>,
        payment_service: Arc<dyn PaymentService>,
        catalog: Arc<PlanCatalog>,
    ) -> Self {
        Self { subscription_repo, tenant_repo, user_repo, email_service, payment_service, catalog }
    }

    pub async fn create(
        &self,
        tenant_id: &str,
        user_id: &str,
        plan_name: &str,
        payment_ref: Option<String>,
    ) -> Result<Subscription, AppError> {
        let plan = self.catalog.find_by_name(plan_name)
            .ok_or_else(|| AppError::Validation(format!("Unknown plan: {}", plan_name)))?;

        if plan.kind == crate::domain::models::plan::PlanKind::Trial
            && self.subscription_repo.has_used_trial(tenant_id).await?
        {
            return Err(AppError::Conflict("Free trial already used for this tenant".to_string()));
        }

        let sub = Subscription::new(tenant_id.to_string(), user_id.to_string(), plan, payment_ref);
        let created = self.subscription_repo.create_exclusive(&sub).await?;

        self.tenant_repo
            .update_subscription_snapshot(tenant_id, plan.kind.as_str(), created.start_date, created.end_date)
            .await?;

        info!(tenant_id = %tenant_id, plan = plan.kind.as_str(), "Subscription created");
        Ok(created)
    }

    pub async fn cancel(&self, tenant_id: &str, subscription_id: &str) -> Result<Subscription, AppError> {
        let cancelled = self.subscription_repo
            .mark_cancelled(tenant_id, subscription_id)
            .await?
            .ok_or_else(|| AppError::NotFound("No matching active subscription".to_string()))?;

        info!(tenant_id = %tenant_id, subscription_id = %subscription_id, "Subscription cancelled");
        Ok(cancelled)
    }

    /// Re-points the active subscription at a new plan. The window is reset
    /// to (now, now + plan.duration); remaining time on the old plan is
    /// discarded rather than carried over.
    pub async fn upgrade(&self, tenant_id: &str, new_plan_name: &str) -> Result<Subscription, AppError> {
        let plan = self.catalog.find_by_name(new_plan_name)
            .ok_or_else(|| AppError::Validation(format!("Unknown plan: {}", new_plan_name)))?;

        let now = Utc::now();
        let end = now + plan.duration();
        let updated = self.subscription_repo
            .update_plan(tenant_id, plan.kind, now, end, None)
            .await?
            .ok_or_else(|| AppError::NotFound("Tenant has no active subscription".to_string()))?;

        self.tenant_repo
            .update_subscription_snapshot(tenant_id, plan.kind.as_str(), now, end)
            .await?;

        info!(tenant_id = %tenant_id, plan = plan.kind.as_str(), "Subscription upgraded");
        Ok(updated)
    }

    pub async fn get_status(&self, tenant_id: &str) -> Result<Subscription, AppError> {
        self.subscription_repo.find_active(tenant_id).await?
            .ok_or_else(|| AppError::NotFound("Tenant has no active subscription".to_string()))
    }

    pub async fn list(&self, tenant_id: &str) -> Result<Vec<Subscription>, AppError> {
        self.subscription_repo.list_by_tenant(tenant_id).await
    }

    /// Entry point for the payment provider webhook. Equivalent to `create`
    /// when the tenant holds no subscription, `upgrade` otherwise.
    pub async fn confirm_payment(
        &self,
        tenant_id: &str,
        plan_name: &str,
        payment_ref: &str,
    ) -> Result<Subscription, AppError> {
        if self.subscription_repo.find_active(tenant_id).await?.is_some() {
            let plan = self.catalog.find_by_name(plan_name)
                .ok_or_else(|| AppError::Validation(format!("Unknown plan: {}", plan_name)))?;
            let now = Utc::now();
            let end = now + plan.duration();
            let updated = self.subscription_repo
                .update_plan(tenant_id, plan.kind, now, end, Some(payment_ref))
                .await?
                .ok_or_else(|| AppError::NotFound("Tenant has no active subscription".to_string()))?;
            self.tenant_repo
                .update_subscription_snapshot(tenant_id, plan.kind.as_str(), now, end)
                .await?;
            return Ok(updated);
        }

        let owner = self.user_repo.find_owner(tenant_id).await?
            .ok_or_else(|| AppError::NotFound("Tenant has no owner account".to_string()))?;
        self.create(tenant_id, &owner.id, plan_name, Some(payment_ref.to_string())).await
    }

    /// Bulk expiry pass. Idempotent: each transition is guarded by the
    /// current status, so a second immediate run (or a concurrent one) finds
    /// nothing left to do. One failing tenant never aborts the batch.
    pub async fn check_and_deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let due = self.subscription_repo.find_expired_active(now).await?;
        let mut transitioned = 0u64;

        for sub in due {
            match self.subscription_repo.mark_expired(&sub.id).await {
                Ok(true) => {}
                // Another sweep got there first.
                Ok(false) => continue,
                Err(e) => {
                    error!(tenant_id = %sub.tenant_id, subscription_id = %sub.id,
                        "Expiry transition failed: {}", e);
                    continue;
                }
            }
            transitioned += 1;
            info!(tenant_id = %sub.tenant_id, subscription_id = %sub.id, "Subscription expired");

            if let Err(e) = self.attempt_renewal(&sub, now).await {
                error!(tenant_id = %sub.tenant_id, subscription_id = %sub.id,
                    "Renewal attempt failed: {}", e);
            }
        }

        Ok(transitioned)
    }

    async fn attempt_renewal(&self, sub: &Subscription, now: DateTime<Utc>) -> Result<(), AppError> {
        let plan = self.catalog.get(sub.plan);
        let tenant = match self.tenant_repo.find_by_id(&sub.tenant_id).await? {
            Some(t) => t,
            None => return Err(AppError::NotFound(format!("Tenant {} not found", sub.tenant_id))),
        };

        let charged = self.payment_service
            .charge_on_file(&sub.tenant_id, sub.plan, plan.price_cents)
            .await?;

        match charged {
            Some(payment_ref) => {
                let new_end = now + plan.duration();
                if self.subscription_repo.mark_renewed(&sub.id, new_end, &payment_ref).await? {
                    self.tenant_repo
                        .update_subscription_snapshot(&sub.tenant_id, sub.plan.as_str(), now, new_end)
                        .await?;
                    info!(tenant_id = %sub.tenant_id, subscription_id = %sub.id, "Subscription renewed");

                    let context = json!({
                        "tenant_name": tenant.name,
                        "plan": sub.plan.as_str(),
                        "expires_at": new_end,
                    });
                    if let Err(e) = self.email_service.send(&tenant.email, MailKind::RenewalConfirmation, &context).await {
                        warn!(tenant_id = %sub.tenant_id, "Failed to send renewal mail: {}", e);
                    }
                }
            }
            None => {
                let context = json!({
                    "tenant_name": tenant.name,
                    "plan": sub.plan.as_str(),
                    "expired_at": sub.end_date,
                });
                if let Err(e) = self.email_service.send(&tenant.email, MailKind::ExpiryNotice, &context).await {
                    warn!(tenant_id = %sub.tenant_id, "Failed to send expiry mail: {}", e);
                }
            }
        }

        Ok(())
    }
}
