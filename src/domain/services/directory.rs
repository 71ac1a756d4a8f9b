use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::models::{code::OneTimeCode, tenant::{Tenant, TenantStatus}, user::User};
use crate::domain::ports::{CodeRepository, EmailService, MailKind, SubscriptionRepository, TenantRepository, UserRepository};
use crate::error::AppError;

const ACTIVATION_CODE_TTL_HOURS: i64 = 24;

/// Outcome of a resolution attempt. Creation happens in exactly one place
/// (`resolve`), so callers composing this into middleware stay
/// side-effect-transparent.
#[derive(Debug, Clone)]
pub enum Resolution {
    Existing(Tenant),
    Created(Tenant),
    Rejected(RejectReason),
}

#[derive(Debug, Clone)]
pub enum RejectReason {
    /// The tenant already has a user or a subscription bound to it.
    AlreadyBound(String),
}

impl Resolution {
    pub fn tenant(&self) -> Option<&Tenant> {
        match self {
            Resolution::Existing(t) | Resolution::Created(t) => Some(t),
            Resolution::Rejected(_) => None,
        }
    }
}

pub struct TenantDirectory {
    tenant_repo: Arc<dyn TenantRepository>,
    user_repo: Arc<dyn UserRepository>,
    subscription_repo: Arc<dyn SubscriptionRepository>,
    code_repo: Arc<dyn CodeRepository>,
    email_service: Arc<dyn EmailService>,
}

impl TenantDirectory {
    pub fn new(
        tenant_repo: Arc<dyn TenantRepository>,
        user_repo: Arc<dyn UserRepository>,
        subscription_repo: Arc<dyn SubscriptionRepository>,
        code_repo: Arc<dyn CodeRepository>,
        email_service: Arc<dyn EmailService>,
    ) -> Self {
        Self { tenant_repo, user_repo, subscription_repo, code_repo, email_service }
    }

    /// Plain resolution: maps a candidate id to a tenant row, creating a
    /// provisional one when none exists. Retried requests with the same id
    /// cannot create duplicates; the insert is conditional on the id.
    pub async fn resolve(&self, candidate: Option<&str>) -> Result<Resolution, AppError> {
        let candidate = candidate.map(str::trim).filter(|c| !c.is_empty());

        if let Some(id) = candidate {
            validate_tenant_id(id)?;

            if let Some(tenant) = self.tenant_repo.find_by_id(id).await? {
                return Ok(Resolution::Existing(tenant));
            }

            let (tenant, created) = self.tenant_repo
                .create_if_absent(&Tenant::provisional(Some(id.to_string())))
                .await?;

            if created {
                info!(tenant_id = %tenant.id, "Tenant created from unresolved id");
                Ok(Resolution::Created(tenant))
            } else {
                Ok(Resolution::Existing(tenant))
            }
        } else {
            let (tenant, _) = self.tenant_repo
                .create_if_absent(&Tenant::provisional(None))
                .await?;
            info!(tenant_id = %tenant.id, "Fresh tenant created on first contact");
            Ok(Resolution::Created(tenant))
        }
    }

    /// Creation/binding path used at signup: resolves the tenant, then binds
    /// the owner account to it. A tenant that already carries a user or a
    /// subscription is never silently overwritten.
    pub async fn claim(
        &self,
        candidate: Option<&str>,
        owner_name: &str,
        owner_email: &str,
        phone: Option<String>,
        address: Option<String>,
    ) -> Result<Resolution, AppError> {
        if owner_email.trim().is_empty() || !owner_email.contains('@') {
            return Err(AppError::Validation("A valid contact email is required".to_string()));
        }

        if let Some(existing) = self.tenant_repo.find_by_email(owner_email).await? {
            if candidate != Some(existing.id.as_str()) {
                return Err(AppError::Conflict("Contact email already in use".to_string()));
            }
        }

        let resolution = self.resolve(candidate).await?;
        let mut tenant = match resolution {
            Resolution::Existing(t) | Resolution::Created(t) => t,
            Resolution::Rejected(r) => return Ok(Resolution::Rejected(r)),
        };

        let users = self.user_repo.count_by_tenant(&tenant.id).await?;
        let subs = self.subscription_repo.count_by_tenant(&tenant.id).await?;
        if users > 0 || subs > 0 {
            warn!(tenant_id = %tenant.id, "Claim rejected: tenant already bound");
            return Ok(Resolution::Rejected(RejectReason::AlreadyBound(
                "Tenant is already bound to an account".to_string(),
            )));
        }

        tenant.name = owner_name.to_string();
        tenant.email = owner_email.to_string();
        tenant.phone = phone;
        tenant.address = address;
        tenant.status = TenantStatus::PendingActivation;
        let tenant = self.tenant_repo.update(&tenant).await?;

        let owner = User::new(tenant.id.clone(), owner_name.to_string(), owner_email.to_string());
        self.user_repo.create(&owner).await?;

        let code = OneTimeCode::activation(tenant.id.clone(), ACTIVATION_CODE_TTL_HOURS);
        self.code_repo.create(&code).await?;

        // Mail failures must not fail the claim itself.
        let context = json!({
            "tenant_name": tenant.name,
            "activation_code": code.code,
            "expires_at": code.expires_at,
        });
        if let Err(e) = self.email_service.send(&tenant.email, MailKind::Activation, &context).await {
            warn!(tenant_id = %tenant.id, "Failed to send activation mail: {}", e);
        }

        info!(tenant_id = %tenant.id, "Tenant claimed, pending activation");
        Ok(Resolution::Created(tenant))
    }

    /// Consumes an activation code and moves the tenant to active.
    pub async fn activate(&self, tenant_id: &str, code: &str) -> Result<Tenant, AppError> {
        validate_tenant_id(tenant_id)?;

        let record = self.code_repo
            .find_valid(tenant_id, code, chrono::Utc::now())
            .await?
            .ok_or_else(|| AppError::Validation("Invalid or expired activation code".to_string()))?;

        if !self.code_repo.consume(&record.id).await? {
            return Err(AppError::Conflict("Activation code already used".to_string()));
        }

        self.tenant_repo.set_status(tenant_id, TenantStatus::Active).await?;
        let tenant = self.tenant_repo.find_by_id(tenant_id).await?
            .ok_or_else(|| AppError::NotFound("Tenant not found".to_string()))?;

        info!(tenant_id = %tenant_id, "Tenant activated");
        Ok(tenant)
    }
}

pub fn validate_tenant_id(id: &str) -> Result<(), AppError> {
    Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| AppError::Validation(format!("Malformed tenant id: {}", id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_id_format_is_uuid() {
        assert!(validate_tenant_id("7b2a9c1e-90ab-4ef0-8f13-1a2b3c4d5e6f").is_ok());
        assert!(validate_tenant_id("not-a-uuid").is_err());
        assert!(validate_tenant_id("").is_err());
    }
}
