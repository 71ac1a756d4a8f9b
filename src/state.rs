use std::sync::Arc;
use crate::config::Config;
use crate::domain::models::plan::PlanCatalog;
use crate::domain::ports::{
    CodeRepository, EmailService, PaymentService, SubscriptionRepository,
    TenantRepository, UserRepository,
};
use crate::domain::services::{directory::TenantDirectory, ledger::SubscriptionLedger};
use crate::infra::provisioner::StorageProvisioner;
use tower_cookies::Key;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub tenant_repo: Arc<dyn TenantRepository>,
    pub user_repo: Arc<dyn UserRepository>,
    pub subscription_repo: Arc<dyn SubscriptionRepository>,
    pub code_repo: Arc<dyn CodeRepository>,
    pub provisioner: Arc<dyn StorageProvisioner>,
    pub directory: Arc<TenantDirectory>,
    pub ledger: Arc<SubscriptionLedger>,
    pub catalog: Arc<PlanCatalog>,
    pub email_service: Arc<dyn EmailService>,
    pub payment_service: Arc<dyn PaymentService>,
    pub session_key: Key,
}
