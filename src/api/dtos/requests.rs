use serde::Deserialize;

#[derive(Deserialize)]
pub struct SignupRequest {
    /// Optional body-level tenant hint; takes effect when no header hint
    /// was supplied.
    pub tenant_id: Option<String>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Deserialize)]
pub struct ActivateRequest {
    pub tenant_id: String,
    pub code: String,
}

#[derive(Deserialize)]
pub struct CreateSubscriptionRequest {
    pub user_id: String,
    pub plan: String,
    pub payment_ref: Option<String>,
}

#[derive(Deserialize)]
pub struct UpgradeSubscriptionRequest {
    pub plan: String,
}

#[derive(Deserialize)]
pub struct ConfirmPaymentRequest {
    pub tenant_id: String,
    pub plan: String,
    pub payment_ref: String,
}
