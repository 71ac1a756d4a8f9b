use crate::domain::{models::plan::PlanKind, ports::PaymentService};
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Talks to the external billing provider. Only the abstract
/// "charge the instrument on file" operation is modeled here; checkout,
/// webhooks signature handling etc. live with the provider.
pub struct HttpPaymentService {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpPaymentService {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
        }
    }
}

#[derive(Serialize)]
struct ChargePayload<'a> {
    tenant_id: &'a str,
    plan: &'static str,
    amount_cents: i64,
}

#[derive(Deserialize)]
struct ChargeResult {
    charged: bool,
    payment_ref: Option<String>,
}

#[async_trait]
impl PaymentService for HttpPaymentService {
    async fn charge_on_file(&self, tenant_id: &str, plan: PlanKind, amount_cents: i64) -> Result<Option<String>, AppError> {
        let payload = ChargePayload {
            tenant_id,
            plan: plan.as_str(),
            amount_cents,
        };

        let res = self.client.post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                let msg = format!("Billing service connection error: {}", e);
                error!("{}", msg);
                AppError::Infrastructure(msg)
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            let msg = format!("Billing service failed. Status: {}, Body: {}", status, text);
            error!("{}", msg);
            return Err(AppError::Infrastructure(msg));
        }

        let result: ChargeResult = res.json().await.map_err(|e| {
            AppError::Infrastructure(format!("Billing service returned malformed body: {}", e))
        })?;

        Ok(if result.charged { result.payment_ref } else { None })
    }
}
