use crate::domain::ports::{EmailService, MailKind};
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

pub struct HttpEmailService {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpEmailService {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
        }
    }
}

#[derive(Serialize)]
struct EmailPayload<'a> {
    to_addr: &'a str,
    template: &'static str,
    context: &'a Value,
}

#[async_trait]
impl EmailService for HttpEmailService {
    async fn send(&self, recipient: &str, kind: MailKind, context: &Value) -> Result<(), AppError> {
        let payload = EmailPayload {
            to_addr: recipient,
            template: kind.as_str(),
            context,
        };

        let res = self.client.post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                let msg = format!("Email service connection error: {}", e);
                error!("{}", msg);
                AppError::Infrastructure(msg)
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            let msg = format!("Email service failed. Status: {}, Body: {}", status, text);
            error!("{}", msg);
            return Err(AppError::Infrastructure(msg));
        }

        Ok(())
    }
}
