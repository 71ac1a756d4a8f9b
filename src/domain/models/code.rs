use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A short-lived code mailed to a tenant owner, e.g. for account activation.
/// Expired rows are reaped by the hourly cleanup sweep.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct OneTimeCode {
    pub id: String,
    pub tenant_id: String,
    pub code: String,
    pub purpose: String,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

pub const PURPOSE_ACTIVATION: &str = "activation";

impl OneTimeCode {
    pub fn activation(tenant_id: String, ttl_hours: i64) -> Self {
        let code: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(char::from)
            .collect();

        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id,
            code,
            purpose: PURPOSE_ACTIVATION.to_string(),
            expires_at: now + Duration::hours(ttl_hours),
            consumed_at: None,
            created_at: now,
        }
    }
}
