use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tenant_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Inactive,
    PendingActivation,
    Active,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: TenantStatus,
    pub subscription_type: Option<String>,
    pub subscription_start_date: Option<DateTime<Utc>>,
    pub subscription_end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// A tenant created on first contact, before anyone has claimed it.
    /// Placeholder name/email are derived from the id; the subscription
    /// snapshot is pre-filled with a 3-month trial window.
    pub fn provisional(id: Option<String>) -> Self {
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let short = &id[..8.min(id.len())];
        let now = Utc::now();
        Self {
            name: format!("tenant-{}", short),
            email: format!("{}@pending.invalid", id),
            phone: None,
            address: None,
            status: TenantStatus::Inactive,
            subscription_type: Some("trial".to_string()),
            subscription_start_date: Some(now),
            subscription_end_date: Some(now + Duration::days(90)),
            created_at: now,
            updated_at: now,
            id,
        }
    }

    /// Name of this tenant's dedicated data store. Dashes are not valid in
    /// database identifiers, so the UUID is flattened.
    pub fn db_name(&self) -> String {
        format!("tenant_{}", self.id.replace('-', "_"))
    }
}
