use crate::domain::{models::tenant::{Tenant, TenantStatus}, ports::TenantRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

pub struct PostgresTenantRepo {
    pool: PgPool,
}

impl PostgresTenantRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantRepository for PostgresTenantRepo {
    async fn create_if_absent(&self, tenant: &Tenant) -> Result<(Tenant, bool), AppError> {
        let result = sqlx::query(
            "INSERT INTO tenants (id, name, email, phone, address, status, subscription_type, subscription_start_date, subscription_end_date, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) ON CONFLICT (id) DO NOTHING"
        )
            .bind(&tenant.id)
            .bind(&tenant.name)
            .bind(&tenant.email)
            .bind(&tenant.phone)
            .bind(&tenant.address)
            .bind(tenant.status)
            .bind(&tenant.subscription_type)
            .bind(tenant.subscription_start_date)
            .bind(tenant.subscription_end_date)
            .bind(tenant.created_at)
            .bind(tenant.updated_at)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;

        let created = result.rows_affected() > 0;
        let row = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
            .bind(&tenant.id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok((row, created))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Tenant>, AppError> {
        sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Tenant>, AppError> {
        sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn update(&self, tenant: &Tenant) -> Result<Tenant, AppError> {
        sqlx::query_as::<_, Tenant>(
            "UPDATE tenants SET name=$1, email=$2, phone=$3, address=$4, status=$5, updated_at=$6 WHERE id=$7 RETURNING *"
        )
            .bind(&tenant.name)
            .bind(&tenant.email)
            .bind(&tenant.phone)
            .bind(&tenant.address)
            .bind(tenant.status)
            .bind(Utc::now())
            .bind(&tenant.id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn set_status(&self, id: &str, status: TenantStatus) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE tenants SET status=$1, updated_at=$2 WHERE id=$3")
            .bind(status)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Tenant not found".into()));
        }
        Ok(())
    }

    async fn update_subscription_snapshot(
        &self,
        id: &str,
        plan_label: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE tenants SET subscription_type=$1, subscription_start_date=$2, subscription_end_date=$3, updated_at=$4 WHERE id=$5"
        )
            .bind(plan_label)
            .bind(start)
            .bind(end)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Tenant not found".into()));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        // Users, subscriptions and codes cascade via FK constraints.
        let result = sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Tenant not found".into()));
        }
        Ok(())
    }
}
