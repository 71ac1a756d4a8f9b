use crate::domain::{
    models::{plan::PlanKind, subscription::{Subscription, SubscriptionStatus}},
    ports::SubscriptionRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

pub struct PostgresSubscriptionRepo {
    pool: PgPool,
}

impl PostgresSubscriptionRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepo {
    async fn create_exclusive(&self, sub: &Subscription) -> Result<Subscription, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        // The tenant row doubles as a per-tenant advisory lock: concurrent
        // creators for the same tenant serialize here, unrelated tenants
        // proceed in parallel.
        sqlx::query("SELECT id FROM tenants WHERE id = $1 FOR UPDATE")
            .bind(&sub.tenant_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Tenant not found".to_string()))?;

        let existing = sqlx::query(
            "SELECT id FROM subscriptions WHERE tenant_id = $1 AND status IN ('active', 'renewed')"
        )
            .bind(&sub.tenant_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::Database)?;
        if existing.is_some() {
            return Err(AppError::Conflict("Tenant already has an active subscription".into()));
        }

        let created = sqlx::query_as::<_, Subscription>(
            "INSERT INTO subscriptions (id, tenant_id, user_id, plan, start_date, end_date, status, is_free_trial_used, payment_ref, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *"
        )
            .bind(&sub.id)
            .bind(&sub.tenant_id)
            .bind(&sub.user_id)
            .bind(sub.plan)
            .bind(sub.start_date)
            .bind(sub.end_date)
            .bind(sub.status)
            .bind(sub.is_free_trial_used)
            .bind(&sub.payment_ref)
            .bind(sub.created_at)
            .bind(sub.updated_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(created)
    }

    async fn find_by_id(&self, tenant_id: &str, id: &str) -> Result<Option<Subscription>, AppError> {
        sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_active(&self, tenant_id: &str) -> Result<Option<Subscription>, AppError> {
        sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE tenant_id = $1 AND status IN ('active', 'renewed')"
        )
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_by_tenant(&self, tenant_id: &str) -> Result<Vec<Subscription>, AppError> {
        sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE tenant_id = $1 ORDER BY created_at DESC"
        )
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn count_by_tenant(&self, tenant_id: &str) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM subscriptions WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(row.get::<i64, _>("count"))
    }

    async fn has_used_trial(&self, tenant_id: &str) -> Result<bool, AppError> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM subscriptions WHERE tenant_id = $1 AND is_free_trial_used = TRUE"
        )
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(row.get::<i64, _>("count") > 0)
    }

    async fn mark_expired(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE subscriptions SET status='expired', updated_at=$1 WHERE id=$2 AND status IN ('active', 'renewed')"
        )
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_renewed(&self, id: &str, new_end: DateTime<Utc>, payment_ref: &str) -> Result<bool, AppError> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE subscriptions SET status='renewed', start_date=$1, end_date=$2, payment_ref=$3, updated_at=$4 WHERE id=$5 AND status='expired'"
        )
            .bind(now)
            .bind(new_end)
            .bind(payment_ref)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_cancelled(&self, tenant_id: &str, id: &str) -> Result<Option<Subscription>, AppError> {
        sqlx::query_as::<_, Subscription>(
            "UPDATE subscriptions SET status='cancelled', updated_at=$1 WHERE id=$2 AND tenant_id=$3 AND status IN ('active', 'renewed') RETURNING *"
        )
            .bind(Utc::now())
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn update_plan(
        &self,
        tenant_id: &str,
        plan: PlanKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        payment_ref: Option<&str>,
    ) -> Result<Option<Subscription>, AppError> {
        sqlx::query_as::<_, Subscription>(
            "UPDATE subscriptions SET plan=$1, start_date=$2, end_date=$3, payment_ref=COALESCE($4, payment_ref), updated_at=$5 WHERE tenant_id=$6 AND status IN ('active', 'renewed') RETURNING *"
        )
            .bind(plan)
            .bind(start)
            .bind(end)
            .bind(payment_ref)
            .bind(Utc::now())
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_expired_active(&self, now: DateTime<Utc>) -> Result<Vec<Subscription>, AppError> {
        sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE status IN ('active', 'renewed') AND end_date < $1"
        )
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn transition(
        &self,
        id: &str,
        from: SubscriptionStatus,
        to: SubscriptionStatus,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE subscriptions SET status=$1, updated_at=$2 WHERE id=$3 AND status=$4"
        )
            .bind(to)
            .bind(Utc::now())
            .bind(id)
            .bind(from)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }
}
