use crate::domain::{models::code::OneTimeCode, ports::CodeRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

pub struct PostgresCodeRepo {
    pool: PgPool,
}

impl PostgresCodeRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CodeRepository for PostgresCodeRepo {
    async fn create(&self, code: &OneTimeCode) -> Result<OneTimeCode, AppError> {
        sqlx::query_as::<_, OneTimeCode>(
            "INSERT INTO one_time_codes (id, tenant_id, code, purpose, expires_at, consumed_at, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *"
        )
            .bind(&code.id)
            .bind(&code.tenant_id)
            .bind(&code.code)
            .bind(&code.purpose)
            .bind(code.expires_at)
            .bind(code.consumed_at)
            .bind(code.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_valid(&self, tenant_id: &str, code: &str, now: DateTime<Utc>) -> Result<Option<OneTimeCode>, AppError> {
        sqlx::query_as::<_, OneTimeCode>(
            "SELECT * FROM one_time_codes WHERE tenant_id = $1 AND code = $2 AND consumed_at IS NULL AND expires_at > $3"
        )
            .bind(tenant_id)
            .bind(code)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn consume(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE one_time_codes SET consumed_at = $1 WHERE id = $2 AND consumed_at IS NULL"
        )
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM one_time_codes WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected())
    }
}
