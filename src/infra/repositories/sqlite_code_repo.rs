use crate::domain::{models::code::OneTimeCode, ports::CodeRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

pub struct SqliteCodeRepo {
    pool: SqlitePool,
}

impl SqliteCodeRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CodeRepository for SqliteCodeRepo {
    async fn create(&self, code: &OneTimeCode) -> Result<OneTimeCode, AppError> {
        sqlx::query_as::<_, OneTimeCode>(
            "INSERT INTO one_time_codes (id, tenant_id, code, purpose, expires_at, consumed_at, created_at) VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING *"
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
            "SELECT * FROM one_time_codes WHERE tenant_id = ? AND code = ? AND consumed_at IS NULL AND expires_at > ?"
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
            "UPDATE one_time_codes SET consumed_at = ? WHERE id = ? AND consumed_at IS NULL"
        )
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM one_time_codes WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(result.rows_affected())
    }
}
