pub mod postgres;
pub mod sqlite;

use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{PgPool, SqlitePool};

pub use postgres::PostgresProvisioner;
pub use sqlite::SqliteProvisioner;

/// A live, pooled connection handle bound to one tenant's dedicated store.
#[derive(Debug, Clone)]
pub enum TenantPool {
    Sqlite(SqlitePool),
    Postgres(PgPool),
}

impl TenantPool {
    pub async fn close(&self) {
        match self {
            TenantPool::Sqlite(p) => p.close().await,
            TenantPool::Postgres(p) => p.close().await,
        }
    }

    pub fn is_closed(&self) -> bool {
        match self {
            TenantPool::Sqlite(p) => p.is_closed(),
            TenantPool::Postgres(p) => p.is_closed(),
        }
    }
}

/// Typed result of the store existence check. Deciding create-vs-open on a
/// parsed variant keeps error text out of control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreExistence {
    Found,
    NotFound,
}

/// Guarantees a physical per-tenant store exists and hands out cached pooled
/// handles. Implementations serialize creation per key, never globally, and
/// commit nothing to the cache on failure.
#[async_trait]
pub trait StorageProvisioner: Send + Sync {
    async fn get_handle(&self, db_name: &str) -> Result<TenantPool, AppError>;
    async fn close_handle(&self, db_name: &str) -> Result<(), AppError>;
    /// Releases every cached handle. Safe to call more than once.
    async fn close_all(&self);
}

/// Tenant store names are derived from UUIDs and interpolated into DDL, so
/// the format is checked strictly rather than escaped.
pub fn validate_db_name(name: &str) -> Result<(), AppError> {
    let valid = name.len() <= 64
        && name.starts_with("tenant_")
        && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(format!("Invalid tenant database name: {}", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_name_format() {
        assert!(validate_db_name("tenant_7b2a9c1e_90ab_4ef0_8f13_1a2b3c4d5e6f").is_ok());
        assert!(validate_db_name("tenant_").is_ok());
        assert!(validate_db_name("products").is_err());
        assert!(validate_db_name("tenant_x; DROP TABLE tenants").is_err());
        assert!(validate_db_name("tenant_ABC").is_err());
    }
}
