use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::error::AppError;
use crate::infra::provisioner::{validate_db_name, StorageProvisioner, StoreExistence, TenantPool};

// duplicate_database: two creators raced, the other one won.
const PG_DUPLICATE_DATABASE: &str = "42P04";

/// One Postgres database per tenant, created through an admin connection to
/// the cluster's maintenance database.
pub struct PostgresProvisioner {
    admin_pool: PgPool,
    base_opts: PgConnectOptions,
    timeout: Duration,
    cache: RwLock<HashMap<String, PgPool>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    created: AtomicUsize,
}

impl PostgresProvisioner {
    pub fn new(admin_pool: PgPool, base_opts: PgConnectOptions, timeout: Duration) -> Self {
        Self {
            admin_pool,
            base_opts,
            timeout,
            cache: RwLock::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
            created: AtomicUsize::new(0),
        }
    }

    pub fn stores_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    async fn creation_lock(&self, db_name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(db_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn check_exists(&self, db_name: &str) -> Result<StoreExistence, AppError> {
        let row = sqlx::query("SELECT 1 FROM pg_database WHERE datname = $1")
            .bind(db_name)
            .fetch_optional(&self.admin_pool)
            .await
            .map_err(|e| AppError::Infrastructure(format!("Store existence check failed: {}", e)))?;

        Ok(if row.is_some() { StoreExistence::Found } else { StoreExistence::NotFound })
    }

    /// Idempotent: a lost creation race is a no-op, detected by SQLSTATE
    /// rather than error-message text.
    async fn create_database(&self, db_name: &str) -> Result<bool, AppError> {
        // CREATE DATABASE cannot be parameterized; db_name is validated
        // against a strict identifier format before reaching this point.
        let ddl = format!("CREATE DATABASE \"{}\" ENCODING 'UTF8' TEMPLATE template0", db_name);
        match sqlx::query(&ddl).execute(&self.admin_pool).await {
            Ok(_) => Ok(true),
            Err(e) => {
                let lost_race = e.as_database_error()
                    .map(|db_err| db_err.code().unwrap_or_default() == PG_DUPLICATE_DATABASE)
                    .unwrap_or(false);
                if lost_race {
                    Ok(false)
                } else {
                    Err(AppError::Infrastructure(format!("Failed to create store {}: {}", db_name, e)))
                }
            }
        }
    }

    async fn open_pool(&self, db_name: &str) -> Result<PgPool, AppError> {
        let opts = self.base_opts.clone().database(db_name);
        let connect = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(opts);

        tokio::time::timeout(self.timeout, connect)
            .await
            .map_err(|_| AppError::Infrastructure(format!("Provisioning timed out for {}", db_name)))?
            .map_err(|e| AppError::Infrastructure(format!("Failed to open store {}: {}", db_name, e)))
    }
}

#[async_trait]
impl StorageProvisioner for PostgresProvisioner {
    async fn get_handle(&self, db_name: &str) -> Result<TenantPool, AppError> {
        validate_db_name(db_name)?;

        if let Some(pool) = self.cache.read().await.get(db_name) {
            return Ok(TenantPool::Postgres(pool.clone()));
        }

        let key_lock = self.creation_lock(db_name).await;
        let _guard = key_lock.lock().await;

        if let Some(pool) = self.cache.read().await.get(db_name) {
            return Ok(TenantPool::Postgres(pool.clone()));
        }

        if self.check_exists(db_name).await? == StoreExistence::NotFound
            && self.create_database(db_name).await?
        {
            self.created.fetch_add(1, Ordering::SeqCst);
            info!(db_name = %db_name, "Tenant store created");
        }

        let pool = self.open_pool(db_name).await?;

        if let Err(e) = sqlx::migrate!("./migrations/tenant_postgres").run(&pool).await {
            pool.close().await;
            return Err(AppError::PartialProvision(format!(
                "Baseline schema failed for {}: {}", db_name, e
            )));
        }

        self.cache.write().await.insert(db_name.to_string(), pool.clone());
        Ok(TenantPool::Postgres(pool))
    }

    async fn close_handle(&self, db_name: &str) -> Result<(), AppError> {
        if let Some(pool) = self.cache.write().await.remove(db_name) {
            pool.close().await;
        }
        Ok(())
    }

    async fn close_all(&self) {
        let pools: Vec<PgPool> = self.cache.write().await.drain().map(|(_, p)| p).collect();
        for pool in pools {
            pool.close().await;
        }
    }
}
