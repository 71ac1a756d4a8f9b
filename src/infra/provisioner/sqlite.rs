use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::error::AppError;
use crate::infra::provisioner::{validate_db_name, StorageProvisioner, StoreExistence, TenantPool};

/// One SQLite database file per tenant under `dir`. Handles are cached per
/// process; creation is serialized with a per-key lock so unrelated tenants
/// never block each other.
pub struct SqliteProvisioner {
    dir: PathBuf,
    timeout: Duration,
    cache: RwLock<HashMap<String, SqlitePool>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    created: AtomicUsize,
}

impl SqliteProvisioner {
    pub fn new(dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            dir: dir.into(),
            timeout,
            cache: RwLock::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
            created: AtomicUsize::new(0),
        }
    }

    /// Number of physical stores this instance has created. Observability
    /// hook; also pins the at-most-one-creation guarantee in tests.
    pub fn stores_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    async fn creation_lock(&self, db_name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(db_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn db_path(&self, db_name: &str) -> PathBuf {
        self.dir.join(format!("{}.db", db_name))
    }

    async fn check_exists(&self, db_name: &str) -> Result<StoreExistence, AppError> {
        match tokio::fs::try_exists(self.db_path(db_name)).await {
            Ok(true) => Ok(StoreExistence::Found),
            Ok(false) => Ok(StoreExistence::NotFound),
            Err(e) => Err(AppError::Infrastructure(format!("Store existence check failed: {}", e))),
        }
    }

    async fn open_pool(&self, db_name: &str, create: bool) -> Result<SqlitePool, AppError> {
        let opts = SqliteConnectOptions::new()
            .filename(self.db_path(db_name))
            .create_if_missing(create)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let connect = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts);

        tokio::time::timeout(self.timeout, connect)
            .await
            .map_err(|_| AppError::Infrastructure(format!("Provisioning timed out for {}", db_name)))?
            .map_err(|e| AppError::Infrastructure(format!("Failed to open store {}: {}", db_name, e)))
    }
}

#[async_trait]
impl StorageProvisioner for SqliteProvisioner {
    async fn get_handle(&self, db_name: &str) -> Result<TenantPool, AppError> {
        validate_db_name(db_name)?;

        if let Some(pool) = self.cache.read().await.get(db_name) {
            return Ok(TenantPool::Sqlite(pool.clone()));
        }

        let key_lock = self.creation_lock(db_name).await;
        let _guard = key_lock.lock().await;

        // Another caller may have provisioned while we waited on the lock.
        if let Some(pool) = self.cache.read().await.get(db_name) {
            return Ok(TenantPool::Sqlite(pool.clone()));
        }

        if tokio::fs::create_dir_all(&self.dir).await.is_err() {
            return Err(AppError::Infrastructure(format!(
                "Cannot create tenant data directory {}", self.dir.display()
            )));
        }

        let creating = self.check_exists(db_name).await? == StoreExistence::NotFound;
        let pool = self.open_pool(db_name, creating).await?;

        if creating {
            self.created.fetch_add(1, Ordering::SeqCst);
            info!(db_name = %db_name, "Tenant store created");
        }

        // Store exists from here on; a schema failure is recoverable by
        // re-applying migrations on the next call, not by re-creating.
        if let Err(e) = sqlx::migrate!("./migrations/tenant_sqlite").run(&pool).await {
            pool.close().await;
            return Err(AppError::PartialProvision(format!(
                "Baseline schema failed for {}: {}", db_name, e
            )));
        }

        self.cache.write().await.insert(db_name.to_string(), pool.clone());
        Ok(TenantPool::Sqlite(pool))
    }

    async fn close_handle(&self, db_name: &str) -> Result<(), AppError> {
        if let Some(pool) = self.cache.write().await.remove(db_name) {
            pool.close().await;
        }
        Ok(())
    }

    async fn close_all(&self) {
        let pools: Vec<SqlitePool> = self.cache.write().await.drain().map(|(_, p)| p).collect();
        for pool in pools {
            pool.close().await;
        }
    }
}
