use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::{postgres::{PgConnectOptions, PgPoolOptions}, sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions}};
use sqlx::{ConnectOptions, PgPool, SqlitePool};
use tower_cookies::Key;
use tracing::info;
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::domain::models::plan::PlanCatalog;
use crate::domain::services::{directory::TenantDirectory, ledger::SubscriptionLedger};
use crate::infra::email::http_email_service::HttpEmailService;
use crate::infra::payment::http_payment_service::HttpPaymentService;
use crate::infra::provisioner::{PostgresProvisioner, SqliteProvisioner};
use crate::infra::repositories::{
    postgres_code_repo::PostgresCodeRepo, postgres_subscription_repo::PostgresSubscriptionRepo,
    postgres_tenant_repo::PostgresTenantRepo, postgres_user_repo::PostgresUserRepo,
    sqlite_code_repo::SqliteCodeRepo, sqlite_subscription_repo::SqliteSubscriptionRepo,
    sqlite_tenant_repo::SqliteTenantRepo, sqlite_user_repo::SqliteUserRepo,
};
use crate::state::AppState;

pub async fn bootstrap_state(config: &Config) -> AppState {
    let database_url = &config.database_url;

    let email_service = Arc::new(HttpEmailService::new(
        config.mail_service_url.clone(),
        config.mail_service_token.clone(),
    ));
    let payment_service = Arc::new(HttpPaymentService::new(
        config.billing_service_url.clone(),
        config.billing_service_token.clone(),
    ));
    let catalog = Arc::new(PlanCatalog::standard());
    let session_key = Key::from(config.session_key.as_bytes());
    let provision_timeout = Duration::from_secs(config.provision_timeout_secs);

    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Initializing PostgreSQL connection...");

        let mut opts: PgConnectOptions = database_url.parse().expect("Invalid Postgres URL");
        opts = opts.log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(opts.clone())
            .await
            .expect("Failed to connect to Postgres");

        run_postgres_migrations(&pool).await;

        let tenant_repo = Arc::new(PostgresTenantRepo::new(pool.clone()));
        let user_repo = Arc::new(PostgresUserRepo::new(pool.clone()));
        let subscription_repo = Arc::new(PostgresSubscriptionRepo::new(pool.clone()));
        let code_repo = Arc::new(PostgresCodeRepo::new(pool.clone()));
        let provisioner = Arc::new(PostgresProvisioner::new(pool.clone(), opts, provision_timeout));

        let directory = Arc::new(TenantDirectory::new(
            tenant_repo.clone(),
            user_repo.clone(),
            subscription_repo.clone(),
            code_repo.clone(),
            email_service.clone(),
        ));
        let ledger = Arc::new(SubscriptionLedger::new(
            subscription_repo.clone(),
            tenant_repo.clone(),
            user_repo.clone(),
            email_service.clone(),
            payment_service.clone(),
            catalog.clone(),
        ));

        AppState {
            config: config.clone(),
            tenant_repo,
            user_repo,
            subscription_repo,
            code_repo,
            provisioner,
            directory,
            ledger,
            catalog,
            email_service,
            payment_service,
            session_key,
        }
    } else {
        info!("Initializing SQLite connection with WAL Mode...");

        let opts = SqliteConnectOptions::from_str(database_url)
            .expect("Invalid SQLite connection string")
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .expect("Failed to connect to SQLite");

        run_sqlite_migrations(&pool).await;

        let tenant_repo = Arc::new(SqliteTenantRepo::new(pool.clone()));
        let user_repo = Arc::new(SqliteUserRepo::new(pool.clone()));
        let subscription_repo = Arc::new(SqliteSubscriptionRepo::new(pool.clone()));
        let code_repo = Arc::new(SqliteCodeRepo::new(pool.clone()));
        let provisioner = Arc::new(SqliteProvisioner::new(
            config.tenant_db_dir.clone(),
            provision_timeout,
        ));

        let directory = Arc::new(TenantDirectory::new(
            tenant_repo.clone(),
            user_repo.clone(),
            subscription_repo.clone(),
            code_repo.clone(),
            email_service.clone(),
        ));
        let ledger = Arc::new(SubscriptionLedger::new(
            subscription_repo.clone(),
            tenant_repo.clone(),
            user_repo.clone(),
            email_service.clone(),
            payment_service.clone(),
            catalog.clone(),
        ));

        AppState {
            config: config.clone(),
            tenant_repo,
            user_repo,
            subscription_repo,
            code_repo,
            provisioner,
            directory,
            ledger,
            catalog,
            email_service,
            payment_service,
            session_key,
        }
    }
}

async fn run_postgres_migrations(pool: &PgPool) {
    sqlx::migrate!("./migrations/postgres")
        .run(pool)
        .await
        .expect("Failed to run Postgres migrations");
}

async fn run_sqlite_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}
