use sales_backend::{
    api::router::create_router,
    config::Config,
    domain::models::plan::{PlanCatalog, PlanKind},
    domain::ports::{EmailService, MailKind, PaymentService},
    domain::services::{directory::TenantDirectory, ledger::SubscriptionLedger},
    error::AppError,
    infra::provisioner::SqliteProvisioner,
    infra::repositories::{
        sqlite_code_repo::SqliteCodeRepo,
        sqlite_subscription_repo::SqliteSubscriptionRepo,
        sqlite_tenant_repo::SqliteTenantRepo,
        sqlite_user_repo::SqliteUserRepo,
    },
    state::AppState,
};
use async_trait::async_trait;
use axum::Router;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower_cookies::Key;
use uuid::Uuid;

// 64+ bytes, as required for cookie signing.
const TEST_SESSION_KEY: &str =
    "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef-test";

/// Records outbound mail instead of sending it.
#[derive(Default)]
pub struct RecordingEmailService {
    pub sent: Mutex<Vec<(String, &'static str)>>,
}

#[async_trait]
impl EmailService for RecordingEmailService {
    async fn send(&self, recipient: &str, kind: MailKind, _context: &Value) -> Result<(), AppError> {
        self.sent.lock().unwrap().push((recipient.to_string(), kind.as_str()));
        Ok(())
    }
}

/// Approves or declines renewal charges based on a shared flag.
pub struct MockPaymentService {
    pub approve: Arc<AtomicBool>,
}

#[async_trait]
impl PaymentService for MockPaymentService {
    async fn charge_on_file(&self, _tenant_id: &str, _plan: PlanKind, _amount_cents: i64) -> Result<Option<String>, AppError> {
        if self.approve.load(Ordering::SeqCst) {
            Ok(Some(format!("pay_{}", Uuid::new_v4())))
        } else {
            Ok(None)
        }
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub tenant_dir: String,
    pub state: Arc<AppState>,
    pub emails: Arc<RecordingEmailService>,
    pub payment_approve: Arc<AtomicBool>,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);
        let tenant_dir = format!("test_tenants_{}", Uuid::new_v4());

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let config = Config {
            database_url: db_url.clone(),
            port: 0,
            tenant_db_dir: tenant_dir.clone(),
            mail_service_url: "http://localhost".to_string(),
            mail_service_token: "token".to_string(),
            billing_service_url: "http://localhost".to_string(),
            billing_service_token: "token".to_string(),
            session_key: TEST_SESSION_KEY.to_string(),
            provision_timeout_secs: 10,
            sweep_interval_secs: 3600,
            code_cleanup_interval_secs: 3600,
        };

        let emails = Arc::new(RecordingEmailService::default());
        let payment_approve = Arc::new(AtomicBool::new(false));
        let payment_service = Arc::new(MockPaymentService { approve: payment_approve.clone() });

        let tenant_repo = Arc::new(SqliteTenantRepo::new(pool.clone()));
        let user_repo = Arc::new(SqliteUserRepo::new(pool.clone()));
        let subscription_repo = Arc::new(SqliteSubscriptionRepo::new(pool.clone()));
        let code_repo = Arc::new(SqliteCodeRepo::new(pool.clone()));
        let catalog = Arc::new(PlanCatalog::standard());
        let provisioner = Arc::new(SqliteProvisioner::new(
            tenant_dir.clone(),
            Duration::from_secs(config.provision_timeout_secs),
        ));

        let directory = Arc::new(TenantDirectory::new(
            tenant_repo.clone(),
            user_repo.clone(),
            subscription_repo.clone(),
            code_repo.clone(),
            emails.clone(),
        ));
        let ledger = Arc::new(SubscriptionLedger::new(
            subscription_repo.clone(),
            tenant_repo.clone(),
            user_repo.clone(),
            emails.clone(),
            payment_service.clone(),
            catalog.clone(),
        ));

        let state = Arc::new(AppState {
            config,
            tenant_repo,
            user_repo,
            subscription_repo,
            code_repo,
            provisioner,
            directory,
            ledger,
            catalog,
            email_service: emails.clone(),
            payment_service,
            session_key: Key::from(TEST_SESSION_KEY.as_bytes()),
        });

        let router = create_router(state.clone());

        Self {
            router,
            pool,
            db_filename,
            tenant_dir,
            state,
            emails,
            payment_approve,
        }
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
        let _ = std::fs::remove_dir_all(&self.tenant_dir);
    }
}
