use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub tenant_db_dir: String,
    pub mail_service_url: String,
    pub mail_service_token: String,
    pub billing_service_url: String,
    pub billing_service_token: String,
    pub session_key: String, // at least 64 bytes, used to sign the session cookie
    pub provision_timeout_secs: u64,
    pub sweep_interval_secs: u64,
    pub code_cleanup_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            port: env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().expect("PORT must be a number"),
            tenant_db_dir: env::var("TENANT_DB_DIR").unwrap_or_else(|_| "./tenant_data".to_string()),
            mail_service_url: env::var("MAIL_SERVICE_URL").unwrap_or_else(|_| "http://localhost:8000/api/v1/send".to_string()),
            mail_service_token: env::var("MAIL_SERVICE_TOKEN").unwrap_or_else(|_| "test-token-1".to_string()),
            billing_service_url: env::var("BILLING_SERVICE_URL").unwrap_or_else(|_| "http://localhost:8100/api/v1/charge".to_string()),
            billing_service_token: env::var("BILLING_SERVICE_TOKEN").unwrap_or_else(|_| "test-token-2".to_string()),
            session_key: env::var("SESSION_KEY").expect("SESSION_KEY must be set (>= 64 bytes)"),
            provision_timeout_secs: env::var("PROVISION_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string()).parse().expect("PROVISION_TIMEOUT_SECS must be a number"),
            // Monthly bulk expiry sweep by default.
            sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| "2592000".to_string()).parse().expect("SWEEP_INTERVAL_SECS must be a number"),
            // Hourly cleanup of expired one-time codes.
            code_cleanup_interval_secs: env::var("CODE_CLEANUP_INTERVAL_SECS")
                .unwrap_or_else(|_| "3600".to_string()).parse().expect("CODE_CLEANUP_INTERVAL_SECS must be a number"),
        }
    }
}
