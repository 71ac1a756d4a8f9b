pub mod postgres_code_repo;
pub mod postgres_subscription_repo;
pub mod postgres_tenant_repo;
pub mod postgres_user_repo;
pub mod sqlite_code_repo;
pub mod sqlite_subscription_repo;
pub mod sqlite_tenant_repo;
pub mod sqlite_user_repo;
