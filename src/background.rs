use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use tokio::time::sleep;
use tracing::{error, info, info_span, Instrument};
use crate::state::AppState;

/// The Subscription Clock: two independent loops decoupled from request
/// handling. The expiry sweep drives active subscriptions past their end
/// date through expire-then-renew-attempt; the code cleanup reaps expired
/// one-time codes. A failing tick is logged and the loop keeps going.
pub async fn start_background_worker(state: Arc<AppState>) {
    info!("Starting subscription clock...");

    let sweep_state = state.clone();
    tokio::spawn(async move {
        run_expiry_sweep_loop(sweep_state).await;
    });

    run_code_cleanup_loop(state).await;
}

async fn run_expiry_sweep_loop(state: Arc<AppState>) {
    let interval = Duration::from_secs(state.config.sweep_interval_secs);
    loop {
        let span = info_span!("subscription_sweep");
        async {
            match state.ledger.check_and_deactivate_expired(Utc::now()).await {
                Ok(count) => info!("Expiry sweep finished, {} subscriptions transitioned", count),
                Err(e) => error!("Expiry sweep failed: {:?}", e),
            }
        }
            .instrument(span)
            .await;

        sleep(interval).await;
    }
}

async fn run_code_cleanup_loop(state: Arc<AppState>) {
    let interval = Duration::from_secs(state.config.code_cleanup_interval_secs);
    loop {
        let span = info_span!("code_cleanup");
        async {
            match state.code_repo.delete_expired(Utc::now()).await {
                Ok(0) => {}
                Ok(count) => info!("Removed {} expired one-time codes", count),
                Err(e) => error!("One-time code cleanup failed: {:?}", e),
            }
        }
            .instrument(span)
            .await;

        sleep(interval).await;
    }
}
