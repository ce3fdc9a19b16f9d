use chrono::Utc;
use feira_payment::PaymentReconciler;
use feira_quote::QuoteLedger;
use std::time::Duration;

use crate::state::AppState;

/// Periodic background task: persists quote expirations and flips stale
/// PENDING charges to EXPIRED. Correctness never depends on it running,
/// the lazy checks cover reads and accepts; this keeps reporting honest.
pub async fn run(state: AppState) {
    let ledger = QuoteLedger::new(state.quotes.clone(), state.catalog.clone());
    let reconciler =
        PaymentReconciler::new(state.payments.clone(), state.rules.pix_expiration_minutes);

    let mut interval = tokio::time::interval(Duration::from_secs(state.rules.sweep_interval_seconds));
    loop {
        interval.tick().await;
        let now = Utc::now();

        if let Err(err) = ledger.sweep_expired(now).await {
            tracing::warn!("quote expiry sweep failed: {}", err);
        }
        if let Err(err) = reconciler.expire_sweep(now).await {
            tracing::warn!("payment expiry sweep failed: {}", err);
        }
    }
}
