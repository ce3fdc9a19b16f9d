use crate::models::{PixPayment, PixPaymentStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feira_core::EngineResult;
use uuid::Uuid;

/// PIX payment persistence contract. Transitions are conditional on the
/// previously observed status, same shape as the quote and order stores.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn insert(&self, payment: &PixPayment) -> EngineResult<()>;

    async fn fetch_by_transaction(&self, transaction_id: &str)
        -> EngineResult<Option<PixPayment>>;

    async fn list_for_quote(&self, quote_id: Uuid) -> EngineResult<Vec<PixPayment>>;

    async fn list_for_order(&self, order_id: Uuid) -> EngineResult<Vec<PixPayment>>;

    /// Persist `payment` guarded by the status previously read. Returns
    /// false when the guard failed and nothing was written.
    async fn transition(
        &self,
        payment: &PixPayment,
        expected: PixPaymentStatus,
    ) -> EngineResult<bool>;

    /// Flip every PENDING charge whose expiry has passed to EXPIRED.
    /// Returns the number of rows changed.
    async fn expire_pending_before(&self, now: DateTime<Utc>) -> EngineResult<u64>;
}
