use crate::models::{Quote, QuoteStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feira_core::EngineResult;
use uuid::Uuid;

/// Quote persistence contract.
///
/// Every transition is a conditional update ("set status where id and
/// status = expected"): `false` means the precondition no longer held and
/// the caller surfaces `ConflictError`. The store is the single
/// serialization point; there is no in-memory coordination.
#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn insert(&self, quote: &Quote) -> EngineResult<()>;

    async fn fetch(&self, id: Uuid) -> EngineResult<Option<Quote>>;

    /// Quotes where the party is the buyer or the supplier, newest first.
    async fn list_for_party(&self, party_id: Uuid) -> EngineResult<Vec<Quote>>;

    /// Persist the quote's current state, guarded by the status the caller
    /// observed. Returns false when no row matched.
    async fn conditional_update(
        &self,
        quote: &Quote,
        expected: QuoteStatus,
    ) -> EngineResult<bool>;

    /// Flip a Quoted quote to Expired. Returns false when it was no longer
    /// Quoted (lost race or already persisted).
    async fn mark_expired(&self, id: Uuid, now: DateTime<Utc>) -> EngineResult<bool>;

    /// Batch-persist expiry for all Quoted quotes past their deadline.
    /// Idempotent per record; returns how many rows changed.
    async fn expire_all_due(&self, now: DateTime<Utc>) -> EngineResult<u64>;
}
