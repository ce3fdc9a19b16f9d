use crate::models::{Order, OrderStatus, OrderStatusEntry};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feira_core::EngineResult;
use feira_quote::Quote;
use uuid::Uuid;

/// Order persistence contract. Orders are created only through the
/// acceptance store; this trait covers reads and fulfillment transitions.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn fetch(&self, id: Uuid) -> EngineResult<Option<Order>>;

    /// Orders where the party is the buying company or the supplier.
    async fn list_for_party(&self, party_id: Uuid) -> EngineResult<Vec<Order>>;

    /// Persist a fulfillment transition guarded by the previously observed
    /// status, appending the audit row in the same transaction. Returns
    /// false when the guard failed and nothing was written.
    async fn transition(
        &self,
        order: &Order,
        expected: OrderStatus,
        entry: &OrderStatusEntry,
    ) -> EngineResult<bool>;

    /// Audit trail for an order, chronological.
    async fn history(&self, order_id: Uuid) -> EngineResult<Vec<OrderStatusEntry>>;
}

/// The atomic seam between quote acceptance and order creation.
///
/// `accept_and_convert` is one transaction: conditional quote flip
/// QUOTED -> ACCEPTED, order insert (unique quote_id), first history row.
/// Any failure rolls the whole unit back; partial application is never
/// observable. A lost race (quote already flipped, or an order already
/// referencing the quote) surfaces as `ConflictError`.
#[async_trait]
pub trait AcceptanceStore: Send + Sync {
    async fn fetch_quote(&self, id: Uuid) -> EngineResult<Option<Quote>>;

    /// Persist expiry discovered during an accept attempt. Returns false
    /// when the quote was no longer QUOTED.
    async fn mark_quote_expired(&self, id: Uuid, now: DateTime<Utc>) -> EngineResult<bool>;

    async fn accept_and_convert(
        &self,
        quote: &Quote,
        order: &Order,
        first_entry: &OrderStatusEntry,
    ) -> EngineResult<()>;
}
