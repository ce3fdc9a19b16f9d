use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Emitted when an accepted quote is converted into an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteAcceptedEvent {
    pub quote_id: Uuid,
    pub order_id: Uuid,
    pub buyer_id: Uuid,
    pub supplier_id: Uuid,
    pub total_cents: i64,
    pub timestamp: DateTime<Utc>,
}

/// Emitted on every fulfillment transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub order_id: Uuid,
    pub from_status: Option<String>,
    pub to_status: String,
    pub changed_by: Uuid,
    pub timestamp: DateTime<Utc>,
}

/// Emitted when a PIX payment settles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSettledEvent {
    pub transaction_id: String,
    pub end_to_end_id: String,
    pub amount_cents: i64,
    pub timestamp: DateTime<Utc>,
}
