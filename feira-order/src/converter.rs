use crate::models::{generate_order_number, Order, OrderStatus, OrderStatusEntry};
use crate::repository::AcceptanceStore;
use chrono::{DateTime, Utc};
use feira_core::{EngineError, EngineResult};
use feira_quote::{Quote, QuoteStatus};
use feira_shared::events::QuoteAcceptedEvent;
use feira_shared::{Actor, Capability};
use std::sync::Arc;
use uuid::Uuid;

/// Converts an accepted quote into an order. Acceptance and conversion are
/// one atomic unit: either the quote ends ACCEPTED with exactly one new
/// order and its creation history row, or nothing changed.
pub struct OrderConverter {
    store: Arc<dyn AcceptanceStore>,
}

impl OrderConverter {
    pub fn new(store: Arc<dyn AcceptanceStore>) -> Self {
        Self { store }
    }

    /// Buyer accepts a quoted quote within its validity window. A quote past
    /// its deadline is persisted as expired and the call fails with
    /// `ExpiredError`; it never becomes accepted.
    pub async fn accept(
        &self,
        actor: &Actor,
        quote_id: Uuid,
        now: DateTime<Utc>,
    ) -> EngineResult<(Quote, Order)> {
        if !actor.can(Capability::DecideQuotes) {
            return Err(EngineError::access_denied("role cannot decide quotes"));
        }

        let mut quote = self
            .store
            .fetch_quote(quote_id)
            .await?
            .ok_or_else(|| EngineError::not_found("quote"))?;

        if !actor.is_admin() && actor.id != quote.buyer_id {
            return Err(EngineError::access_denied("quote belongs to another buyer"));
        }

        match quote.status {
            QuoteStatus::Quoted => {}
            QuoteStatus::Pending => {
                return Err(EngineError::conflict("quote has not been responded to"))
            }
            other => {
                return Err(EngineError::conflict(format!(
                    "quote is already {}",
                    other.as_str()
                )))
            }
        }

        if quote.is_past_validity(now) {
            // Persist what the lazy check discovered, then refuse.
            self.store.mark_quote_expired(quote.id, now).await?;
            return Err(EngineError::expired("quote validity window has passed"));
        }

        let (order, first_entry) = Self::convert(&quote, actor.id, now)?;

        quote.status = QuoteStatus::Accepted;
        quote.updated_at = now;

        self.store
            .accept_and_convert(&quote, &order, &first_entry)
            .await?;

        let event = QuoteAcceptedEvent {
            quote_id: quote.id,
            order_id: order.id,
            buyer_id: quote.buyer_id,
            supplier_id: quote.supplier_id,
            total_cents: order.total_cents,
            timestamp: now,
        };
        tracing::info!(
            quote_id = %event.quote_id,
            order_id = %event.order_id,
            order_number = %order.order_number,
            total_cents = event.total_cents,
            "quote accepted and converted"
        );

        Ok((quote, order))
    }

    /// Pure build of the order and its creation history row from a priced
    /// quote. The total is copied verbatim; the first audit row has no
    /// `from_status`.
    pub fn convert(
        quote: &Quote,
        accepted_by: Uuid,
        now: DateTime<Utc>,
    ) -> EngineResult<(Order, OrderStatusEntry)> {
        let total_cents = quote
            .total_cents
            .ok_or_else(|| EngineError::conflict("quote has no priced total"))?;

        let order = Order {
            id: Uuid::new_v4(),
            order_number: generate_order_number(now),
            company_id: quote.buyer_id,
            supplier_id: quote.supplier_id,
            quote_id: quote.id,
            total_cents,
            status: OrderStatus::Pending,
            estimated_delivery_date: None,
            tracking_number: None,
            created_at: now,
            updated_at: now,
        };
        let first_entry = OrderStatusEntry {
            order_id: order.id,
            from_status: None,
            to_status: OrderStatus::Pending,
            changed_by: accepted_by,
            notes: Some(format!("Converted from quote {}", quote.quote_number)),
            created_at: now,
        };
        Ok((order, first_entry))
    }
}
