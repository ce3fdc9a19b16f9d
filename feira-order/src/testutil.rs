use crate::models::{Order, OrderStatus, OrderStatusEntry};
use crate::repository::{AcceptanceStore, OrderRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feira_core::{EngineError, EngineResult};
use feira_quote::{Quote, QuoteStatus};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    quotes: HashMap<Uuid, Quote>,
    orders: HashMap<Uuid, Order>,
    history: Vec<OrderStatusEntry>,
}

/// In-memory store mirroring the conditional-update semantics the Postgres
/// repositories provide: each mutation holds one lock, checks the guard,
/// and applies or refuses atomically.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn seed_quote(&self, quote: Quote) {
        self.inner.lock().unwrap().quotes.insert(quote.id, quote);
    }

    pub fn seed_order(&self, order: Order, first_entry: OrderStatusEntry) {
        let mut inner = self.inner.lock().unwrap();
        inner.orders.insert(order.id, order);
        inner.history.push(first_entry);
    }

    pub fn quote(&self, id: Uuid) -> Option<Quote> {
        self.inner.lock().unwrap().quotes.get(&id).cloned()
    }

    pub fn order_for_quote(&self, quote_id: Uuid) -> Option<Order> {
        self.inner
            .lock()
            .unwrap()
            .orders
            .values()
            .find(|o| o.quote_id == quote_id)
            .cloned()
    }

    pub fn order_count(&self) -> usize {
        self.inner.lock().unwrap().orders.len()
    }

    pub fn history_for(&self, order_id: Uuid) -> Vec<OrderStatusEntry> {
        self.inner
            .lock()
            .unwrap()
            .history
            .iter()
            .filter(|e| e.order_id == order_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AcceptanceStore for MemoryStore {
    async fn fetch_quote(&self, id: Uuid) -> EngineResult<Option<Quote>> {
        Ok(self.inner.lock().unwrap().quotes.get(&id).cloned())
    }

    async fn mark_quote_expired(&self, id: Uuid, now: DateTime<Utc>) -> EngineResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        match inner.quotes.get_mut(&id) {
            Some(q) if q.status == QuoteStatus::Quoted => {
                q.status = QuoteStatus::Expired;
                q.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn accept_and_convert(
        &self,
        quote: &Quote,
        order: &Order,
        first_entry: &OrderStatusEntry,
    ) -> EngineResult<()> {
        let mut inner = self.inner.lock().unwrap();
        match inner.quotes.get(&quote.id) {
            Some(current) if current.status == QuoteStatus::Quoted => {}
            _ => return Err(EngineError::conflict("quote is no longer QUOTED")),
        }
        if inner.orders.values().any(|o| o.quote_id == quote.id) {
            return Err(EngineError::conflict("quote is already converted"));
        }
        inner.quotes.insert(quote.id, quote.clone());
        inner.orders.insert(order.id, order.clone());
        inner.history.push(first_entry.clone());
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn fetch(&self, id: Uuid) -> EngineResult<Option<Order>> {
        Ok(self.inner.lock().unwrap().orders.get(&id).cloned())
    }

    async fn list_for_party(&self, party_id: Uuid) -> EngineResult<Vec<Order>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .orders
            .values()
            .filter(|o| o.company_id == party_id || o.supplier_id == party_id)
            .cloned()
            .collect())
    }

    async fn transition(
        &self,
        order: &Order,
        expected: OrderStatus,
        entry: &OrderStatusEntry,
    ) -> EngineResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        match inner.orders.get_mut(&order.id) {
            Some(current) if current.status == expected => {
                *current = order.clone();
                inner.history.push(entry.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn history(&self, order_id: Uuid) -> EngineResult<Vec<OrderStatusEntry>> {
        Ok(self.history_for(order_id))
    }
}
