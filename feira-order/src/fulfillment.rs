use crate::models::{Order, OrderStatus, OrderStatusEntry};
use crate::repository::OrderRepository;
use chrono::{DateTime, Utc};
use feira_core::{EngineError, EngineResult};
use feira_shared::events::OrderStatusChangedEvent;
use feira_shared::{Actor, Capability};
use std::sync::Arc;
use uuid::Uuid;

/// A requested fulfillment transition.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub to_status: OrderStatus,
    pub notes: Option<String>,
    pub tracking_number: Option<String>,
    pub estimated_delivery_date: Option<DateTime<Utc>>,
}

/// Owns order status transitions and the append-only audit trail. Every
/// successful transition writes exactly one history row.
pub struct OrderFulfillmentTracker {
    orders: Arc<dyn OrderRepository>,
}

impl OrderFulfillmentTracker {
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self { orders }
    }

    pub async fn transition(
        &self,
        actor: &Actor,
        order_id: Uuid,
        request: TransitionRequest,
        now: DateTime<Utc>,
    ) -> EngineResult<Order> {
        if !actor.can(Capability::AdvanceFulfillment) {
            return Err(EngineError::access_denied("role cannot update fulfillment"));
        }

        let mut order = self
            .orders
            .fetch(order_id)
            .await?
            .ok_or_else(|| EngineError::not_found("order"))?;

        if !actor.is_admin() && actor.id != order.supplier_id {
            return Err(EngineError::access_denied(
                "order belongs to another supplier",
            ));
        }

        let from = order.status;
        if !from.can_transition_to(request.to_status) {
            return Err(EngineError::conflict(format!(
                "cannot transition order from {} to {}",
                from.as_str(),
                request.to_status.as_str()
            )));
        }

        if request.to_status == OrderStatus::Shipped {
            match request.tracking_number.as_deref() {
                Some(tracking) if !tracking.trim().is_empty() => {}
                _ => {
                    return Err(EngineError::validation(
                        "shipping requires a tracking number",
                    ))
                }
            }
        }

        order.status = request.to_status;
        order.updated_at = now;
        if let Some(tracking) = request.tracking_number {
            order.tracking_number = Some(tracking);
        }
        if let Some(estimate) = request.estimated_delivery_date {
            order.estimated_delivery_date = Some(estimate);
        }

        let entry = OrderStatusEntry {
            order_id: order.id,
            from_status: Some(from),
            to_status: order.status,
            changed_by: actor.id,
            notes: request.notes,
            created_at: now,
        };

        if !self.orders.transition(&order, from, &entry).await? {
            return Err(EngineError::conflict("order was concurrently modified"));
        }

        let event = OrderStatusChangedEvent {
            order_id: order.id,
            from_status: Some(from.as_str().to_string()),
            to_status: order.status.as_str().to_string(),
            changed_by: actor.id,
            timestamp: now,
        };
        tracing::info!(
            order_id = %event.order_id,
            from = %from.as_str(),
            to = %order.status.as_str(),
            changed_by = %actor.id,
            "order status changed"
        );

        Ok(order)
    }

    /// Order plus its audit trail.
    pub async fn get_with_history(
        &self,
        order_id: Uuid,
    ) -> EngineResult<(Order, Vec<OrderStatusEntry>)> {
        let order = self
            .orders
            .fetch(order_id)
            .await?
            .ok_or_else(|| EngineError::not_found("order"))?;
        let history = self.orders.history(order_id).await?;
        Ok((order, history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::generate_order_number;
    use crate::testutil::MemoryStore;
    use feira_shared::Role;

    fn seeded_order(store: &MemoryStore, supplier: &Actor, now: DateTime<Utc>) -> Order {
        let order = Order {
            id: Uuid::new_v4(),
            order_number: generate_order_number(now),
            company_id: Uuid::new_v4(),
            supplier_id: supplier.id,
            quote_id: Uuid::new_v4(),
            total_cents: 6_000,
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
            changed_by: order.company_id,
            notes: None,
            created_at: now,
        };
        store.seed_order(order.clone(), first_entry);
        order
    }

    fn to(status: OrderStatus) -> TransitionRequest {
        TransitionRequest {
            to_status: status,
            notes: None,
            tracking_number: None,
            estimated_delivery_date: None,
        }
    }

    #[tokio::test]
    async fn test_full_fulfillment_path_with_audit_trail() {
        let now = Utc::now();
        let supplier = Actor::new(Uuid::new_v4(), Role::Supplier);
        let store = Arc::new(MemoryStore::new());
        let order = seeded_order(&store, &supplier, now);
        let tracker = OrderFulfillmentTracker::new(store.clone());

        tracker
            .transition(&supplier, order.id, to(OrderStatus::Processing), now)
            .await
            .unwrap();
        tracker
            .transition(
                &supplier,
                order.id,
                TransitionRequest {
                    tracking_number: Some("BR123".to_string()),
                    ..to(OrderStatus::Shipped)
                },
                now,
            )
            .await
            .unwrap();
        let delivered = tracker
            .transition(&supplier, order.id, to(OrderStatus::Delivered), now)
            .await
            .unwrap();

        assert_eq!(delivered.status, OrderStatus::Delivered);
        assert_eq!(delivered.tracking_number.as_deref(), Some("BR123"));

        let (_, history) = tracker.get_with_history(order.id).await.unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].from_status, None);
        let path: Vec<OrderStatus> = history.iter().map(|e| e.to_status).collect();
        assert_eq!(
            path,
            vec![
                OrderStatus::Pending,
                OrderStatus::Processing,
                OrderStatus::Shipped,
                OrderStatus::Delivered
            ]
        );
        assert!(history.iter().all(|e| !e.changed_by.is_nil()));
    }

    #[tokio::test]
    async fn test_shipping_without_tracking_number_fails() {
        let now = Utc::now();
        let supplier = Actor::new(Uuid::new_v4(), Role::Supplier);
        let store = Arc::new(MemoryStore::new());
        let order = seeded_order(&store, &supplier, now);
        let tracker = OrderFulfillmentTracker::new(store);

        tracker
            .transition(&supplier, order.id, to(OrderStatus::Processing), now)
            .await
            .unwrap();
        let err = tracker
            .transition(&supplier, order.id, to(OrderStatus::Shipped), now)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_illegal_transitions_conflict() {
        let now = Utc::now();
        let supplier = Actor::new(Uuid::new_v4(), Role::Supplier);
        let store = Arc::new(MemoryStore::new());
        let order = seeded_order(&store, &supplier, now);
        let tracker = OrderFulfillmentTracker::new(store);

        // Pending cannot jump straight to Delivered.
        let err = tracker
            .transition(&supplier, order.id, to(OrderStatus::Delivered), now)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_cancel_unreachable_after_shipping() {
        let now = Utc::now();
        let supplier = Actor::new(Uuid::new_v4(), Role::Supplier);
        let store = Arc::new(MemoryStore::new());
        let order = seeded_order(&store, &supplier, now);
        let tracker = OrderFulfillmentTracker::new(store);

        tracker
            .transition(&supplier, order.id, to(OrderStatus::Processing), now)
            .await
            .unwrap();
        tracker
            .transition(
                &supplier,
                order.id,
                TransitionRequest {
                    tracking_number: Some("BR999".to_string()),
                    ..to(OrderStatus::Shipped)
                },
                now,
            )
            .await
            .unwrap();

        let err = tracker
            .transition(&supplier, order.id, to(OrderStatus::Cancelled), now)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_wrong_supplier_denied_admin_allowed() {
        let now = Utc::now();
        let supplier = Actor::new(Uuid::new_v4(), Role::Supplier);
        let store = Arc::new(MemoryStore::new());
        let order = seeded_order(&store, &supplier, now);
        let tracker = OrderFulfillmentTracker::new(store);

        let intruder = Actor::new(Uuid::new_v4(), Role::Supplier);
        let err = tracker
            .transition(&intruder, order.id, to(OrderStatus::Processing), now)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AccessDenied(_)));

        let admin = Actor::new(Uuid::new_v4(), Role::Admin);
        tracker
            .transition(&admin, order.id, to(OrderStatus::Processing), now)
            .await
            .unwrap();
    }
}
