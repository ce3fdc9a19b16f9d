use crate::errors::map_sqlx;
use crate::quote_repo::QuoteRow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feira_core::{EngineError, EngineResult};
use feira_order::{AcceptanceStore, Order, OrderRepository, OrderStatus, OrderStatusEntry};
use feira_quote::Quote;
use sqlx::PgPool;
use uuid::Uuid;

pub struct StoreOrderRepository {
    pool: PgPool,
}

impl StoreOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    company_id: Uuid,
    supplier_id: Uuid,
    quote_id: Uuid,
    total_cents: i64,
    status: String,
    estimated_delivery_date: Option<DateTime<Utc>>,
    tracking_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self) -> EngineResult<Order> {
        let status = OrderStatus::parse(&self.status)
            .ok_or_else(|| EngineError::storage(format!("unknown order status: {}", self.status)))?;
        Ok(Order {
            id: self.id,
            order_number: self.order_number,
            company_id: self.company_id,
            supplier_id: self.supplier_id,
            quote_id: self.quote_id,
            total_cents: self.total_cents,
            status,
            estimated_delivery_date: self.estimated_delivery_date,
            tracking_number: self.tracking_number,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    order_id: Uuid,
    from_status: Option<String>,
    to_status: String,
    changed_by: Uuid,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl HistoryRow {
    fn into_entry(self) -> EngineResult<OrderStatusEntry> {
        let from_status = self
            .from_status
            .map(|s| {
                OrderStatus::parse(&s)
                    .ok_or_else(|| EngineError::storage(format!("unknown order status: {s}")))
            })
            .transpose()?;
        let to_status = OrderStatus::parse(&self.to_status).ok_or_else(|| {
            EngineError::storage(format!("unknown order status: {}", self.to_status))
        })?;
        Ok(OrderStatusEntry {
            order_id: self.order_id,
            from_status,
            to_status,
            changed_by: self.changed_by,
            notes: self.notes,
            created_at: self.created_at,
        })
    }
}

const SELECT_ORDER: &str = r#"
    SELECT id, order_number, company_id, supplier_id, quote_id, total_cents,
           status, estimated_delivery_date, tracking_number, created_at, updated_at
    FROM orders
"#;

const INSERT_ORDER: &str = r#"
    INSERT INTO orders (id, order_number, company_id, supplier_id, quote_id,
                        total_cents, status, estimated_delivery_date,
                        tracking_number, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
"#;

const INSERT_HISTORY: &str = r#"
    INSERT INTO order_status_history (order_id, from_status, to_status,
                                      changed_by, notes, created_at)
    VALUES ($1, $2, $3, $4, $5, $6)
"#;

#[async_trait]
impl OrderRepository for StoreOrderRepository {
    async fn fetch(&self, id: Uuid) -> EngineResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!("{SELECT_ORDER} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        row.map(OrderRow::into_order).transpose()
    }

    async fn list_for_party(&self, party_id: Uuid) -> EngineResult<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "{SELECT_ORDER} WHERE company_id = $1 OR supplier_id = $1 ORDER BY created_at DESC"
        ))
        .bind(party_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        rows.into_iter().map(OrderRow::into_order).collect()
    }

    async fn transition(
        &self,
        order: &Order,
        expected: OrderStatus,
        entry: &OrderStatusEntry,
    ) -> EngineResult<bool> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $1, estimated_delivery_date = $2, tracking_number = $3,
                updated_at = $4
            WHERE id = $5 AND status = $6
            "#,
        )
        .bind(order.status.as_str())
        .bind(order.estimated_delivery_date)
        .bind(&order.tracking_number)
        .bind(order.updated_at)
        .bind(order.id)
        .bind(expected.as_str())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(map_sqlx)?;
            return Ok(false);
        }

        sqlx::query(INSERT_HISTORY)
            .bind(entry.order_id)
            .bind(entry.from_status.map(|s| s.as_str()))
            .bind(entry.to_status.as_str())
            .bind(entry.changed_by)
            .bind(&entry.notes)
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        tx.commit().await.map_err(map_sqlx)?;
        Ok(true)
    }

    async fn history(&self, order_id: Uuid) -> EngineResult<Vec<OrderStatusEntry>> {
        let rows: Vec<HistoryRow> = sqlx::query_as(
            r#"
            SELECT order_id, from_status, to_status, changed_by, notes, created_at
            FROM order_status_history
            WHERE order_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        rows.into_iter().map(HistoryRow::into_entry).collect()
    }
}

#[async_trait]
impl AcceptanceStore for StoreOrderRepository {
    async fn fetch_quote(&self, id: Uuid) -> EngineResult<Option<Quote>> {
        let row: Option<QuoteRow> = sqlx::query_as(
            r#"
            SELECT id, quote_number, buyer_id, supplier_id, product_id, quantity,
                   unit_price_cents, total_cents, valid_until, delivery_time, terms,
                   notes, supplier_notes, status, created_at, updated_at
            FROM quotes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.map(QuoteRow::into_quote).transpose()
    }

    async fn mark_quote_expired(&self, id: Uuid, now: DateTime<Utc>) -> EngineResult<bool> {
        let result = sqlx::query(
            "UPDATE quotes SET status = 'EXPIRED', updated_at = $1 WHERE id = $2 AND status = 'QUOTED'",
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn accept_and_convert(
        &self,
        quote: &Quote,
        order: &Order,
        first_entry: &OrderStatusEntry,
    ) -> EngineResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        // Conditional flip: losing the race means zero rows and a rollback.
        let flipped = sqlx::query(
            "UPDATE quotes SET status = 'ACCEPTED', updated_at = $1 WHERE id = $2 AND status = 'QUOTED'",
        )
        .bind(quote.updated_at)
        .bind(quote.id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        if flipped.rows_affected() == 0 {
            tx.rollback().await.map_err(map_sqlx)?;
            return Err(EngineError::conflict("quote is no longer QUOTED"));
        }

        // The unique index on orders.quote_id backstops the 1:1 mapping.
        sqlx::query(INSERT_ORDER)
            .bind(order.id)
            .bind(&order.order_number)
            .bind(order.company_id)
            .bind(order.supplier_id)
            .bind(order.quote_id)
            .bind(order.total_cents)
            .bind(order.status.as_str())
            .bind(order.estimated_delivery_date)
            .bind(&order.tracking_number)
            .bind(order.created_at)
            .bind(order.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        sqlx::query(INSERT_HISTORY)
            .bind(first_entry.order_id)
            .bind(first_entry.from_status.map(|s| s.as_str()))
            .bind(first_entry.to_status.as_str())
            .bind(first_entry.changed_by)
            .bind(&first_entry.notes)
            .bind(first_entry.created_at)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        tx.commit().await.map_err(map_sqlx)?;
        Ok(())
    }
}
