use crate::errors::map_sqlx;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feira_core::{EngineError, EngineResult};
use feira_quote::{Quote, QuoteRepository, QuoteStatus};
use sqlx::PgPool;
use uuid::Uuid;

pub struct StoreQuoteRepository {
    pool: PgPool,
}

impl StoreQuoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct QuoteRow {
    id: Uuid,
    quote_number: String,
    buyer_id: Uuid,
    supplier_id: Uuid,
    product_id: Uuid,
    quantity: i64,
    unit_price_cents: Option<i64>,
    total_cents: Option<i64>,
    valid_until: Option<DateTime<Utc>>,
    delivery_time: Option<String>,
    terms: Option<String>,
    notes: Option<String>,
    supplier_notes: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl QuoteRow {
    pub(crate) fn into_quote(self) -> EngineResult<Quote> {
        let status = QuoteStatus::parse(&self.status)
            .ok_or_else(|| EngineError::storage(format!("unknown quote status: {}", self.status)))?;
        Ok(Quote {
            id: self.id,
            quote_number: self.quote_number,
            buyer_id: self.buyer_id,
            supplier_id: self.supplier_id,
            product_id: self.product_id,
            quantity: self.quantity,
            unit_price_cents: self.unit_price_cents,
            total_cents: self.total_cents,
            valid_until: self.valid_until,
            delivery_time: self.delivery_time,
            terms: self.terms,
            notes: self.notes,
            supplier_notes: self.supplier_notes,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_QUOTE: &str = r#"
    SELECT id, quote_number, buyer_id, supplier_id, product_id, quantity,
           unit_price_cents, total_cents, valid_until, delivery_time, terms,
           notes, supplier_notes, status, created_at, updated_at
    FROM quotes
"#;

#[async_trait]
impl QuoteRepository for StoreQuoteRepository {
    async fn insert(&self, quote: &Quote) -> EngineResult<()> {
        sqlx::query(
            r#"
            INSERT INTO quotes (id, quote_number, buyer_id, supplier_id, product_id,
                                quantity, unit_price_cents, total_cents, valid_until,
                                delivery_time, terms, notes, supplier_notes, status,
                                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(quote.id)
        .bind(&quote.quote_number)
        .bind(quote.buyer_id)
        .bind(quote.supplier_id)
        .bind(quote.product_id)
        .bind(quote.quantity)
        .bind(quote.unit_price_cents)
        .bind(quote.total_cents)
        .bind(quote.valid_until)
        .bind(&quote.delivery_time)
        .bind(&quote.terms)
        .bind(&quote.notes)
        .bind(&quote.supplier_notes)
        .bind(quote.status.as_str())
        .bind(quote.created_at)
        .bind(quote.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn fetch(&self, id: Uuid) -> EngineResult<Option<Quote>> {
        let row: Option<QuoteRow> = sqlx::query_as(&format!("{SELECT_QUOTE} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        row.map(QuoteRow::into_quote).transpose()
    }

    async fn list_for_party(&self, party_id: Uuid) -> EngineResult<Vec<Quote>> {
        let rows: Vec<QuoteRow> = sqlx::query_as(&format!(
            "{SELECT_QUOTE} WHERE buyer_id = $1 OR supplier_id = $1 ORDER BY created_at DESC"
        ))
        .bind(party_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        rows.into_iter().map(QuoteRow::into_quote).collect()
    }

    async fn conditional_update(
        &self,
        quote: &Quote,
        expected: QuoteStatus,
    ) -> EngineResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE quotes
            SET unit_price_cents = $1, total_cents = $2, valid_until = $3,
                delivery_time = $4, terms = $5, supplier_notes = $6,
                status = $7, updated_at = $8
            WHERE id = $9 AND status = $10
            "#,
        )
        .bind(quote.unit_price_cents)
        .bind(quote.total_cents)
        .bind(quote.valid_until)
        .bind(&quote.delivery_time)
        .bind(&quote.terms)
        .bind(&quote.supplier_notes)
        .bind(quote.status.as_str())
        .bind(quote.updated_at)
        .bind(quote.id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_expired(&self, id: Uuid, now: DateTime<Utc>) -> EngineResult<bool> {
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

    async fn expire_all_due(&self, now: DateTime<Utc>) -> EngineResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE quotes
            SET status = 'EXPIRED', updated_at = $1
            WHERE status = 'QUOTED' AND valid_until IS NOT NULL AND valid_until <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(result.rows_affected())
    }
}
