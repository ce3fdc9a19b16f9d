use crate::errors::map_sqlx;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feira_core::EngineResult;
use feira_payment::{PaymentRepository, PixKeyType, PixPayment, PixPaymentStatus};
use sqlx::PgPool;
use uuid::Uuid;

pub struct StorePaymentRepository {
    pool: PgPool,
}

impl StorePaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    transaction_id: String,
    end_to_end_id: Option<String>,
    quote_id: Option<Uuid>,
    order_id: Option<Uuid>,
    amount_cents: i64,
    description: String,
    pix_key: String,
    pix_key_type: String,
    payer_name: String,
    payer_document: String,
    receiver_name: String,
    receiver_document: String,
    qr_code: String,
    status: String,
    expires_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_payment(self) -> EngineResult<PixPayment> {
        Ok(PixPayment {
            id: self.id,
            transaction_id: self.transaction_id,
            end_to_end_id: self.end_to_end_id,
            quote_id: self.quote_id,
            order_id: self.order_id,
            amount_cents: self.amount_cents,
            description: self.description,
            pix_key: self.pix_key,
            pix_key_type: PixKeyType::parse(&self.pix_key_type)?,
            payer_name: self.payer_name,
            payer_document: self.payer_document,
            receiver_name: self.receiver_name,
            receiver_document: self.receiver_document,
            qr_code: self.qr_code,
            status: PixPaymentStatus::parse(&self.status)?,
            expires_at: self.expires_at,
            paid_at: self.paid_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_PAYMENT: &str = r#"
    SELECT id, transaction_id, end_to_end_id, quote_id, order_id, amount_cents,
           description, pix_key, pix_key_type, payer_name, payer_document,
           receiver_name, receiver_document, qr_code, status, expires_at,
           paid_at, created_at, updated_at
    FROM pix_payments
"#;

#[async_trait]
impl PaymentRepository for StorePaymentRepository {
    async fn insert(&self, payment: &PixPayment) -> EngineResult<()> {
        sqlx::query(
            r#"
            INSERT INTO pix_payments (id, transaction_id, end_to_end_id, quote_id,
                                      order_id, amount_cents, description, pix_key,
                                      pix_key_type, payer_name, payer_document,
                                      receiver_name, receiver_document, qr_code,
                                      status, expires_at, paid_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19)
            "#,
        )
        .bind(payment.id)
        .bind(&payment.transaction_id)
        .bind(&payment.end_to_end_id)
        .bind(payment.quote_id)
        .bind(payment.order_id)
        .bind(payment.amount_cents)
        .bind(&payment.description)
        .bind(&payment.pix_key)
        .bind(payment.pix_key_type.as_str())
        .bind(&payment.payer_name)
        .bind(&payment.payer_document)
        .bind(&payment.receiver_name)
        .bind(&payment.receiver_document)
        .bind(&payment.qr_code)
        .bind(payment.status.as_str())
        .bind(payment.expires_at)
        .bind(payment.paid_at)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn fetch_by_transaction(
        &self,
        transaction_id: &str,
    ) -> EngineResult<Option<PixPayment>> {
        let row: Option<PaymentRow> =
            sqlx::query_as(&format!("{SELECT_PAYMENT} WHERE transaction_id = $1"))
                .bind(transaction_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;
        row.map(PaymentRow::into_payment).transpose()
    }

    async fn list_for_quote(&self, quote_id: Uuid) -> EngineResult<Vec<PixPayment>> {
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            "{SELECT_PAYMENT} WHERE quote_id = $1 ORDER BY created_at DESC"
        ))
        .bind(quote_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        rows.into_iter().map(PaymentRow::into_payment).collect()
    }

    async fn list_for_order(&self, order_id: Uuid) -> EngineResult<Vec<PixPayment>> {
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            "{SELECT_PAYMENT} WHERE order_id = $1 ORDER BY created_at DESC"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        rows.into_iter().map(PaymentRow::into_payment).collect()
    }

    async fn transition(
        &self,
        payment: &PixPayment,
        expected: PixPaymentStatus,
    ) -> EngineResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE pix_payments
            SET status = $1, end_to_end_id = $2, paid_at = $3, updated_at = $4
            WHERE transaction_id = $5 AND status = $6
            "#,
        )
        .bind(payment.status.as_str())
        .bind(&payment.end_to_end_id)
        .bind(payment.paid_at)
        .bind(payment.updated_at)
        .bind(&payment.transaction_id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn expire_pending_before(&self, now: DateTime<Utc>) -> EngineResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE pix_payments
            SET status = 'EXPIRED', updated_at = $1
            WHERE status = 'PENDING' AND expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(result.rows_affected())
    }
}
