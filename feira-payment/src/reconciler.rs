use crate::emv::{build_payload, EmvPayload};
use crate::models::{
    generate_transaction_id, validate_pix_key, PixKeyType, PixPayment, PixPaymentStatus,
};
use crate::repository::PaymentRepository;
use chrono::{DateTime, Duration, Utc};
use feira_core::{EngineError, EngineResult};
use feira_shared::events::PaymentSettledEvent;
use feira_shared::{Actor, Capability};
use std::sync::Arc;
use uuid::Uuid;

/// The entity a charge settles against. The caller resolves the binding and
/// supplies its authoritative total.
#[derive(Debug, Clone, Copy)]
pub enum PaymentBinding {
    Quote { id: Uuid, total_cents: i64 },
    Order { id: Uuid, total_cents: i64 },
}

#[derive(Debug, Clone)]
pub struct PixIssueRequest {
    pub amount_cents: i64,
    pub description: String,
    pub pix_key: String,
    pub pix_key_type: PixKeyType,
    pub payer_name: String,
    pub payer_document: String,
    pub receiver_name: String,
    pub receiver_document: String,
    pub merchant_city: String,
}

/// Issues PIX charges and reconciles settlement callbacks. Confirmation is
/// idempotent on the end-to-end id so bank webhook retries are harmless.
pub struct PaymentReconciler {
    payments: Arc<dyn PaymentRepository>,
    expiration_minutes: i64,
}

impl PaymentReconciler {
    pub fn new(payments: Arc<dyn PaymentRepository>, expiration_minutes: i64) -> Self {
        Self {
            payments,
            expiration_minutes,
        }
    }

    pub async fn issue(
        &self,
        actor: &Actor,
        binding: PaymentBinding,
        request: PixIssueRequest,
        now: DateTime<Utc>,
    ) -> EngineResult<PixPayment> {
        if !actor.can(Capability::IssuePayments) {
            return Err(EngineError::access_denied("role cannot issue payments"));
        }

        let (quote_id, order_id, bound_total) = match binding {
            PaymentBinding::Quote { id, total_cents } => (Some(id), None, total_cents),
            PaymentBinding::Order { id, total_cents } => (None, Some(id), total_cents),
        };

        if request.amount_cents <= 0 {
            return Err(EngineError::validation("amount must be positive"));
        }
        if request.amount_cents != bound_total {
            return Err(EngineError::validation(format!(
                "amount {} does not match the bound total {}",
                request.amount_cents, bound_total
            )));
        }
        validate_pix_key(&request.pix_key, request.pix_key_type)?;

        let transaction_id = generate_transaction_id(now);
        let qr_code = build_payload(&EmvPayload {
            pix_key: request.pix_key.clone(),
            description: request.description.clone(),
            merchant_name: request.receiver_name.clone(),
            merchant_city: request.merchant_city.clone(),
            amount_cents: request.amount_cents,
            transaction_id: transaction_id.clone(),
        });

        let payment = PixPayment {
            id: Uuid::new_v4(),
            transaction_id,
            end_to_end_id: None,
            quote_id,
            order_id,
            amount_cents: request.amount_cents,
            description: request.description,
            pix_key: request.pix_key,
            pix_key_type: request.pix_key_type,
            payer_name: request.payer_name,
            payer_document: request.payer_document,
            receiver_name: request.receiver_name,
            receiver_document: request.receiver_document,
            qr_code,
            status: PixPaymentStatus::Pending,
            expires_at: now + Duration::minutes(self.expiration_minutes),
            paid_at: None,
            created_at: now,
            updated_at: now,
        };
        self.payments.insert(&payment).await?;

        tracing::info!(
            transaction_id = %payment.transaction_id,
            amount_cents = payment.amount_cents,
            "pix charge issued"
        );
        Ok(payment)
    }

    pub async fn get(&self, transaction_id: &str) -> EngineResult<PixPayment> {
        self.payments
            .fetch_by_transaction(transaction_id)
            .await?
            .ok_or_else(|| EngineError::not_found("payment"))
    }

    /// Settlement callback. Replays with the same end-to-end id succeed
    /// without a second write; a different id against a settled charge is
    /// refused.
    pub async fn confirm(
        &self,
        transaction_id: &str,
        end_to_end_id: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<PixPayment> {
        if end_to_end_id.trim().is_empty() {
            return Err(EngineError::validation("end_to_end_id is required"));
        }

        let mut payment = self.get(transaction_id).await?;
        match payment.status {
            PixPaymentStatus::Paid => {
                return if payment.end_to_end_id.as_deref() == Some(end_to_end_id) {
                    Ok(payment)
                } else {
                    Err(EngineError::conflict(
                        "charge already settled under a different end_to_end_id",
                    ))
                };
            }
            PixPaymentStatus::Pending => {}
            other => {
                return Err(EngineError::conflict(format!(
                    "charge is {}",
                    other.as_str()
                )))
            }
        }

        if payment.is_past_expiry(now) {
            // Persist what the lazy check discovered, then refuse.
            let mut expired = payment.clone();
            expired.status = PixPaymentStatus::Expired;
            expired.updated_at = now;
            self.payments
                .transition(&expired, PixPaymentStatus::Pending)
                .await?;
            return Err(EngineError::conflict("charge expired before settlement"));
        }

        payment.status = PixPaymentStatus::Paid;
        payment.end_to_end_id = Some(end_to_end_id.to_string());
        payment.paid_at = Some(now);
        payment.updated_at = now;

        if !self
            .payments
            .transition(&payment, PixPaymentStatus::Pending)
            .await?
        {
            return Err(EngineError::conflict("charge was concurrently modified"));
        }

        let event = PaymentSettledEvent {
            transaction_id: payment.transaction_id.clone(),
            end_to_end_id: end_to_end_id.to_string(),
            amount_cents: payment.amount_cents,
            timestamp: now,
        };
        tracing::info!(
            transaction_id = %event.transaction_id,
            end_to_end_id = %event.end_to_end_id,
            amount_cents = event.amount_cents,
            "pix charge settled"
        );
        Ok(payment)
    }

    /// Withdraw an unsettled charge.
    pub async fn cancel(
        &self,
        actor: &Actor,
        transaction_id: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<PixPayment> {
        if !actor.can(Capability::IssuePayments) {
            return Err(EngineError::access_denied("role cannot cancel payments"));
        }
        let mut payment = self.get(transaction_id).await?;
        if payment.status != PixPaymentStatus::Pending {
            return Err(EngineError::conflict(format!(
                "only a PENDING charge can be cancelled, charge is {}",
                payment.status.as_str()
            )));
        }
        payment.status = PixPaymentStatus::Cancelled;
        payment.updated_at = now;
        if !self
            .payments
            .transition(&payment, PixPaymentStatus::Pending)
            .await?
        {
            return Err(EngineError::conflict("charge was concurrently modified"));
        }
        Ok(payment)
    }

    /// Reverse a settled charge. Restricted to operators with the refund
    /// capability, which only admins hold.
    pub async fn refund(
        &self,
        actor: &Actor,
        transaction_id: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<PixPayment> {
        if !actor.can(Capability::RefundPayments) {
            return Err(EngineError::access_denied("role cannot refund payments"));
        }
        let mut payment = self.get(transaction_id).await?;
        if payment.status != PixPaymentStatus::Paid {
            return Err(EngineError::conflict(format!(
                "only a PAID charge can be refunded, charge is {}",
                payment.status.as_str()
            )));
        }
        payment.status = PixPaymentStatus::Refunded;
        payment.updated_at = now;
        if !self
            .payments
            .transition(&payment, PixPaymentStatus::Paid)
            .await?
        {
            return Err(EngineError::conflict("charge was concurrently modified"));
        }
        tracing::info!(transaction_id = %payment.transaction_id, "pix charge refunded");
        Ok(payment)
    }

    /// Persist expiry for every PENDING charge past its deadline.
    pub async fn expire_sweep(&self, now: DateTime<Utc>) -> EngineResult<u64> {
        let expired = self.payments.expire_pending_before(now).await?;
        if expired > 0 {
            tracing::info!(count = expired, "expired stale pix charges");
        }
        Ok(expired)
    }
}
