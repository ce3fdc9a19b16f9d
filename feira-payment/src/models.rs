use chrono::{DateTime, Utc};
use feira_core::{EngineError, EngineResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// PIX charge lifecycle. PENDING charges settle to PAID, lapse to EXPIRED,
/// or are withdrawn to CANCELLED; only PAID can move to REFUNDED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PixPaymentStatus {
    Pending,
    Paid,
    Cancelled,
    Expired,
    Refunded,
}

impl PixPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PixPaymentStatus::Pending => "PENDING",
            PixPaymentStatus::Paid => "PAID",
            PixPaymentStatus::Cancelled => "CANCELLED",
            PixPaymentStatus::Expired => "EXPIRED",
            PixPaymentStatus::Refunded => "REFUNDED",
        }
    }

    pub fn parse(value: &str) -> EngineResult<Self> {
        match value {
            "PENDING" => Ok(PixPaymentStatus::Pending),
            "PAID" => Ok(PixPaymentStatus::Paid),
            "CANCELLED" => Ok(PixPaymentStatus::Cancelled),
            "EXPIRED" => Ok(PixPaymentStatus::Expired),
            "REFUNDED" => Ok(PixPaymentStatus::Refunded),
            other => Err(EngineError::storage(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PixKeyType {
    Email,
    Phone,
    Cpf,
    Cnpj,
    Random,
}

impl PixKeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PixKeyType::Email => "EMAIL",
            PixKeyType::Phone => "PHONE",
            PixKeyType::Cpf => "CPF",
            PixKeyType::Cnpj => "CNPJ",
            PixKeyType::Random => "RANDOM",
        }
    }

    pub fn parse(value: &str) -> EngineResult<Self> {
        match value {
            "EMAIL" => Ok(PixKeyType::Email),
            "PHONE" => Ok(PixKeyType::Phone),
            "CPF" => Ok(PixKeyType::Cpf),
            "CNPJ" => Ok(PixKeyType::Cnpj),
            "RANDOM" => Ok(PixKeyType::Random),
            other => Err(EngineError::storage(format!("unknown pix key type: {other}"))),
        }
    }
}

/// Format check per key type. Numeric keys carry digits only (callers strip
/// punctuation before issuance); random keys are UUIDs.
pub fn validate_pix_key(key: &str, key_type: PixKeyType) -> EngineResult<()> {
    let ok = match key_type {
        PixKeyType::Email => {
            let mut parts = key.splitn(2, '@');
            match (parts.next(), parts.next()) {
                (Some(local), Some(domain)) => {
                    !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
                }
                _ => false,
            }
        }
        PixKeyType::Phone => {
            let digits = key.strip_prefix("+55").unwrap_or(key);
            (10..=11).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
        }
        PixKeyType::Cpf => key.len() == 11 && key.chars().all(|c| c.is_ascii_digit()),
        PixKeyType::Cnpj => key.len() == 14 && key.chars().all(|c| c.is_ascii_digit()),
        PixKeyType::Random => Uuid::parse_str(key).is_ok(),
    };
    if ok {
        Ok(())
    } else {
        Err(EngineError::validation(format!(
            "malformed {} pix key",
            key_type.as_str()
        )))
    }
}

/// A PIX charge bound to exactly one quote or one order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PixPayment {
    pub id: Uuid,
    pub transaction_id: String,
    /// Bank-assigned settlement identifier, set on confirmation.
    pub end_to_end_id: Option<String>,
    pub quote_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub amount_cents: i64,
    pub description: String,
    pub pix_key: String,
    pub pix_key_type: PixKeyType,
    pub payer_name: String,
    pub payer_document: String,
    pub receiver_name: String,
    pub receiver_document: String,
    pub qr_code: String,
    pub status: PixPaymentStatus,
    pub expires_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PixPayment {
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Status as presented to callers: a PENDING charge past its expiry
    /// reads as EXPIRED even before the sweep persists it.
    pub fn effective_status(&self, now: DateTime<Utc>) -> PixPaymentStatus {
        if self.status == PixPaymentStatus::Pending && self.is_past_expiry(now) {
            PixPaymentStatus::Expired
        } else {
            self.status
        }
    }
}

/// `FRA` + the trailing eight digits of the epoch millis + eight random
/// uppercase hex characters. Unique in practice, indexed unique in storage.
pub fn generate_transaction_id(now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().to_string();
    let tail = &millis[millis.len().saturating_sub(8)..];
    const HEX: &[u8] = b"0123456789ABCDEF";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..8).map(|_| HEX[rng.gen_range(0..16)] as char).collect();
    format!("FRA{tail}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_id_shape() {
        let id = generate_transaction_id(Utc::now());
        assert_eq!(id.len(), 19);
        assert!(id.starts_with("FRA"));
        assert!(id[3..11].chars().all(|c| c.is_ascii_digit()));
        assert!(id[11..]
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[test]
    fn test_pix_key_validation() {
        assert!(validate_pix_key("financeiro@acme.com.br", PixKeyType::Email).is_ok());
        assert!(validate_pix_key("financeiro-acme", PixKeyType::Email).is_err());
        assert!(validate_pix_key("+5511987654321", PixKeyType::Phone).is_ok());
        assert!(validate_pix_key("11987654321", PixKeyType::Phone).is_ok());
        assert!(validate_pix_key("123", PixKeyType::Phone).is_err());
        assert!(validate_pix_key("12345678901", PixKeyType::Cpf).is_ok());
        assert!(validate_pix_key("123.456.789-01", PixKeyType::Cpf).is_err());
        assert!(validate_pix_key("12345678000195", PixKeyType::Cnpj).is_ok());
        assert!(validate_pix_key(&Uuid::new_v4().to_string(), PixKeyType::Random).is_ok());
        assert!(validate_pix_key("not-a-uuid", PixKeyType::Random).is_err());
    }

    #[test]
    fn test_effective_status_lazy_expiry() {
        let now = Utc::now();
        let payment = PixPayment {
            id: Uuid::new_v4(),
            transaction_id: generate_transaction_id(now),
            end_to_end_id: None,
            quote_id: Some(Uuid::new_v4()),
            order_id: None,
            amount_cents: 10_000,
            description: "Quote payment".to_string(),
            pix_key: "12345678901".to_string(),
            pix_key_type: PixKeyType::Cpf,
            payer_name: "Acme".to_string(),
            payer_document: "12345678000195".to_string(),
            receiver_name: "Fornecedora".to_string(),
            receiver_document: "98765432000110".to_string(),
            qr_code: String::new(),
            status: PixPaymentStatus::Pending,
            expires_at: now - chrono::Duration::minutes(1),
            paid_at: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(payment.effective_status(now), PixPaymentStatus::Expired);
        assert_eq!(payment.status, PixPaymentStatus::Pending);
    }
}
