use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Quote lifecycle status. Terminal states (Accepted, Rejected, Expired)
/// accept no further transitions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteStatus {
    Pending,
    Quoted,
    Accepted,
    Rejected,
    Expired,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Pending => "PENDING",
            QuoteStatus::Quoted => "QUOTED",
            QuoteStatus::Accepted => "ACCEPTED",
            QuoteStatus::Rejected => "REJECTED",
            QuoteStatus::Expired => "EXPIRED",
        }
    }

    pub fn parse(s: &str) -> Option<QuoteStatus> {
        match s {
            "PENDING" => Some(QuoteStatus::Pending),
            "QUOTED" => Some(QuoteStatus::Quoted),
            "ACCEPTED" => Some(QuoteStatus::Accepted),
            "REJECTED" => Some(QuoteStatus::Rejected),
            "EXPIRED" => Some(QuoteStatus::Expired),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QuoteStatus::Accepted | QuoteStatus::Rejected | QuoteStatus::Expired
        )
    }
}

/// A single-product price negotiation between one buyer and one supplier.
///
/// Invariant: `unit_price_cents`/`total_cents` are set iff status is Quoted,
/// Accepted or Rejected; a quote expired after pricing retains its last
/// known values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub id: Uuid,
    pub quote_number: String,
    pub buyer_id: Uuid,
    pub supplier_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub unit_price_cents: Option<i64>,
    pub total_cents: Option<i64>,
    pub valid_until: Option<DateTime<Utc>>,
    pub delivery_time: Option<String>,
    pub terms: Option<String>,
    pub notes: Option<String>,
    pub supplier_notes: Option<String>,
    pub status: QuoteStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quote {
    /// A fresh buyer request, unpriced, pending supplier response.
    pub fn new_request(
        buyer_id: Uuid,
        supplier_id: Uuid,
        product_id: Uuid,
        quantity: i64,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            quote_number: generate_quote_number(now),
            buyer_id,
            supplier_id,
            product_id,
            quantity,
            unit_price_cents: None,
            total_cents: None,
            valid_until: None,
            delivery_time: None,
            terms: None,
            notes,
            supplier_notes: None,
            status: QuoteStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the validity window set by the supplier has elapsed.
    pub fn is_past_validity(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.map_or(false, |deadline| now >= deadline)
    }

    /// Expiry is evaluated lazily on every read: a Quoted quote past its
    /// deadline is presented as Expired even before the store catches up.
    pub fn effective_status(&self, now: DateTime<Utc>) -> QuoteStatus {
        if self.status == QuoteStatus::Quoted && self.is_past_validity(now) {
            QuoteStatus::Expired
        } else {
            self.status
        }
    }

    pub(crate) fn apply_response(
        &mut self,
        unit_price_cents: i64,
        total_cents: i64,
        valid_until: DateTime<Utc>,
        delivery_time: Option<String>,
        terms: Option<String>,
        supplier_notes: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.unit_price_cents = Some(unit_price_cents);
        self.total_cents = Some(total_cents);
        self.valid_until = Some(valid_until);
        self.delivery_time = delivery_time;
        self.terms = terms;
        self.supplier_notes = supplier_notes;
        self.status = QuoteStatus::Quoted;
        self.updated_at = now;
    }

    pub(crate) fn apply_rejection(&mut self, reason: Option<String>, now: DateTime<Utc>) {
        if let Some(reason) = reason {
            self.supplier_notes = Some(match self.supplier_notes.take() {
                Some(existing) => format!("{existing}\nRejected: {reason}"),
                None => format!("Rejected: {reason}"),
            });
        }
        self.status = QuoteStatus::Rejected;
        self.updated_at = now;
    }
}

/// Human-readable quote number: QUO- prefix, millisecond timestamp, random
/// tail to dodge same-millisecond collisions.
fn generate_quote_number(now: DateTime<Utc>) -> String {
    format!("QUO-{}{:04X}", now.timestamp_millis(), rand::random::<u16>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_request_is_unpriced() {
        let quote = Quote::new_request(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            10,
            None,
            Utc::now(),
        );
        assert_eq!(quote.status, QuoteStatus::Pending);
        assert!(quote.unit_price_cents.is_none());
        assert!(quote.total_cents.is_none());
        assert!(quote.quote_number.starts_with("QUO-"));
    }

    #[test]
    fn test_effective_status_lazy_expiry() {
        let now = Utc::now();
        let mut quote = Quote::new_request(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            5,
            None,
            now,
        );
        quote.apply_response(1_000, 5_000, now + Duration::hours(48), None, None, None, now);

        assert_eq!(quote.effective_status(now), QuoteStatus::Quoted);
        assert_eq!(
            quote.effective_status(now + Duration::hours(49)),
            QuoteStatus::Expired
        );
        // Pricing survives the lazy expiry presentation.
        assert_eq!(quote.total_cents, Some(5_000));
    }

    #[test]
    fn test_pending_quote_never_lazily_expires() {
        let now = Utc::now();
        let quote = Quote::new_request(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            5,
            None,
            now - Duration::days(30),
        );
        assert_eq!(quote.effective_status(now), QuoteStatus::Pending);
    }
}
