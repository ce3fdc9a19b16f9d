use crate::models::{Quote, QuoteStatus};
use crate::repository::QuoteRepository;
use chrono::{DateTime, Utc};
use feira_catalog::{price, ProductCatalog, TierSchedule};
use feira_core::{EngineError, EngineResult};
use feira_shared::{Actor, Capability};
use std::sync::Arc;
use uuid::Uuid;

/// A buyer's quote request.
#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub product_id: Uuid,
    pub quantity: i64,
    pub notes: Option<String>,
}

/// A supplier's priced response to a pending quote.
#[derive(Debug, Clone)]
pub struct SupplierResponse {
    /// Overrides the catalog base price when set; tier discounts still apply.
    pub unit_price_cents_override: Option<i64>,
    pub valid_until: DateTime<Utc>,
    pub delivery_time: Option<String>,
    pub terms: Option<String>,
    pub supplier_notes: Option<String>,
}

/// Owns the Quote lifecycle: buyer request, supplier response, buyer
/// rejection, lazy expiry. Acceptance lives with the order converter since
/// it spans both aggregates in one transaction.
pub struct QuoteLedger {
    quotes: Arc<dyn QuoteRepository>,
    catalog: Arc<dyn ProductCatalog>,
}

impl QuoteLedger {
    pub fn new(quotes: Arc<dyn QuoteRepository>, catalog: Arc<dyn ProductCatalog>) -> Self {
        Self { quotes, catalog }
    }

    /// Create a pending quote for a single product. The supplier is the
    /// product's owning supplier.
    pub async fn request(
        &self,
        actor: &Actor,
        request: QuoteRequest,
        now: DateTime<Utc>,
    ) -> EngineResult<Quote> {
        if !actor.can(Capability::RequestQuotes) {
            return Err(EngineError::access_denied("role cannot request quotes"));
        }
        if request.quantity < 1 {
            return Err(EngineError::validation("quantity must be at least 1"));
        }

        let product = self
            .catalog
            .get_product(request.product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| EngineError::not_found("product"))?;

        if request.quantity < product.minimum_order_quantity {
            return Err(EngineError::validation(format!(
                "minimum order quantity is {} units, requested {}",
                product.minimum_order_quantity, request.quantity
            )));
        }

        let quote = Quote::new_request(
            actor.id,
            product.supplier_id,
            product.id,
            request.quantity,
            request.notes,
            now,
        );
        self.quotes.insert(&quote).await?;

        tracing::info!(
            quote_id = %quote.id,
            quote_number = %quote.quote_number,
            buyer_id = %quote.buyer_id,
            "quote requested"
        );
        Ok(quote)
    }

    /// Supplier prices a pending quote and opens the validity window.
    pub async fn respond(
        &self,
        actor: &Actor,
        quote_id: Uuid,
        response: SupplierResponse,
        now: DateTime<Utc>,
    ) -> EngineResult<Quote> {
        if !actor.can(Capability::RespondToQuotes) {
            return Err(EngineError::access_denied("role cannot respond to quotes"));
        }
        if response.valid_until <= now {
            return Err(EngineError::validation("valid_until must be in the future"));
        }
        if let Some(override_cents) = response.unit_price_cents_override {
            if override_cents < 0 {
                return Err(EngineError::validation("unit price cannot be negative"));
            }
        }

        let mut quote = self
            .quotes
            .fetch(quote_id)
            .await?
            .ok_or_else(|| EngineError::not_found("quote"))?;

        if !actor.is_admin() && actor.id != quote.supplier_id {
            return Err(EngineError::access_denied(
                "quote belongs to another supplier",
            ));
        }
        if quote.status != QuoteStatus::Pending {
            return Err(EngineError::conflict(format!(
                "quote is {}, only PENDING quotes can be responded to",
                quote.status.as_str()
            )));
        }

        let product = self
            .catalog
            .get_product(quote.product_id)
            .await?
            .ok_or_else(|| EngineError::not_found("product"))?;

        let schedule = TierSchedule::new(product.tier_pricing.clone())
            .map_err(|e| EngineError::validation(e.to_string()))?;
        let base = response
            .unit_price_cents_override
            .unwrap_or(product.base_price_cents);
        let priced = price(base, quote.quantity, &schedule)?;

        quote.apply_response(
            priced.unit_price_cents,
            priced.total_cents,
            response.valid_until,
            response.delivery_time,
            response.terms,
            response.supplier_notes,
            now,
        );

        if !self
            .quotes
            .conditional_update(&quote, QuoteStatus::Pending)
            .await?
        {
            return Err(EngineError::conflict("quote was concurrently modified"));
        }

        tracing::info!(
            quote_id = %quote.id,
            total_cents = priced.total_cents,
            valid_until = %response.valid_until,
            "quote responded"
        );
        Ok(quote)
    }

    /// Buyer declines a quoted quote.
    pub async fn reject(
        &self,
        actor: &Actor,
        quote_id: Uuid,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> EngineResult<Quote> {
        if !actor.can(Capability::DecideQuotes) {
            return Err(EngineError::access_denied("role cannot decide quotes"));
        }

        let mut quote = self
            .quotes
            .fetch(quote_id)
            .await?
            .ok_or_else(|| EngineError::not_found("quote"))?;

        if !actor.is_admin() && actor.id != quote.buyer_id {
            return Err(EngineError::access_denied("quote belongs to another buyer"));
        }
        if quote.status != QuoteStatus::Quoted {
            return Err(EngineError::conflict(format!(
                "quote is {}, only QUOTED quotes can be rejected",
                quote.status.as_str()
            )));
        }

        quote.apply_rejection(reason, now);

        if !self
            .quotes
            .conditional_update(&quote, QuoteStatus::Quoted)
            .await?
        {
            return Err(EngineError::conflict("quote was concurrently modified"));
        }

        tracing::info!(quote_id = %quote.id, "quote rejected");
        Ok(quote)
    }

    /// Fetch with lazy expiry applied to the presented status.
    pub async fn get(&self, quote_id: Uuid, now: DateTime<Utc>) -> EngineResult<Quote> {
        let mut quote = self
            .quotes
            .fetch(quote_id)
            .await?
            .ok_or_else(|| EngineError::not_found("quote"))?;
        quote.status = quote.effective_status(now);
        Ok(quote)
    }

    /// All quotes the actor is party to, lazy expiry applied.
    pub async fn list_for(&self, actor: &Actor, now: DateTime<Utc>) -> EngineResult<Vec<Quote>> {
        let mut quotes = self.quotes.list_for_party(actor.id).await?;
        for quote in &mut quotes {
            quote.status = quote.effective_status(now);
        }
        Ok(quotes)
    }

    /// Persist expirations so reporting sees them without waiting for the
    /// next write attempt. Optional: correctness never depends on it.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> EngineResult<u64> {
        let expired = self.quotes.expire_all_due(now).await?;
        if expired > 0 {
            tracing::info!(count = expired, "persisted quote expirations");
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::QuoteRepository;
    use async_trait::async_trait;
    use chrono::Duration;
    use feira_catalog::{PricingTier, ProductSnapshot};
    use feira_core::EngineResult;
    use feira_shared::Role;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MemoryQuotes {
        quotes: Mutex<HashMap<Uuid, Quote>>,
    }

    impl MemoryQuotes {
        fn new() -> Self {
            Self {
                quotes: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl QuoteRepository for MemoryQuotes {
        async fn insert(&self, quote: &Quote) -> EngineResult<()> {
            self.quotes
                .lock()
                .unwrap()
                .insert(quote.id, quote.clone());
            Ok(())
        }

        async fn fetch(&self, id: Uuid) -> EngineResult<Option<Quote>> {
            Ok(self.quotes.lock().unwrap().get(&id).cloned())
        }

        async fn list_for_party(&self, party_id: Uuid) -> EngineResult<Vec<Quote>> {
            Ok(self
                .quotes
                .lock()
                .unwrap()
                .values()
                .filter(|q| q.buyer_id == party_id || q.supplier_id == party_id)
                .cloned()
                .collect())
        }

        async fn conditional_update(
            &self,
            quote: &Quote,
            expected: QuoteStatus,
        ) -> EngineResult<bool> {
            let mut quotes = self.quotes.lock().unwrap();
            match quotes.get_mut(&quote.id) {
                Some(current) if current.status == expected => {
                    *current = quote.clone();
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn mark_expired(&self, id: Uuid, now: DateTime<Utc>) -> EngineResult<bool> {
            let mut quotes = self.quotes.lock().unwrap();
            match quotes.get_mut(&id) {
                Some(q) if q.status == QuoteStatus::Quoted => {
                    q.status = QuoteStatus::Expired;
                    q.updated_at = now;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn expire_all_due(&self, now: DateTime<Utc>) -> EngineResult<u64> {
            let mut quotes = self.quotes.lock().unwrap();
            let mut count = 0;
            for q in quotes.values_mut() {
                if q.status == QuoteStatus::Quoted && q.is_past_validity(now) {
                    q.status = QuoteStatus::Expired;
                    q.updated_at = now;
                    count += 1;
                }
            }
            Ok(count)
        }
    }

    struct MemoryCatalog {
        products: HashMap<Uuid, ProductSnapshot>,
    }

    #[async_trait]
    impl ProductCatalog for MemoryCatalog {
        async fn get_product(&self, id: Uuid) -> EngineResult<Option<ProductSnapshot>> {
            Ok(self.products.get(&id).cloned())
        }
    }

    struct Fixture {
        ledger: QuoteLedger,
        buyer: Actor,
        supplier: Actor,
        product_id: Uuid,
    }

    fn fixture(minimum_order_quantity: i64, tiers: Vec<PricingTier>) -> Fixture {
        let supplier = Actor::new(Uuid::new_v4(), Role::Supplier);
        let product = ProductSnapshot {
            id: Uuid::new_v4(),
            supplier_id: supplier.id,
            name: "Industrial pump".to_string(),
            base_price_cents: 10_000,
            tier_pricing: tiers,
            minimum_order_quantity,
            is_active: true,
        };
        let product_id = product.id;
        let catalog = MemoryCatalog {
            products: HashMap::from([(product_id, product)]),
        };
        Fixture {
            ledger: QuoteLedger::new(Arc::new(MemoryQuotes::new()), Arc::new(catalog)),
            buyer: Actor::new(Uuid::new_v4(), Role::Buyer),
            supplier,
            product_id,
        }
    }

    fn respond_in(hours: i64) -> SupplierResponse {
        SupplierResponse {
            unit_price_cents_override: None,
            valid_until: Utc::now() + Duration::hours(hours),
            delivery_time: Some("5 business days".to_string()),
            terms: None,
            supplier_notes: None,
        }
    }

    #[tokio::test]
    async fn test_request_below_minimum_quantity_fails() {
        let f = fixture(10, vec![]);
        let err = f
            .ledger
            .request(
                &f.buyer,
                QuoteRequest {
                    product_id: f.product_id,
                    quantity: 5,
                    notes: None,
                },
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_request_unknown_product_fails() {
        let f = fixture(1, vec![]);
        let err = f
            .ledger
            .request(
                &f.buyer,
                QuoteRequest {
                    product_id: Uuid::new_v4(),
                    quantity: 5,
                    notes: None,
                },
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_respond_prices_with_override_and_window() {
        let f = fixture(1, vec![]);
        let now = Utc::now();
        let quote = f
            .ledger
            .request(
                &f.buyer,
                QuoteRequest {
                    product_id: f.product_id,
                    quantity: 3,
                    notes: None,
                },
                now,
            )
            .await
            .unwrap();

        let response = SupplierResponse {
            unit_price_cents_override: Some(2_000),
            ..respond_in(48)
        };
        let quoted = f
            .ledger
            .respond(&f.supplier, quote.id, response, now)
            .await
            .unwrap();

        assert_eq!(quoted.status, QuoteStatus::Quoted);
        assert_eq!(quoted.unit_price_cents, Some(2_000));
        assert_eq!(quoted.total_cents, Some(6_000));
    }

    #[tokio::test]
    async fn test_respond_applies_tier_discount() {
        let f = fixture(
            1,
            vec![
                PricingTier {
                    min_quantity: 1,
                    max_quantity: Some(9),
                    discount: 0.0,
                },
                PricingTier {
                    min_quantity: 10,
                    max_quantity: None,
                    discount: 0.1,
                },
            ],
        );
        let now = Utc::now();
        let quote = f
            .ledger
            .request(
                &f.buyer,
                QuoteRequest {
                    product_id: f.product_id,
                    quantity: 50,
                    notes: None,
                },
                now,
            )
            .await
            .unwrap();

        let quoted = f
            .ledger
            .respond(&f.supplier, quote.id, respond_in(48), now)
            .await
            .unwrap();

        assert_eq!(quoted.unit_price_cents, Some(9_000));
        assert_eq!(quoted.total_cents, Some(450_000));
    }

    #[tokio::test]
    async fn test_respond_to_overflowing_quantity_fails() {
        let f = fixture(1, vec![]);
        let now = Utc::now();
        let quote = f
            .ledger
            .request(
                &f.buyer,
                QuoteRequest {
                    product_id: f.product_id,
                    quantity: i64::MAX / 1_000,
                    notes: None,
                },
                now,
            )
            .await
            .unwrap();

        // 10_000 centavos times this quantity does not fit an i64; the
        // response is refused instead of recording a wrapped total.
        let err = f
            .ledger
            .respond(&f.supplier, quote.id, respond_in(48), now)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_respond_by_wrong_supplier_denied() {
        let f = fixture(1, vec![]);
        let now = Utc::now();
        let quote = f
            .ledger
            .request(
                &f.buyer,
                QuoteRequest {
                    product_id: f.product_id,
                    quantity: 2,
                    notes: None,
                },
                now,
            )
            .await
            .unwrap();

        let intruder = Actor::new(Uuid::new_v4(), Role::Supplier);
        let err = f
            .ledger
            .respond(&intruder, quote.id, respond_in(48), now)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AccessDenied(_)));
    }

    #[tokio::test]
    async fn test_respond_twice_conflicts() {
        let f = fixture(1, vec![]);
        let now = Utc::now();
        let quote = f
            .ledger
            .request(
                &f.buyer,
                QuoteRequest {
                    product_id: f.product_id,
                    quantity: 2,
                    notes: None,
                },
                now,
            )
            .await
            .unwrap();

        f.ledger
            .respond(&f.supplier, quote.id, respond_in(48), now)
            .await
            .unwrap();
        let err = f
            .ledger
            .respond(&f.supplier, quote.id, respond_in(48), now)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_reject_records_reason_and_is_terminal() {
        let f = fixture(1, vec![]);
        let now = Utc::now();
        let quote = f
            .ledger
            .request(
                &f.buyer,
                QuoteRequest {
                    product_id: f.product_id,
                    quantity: 2,
                    notes: None,
                },
                now,
            )
            .await
            .unwrap();
        f.ledger
            .respond(&f.supplier, quote.id, respond_in(48), now)
            .await
            .unwrap();

        let rejected = f
            .ledger
            .reject(&f.buyer, quote.id, Some("found cheaper".to_string()), now)
            .await
            .unwrap();
        assert_eq!(rejected.status, QuoteStatus::Rejected);
        assert!(rejected.supplier_notes.unwrap().contains("found cheaper"));
        // Pricing invariant: rejected quotes keep their figures.
        assert!(rejected.unit_price_cents.is_some());

        let err = f
            .ledger
            .reject(&f.buyer, quote.id, None, now)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_get_presents_lazy_expiry() {
        let f = fixture(1, vec![]);
        let now = Utc::now();
        let quote = f
            .ledger
            .request(
                &f.buyer,
                QuoteRequest {
                    product_id: f.product_id,
                    quantity: 2,
                    notes: None,
                },
                now,
            )
            .await
            .unwrap();
        f.ledger
            .respond(&f.supplier, quote.id, respond_in(1), now)
            .await
            .unwrap();

        let later = now + Duration::hours(2);
        let seen = f.ledger.get(quote.id, later).await.unwrap();
        assert_eq!(seen.status, QuoteStatus::Expired);

        // The sweep persists it.
        assert_eq!(f.ledger.sweep_expired(later).await.unwrap(), 1);
        assert_eq!(f.ledger.sweep_expired(later).await.unwrap(), 0);
    }
}
