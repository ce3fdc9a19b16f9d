use async_trait::async_trait;
use feira_core::EngineResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One quantity band of a product's discount schedule. `max_quantity: None`
/// means the band is open-ended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingTier {
    pub min_quantity: i64,
    pub max_quantity: Option<i64>,
    pub discount: f64,
}

impl PricingTier {
    pub fn contains(&self, quantity: i64) -> bool {
        quantity >= self.min_quantity
            && self.max_quantity.map_or(true, |max| quantity <= max)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TierError {
    #[error("invalid tier schedule: {0}")]
    InvalidTierSchedule(String),
}

/// A validated, ordered discount schedule. Construction is the only way to
/// obtain one, so pricing can assume the bands are sane.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierSchedule {
    tiers: Vec<PricingTier>,
}

impl TierSchedule {
    /// Empty schedule: every quantity prices at the base rate.
    pub fn empty() -> Self {
        Self { tiers: Vec::new() }
    }

    /// Validates that tiers are ascending by `min_quantity`, non-overlapping,
    /// internally consistent, and carry discounts in [0, 1].
    pub fn new(tiers: Vec<PricingTier>) -> Result<Self, TierError> {
        for tier in &tiers {
            if tier.min_quantity < 1 {
                return Err(TierError::InvalidTierSchedule(format!(
                    "min_quantity {} is below 1",
                    tier.min_quantity
                )));
            }
            if let Some(max) = tier.max_quantity {
                if max < tier.min_quantity {
                    return Err(TierError::InvalidTierSchedule(format!(
                        "tier [{}, {}] has max below min",
                        tier.min_quantity, max
                    )));
                }
            }
            if !(0.0..=1.0).contains(&tier.discount) {
                return Err(TierError::InvalidTierSchedule(format!(
                    "discount {} is outside [0, 1]",
                    tier.discount
                )));
            }
        }

        for pair in tiers.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.min_quantity <= prev.min_quantity {
                return Err(TierError::InvalidTierSchedule(
                    "tiers are not ascending by min_quantity".to_string(),
                ));
            }
            match prev.max_quantity {
                Some(max) if next.min_quantity > max => {}
                // An open-ended band before the last one swallows everything
                // after it.
                _ => {
                    return Err(TierError::InvalidTierSchedule(format!(
                        "tier starting at {} overlaps its predecessor",
                        next.min_quantity
                    )))
                }
            }
        }

        Ok(Self { tiers })
    }

    /// The band containing `quantity`, if any.
    pub fn tier_for(&self, quantity: i64) -> Option<&PricingTier> {
        self.tiers.iter().find(|t| t.contains(quantity))
    }

    pub fn tiers(&self) -> &[PricingTier] {
        &self.tiers
    }
}

/// What the catalog collaborator exposes about a product: just enough to
/// validate a quote request and price a supplier response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub name: String,
    pub base_price_cents: i64,
    pub tier_pricing: Vec<PricingTier>,
    pub minimum_order_quantity: i64,
    pub is_active: bool,
}

/// Product catalog lookup contract.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn get_product(&self, id: Uuid) -> EngineResult<Option<ProductSnapshot>>;
}
