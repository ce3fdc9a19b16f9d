use crate::product::TierSchedule;
use feira_core::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// Result of pricing a quantity against a discount schedule. Amounts are
/// integer centavos.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceQuote {
    pub unit_price_cents: i64,
    pub total_cents: i64,
}

/// Effective unit price and total for `quantity` units at `base_price_cents`,
/// after the tier discount for the band containing the quantity. Quantities
/// matching no band price at the base rate. Pure and deterministic. Totals
/// that do not fit an i64 are refused rather than wrapped.
pub fn price(
    base_price_cents: i64,
    quantity: i64,
    schedule: &TierSchedule,
) -> EngineResult<PriceQuote> {
    let discount = schedule.tier_for(quantity).map_or(0.0, |t| t.discount);
    let unit_price_cents = (base_price_cents as f64 * (1.0 - discount)).round() as i64;
    let total_cents = unit_price_cents.checked_mul(quantity).ok_or_else(|| {
        EngineError::validation("quantity too large: total exceeds the representable amount")
    })?;
    Ok(PriceQuote {
        unit_price_cents,
        total_cents,
    })
}
