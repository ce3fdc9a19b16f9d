pub mod pricing;
pub mod product;

pub use pricing::{price, PriceQuote};
pub use product::{PricingTier, ProductCatalog, ProductSnapshot, TierError, TierSchedule};
