use feira_order::{AcceptanceStore, OrderRepository};
use feira_payment::PaymentRepository;
use feira_quote::QuoteRepository;
use feira_shared::rate::RateCounter;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct RulesConfig {
    pub default_quote_validity_hours: i64,
    pub pix_expiration_minutes: i64,
    pub sweep_interval_seconds: u64,
    pub rate_limit_per_minute: i64,
}

/// Everything the handlers need, behind trait objects so tests can run the
/// router against in-memory stores.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn feira_catalog::ProductCatalog>,
    pub quotes: Arc<dyn QuoteRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub acceptance: Arc<dyn AcceptanceStore>,
    pub payments: Arc<dyn PaymentRepository>,
    pub rate: Arc<dyn RateCounter>,
    pub auth: AuthConfig,
    pub rules: RulesConfig,
}
