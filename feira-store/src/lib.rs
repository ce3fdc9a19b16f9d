pub mod app_config;
pub mod catalog_repo;
pub mod database;
pub mod errors;
pub mod order_repo;
pub mod payment_repo;
pub mod quote_repo;
pub mod redis_repo;

pub use app_config::{AuthConfig, BusinessRules, Config};
pub use catalog_repo::StoreProductCatalog;
pub use database::DbClient;
pub use order_repo::StoreOrderRepository;
pub use payment_repo::StorePaymentRepository;
pub use quote_repo::StoreQuoteRepository;
pub use redis_repo::RedisClient;
