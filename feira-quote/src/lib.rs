pub mod ledger;
pub mod models;
pub mod repository;

pub use ledger::{QuoteLedger, QuoteRequest, SupplierResponse};
pub use models::{Quote, QuoteStatus};
pub use repository::QuoteRepository;
