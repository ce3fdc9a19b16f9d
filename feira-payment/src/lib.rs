pub mod emv;
pub mod models;
pub mod reconciler;
pub mod repository;

pub use emv::{build_payload, EmvPayload};
pub use models::{
    generate_transaction_id, validate_pix_key, PixKeyType, PixPayment, PixPaymentStatus,
};
pub use reconciler::{PaymentBinding, PaymentReconciler, PixIssueRequest};
pub use repository::PaymentRepository;
