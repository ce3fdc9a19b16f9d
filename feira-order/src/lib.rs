pub mod converter;
pub mod fulfillment;
pub mod models;
pub mod repository;

#[cfg(test)]
mod testutil;

pub use converter::OrderConverter;
pub use fulfillment::{OrderFulfillmentTracker, TransitionRequest};
pub use models::{Order, OrderStatus, OrderStatusEntry};
pub use repository::{AcceptanceStore, OrderRepository};
