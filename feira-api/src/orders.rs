use axum::{
    extract::{Path, State},
    routing::{get, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use feira_core::EngineError;
use feira_order::{Order, OrderFulfillmentTracker, OrderStatus, OrderStatusEntry, TransitionRequest};
use feira_payment::PixPayment;
use feira_shared::Actor;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/orders", get(list_orders))
        .route("/v1/orders/{id}", get(get_order))
        .route("/v1/orders/{id}/status", put(update_status))
}

#[derive(Debug, Serialize)]
struct PaymentSummary {
    transaction_id: String,
    amount_cents: i64,
    status: feira_payment::PixPaymentStatus,
    paid_at: Option<DateTime<Utc>>,
}

impl PaymentSummary {
    fn from_payment(payment: &PixPayment, now: DateTime<Utc>) -> Self {
        Self {
            transaction_id: payment.transaction_id.clone(),
            amount_cents: payment.amount_cents,
            status: payment.effective_status(now),
            paid_at: payment.paid_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct OrderDetail {
    #[serde(flatten)]
    order: Order,
    history: Vec<OrderStatusEntry>,
    payments: Vec<PaymentSummary>,
}

async fn list_orders(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = state.orders.list_for_party(actor.id).await?;
    Ok(Json(orders))
}

async fn get_order(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDetail>, AppError> {
    let order = state
        .orders
        .fetch(id)
        .await?
        .ok_or_else(|| EngineError::not_found("order"))?;

    if !actor.is_admin() && actor.id != order.company_id && actor.id != order.supplier_id {
        return Err(EngineError::access_denied("not a party to this order").into());
    }

    let now = Utc::now();
    let history = state.orders.history(id).await?;
    let payments = state
        .payments
        .list_for_order(id)
        .await?
        .iter()
        .map(|p| PaymentSummary::from_payment(p, now))
        .collect();

    Ok(Json(OrderDetail {
        order,
        history,
        payments,
    }))
}

#[derive(Debug, Deserialize)]
struct UpdateStatusBody {
    status: OrderStatus,
    notes: Option<String>,
    tracking_number: Option<String>,
    estimated_delivery_date: Option<DateTime<Utc>>,
}

async fn update_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStatusBody>,
) -> Result<Json<Order>, AppError> {
    let tracker = OrderFulfillmentTracker::new(state.orders.clone());
    let order = tracker
        .transition(
            &actor,
            id,
            TransitionRequest {
                to_status: body.status,
                notes: body.notes,
                tracking_number: body.tracking_number,
                estimated_delivery_date: body.estimated_delivery_date,
            },
            Utc::now(),
        )
        .await?;
    Ok(Json(order))
}
