use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use feira_core::EngineError;
use feira_payment::{
    PaymentBinding, PaymentReconciler, PixIssueRequest, PixKeyType, PixPayment,
};
use feira_shared::Actor;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/payments/pix", post(issue_payment))
        .route("/v1/payments/pix/{transaction_id}", get(get_payment))
        .route(
            "/v1/payments/pix/{transaction_id}/cancel",
            post(cancel_payment),
        )
        .route(
            "/v1/payments/pix/{transaction_id}/refund",
            post(refund_payment),
        )
}

/// Settlement confirmation arrives from the payment provider, not from an
/// authenticated marketplace user, so it lives outside the auth layer.
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route(
        "/v1/payments/pix/{transaction_id}/confirm",
        post(confirm_payment),
    )
}

fn reconciler(state: &AppState) -> PaymentReconciler {
    PaymentReconciler::new(state.payments.clone(), state.rules.pix_expiration_minutes)
}

fn default_merchant_city() -> String {
    "SAO PAULO".to_string()
}

/// Admins see every charge; everyone else must be a party to the bound
/// quote or order. With `payer_only`, the receiving supplier is excluded
/// too, matching who was allowed to issue the charge.
async fn ensure_party(
    state: &AppState,
    actor: &Actor,
    payment: &PixPayment,
    payer_only: bool,
) -> Result<(), AppError> {
    if actor.is_admin() {
        return Ok(());
    }
    let allowed = if let Some(quote_id) = payment.quote_id {
        let quote = state
            .quotes
            .fetch(quote_id)
            .await?
            .ok_or_else(|| EngineError::not_found("quote"))?;
        actor.id == quote.buyer_id || (!payer_only && actor.id == quote.supplier_id)
    } else if let Some(order_id) = payment.order_id {
        let order = state
            .orders
            .fetch(order_id)
            .await?
            .ok_or_else(|| EngineError::not_found("order"))?;
        actor.id == order.company_id || (!payer_only && actor.id == order.supplier_id)
    } else {
        false
    };
    if allowed {
        Ok(())
    } else {
        Err(EngineError::access_denied("charge belongs to another party").into())
    }
}

#[derive(Debug, Deserialize)]
struct IssueBody {
    quote_id: Option<Uuid>,
    order_id: Option<Uuid>,
    amount_cents: i64,
    description: String,
    pix_key: String,
    pix_key_type: PixKeyType,
    payer_name: String,
    payer_document: String,
    receiver_name: String,
    receiver_document: String,
    #[serde(default = "default_merchant_city")]
    merchant_city: String,
}

async fn issue_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<IssueBody>,
) -> Result<(axum::http::StatusCode, Json<PixPayment>), AppError> {
    let binding = match (body.quote_id, body.order_id) {
        (Some(quote_id), None) => {
            let quote = state
                .quotes
                .fetch(quote_id)
                .await?
                .ok_or_else(|| EngineError::not_found("quote"))?;
            if !actor.is_admin() && actor.id != quote.buyer_id {
                return Err(EngineError::access_denied("quote belongs to another buyer").into());
            }
            let total_cents = quote
                .total_cents
                .ok_or_else(|| EngineError::conflict("quote has no priced total"))?;
            PaymentBinding::Quote {
                id: quote_id,
                total_cents,
            }
        }
        (None, Some(order_id)) => {
            let order = state
                .orders
                .fetch(order_id)
                .await?
                .ok_or_else(|| EngineError::not_found("order"))?;
            if !actor.is_admin() && actor.id != order.company_id {
                return Err(EngineError::access_denied("order belongs to another company").into());
            }
            PaymentBinding::Order {
                id: order_id,
                total_cents: order.total_cents,
            }
        }
        _ => {
            return Err(EngineError::validation(
                "exactly one of quote_id or order_id must be set",
            )
            .into())
        }
    };

    let payment = reconciler(&state)
        .issue(
            &actor,
            binding,
            PixIssueRequest {
                amount_cents: body.amount_cents,
                description: body.description,
                pix_key: body.pix_key,
                pix_key_type: body.pix_key_type,
                payer_name: body.payer_name,
                payer_document: body.payer_document,
                receiver_name: body.receiver_name,
                receiver_document: body.receiver_document,
                merchant_city: body.merchant_city,
            },
            Utc::now(),
        )
        .await?;
    Ok((axum::http::StatusCode::CREATED, Json(payment)))
}

async fn get_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(transaction_id): Path<String>,
) -> Result<Json<PixPayment>, AppError> {
    let mut payment = reconciler(&state).get(&transaction_id).await?;
    ensure_party(&state, &actor, &payment, false).await?;
    payment.status = payment.effective_status(Utc::now());
    Ok(Json(payment))
}

#[derive(Debug, Deserialize)]
struct ConfirmBody {
    end_to_end_id: String,
}

async fn confirm_payment(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
    Json(body): Json<ConfirmBody>,
) -> Result<Json<PixPayment>, AppError> {
    let payment = reconciler(&state)
        .confirm(&transaction_id, &body.end_to_end_id, Utc::now())
        .await?;
    Ok(Json(payment))
}

async fn cancel_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(transaction_id): Path<String>,
) -> Result<Json<PixPayment>, AppError> {
    let reconciler = reconciler(&state);
    let payment = reconciler.get(&transaction_id).await?;
    ensure_party(&state, &actor, &payment, true).await?;
    let payment = reconciler.cancel(&actor, &transaction_id, Utc::now()).await?;
    Ok(Json(payment))
}

async fn refund_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(transaction_id): Path<String>,
) -> Result<Json<PixPayment>, AppError> {
    let payment = reconciler(&state)
        .refund(&actor, &transaction_id, Utc::now())
        .await?;
    Ok(Json(payment))
}
