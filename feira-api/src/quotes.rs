use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use feira_order::{Order, OrderConverter};
use feira_quote::{Quote, QuoteLedger, QuoteRequest, SupplierResponse};
use feira_shared::Actor;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/quotes/request", post(request_quote))
        .route("/v1/quotes", get(list_quotes))
        .route("/v1/quotes/{id}", get(get_quote))
        .route("/v1/quotes/{id}/respond", put(respond_quote))
        .route("/v1/quotes/{id}/accept", post(accept_quote))
        .route("/v1/quotes/{id}/reject", post(reject_quote))
}

fn ledger(state: &AppState) -> QuoteLedger {
    QuoteLedger::new(state.quotes.clone(), state.catalog.clone())
}

#[derive(Debug, Deserialize)]
struct RequestQuoteBody {
    product_id: Uuid,
    quantity: i64,
    notes: Option<String>,
}

async fn request_quote(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<RequestQuoteBody>,
) -> Result<(axum::http::StatusCode, Json<Quote>), AppError> {
    let quote = ledger(&state)
        .request(
            &actor,
            QuoteRequest {
                product_id: body.product_id,
                quantity: body.quantity,
                notes: body.notes,
            },
            Utc::now(),
        )
        .await?;
    Ok((axum::http::StatusCode::CREATED, Json(quote)))
}

async fn list_quotes(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<Quote>>, AppError> {
    let quotes = ledger(&state).list_for(&actor, Utc::now()).await?;
    Ok(Json(quotes))
}

async fn get_quote(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<Quote>, AppError> {
    let quote = ledger(&state).get(id, Utc::now()).await?;
    if !actor.is_admin() && actor.id != quote.buyer_id && actor.id != quote.supplier_id {
        return Err(feira_core::EngineError::access_denied("not a party to this quote").into());
    }
    Ok(Json(quote))
}

#[derive(Debug, Deserialize)]
struct RespondBody {
    unit_price_cents: Option<i64>,
    /// Defaults to now + the configured validity window.
    valid_until: Option<DateTime<Utc>>,
    delivery_time: Option<String>,
    terms: Option<String>,
    supplier_notes: Option<String>,
}

async fn respond_quote(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(body): Json<RespondBody>,
) -> Result<Json<Quote>, AppError> {
    let now = Utc::now();
    let valid_until = body
        .valid_until
        .unwrap_or_else(|| now + Duration::hours(state.rules.default_quote_validity_hours));

    let quote = ledger(&state)
        .respond(
            &actor,
            id,
            SupplierResponse {
                unit_price_cents_override: body.unit_price_cents,
                valid_until,
                delivery_time: body.delivery_time,
                terms: body.terms,
                supplier_notes: body.supplier_notes,
            },
            now,
        )
        .await?;
    Ok(Json(quote))
}

#[derive(Debug, Serialize)]
struct AcceptResponse {
    quote: Quote,
    order: Order,
}

async fn accept_quote(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<AcceptResponse>, AppError> {
    let converter = OrderConverter::new(state.acceptance.clone());
    let (quote, order) = converter.accept(&actor, id, Utc::now()).await?;
    Ok(Json(AcceptResponse { quote, order }))
}

#[derive(Debug, Deserialize, Default)]
struct RejectBody {
    reason: Option<String>,
}

async fn reject_quote(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    body: Option<Json<RejectBody>>,
) -> Result<Json<Quote>, AppError> {
    let reason = body.and_then(|Json(b)| b.reason);
    let quote = ledger(&state).reject(&actor, id, reason, Utc::now()).await?;
    Ok(Json(quote))
}
