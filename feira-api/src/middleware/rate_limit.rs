use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
};
use std::net::SocketAddr;

use crate::state::AppState;

/// Per-IP request throttle. Fails open: a counter outage must never take
/// the API down with it.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, impl IntoResponse> {
    // ConnectInfo is absent when the router is driven directly (tests);
    // those requests pass through unthrottled.
    let ip = match req.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => addr.ip().to_string(),
        None => return Ok(next.run(req).await),
    };
    let key = format!("ratelimit:{}", ip);

    match state.rate.incr(&key, 60).await {
        Ok((count, _reset)) if count > state.rules.rate_limit_per_minute => {
            Err((StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded"))
        }
        Ok(_) => Ok(next.run(req).await),
        Err(err) => {
            tracing::warn!("rate counter unavailable, failing open: {}", err);
            Ok(next.run(req).await)
        }
    }
}
