use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use feira_core::EngineError;
use serde_json::json;

/// HTTP carrier for the engine taxonomy plus the auth failures that only
/// exist at this boundary.
#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    Engine(EngineError),
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        AppError::Engine(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Engine(err) => match err {
                EngineError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
                EngineError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
                EngineError::AccessDenied(msg) => (StatusCode::FORBIDDEN, msg),
                EngineError::Conflict(msg) => (StatusCode::CONFLICT, msg),
                EngineError::Expired(msg) => (StatusCode::GONE, msg),
                EngineError::Storage(msg) => {
                    tracing::error!("storage error: {}", msg);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal Server Error".to_string(),
                    )
                }
            },
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
