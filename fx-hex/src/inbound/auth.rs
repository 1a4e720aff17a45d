//! Authentication middleware for API key validation.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use fx_types::RatesRepository;

use super::handlers::AppState;

/// Extracts the API key from the Authorization header.
/// Expected format: "Bearer <api_key>" or just "<api_key>"
fn extract_api_key(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;
    Some(header.strip_prefix("Bearer ").unwrap_or(header).trim())
}

/// Paths served without a key.
fn is_public(path: &str) -> bool {
    path == "/health" || path == "/docs" || path.starts_with("/docs/") || path.starts_with("/api-docs/")
}

/// Authentication middleware that validates the bearer key.
///
/// The presented key is hashed with SHA-256 and compared in constant time
/// against the configured hash. `/health` and the Swagger UI are open.
pub async fn auth_middleware<R: RatesRepository>(
    State(state): State<Arc<AppState<R>>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if is_public(request.uri().path()) {
        return next.run(request).await;
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let api_key = match extract_api_key(auth_header) {
        Some(key) if !key.is_empty() => key,
        _ => {
            return unauthorized_response("Missing or invalid Authorization header");
        }
    };

    if state.api_key.matches(api_key) {
        next.run(request).await
    } else {
        tracing::debug!(path = %request.uri().path(), "Rejected API key");
        unauthorized_response("Invalid API key")
    }
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": message,
            "code": 401
        })),
    )
        .into_response()
}
