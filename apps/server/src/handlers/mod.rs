pub mod barber;
pub mod booking;
pub mod health;
pub mod public;

use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;

use crate::auth::{self, Claims};
use crate::models::ApiResponse;
use crate::AppState;

/// Helper: extract verified JWT claims from the Authorization header.
pub(crate) fn authenticate(
    headers: &HeaderMap,
    state: &AppState,
) -> Result<Claims, (StatusCode, Json<ApiResponse<()>>)> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::error("Missing Authorization header")),
            )
        })?;
    auth::extract_claims(header, &state.jwt_secret).ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("Invalid or expired token")),
        )
    })
}

/// Log a storage failure and map it to a generic 500 body.
pub(crate) fn db_error(
    context: &'static str,
    err: sqlx::Error,
) -> (StatusCode, Json<ApiResponse<()>>) {
    tracing::error!("{}: {}", context, err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::error("Database error")),
    )
}
