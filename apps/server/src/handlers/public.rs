use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::availability::{
    compute_available_slots, day_bounds, TimeOfDay, DEFAULT_SLOT_GRANULARITY_MIN,
};
use crate::models::*;
use crate::{auth, store, AppState};

use super::db_error;

/// POST /api/login — mint a session token for a signed-in user.
///
/// TODO: verify the identity provider's ID token here instead of trusting
/// the submitted uid/email pair.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, (StatusCode, Json<ApiResponse<()>>)> {
    if body.uid.trim().is_empty() || body.email.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("uid and email are required")),
        ));
    }

    let token = auth::mint_token(&body.uid, &body.email, &state.jwt_secret).map_err(|e| {
        tracing::error!("login: token encoding failed: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error("Could not create session")),
        )
    })?;

    Ok(Json(ApiResponse::success(LoginResponse { token })))
}

/// GET /api/barber_profiles — all profiles with establishment summary,
/// for the public search page.
pub async fn list_barber_profiles(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<BarberSummary>>>, StatusCode> {
    let rows = sqlx::query_as::<_, BarberSummaryRow>(
        "SELECT b.id, b.name, b.bio, b.email,
                e.id AS establishment_id, e.name AS establishment_name,
                e.banner_url, e.profile_url, e.address_json
         FROM barber_profiles b
         LEFT JOIN establishments e ON e.barber_id = b.id
         ORDER BY b.name ASC",
    )
    .fetch_all(&state.db)
    .await
    .map_err(|e| {
        tracing::error!("list_barber_profiles: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let profiles = rows.into_iter().map(BarberSummary::from).collect();
    Ok(Json(ApiResponse::success(profiles)))
}

/// GET /api/establishments/:id — public establishment details.
pub async fn establishment_details(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<EstablishmentDetails>>, (StatusCode, Json<ApiResponse<()>>)> {
    let row = store::establishment_by_id(&state.db, id)
        .await
        .map_err(|e| db_error("establishment_details", e))?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("Establishment not found")),
            )
        })?;

    Ok(Json(ApiResponse::success(EstablishmentDetails::from_row(
        &row,
    ))))
}

/// GET /api/establishments/:id/services — active services of an
/// establishment, newest first.
pub async fn list_services(
    State(state): State<Arc<AppState>>,
    Path(establishment_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<Service>>>, StatusCode> {
    let services = sqlx::query_as::<_, Service>(
        "SELECT id, establishment_id, name, description, price, duration_min, is_active, created_at, updated_at
         FROM services WHERE establishment_id = ? AND is_active = 1
         ORDER BY created_at DESC",
    )
    .bind(establishment_id)
    .fetch_all(&state.db)
    .await
    .map_err(|e| {
        tracing::error!("list_services: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(ApiResponse::success(services)))
}

/// GET /api/establishments/:id/slots?service_id=N&date=YYYY-MM-DD —
/// bookable start times for a service on a date.
pub async fn list_slots(
    State(state): State<Arc<AppState>>,
    Path(establishment_id): Path<i64>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<ApiResponse<Vec<TimeOfDay>>>, (StatusCode, Json<ApiResponse<()>>)> {
    let establishment = store::establishment_by_id(&state.db, establishment_id)
        .await
        .map_err(|e| db_error("list_slots", e))?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("Establishment not found")),
            )
        })?;

    // Malformed hours read as closed, not as a fault.
    let hours = match establishment.weekly_hours() {
        Some(hours) => hours,
        None => {
            tracing::warn!("establishment {}: malformed working_hours", establishment.id);
            return Ok(Json(ApiResponse::success(Vec::new())));
        }
    };

    let service = store::active_service(&state.db, establishment_id, query.service_id)
        .await
        .map_err(|e| db_error("list_slots", e))?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("Service not found")),
            )
        })?;

    let (start, end) = day_bounds(query.date);
    let appointments = store::appointments_between(&state.db, establishment_id, start, end)
        .await
        .map_err(|e| db_error("list_slots", e))?;

    let slots = compute_available_slots(
        query.date,
        &hours,
        service.duration_min,
        &appointments,
        DEFAULT_SLOT_GRANULARITY_MIN,
    )
    .map_err(|e| {
        tracing::error!("list_slots: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error("Could not compute slots")),
        )
    })?;

    Ok(Json(ApiResponse::success(slots)))
}

/// GET /api/appointments?establishment_id=N&start=..&end=.. — appointment
/// spans in a range, for the booking page to grey out taken times.
pub async fn appointments_in_range(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<ApiResponse<Vec<AppointmentSpan>>>, StatusCode> {
    let appointments =
        store::appointments_between(&state.db, query.establishment_id, query.start, query.end)
            .await
            .map_err(|e| {
                tracing::error!("appointments_in_range: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?;

    let spans = appointments
        .into_iter()
        .map(|a| AppointmentSpan {
            start_time: a.start_time,
            end_time: a.end_time,
        })
        .collect();

    Ok(Json(ApiResponse::success(spans)))
}
