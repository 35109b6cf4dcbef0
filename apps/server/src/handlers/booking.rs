use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Local;
use std::sync::Arc;

use crate::availability::{day_bounds, WeeklyHours};
use crate::booking::{validate_booking, BookingRequest, Rejection};
use crate::models::*;
use crate::{store, AppState};

use super::{authenticate, db_error};

fn rejection_response(rejection: &Rejection) -> Response {
    let status = match rejection {
        Rejection::MissingField(_) | Rejection::SlotUnavailable => StatusCode::BAD_REQUEST,
        Rejection::UnknownService => StatusCode::NOT_FOUND,
        Rejection::SlotTaken => StatusCode::CONFLICT,
        // Calculator input faults mean corrupt stored data, not user error.
        Rejection::Invalid(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(RejectionBody::from(rejection))).into_response()
}

/// POST /api/appointments — submit a booking.
///
/// Re-validates against a fresh snapshot, then persists inside a
/// transaction that re-checks overlap at write time: the snapshot may go
/// stale between listing and submission, and between validation and the
/// INSERT.
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<BookingRequest>,
) -> Result<Json<ApiResponse<Appointment>>, Response> {
    let claims = authenticate(&headers, &state).map_err(IntoResponse::into_response)?;

    let establishment = store::establishment_by_id(&state.db, body.establishment_id)
        .await
        .map_err(|e| db_error("create_appointment", e).into_response())?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::<()>::error("Establishment not found")),
            )
                .into_response()
        })?;

    let hours = establishment
        .weekly_hours()
        .unwrap_or_else(WeeklyHours::closed);

    let service = match body.service_id {
        Some(service_id) => store::active_service(&state.db, establishment.id, service_id)
            .await
            .map_err(|e| db_error("create_appointment", e).into_response())?,
        None => None,
    };

    let has_staff = store::staff_count(&state.db, establishment.id)
        .await
        .map_err(|e| db_error("create_appointment", e).into_response())?
        > 0;

    let appointments = match body.date {
        Some(date) => {
            let (start, end) = day_bounds(date);
            store::appointments_between(&state.db, establishment.id, start, end)
                .await
                .map_err(|e| db_error("create_appointment", e).into_response())?
        }
        None => Vec::new(),
    };

    let draft = validate_booking(&body, service.as_ref(), &hours, &appointments, has_staff)
        .map_err(|rejection| rejection_response(&rejection))?;

    // Persist with a write-time overlap re-check: validation alone cannot
    // exclude a concurrent booking that landed after the snapshot.
    let mut tx = state
        .db
        .begin()
        .await
        .map_err(|e| db_error("create_appointment", e).into_response())?;

    let conflicts: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM appointments
         WHERE establishment_id = ? AND status != 'cancelled'
           AND start_time < ? AND end_time > ?",
    )
    .bind(draft.establishment_id)
    .bind(draft.end_time)
    .bind(draft.start_time)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| db_error("create_appointment", e).into_response())?;

    if conflicts > 0 {
        return Err(rejection_response(&Rejection::SlotTaken));
    }

    let id = sqlx::query(
        "INSERT INTO appointments
         (establishment_id, service_id, employee_id, client_uid, client_name, start_time, end_time, status)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(draft.establishment_id)
    .bind(draft.service_id)
    .bind(draft.employee_id)
    .bind(&claims.sub)
    .bind(body.client_name.as_deref().unwrap_or(""))
    .bind(draft.start_time)
    .bind(draft.end_time)
    .bind(draft.status)
    .execute(&mut *tx)
    .await
    .map_err(|e| db_error("create_appointment", e).into_response())?
    .last_insert_rowid();

    tx.commit()
        .await
        .map_err(|e| db_error("create_appointment", e).into_response())?;

    let appointment = sqlx::query_as::<_, Appointment>(
        "SELECT id, establishment_id, service_id, employee_id, client_uid, client_name,
                start_time, end_time, status, created_at
         FROM appointments WHERE id = ?",
    )
    .bind(id)
    .fetch_one(&state.db)
    .await
    .map_err(|e| db_error("create_appointment", e).into_response())?;

    tracing::info!(
        "appointment {} booked: establishment {} at {}",
        appointment.id,
        appointment.establishment_id,
        appointment.start_time
    );

    Ok(Json(ApiResponse::success(appointment)))
}

/// GET /api/appointments/my — the caller's upcoming appointments.
pub async fn my_appointments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<AppointmentDetail>>>, (StatusCode, Json<ApiResponse<()>>)> {
    let claims = authenticate(&headers, &state)?;

    let query = format!(
        "{} WHERE a.client_uid = ? AND a.status = 'scheduled' AND a.start_time >= ?
         ORDER BY a.start_time ASC",
        store::APPOINTMENT_DETAIL_SELECT
    );

    let appointments = sqlx::query_as::<_, AppointmentDetail>(&query)
        .bind(&claims.sub)
        .bind(Local::now().naive_local())
        .fetch_all(&state.db)
        .await
        .map_err(|e| db_error("my_appointments", e))?;

    Ok(Json(ApiResponse::success(appointments)))
}

/// DELETE /api/appointments/:id — cancel one of the caller's appointments.
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, (StatusCode, Json<ApiResponse<()>>)> {
    let claims = authenticate(&headers, &state)?;

    let result = sqlx::query(
        "UPDATE appointments SET status = 'cancelled'
         WHERE id = ? AND client_uid = ? AND status = 'scheduled'",
    )
    .bind(id)
    .bind(&claims.sub)
    .execute(&state.db)
    .await
    .map_err(|e| db_error("cancel_appointment", e))?;

    if result.rows_affected() == 0 {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("Appointment not found")),
        ));
    }

    tracing::info!("appointment {} cancelled by client", id);
    Ok(Json(ApiResponse::success(())))
}

/// GET /api/appointments/agenda?date=YYYY-MM-DD — the authenticated
/// barber's appointments for a day.
pub async fn agenda(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AgendaQuery>,
) -> Result<Json<ApiResponse<Vec<AppointmentDetail>>>, (StatusCode, Json<ApiResponse<()>>)> {
    let claims = authenticate(&headers, &state)?;

    let profile = store::barber_by_uid(&state.db, &claims.sub)
        .await
        .map_err(|e| db_error("agenda", e))?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("Profile not found")),
            )
        })?;

    let establishment = store::establishment_for_barber(&state.db, profile.id)
        .await
        .map_err(|e| db_error("agenda", e))?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error("Establishment not found")),
            )
        })?;

    let (start, end) = day_bounds(query.date);
    let sql = format!(
        "{} WHERE a.establishment_id = ? AND a.start_time < ? AND a.end_time > ?
           AND a.status != 'cancelled'
         ORDER BY a.start_time ASC",
        store::APPOINTMENT_DETAIL_SELECT
    );

    let appointments = sqlx::query_as::<_, AppointmentDetail>(&sql)
        .bind(establishment.id)
        .bind(end)
        .bind(start)
        .fetch_all(&state.db)
        .await
        .map_err(|e| db_error("agenda", e))?;

    Ok(Json(ApiResponse::success(appointments)))
}
