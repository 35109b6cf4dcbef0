//! Data-source helpers shared across handlers.
//!
//! Slot listing and booking submission must read the schedule, service
//! and appointment state through the same queries — the business logic
//! lives in `availability`/`booking` and is never duplicated per caller.

use chrono::NaiveDateTime;
use sqlx::SqlitePool;

use crate::models::{
    Appointment, BarberProfile, EstablishmentRow, Service, STATUS_COMPLETED, STATUS_SCHEDULED,
};

const ESTABLISHMENT_COLUMNS: &str =
    "id, barber_id, name, phone, bio, address_json, working_hours, banner_url, profile_url, created_at";

const APPOINTMENT_COLUMNS: &str =
    "id, establishment_id, service_id, employee_id, client_uid, client_name, start_time, end_time, status, created_at";

/// Shared SELECT for appointment listings joined with service and
/// establishment names (client dashboard + barber agenda).
pub const APPOINTMENT_DETAIL_SELECT: &str =
    "SELECT a.id, a.establishment_id, a.service_id, a.employee_id, a.client_uid, a.client_name,
            a.start_time, a.end_time, a.status, a.created_at,
            s.name AS service_name, s.price AS service_price,
            e.name AS establishment_name
     FROM appointments a
     JOIN services s ON s.id = a.service_id
     JOIN establishments e ON e.id = a.establishment_id";

pub async fn establishment_by_id(
    db: &SqlitePool,
    id: i64,
) -> sqlx::Result<Option<EstablishmentRow>> {
    sqlx::query_as::<_, EstablishmentRow>(&format!(
        "SELECT {} FROM establishments WHERE id = ?",
        ESTABLISHMENT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn establishment_for_barber(
    db: &SqlitePool,
    barber_id: i64,
) -> sqlx::Result<Option<EstablishmentRow>> {
    sqlx::query_as::<_, EstablishmentRow>(&format!(
        "SELECT {} FROM establishments WHERE barber_id = ?",
        ESTABLISHMENT_COLUMNS
    ))
    .bind(barber_id)
    .fetch_optional(db)
    .await
}

/// Appointment source: non-cancelled appointments of an establishment
/// intersecting the half-open range `[start, end)`, in start order.
pub async fn appointments_between(
    db: &SqlitePool,
    establishment_id: i64,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> sqlx::Result<Vec<Appointment>> {
    sqlx::query_as::<_, Appointment>(&format!(
        "SELECT {} FROM appointments
         WHERE establishment_id = ? AND start_time < ? AND end_time > ? AND status != 'cancelled'
         ORDER BY start_time ASC",
        APPOINTMENT_COLUMNS
    ))
    .bind(establishment_id)
    .bind(end)
    .bind(start)
    .fetch_all(db)
    .await
}

/// Service source: an active service belonging to the establishment.
pub async fn active_service(
    db: &SqlitePool,
    establishment_id: i64,
    service_id: i64,
) -> sqlx::Result<Option<Service>> {
    sqlx::query_as::<_, Service>(
        "SELECT id, establishment_id, name, description, price, duration_min, is_active, created_at, updated_at
         FROM services WHERE id = ? AND establishment_id = ? AND is_active = 1",
    )
    .bind(service_id)
    .bind(establishment_id)
    .fetch_optional(db)
    .await
}

pub async fn barber_by_uid(
    db: &SqlitePool,
    auth_uid: &str,
) -> sqlx::Result<Option<BarberProfile>> {
    sqlx::query_as::<_, BarberProfile>(
        "SELECT id, auth_uid, name, email, phone, bio, created_at
         FROM barber_profiles WHERE auth_uid = ?",
    )
    .bind(auth_uid)
    .fetch_optional(db)
    .await
}

/// Number of staff members on file; a positive count makes naming an
/// employee mandatory when booking.
pub async fn staff_count(db: &SqlitePool, establishment_id: i64) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM employees WHERE establishment_id = ?")
        .bind(establishment_id)
        .fetch_one(db)
        .await
}

/// Flip scheduled appointments whose end has passed to completed.
/// Called periodically from a background task.
pub async fn complete_elapsed_appointments(
    db: &SqlitePool,
    now: NaiveDateTime,
) -> sqlx::Result<u64> {
    let result = sqlx::query("UPDATE appointments SET status = ? WHERE status = ? AND end_time <= ?")
        .bind(STATUS_COMPLETED)
        .bind(STATUS_SCHEDULED)
        .bind(now)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}
