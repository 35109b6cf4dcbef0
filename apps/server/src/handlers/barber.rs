use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;

use crate::models::*;
use crate::{store, AppState};

use super::{authenticate, db_error};

type HandlerError = (StatusCode, Json<ApiResponse<()>>);

fn not_found(msg: &'static str) -> HandlerError {
    (StatusCode::NOT_FOUND, Json(ApiResponse::error(msg)))
}

fn bad_request(msg: impl Into<String>) -> HandlerError {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::error(msg)))
}

/// Helper: the authenticated caller's barber profile.
async fn require_profile(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<BarberProfile, HandlerError> {
    let claims = authenticate(headers, state)?;
    store::barber_by_uid(&state.db, &claims.sub)
        .await
        .map_err(|e| db_error("require_profile", e))?
        .ok_or_else(|| not_found("Profile not found"))
}

/// Helper: the caller's profile plus its establishment.
async fn require_establishment(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<(BarberProfile, EstablishmentRow), HandlerError> {
    let profile = require_profile(state, headers).await?;
    let establishment = store::establishment_for_barber(&state.db, profile.id)
        .await
        .map_err(|e| db_error("require_establishment", e))?
        .ok_or_else(|| not_found("Establishment not found"))?;
    Ok((profile, establishment))
}

// ── Profile ──

/// GET /api/barber_profiles/me
pub async fn get_my_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<BarberProfile>>, HandlerError> {
    let profile = require_profile(&state, &headers).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// POST /api/barber_profiles/me — create the caller's profile.
pub async fn create_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateProfileRequest>,
) -> Result<Json<ApiResponse<BarberProfile>>, HandlerError> {
    let claims = authenticate(&headers, &state)?;

    if body.name.trim().is_empty() || body.email.trim().is_empty() {
        return Err(bad_request("name and email are required"));
    }

    if store::barber_by_uid(&state.db, &claims.sub)
        .await
        .map_err(|e| db_error("create_profile", e))?
        .is_some()
    {
        return Err((
            StatusCode::CONFLICT,
            Json(ApiResponse::error("Profile already exists")),
        ));
    }

    sqlx::query(
        "INSERT INTO barber_profiles (auth_uid, name, email, phone, bio) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&claims.sub)
    .bind(body.name.trim())
    .bind(body.email.trim())
    .bind(body.phone.as_deref().unwrap_or(""))
    .bind(body.bio.as_deref().unwrap_or(""))
    .execute(&state.db)
    .await
    .map_err(|e| db_error("create_profile", e))?;

    let profile = store::barber_by_uid(&state.db, &claims.sub)
        .await
        .map_err(|e| db_error("create_profile", e))?
        .ok_or_else(|| not_found("Profile not found"))?;

    tracing::info!("barber profile created for uid {}", claims.sub);
    Ok(Json(ApiResponse::success(profile)))
}

/// PUT /api/barber_profiles/me — partial update.
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<BarberProfile>>, HandlerError> {
    let profile = require_profile(&state, &headers).await?;

    if let Some(name) = &body.name {
        sqlx::query("UPDATE barber_profiles SET name = ? WHERE id = ?")
            .bind(name)
            .bind(profile.id)
            .execute(&state.db)
            .await
            .ok();
    }
    if let Some(email) = &body.email {
        sqlx::query("UPDATE barber_profiles SET email = ? WHERE id = ?")
            .bind(email)
            .bind(profile.id)
            .execute(&state.db)
            .await
            .ok();
    }
    if let Some(phone) = &body.phone {
        sqlx::query("UPDATE barber_profiles SET phone = ? WHERE id = ?")
            .bind(phone)
            .bind(profile.id)
            .execute(&state.db)
            .await
            .ok();
    }
    if let Some(bio) = &body.bio {
        sqlx::query("UPDATE barber_profiles SET bio = ? WHERE id = ?")
            .bind(bio)
            .bind(profile.id)
            .execute(&state.db)
            .await
            .ok();
    }

    let updated = store::barber_by_uid(&state.db, &profile.auth_uid)
        .await
        .map_err(|e| db_error("update_profile", e))?
        .ok_or_else(|| not_found("Profile not found"))?;

    Ok(Json(ApiResponse::success(updated)))
}

// ── Establishment ──

/// GET /api/establishments/me
pub async fn get_my_establishment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<EstablishmentDetails>>, HandlerError> {
    let (_, establishment) = require_establishment(&state, &headers).await?;
    Ok(Json(ApiResponse::success(EstablishmentDetails::from_row(
        &establishment,
    ))))
}

/// PUT /api/establishments/me — create or update the caller's
/// establishment, including its working-hours record.
pub async fn upsert_establishment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<UpsertEstablishmentRequest>,
) -> Result<Json<ApiResponse<EstablishmentDetails>>, HandlerError> {
    let profile = require_profile(&state, &headers).await?;

    if body.name.trim().is_empty() {
        return Err(bad_request("name is required"));
    }
    if let Err(day) = body.working_hours.validate() {
        return Err(bad_request(format!(
            "working hours for {} must open before they close",
            day
        )));
    }

    // Serialization of a validated WeeklyHours cannot fail.
    let hours_json =
        serde_json::to_string(&body.working_hours).unwrap_or_else(|_| "{}".to_string());
    let address_json = body.address_json().to_string();

    let existing = store::establishment_for_barber(&state.db, profile.id)
        .await
        .map_err(|e| db_error("upsert_establishment", e))?;

    match existing {
        Some(row) => {
            sqlx::query(
                "UPDATE establishments
                 SET name = ?, phone = ?, bio = ?, address_json = ?, working_hours = ?,
                     banner_url = ?, profile_url = ?
                 WHERE id = ? AND barber_id = ?",
            )
            .bind(body.name.trim())
            .bind(body.phone.as_deref().unwrap_or(""))
            .bind(body.bio.as_deref().unwrap_or(""))
            .bind(&address_json)
            .bind(&hours_json)
            .bind(&body.banner_url)
            .bind(&body.profile_url)
            .bind(row.id)
            .bind(profile.id)
            .execute(&state.db)
            .await
            .map_err(|e| db_error("upsert_establishment", e))?;
        }
        None => {
            sqlx::query(
                "INSERT INTO establishments
                 (barber_id, name, phone, bio, address_json, working_hours, banner_url, profile_url)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(profile.id)
            .bind(body.name.trim())
            .bind(body.phone.as_deref().unwrap_or(""))
            .bind(body.bio.as_deref().unwrap_or(""))
            .bind(&address_json)
            .bind(&hours_json)
            .bind(&body.banner_url)
            .bind(&body.profile_url)
            .execute(&state.db)
            .await
            .map_err(|e| db_error("upsert_establishment", e))?;
        }
    }

    let saved = store::establishment_for_barber(&state.db, profile.id)
        .await
        .map_err(|e| db_error("upsert_establishment", e))?
        .ok_or_else(|| not_found("Establishment not found"))?;

    Ok(Json(ApiResponse::success(EstablishmentDetails::from_row(
        &saved,
    ))))
}

// ── Services ──

/// GET /api/services — all of the caller's services, including inactive.
pub async fn list_my_services(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<Service>>>, HandlerError> {
    let (_, establishment) = require_establishment(&state, &headers).await?;

    let services = sqlx::query_as::<_, Service>(
        "SELECT id, establishment_id, name, description, price, duration_min, is_active, created_at, updated_at
         FROM services WHERE establishment_id = ? ORDER BY created_at DESC",
    )
    .bind(establishment.id)
    .fetch_all(&state.db)
    .await
    .map_err(|e| db_error("list_my_services", e))?;

    Ok(Json(ApiResponse::success(services)))
}

/// POST /api/services — add a service.
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateServiceRequest>,
) -> Result<Json<ApiResponse<Service>>, HandlerError> {
    let (_, establishment) = require_establishment(&state, &headers).await?;

    if body.name.trim().is_empty() {
        return Err(bad_request("name is required"));
    }
    if body.price < 0 {
        return Err(bad_request("price must not be negative"));
    }
    if body.duration_min <= 0 {
        return Err(bad_request("duration_min must be positive"));
    }

    let id = sqlx::query(
        "INSERT INTO services (establishment_id, name, description, price, duration_min)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(establishment.id)
    .bind(body.name.trim())
    .bind(body.description.as_deref().unwrap_or(""))
    .bind(body.price)
    .bind(body.duration_min)
    .execute(&state.db)
    .await
    .map_err(|e| db_error("create_service", e))?
    .last_insert_rowid();

    let service = fetch_service(&state, id).await?;
    Ok(Json(ApiResponse::success(service)))
}

/// PUT /api/services/:id — partial update, scoped to the caller.
pub async fn update_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<UpdateServiceRequest>,
) -> Result<Json<ApiResponse<Service>>, HandlerError> {
    let (_, establishment) = require_establishment(&state, &headers).await?;

    let owned: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM services WHERE id = ? AND establishment_id = ?")
            .bind(id)
            .bind(establishment.id)
            .fetch_one(&state.db)
            .await
            .map_err(|e| db_error("update_service", e))?;
    if owned == 0 {
        return Err(not_found("Service not found"));
    }

    if let Some(price) = body.price {
        if price < 0 {
            return Err(bad_request("price must not be negative"));
        }
    }
    if let Some(duration) = body.duration_min {
        if duration <= 0 {
            return Err(bad_request("duration_min must be positive"));
        }
    }

    if let Some(name) = &body.name {
        sqlx::query("UPDATE services SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&state.db)
            .await
            .ok();
    }
    if let Some(description) = &body.description {
        sqlx::query("UPDATE services SET description = ? WHERE id = ?")
            .bind(description)
            .bind(id)
            .execute(&state.db)
            .await
            .ok();
    }
    if let Some(price) = body.price {
        sqlx::query("UPDATE services SET price = ? WHERE id = ?")
            .bind(price)
            .bind(id)
            .execute(&state.db)
            .await
            .ok();
    }
    if let Some(duration) = body.duration_min {
        sqlx::query("UPDATE services SET duration_min = ? WHERE id = ?")
            .bind(duration)
            .bind(id)
            .execute(&state.db)
            .await
            .ok();
    }
    if let Some(active) = body.is_active {
        sqlx::query("UPDATE services SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&state.db)
            .await
            .ok();
    }
    sqlx::query("UPDATE services SET updated_at = datetime('now') WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await
        .ok();

    let service = fetch_service(&state, id).await?;
    Ok(Json(ApiResponse::success(service)))
}

/// DELETE /api/services/:id — deactivate a service.
///
/// Existing appointments keep referencing the row, so removal is a
/// deactivation rather than a hard delete.
pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, HandlerError> {
    let (_, establishment) = require_establishment(&state, &headers).await?;

    let result = sqlx::query(
        "UPDATE services SET is_active = 0, updated_at = datetime('now')
         WHERE id = ? AND establishment_id = ?",
    )
    .bind(id)
    .bind(establishment.id)
    .execute(&state.db)
    .await
    .map_err(|e| db_error("delete_service", e))?;

    if result.rows_affected() == 0 {
        return Err(not_found("Service not found"));
    }

    Ok(Json(ApiResponse::success(())))
}

async fn fetch_service(state: &AppState, id: i64) -> Result<Service, HandlerError> {
    sqlx::query_as::<_, Service>(
        "SELECT id, establishment_id, name, description, price, duration_min, is_active, created_at, updated_at
         FROM services WHERE id = ?",
    )
    .bind(id)
    .fetch_one(&state.db)
    .await
    .map_err(|e| db_error("fetch_service", e))
}

// ── Employees ──

/// GET /api/employees — the caller's staff.
pub async fn list_employees(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<Employee>>>, HandlerError> {
    let (_, establishment) = require_establishment(&state, &headers).await?;

    let employees = sqlx::query_as::<_, Employee>(
        "SELECT id, establishment_id, name, phone, email, photo_url, created_at
         FROM employees WHERE establishment_id = ? ORDER BY name ASC",
    )
    .bind(establishment.id)
    .fetch_all(&state.db)
    .await
    .map_err(|e| db_error("list_employees", e))?;

    Ok(Json(ApiResponse::success(employees)))
}

/// POST /api/employees — register a staff member.
pub async fn create_employee(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateEmployeeRequest>,
) -> Result<Json<ApiResponse<Employee>>, HandlerError> {
    let (_, establishment) = require_establishment(&state, &headers).await?;

    if body.name.trim().is_empty() {
        return Err(bad_request("name is required"));
    }

    let id = sqlx::query(
        "INSERT INTO employees (establishment_id, name, phone, email, photo_url)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(establishment.id)
    .bind(body.name.trim())
    .bind(body.phone.as_deref().unwrap_or(""))
    .bind(body.email.as_deref().unwrap_or(""))
    .bind(&body.photo_url)
    .execute(&state.db)
    .await
    .map_err(|e| db_error("create_employee", e))?
    .last_insert_rowid();

    let employee = sqlx::query_as::<_, Employee>(
        "SELECT id, establishment_id, name, phone, email, photo_url, created_at
         FROM employees WHERE id = ?",
    )
    .bind(id)
    .fetch_one(&state.db)
    .await
    .map_err(|e| db_error("create_employee", e))?;

    tracing::info!(
        "employee {} registered for establishment {}",
        employee.name,
        establishment.id
    );
    Ok(Json(ApiResponse::success(employee)))
}

/// DELETE /api/employees/:id
pub async fn delete_employee(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, HandlerError> {
    let (_, establishment) = require_establishment(&state, &headers).await?;

    let result = sqlx::query("DELETE FROM employees WHERE id = ? AND establishment_id = ?")
        .bind(id)
        .bind(establishment.id)
        .execute(&state.db)
        .await
        .map_err(|e| db_error("delete_employee", e))?;

    if result.rows_affected() == 0 {
        return Err(not_found("Employee not found"));
    }

    Ok(Json(ApiResponse::success(())))
}
