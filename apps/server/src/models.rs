use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::availability::WeeklyHours;
use crate::booking::Rejection;

// ── Status constants ──

pub const STATUS_SCHEDULED: &str = "scheduled";
pub const STATUS_CANCELLED: &str = "cancelled";
pub const STATUS_COMPLETED: &str = "completed";

// ── Database models ──

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BarberProfile {
    pub id: i64,
    pub auth_uid: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub bio: String,
    pub created_at: String,
}

/// Raw establishment row; `address_json` and `working_hours` are JSON text
/// columns decoded on demand.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EstablishmentRow {
    pub id: i64,
    pub barber_id: i64,
    pub name: String,
    pub phone: String,
    pub bio: String,
    pub address_json: String,
    pub working_hours: String,
    pub banner_url: Option<String>,
    pub profile_url: Option<String>,
    pub created_at: String,
}

impl EstablishmentRow {
    /// Decoded weekly hours, or `None` when the stored JSON is malformed.
    pub fn weekly_hours(&self) -> Option<WeeklyHours> {
        serde_json::from_str(&self.working_hours).ok()
    }

    pub fn address(&self) -> serde_json::Value {
        serde_json::from_str(&self.address_json).unwrap_or_else(|_| serde_json::json!({}))
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Service {
    pub id: i64,
    pub establishment_id: i64,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub duration_min: i64,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Employee {
    pub id: i64,
    pub establishment_id: i64,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub photo_url: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Appointment {
    pub id: i64,
    pub establishment_id: i64,
    pub service_id: i64,
    pub employee_id: Option<i64>,
    pub client_uid: String,
    pub client_name: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub status: String,
    pub created_at: String,
}

// ── API request/response types ──

/// Establishment details as the booking page consumes them: decoded
/// address and working-hours records instead of raw JSON columns.
#[derive(Debug, Serialize)]
pub struct EstablishmentDetails {
    pub id: i64,
    pub barber_id: i64,
    pub name: String,
    pub phone: String,
    pub bio: String,
    pub address: serde_json::Value,
    pub working_hours: WeeklyHours,
    pub banner_url: Option<String>,
    pub profile_url: Option<String>,
}

impl EstablishmentDetails {
    /// Malformed stored hours degrade to an all-disabled week (the
    /// establishment reads as closed) rather than failing the request.
    pub fn from_row(row: &EstablishmentRow) -> Self {
        Self {
            id: row.id,
            barber_id: row.barber_id,
            name: row.name.clone(),
            phone: row.phone.clone(),
            bio: row.bio.clone(),
            address: row.address(),
            working_hours: row.weekly_hours().unwrap_or_else(WeeklyHours::closed),
            banner_url: row.banner_url.clone(),
            profile_url: row.profile_url.clone(),
        }
    }
}

/// One row of the public search listing (profile joined with its
/// establishment, when one exists).
#[derive(Debug, sqlx::FromRow)]
pub struct BarberSummaryRow {
    pub id: i64,
    pub name: String,
    pub bio: String,
    pub email: String,
    pub establishment_id: Option<i64>,
    pub establishment_name: Option<String>,
    pub banner_url: Option<String>,
    pub profile_url: Option<String>,
    pub address_json: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BarberSummary {
    pub id: i64,
    pub name: String,
    pub bio: String,
    pub email: String,
    pub establishment_id: Option<i64>,
    pub establishment_name: Option<String>,
    pub banner_url: Option<String>,
    pub profile_url: Option<String>,
    pub address: Option<serde_json::Value>,
}

impl From<BarberSummaryRow> for BarberSummary {
    fn from(row: BarberSummaryRow) -> Self {
        let address = row
            .address_json
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok());
        Self {
            id: row.id,
            name: row.name,
            bio: row.bio,
            email: row.email,
            establishment_id: row.establishment_id,
            establishment_name: row.establishment_name,
            banner_url: row.banner_url,
            profile_url: row.profile_url,
            address,
        }
    }
}

/// Bare appointment span, all the booking page needs to grey out slots.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AppointmentSpan {
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

/// Appointment row joined with service and establishment names, for the
/// client dashboard and the barber agenda.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AppointmentDetail {
    pub id: i64,
    pub establishment_id: i64,
    pub service_id: i64,
    pub employee_id: Option<i64>,
    pub client_uid: String,
    pub client_name: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub status: String,
    pub created_at: String,
    pub service_name: String,
    pub service_price: i64,
    pub establishment_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub uid: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub service_id: i64,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub establishment_id: i64,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Deserialize)]
pub struct AgendaQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertEstablishmentRequest {
    pub name: String,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub street: Option<String>,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    #[serde(alias = "workingHours")]
    pub working_hours: WeeklyHours,
    pub banner_url: Option<String>,
    pub profile_url: Option<String>,
}

impl UpsertEstablishmentRequest {
    pub fn address_json(&self) -> serde_json::Value {
        serde_json::json!({
            "street": self.street,
            "number": self.number,
            "complement": self.complement,
            "neighborhood": self.neighborhood,
            "city": self.city,
            "state": self.state,
            "zipcode": self.zipcode,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub duration_min: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub duration_min: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateEmployeeRequest {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Booking rejection payload: machine-readable code plus the offending
/// field, so HTTP callers can map rejections to 4xx deterministically.
#[derive(Debug, Serialize)]
pub struct RejectionBody {
    pub ok: bool,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    pub error: String,
}

impl From<&Rejection> for RejectionBody {
    fn from(rejection: &Rejection) -> Self {
        Self {
            ok: false,
            code: rejection.code(),
            field: rejection.field(),
            error: rejection.message(),
        }
    }
}
