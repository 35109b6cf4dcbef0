//! Booking request validation.
//!
//! The validator re-runs the slot calculator against a fresh appointment
//! snapshot right before persistence; it is the guard between "the client
//! saw this slot listed" and "the row gets written". It never persists
//! anything itself — on acceptance it hands back the materialized
//! appointment for the caller to store.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::availability::{
    compute_available_slots, SlotError, TimeOfDay, WeeklyHours, DEFAULT_SLOT_GRANULARITY_MIN,
};
use crate::models::{Appointment, Service, STATUS_SCHEDULED};

/// A client's booking submission. Field presence is validated here rather
/// than at deserialization so callers get a reason code, not a bare 422.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub establishment_id: i64,
    pub service_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub employee_id: Option<i64>,
    pub client_name: Option<String>,
}

/// Why a booking request was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// A required field is absent. `employee_id` counts as required once
    /// the establishment has staff on file.
    MissingField(&'static str),
    UnknownService,
    /// The requested time is structurally not a bookable slot: closed
    /// day, off the grid, or the service does not fit before closing.
    SlotUnavailable,
    /// The slot was bookable in shape but is occupied now — the listing
    /// the client picked from went stale and they should re-select.
    SlotTaken,
    /// Stored service data failed the calculator's input checks.
    Invalid(SlotError),
}

impl Rejection {
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::MissingField(_) => "MISSING_FIELD",
            Rejection::UnknownService => "UNKNOWN_SERVICE",
            Rejection::SlotUnavailable => "SLOT_UNAVAILABLE",
            Rejection::SlotTaken => "SLOT_TAKEN",
            Rejection::Invalid(_) => "INVALID_ARGUMENT",
        }
    }

    pub fn field(&self) -> Option<&'static str> {
        match self {
            Rejection::MissingField(field) => Some(field),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Rejection::MissingField(field) => format!("missing required field: {field}"),
            Rejection::UnknownService => "service not found".into(),
            Rejection::SlotUnavailable => "requested time is not available".into(),
            Rejection::SlotTaken => {
                "requested time was just booked, please pick another slot".into()
            }
            Rejection::Invalid(err) => err.to_string(),
        }
    }
}

/// An accepted booking, materialized for the caller to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentDraft {
    pub establishment_id: i64,
    pub service_id: i64,
    pub employee_id: Option<i64>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub status: &'static str,
}

/// Validate a booking submission against the current snapshot.
///
/// `service` is the resolution of `request.service_id` (None when it
/// matched no active service of the establishment); `appointments` is the
/// day's current book. `has_staff` makes a named employee mandatory.
pub fn validate_booking(
    request: &BookingRequest,
    service: Option<&Service>,
    hours: &WeeklyHours,
    appointments: &[Appointment],
    has_staff: bool,
) -> Result<AppointmentDraft, Rejection> {
    if request.service_id.is_none() {
        return Err(Rejection::MissingField("service_id"));
    }
    let date = request.date.ok_or(Rejection::MissingField("date"))?;
    let time_raw = request
        .time
        .as_deref()
        .ok_or(Rejection::MissingField("time"))?;
    if has_staff && request.employee_id.is_none() {
        return Err(Rejection::MissingField("employee_id"));
    }
    let service = service.ok_or(Rejection::UnknownService)?;

    // A string that does not parse as HH:MM can never appear in a listing.
    let time: TimeOfDay = time_raw.parse().map_err(|_| Rejection::SlotUnavailable)?;

    let slots = compute_available_slots(
        date,
        hours,
        service.duration_min,
        appointments,
        DEFAULT_SLOT_GRANULARITY_MIN,
    )
    .map_err(Rejection::Invalid)?;

    if !slots.contains(&time) {
        // Separate "never bookable" from "lost to a race": rerun without
        // the appointment book and see whether the shape alone allows it.
        let unbooked = compute_available_slots(
            date,
            hours,
            service.duration_min,
            &[],
            DEFAULT_SLOT_GRANULARITY_MIN,
        )
        .map_err(Rejection::Invalid)?;
        return Err(if unbooked.contains(&time) {
            Rejection::SlotTaken
        } else {
            Rejection::SlotUnavailable
        });
    }

    let start_time = date.and_time(time.as_naive_time());
    Ok(AppointmentDraft {
        establishment_id: request.establishment_id,
        service_id: service.id,
        employee_id: request.employee_id,
        start_time,
        end_time: start_time + Duration::minutes(service.duration_min),
        status: STATUS_SCHEDULED,
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::DayHours;
    use crate::models::STATUS_SCHEDULED;

    /// 2026-03-02 is a Monday.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    fn open_week(start: &str, end: &str) -> WeeklyHours {
        let day = DayHours {
            start: t(start),
            end: t(end),
            enabled: true,
        };
        WeeklyHours {
            monday: day,
            tuesday: day,
            wednesday: day,
            thursday: day,
            friday: day,
            saturday: day,
            sunday: day,
        }
    }

    fn make_service(duration_min: i64) -> Service {
        Service {
            id: 7,
            establishment_id: 1,
            name: "Corte".into(),
            description: "".into(),
            price: 4500,
            duration_min,
            is_active: true,
            created_at: "2026-01-01 10:00:00".into(),
            updated_at: "2026-01-01 10:00:00".into(),
        }
    }

    fn make_appt(date: NaiveDate, start: &str, end: &str) -> Appointment {
        Appointment {
            id: 1,
            establishment_id: 1,
            service_id: 7,
            employee_id: None,
            client_uid: "client-1".into(),
            client_name: "Cliente".into(),
            start_time: date.and_time(t(start).as_naive_time()),
            end_time: date.and_time(t(end).as_naive_time()),
            status: STATUS_SCHEDULED.into(),
            created_at: "2026-03-01 09:00:00".into(),
        }
    }

    fn make_request(time: &str) -> BookingRequest {
        BookingRequest {
            establishment_id: 1,
            service_id: Some(7),
            date: Some(monday()),
            time: Some(time.into()),
            employee_id: None,
            client_name: Some("Cliente".into()),
        }
    }

    #[test]
    fn test_accepts_listed_slot_and_materializes_span() {
        let service = make_service(60);
        let request = make_request("10:30");
        let draft = validate_booking(
            &request,
            Some(&service),
            &open_week("09:00", "18:00"),
            &[],
            false,
        )
        .unwrap();
        assert_eq!(draft.start_time.to_string(), "2026-03-02 10:30:00");
        assert_eq!(draft.end_time.to_string(), "2026-03-02 11:30:00");
        assert_eq!(draft.service_id, 7);
        assert_eq!(draft.status, STATUS_SCHEDULED);
    }

    #[test]
    fn test_missing_service_id() {
        let mut request = make_request("10:30");
        request.service_id = None;
        let err = validate_booking(&request, None, &open_week("09:00", "18:00"), &[], false)
            .unwrap_err();
        assert_eq!(err, Rejection::MissingField("service_id"));
        assert_eq!(err.code(), "MISSING_FIELD");
        assert_eq!(err.field(), Some("service_id"));
    }

    #[test]
    fn test_missing_date() {
        let service = make_service(60);
        let mut request = make_request("10:30");
        request.date = None;
        let err = validate_booking(
            &request,
            Some(&service),
            &open_week("09:00", "18:00"),
            &[],
            false,
        )
        .unwrap_err();
        assert_eq!(err, Rejection::MissingField("date"));
    }

    #[test]
    fn test_missing_time() {
        let service = make_service(60);
        let mut request = make_request("10:30");
        request.time = None;
        let err = validate_booking(
            &request,
            Some(&service),
            &open_week("09:00", "18:00"),
            &[],
            false,
        )
        .unwrap_err();
        assert_eq!(err, Rejection::MissingField("time"));
    }

    #[test]
    fn test_staffed_establishment_requires_employee() {
        let service = make_service(60);
        let request = make_request("10:30");
        let err = validate_booking(
            &request,
            Some(&service),
            &open_week("09:00", "18:00"),
            &[],
            true,
        )
        .unwrap_err();
        assert_eq!(err, Rejection::MissingField("employee_id"));
    }

    #[test]
    fn test_named_employee_passes_through() {
        let service = make_service(60);
        let mut request = make_request("10:30");
        request.employee_id = Some(3);
        let draft = validate_booking(
            &request,
            Some(&service),
            &open_week("09:00", "18:00"),
            &[],
            true,
        )
        .unwrap();
        assert_eq!(draft.employee_id, Some(3));
    }

    #[test]
    fn test_missing_fields_reported_before_unknown_service() {
        let mut request = make_request("10:30");
        request.service_id = None;
        request.date = None;
        let err = validate_booking(&request, None, &open_week("09:00", "18:00"), &[], false)
            .unwrap_err();
        assert_eq!(err, Rejection::MissingField("service_id"));
    }

    #[test]
    fn test_unknown_service() {
        let request = make_request("10:30");
        let err = validate_booking(&request, None, &open_week("09:00", "18:00"), &[], false)
            .unwrap_err();
        assert_eq!(err, Rejection::UnknownService);
        assert_eq!(err.code(), "UNKNOWN_SERVICE");
    }

    #[test]
    fn test_off_grid_time_is_unavailable() {
        let service = make_service(60);
        let request = make_request("10:15");
        let err = validate_booking(
            &request,
            Some(&service),
            &open_week("09:00", "18:00"),
            &[],
            false,
        )
        .unwrap_err();
        assert_eq!(err, Rejection::SlotUnavailable);
    }

    #[test]
    fn test_closed_day_is_unavailable() {
        let service = make_service(60);
        let request = make_request("10:30");
        let err =
            validate_booking(&request, Some(&service), &WeeklyHours::closed(), &[], false)
                .unwrap_err();
        assert_eq!(err, Rejection::SlotUnavailable);
        assert_eq!(err.code(), "SLOT_UNAVAILABLE");
    }

    #[test]
    fn test_unparseable_time_is_unavailable() {
        let service = make_service(60);
        let request = make_request("half past ten");
        let err = validate_booking(
            &request,
            Some(&service),
            &open_week("09:00", "18:00"),
            &[],
            false,
        )
        .unwrap_err();
        assert_eq!(err, Rejection::SlotUnavailable);
    }

    #[test]
    fn test_raced_slot_is_reported_taken() {
        // 10:30 was listed, then someone booked 10:00–11:00.
        let service = make_service(60);
        let request = make_request("10:30");
        let appts = vec![make_appt(monday(), "10:00", "11:00")];
        let err = validate_booking(
            &request,
            Some(&service),
            &open_week("09:00", "18:00"),
            &appts,
            false,
        )
        .unwrap_err();
        assert_eq!(err, Rejection::SlotTaken);
        assert_eq!(err.code(), "SLOT_TAKEN");
    }

    #[test]
    fn test_touching_existing_appointment_is_accepted() {
        let service = make_service(60);
        let request = make_request("11:00");
        let appts = vec![make_appt(monday(), "10:00", "11:00")];
        let draft = validate_booking(
            &request,
            Some(&service),
            &open_week("09:00", "18:00"),
            &appts,
            false,
        )
        .unwrap();
        assert_eq!(draft.start_time.to_string(), "2026-03-02 11:00:00");
    }

    #[test]
    fn test_service_that_cannot_fit_is_unavailable_not_taken() {
        // Window fits nothing, and there happens to be an appointment:
        // still structural, not a race.
        let service = make_service(300);
        let request = make_request("09:00");
        let appts = vec![make_appt(monday(), "10:00", "11:00")];
        let err = validate_booking(
            &request,
            Some(&service),
            &open_week("09:00", "13:00"),
            &appts,
            false,
        )
        .unwrap_err();
        assert_eq!(err, Rejection::SlotUnavailable);
    }

    #[test]
    fn test_lenient_time_spelling_normalizes_onto_grid() {
        let service = make_service(60);
        let request = make_request("9:00");
        let draft = validate_booking(
            &request,
            Some(&service),
            &open_week("09:00", "18:00"),
            &[],
            false,
        )
        .unwrap();
        assert_eq!(draft.start_time.to_string(), "2026-03-02 09:00:00");
    }

    #[test]
    fn test_corrupt_duration_is_a_fault_code() {
        let service = make_service(0);
        let request = make_request("10:30");
        let err = validate_booking(
            &request,
            Some(&service),
            &open_week("09:00", "18:00"),
            &[],
            false,
        )
        .unwrap_err();
        assert_eq!(err, Rejection::Invalid(SlotError::InvalidDuration(0)));
        assert_eq!(err.code(), "INVALID_ARGUMENT");
    }
}
