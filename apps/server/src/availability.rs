//! Slot availability engine.
//!
//! Pure computation: given a date, the establishment's weekly working
//! hours, a service duration and the appointments already on the books,
//! produce the bookable start times. No clock reads, no I/O — callers
//! supply everything, which keeps the whole module deterministic and
//! trivially testable.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::models::{Appointment, STATUS_CANCELLED};

/// Candidate start times are offered on a fixed grid of this many minutes,
/// independent of the service duration.
pub const DEFAULT_SLOT_GRANULARITY_MIN: i64 = 30;

const MINUTES_PER_DAY: u16 = 24 * 60;

// ── Errors ──

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("service duration must be positive, got {0}")]
    InvalidDuration(i64),
    #[error("slot granularity must be positive, got {0}")]
    InvalidGranularity(i64),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid time of day {0:?}, expected HH:MM")]
pub struct ParseTimeError(pub String);

// ── Time of day ──

/// A wall-clock time of day stored as minutes from midnight.
///
/// All slot arithmetic runs on integer minutes; "HH:MM" is purely a
/// display/wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(Self(minutes))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn as_naive_time(self) -> NaiveTime {
        // 0..1440 by construction, so the conversion cannot fail
        NaiveTime::from_num_seconds_from_midnight_opt(u32::from(self.0) * 60, 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl FromStr for TimeOfDay {
    type Err = ParseTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseTimeError(s.to_string());
        let (hours, minutes) = s.split_once(':').ok_or_else(err)?;
        let hours: u16 = hours.parse().map_err(|_| err())?;
        let minutes: u16 = minutes.parse().map_err(|_| err())?;
        if hours > 23 || minutes > 59 {
            return Err(err());
        }
        Ok(Self(hours * 60 + minutes))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(|_| {
            D::Error::custom(format!("invalid time of day {:?}, expected HH:MM", raw))
        })
    }
}

// ── Weekly working hours ──

/// Open/close window for a single weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub enabled: bool,
}

impl DayHours {
    pub fn closed() -> Self {
        Self {
            start: TimeOfDay(0),
            end: TimeOfDay(0),
            enabled: false,
        }
    }
}

/// Weekly working hours keyed by the seven lowercase English weekday
/// names. The struct shape guarantees exactly seven entries and keeps the
/// persisted JSON record byte-compatible with existing establishment
/// configuration data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyHours {
    pub monday: DayHours,
    pub tuesday: DayHours,
    pub wednesday: DayHours,
    pub thursday: DayHours,
    pub friday: DayHours,
    pub saturday: DayHours,
    pub sunday: DayHours,
}

impl WeeklyHours {
    /// A week with every day disabled.
    pub fn closed() -> Self {
        Self {
            monday: DayHours::closed(),
            tuesday: DayHours::closed(),
            wednesday: DayHours::closed(),
            thursday: DayHours::closed(),
            friday: DayHours::closed(),
            saturday: DayHours::closed(),
            sunday: DayHours::closed(),
        }
    }

    pub fn day(&self, weekday: Weekday) -> &DayHours {
        match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    /// The entry governing `date`, selected arithmetically from the
    /// day-of-week index — never from a locale-formatted weekday string.
    pub fn for_date(&self, date: NaiveDate) -> &DayHours {
        self.day(date.weekday())
    }

    /// Check every enabled day has `start < end`. Returns the offending
    /// weekday name on failure; used when a barber saves the schedule.
    pub fn validate(&self) -> Result<(), &'static str> {
        for weekday in [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ] {
            let day = self.day(weekday);
            if day.enabled && day.start >= day.end {
                return Err(weekday_key(weekday));
            }
        }
        Ok(())
    }
}

/// Canonical lowercase name for a weekday. A fixed mapping, stable across
/// runtime locale configuration.
pub fn weekday_key(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Half-open [midnight, next midnight) bounds of a calendar date, for
/// range queries against the appointment store.
pub fn day_bounds(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = date.and_time(NaiveTime::MIN);
    (start, start + Duration::days(1))
}

// ── Slot calculator ──

/// Compute the bookable start times for `date`.
///
/// Candidates walk the working window on a fixed `granularity_min` grid.
/// A candidate survives when its end (`start + duration_min`) falls
/// strictly before closing and it does not overlap any non-cancelled
/// appointment. Overlap is half-open interval intersection, so a slot may
/// start exactly when an appointment ends (and vice versa).
///
/// A disabled day, a window the service does not fit into, or a fully
/// booked day all yield `Ok` with an empty list; only malformed input
/// (non-positive duration or granularity) is an error.
pub fn compute_available_slots(
    date: NaiveDate,
    hours: &WeeklyHours,
    duration_min: i64,
    appointments: &[Appointment],
    granularity_min: i64,
) -> Result<Vec<TimeOfDay>, SlotError> {
    if duration_min <= 0 {
        return Err(SlotError::InvalidDuration(duration_min));
    }
    if granularity_min <= 0 {
        return Err(SlotError::InvalidGranularity(granularity_min));
    }

    let day = hours.for_date(date);
    if !day.enabled {
        return Ok(Vec::new());
    }

    let open = i64::from(day.start.minutes());
    let close = i64::from(day.end.minutes());
    let midnight = date.and_time(NaiveTime::MIN);

    let mut slots = Vec::new();
    let mut cursor = open;
    while cursor < close {
        let end = cursor + duration_min;
        // The slot must end strictly before closing time.
        if end < close {
            let slot_start = midnight + Duration::minutes(cursor);
            let slot_end = midnight + Duration::minutes(end);
            // Comparing full datetimes makes appointments on other dates
            // harmless even if the caller forgot to pre-filter.
            let taken = appointments.iter().any(|appt| {
                appt.status != STATUS_CANCELLED
                    && slot_start < appt.end_time
                    && slot_end > appt.start_time
            });
            if !taken {
                if let Some(time) = TimeOfDay::from_minutes(cursor as u16) {
                    slots.push(time);
                }
            }
        }
        cursor += granularity_min;
    }

    Ok(slots)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::STATUS_SCHEDULED;

    /// 2026-03-02 is a Monday.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    /// A week open every day with the same window.
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

    fn make_appt(date: NaiveDate, start: &str, end: &str, status: &str) -> Appointment {
        Appointment {
            id: 1,
            establishment_id: 1,
            service_id: 1,
            employee_id: None,
            client_uid: "client-1".into(),
            client_name: "Cliente".into(),
            start_time: date.and_time(t(start).as_naive_time()),
            end_time: date.and_time(t(end).as_naive_time()),
            status: status.into(),
            created_at: "2026-03-01 09:00:00".into(),
        }
    }

    fn times(slots: &[TimeOfDay]) -> Vec<String> {
        slots.iter().map(|s| s.to_string()).collect()
    }

    // ── TimeOfDay ──

    #[test]
    fn test_parse_basic() {
        assert_eq!(t("09:30").minutes(), 9 * 60 + 30);
    }

    #[test]
    fn test_parse_single_digit_hour() {
        assert_eq!(t("9:05").minutes(), 9 * 60 + 5);
    }

    #[test]
    fn test_parse_rejects_24_hours() {
        assert!("24:00".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_parse_rejects_bad_minutes() {
        assert!("10:60".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("garbage".parse::<TimeOfDay>().is_err());
        assert!("10:00:00".parse::<TimeOfDay>().is_err());
        assert!("".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_display_zero_pads() {
        assert_eq!(t("9:05").to_string(), "09:05");
        assert_eq!(t("00:00").to_string(), "00:00");
    }

    #[test]
    fn test_ordering_follows_clock() {
        assert!(t("09:00") < t("09:30"));
        assert!(t("23:59") > t("00:00"));
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&t("08:15")).unwrap();
        assert_eq!(json, "\"08:15\"");
        let back: TimeOfDay = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t("08:15"));
    }

    #[test]
    fn test_from_minutes_bounds() {
        assert!(TimeOfDay::from_minutes(1439).is_some());
        assert!(TimeOfDay::from_minutes(1440).is_none());
    }

    // ── Weekday mapping ──

    #[test]
    fn test_weekday_keys_are_fixed() {
        assert_eq!(weekday_key(Weekday::Mon), "monday");
        assert_eq!(weekday_key(Weekday::Tue), "tuesday");
        assert_eq!(weekday_key(Weekday::Wed), "wednesday");
        assert_eq!(weekday_key(Weekday::Thu), "thursday");
        assert_eq!(weekday_key(Weekday::Fri), "friday");
        assert_eq!(weekday_key(Weekday::Sat), "saturday");
        assert_eq!(weekday_key(Weekday::Sun), "sunday");
    }

    #[test]
    fn test_for_date_picks_weekday_entry() {
        let mut hours = WeeklyHours::closed();
        hours.monday = DayHours {
            start: t("09:00"),
            end: t("18:00"),
            enabled: true,
        };
        assert!(hours.for_date(monday()).enabled);
        assert!(!hours.for_date(monday().succ_opt().unwrap()).enabled);
    }

    #[test]
    fn test_weekly_hours_round_trips_legacy_shape() {
        let raw = r#"{"monday":{"start":"09:00","end":"18:00","enabled":true},"tuesday":{"start":"09:00","end":"18:00","enabled":true},"wednesday":{"start":"09:00","end":"18:00","enabled":true},"thursday":{"start":"09:00","end":"18:00","enabled":true},"friday":{"start":"09:00","end":"18:00","enabled":true},"saturday":{"start":"10:00","end":"14:00","enabled":true},"sunday":{"start":"00:00","end":"00:00","enabled":false}}"#;
        let hours: WeeklyHours = serde_json::from_str(raw).unwrap();
        assert_eq!(serde_json::to_string(&hours).unwrap(), raw);
    }

    #[test]
    fn test_weekly_hours_rejects_missing_day() {
        let raw = r#"{"monday":{"start":"09:00","end":"18:00","enabled":true}}"#;
        assert!(serde_json::from_str::<WeeklyHours>(raw).is_err());
    }

    #[test]
    fn test_validate_flags_inverted_window() {
        let mut hours = open_week("09:00", "18:00");
        hours.wednesday.start = t("19:00");
        assert_eq!(hours.validate(), Err("wednesday"));
    }

    #[test]
    fn test_validate_ignores_disabled_days() {
        let mut hours = open_week("09:00", "18:00");
        hours.sunday = DayHours {
            start: t("12:00"),
            end: t("12:00"),
            enabled: false,
        };
        assert!(hours.validate().is_ok());
    }

    // ── Calculator: windows and grid ──

    #[test]
    fn test_closed_day_yields_no_slots() {
        let slots =
            compute_available_slots(monday(), &WeeklyHours::closed(), 30, &[], 30).unwrap();
        assert!(slots.is_empty());
    }

    #[test]
    fn test_scenario_a_sixty_minute_service() {
        // 09:00–13:00, 60 min: last start must satisfy start + 60 < 13:00.
        let hours = open_week("09:00", "13:00");
        let slots = compute_available_slots(monday(), &hours, 60, &[], 30).unwrap();
        assert_eq!(
            times(&slots),
            vec!["09:00", "09:30", "10:00", "10:30", "11:00", "11:30"]
        );
    }

    #[test]
    fn test_scenario_b_midday_appointment() {
        // Appointment 10:00–11:00: 09:30 (ends 10:30) overlaps, 11:00
        // starts exactly at the appointment end and is allowed.
        let hours = open_week("09:00", "13:00");
        let appts = vec![make_appt(monday(), "10:00", "11:00", STATUS_SCHEDULED)];
        let slots = compute_available_slots(monday(), &hours, 60, &appts, 30).unwrap();
        assert_eq!(times(&slots), vec!["09:00", "09:30", "11:00", "11:30"]);
    }

    #[test]
    fn test_grid_alignment_nine_to_six() {
        let hours = open_week("09:00", "18:00");
        let slots = compute_available_slots(monday(), &hours, 30, &[], 30).unwrap();
        assert_eq!(slots.first().map(ToString::to_string).as_deref(), Some("09:00"));
        // 17:30 + 30 = 18:00 would end exactly at close, so 17:00 is last.
        assert_eq!(slots.last().map(ToString::to_string).as_deref(), Some("17:00"));
    }

    #[test]
    fn test_grid_is_independent_of_duration() {
        // 45-min service still walks on the 30-min grid; slot ends land
        // mid-grid and that is fine.
        let hours = open_week("09:00", "11:00");
        let slots = compute_available_slots(monday(), &hours, 45, &[], 30).unwrap();
        assert_eq!(times(&slots), vec!["09:00", "09:30", "10:00"]);
    }

    #[test]
    fn test_slot_may_not_end_at_close() {
        let hours = open_week("09:00", "10:00");
        // 09:00 + 60 = 10:00, not strictly before close.
        let slots = compute_available_slots(monday(), &hours, 60, &[], 30).unwrap();
        assert!(slots.is_empty());
    }

    #[test]
    fn test_duration_longer_than_window() {
        let hours = open_week("09:00", "13:00");
        let slots = compute_available_slots(monday(), &hours, 300, &[], 30).unwrap();
        assert!(slots.is_empty());
    }

    #[test]
    fn test_inverted_window_yields_no_slots() {
        // Defensive: an enabled day with start >= end is empty, not a fault.
        let mut hours = WeeklyHours::closed();
        hours.monday = DayHours {
            start: t("18:00"),
            end: t("09:00"),
            enabled: true,
        };
        let slots = compute_available_slots(monday(), &hours, 30, &[], 30).unwrap();
        assert!(slots.is_empty());
    }

    // ── Calculator: overlap semantics ──

    #[test]
    fn test_touching_appointment_end_is_allowed() {
        let hours = open_week("09:00", "13:00");
        let appts = vec![make_appt(monday(), "09:00", "10:00", STATUS_SCHEDULED)];
        let slots = compute_available_slots(monday(), &hours, 30, &appts, 30).unwrap();
        assert!(slots.contains(&t("10:00")));
        assert!(!slots.contains(&t("09:30")));
    }

    #[test]
    fn test_no_returned_slot_overlaps_appointments() {
        let hours = open_week("09:00", "18:00");
        let appts = vec![
            make_appt(monday(), "10:00", "11:00", STATUS_SCHEDULED),
            make_appt(monday(), "14:30", "15:15", STATUS_SCHEDULED),
        ];
        let duration = 45;
        let slots = compute_available_slots(monday(), &hours, duration, &appts, 30).unwrap();
        for slot in &slots {
            let start = monday().and_time(slot.as_naive_time());
            let end = start + Duration::minutes(duration);
            for appt in &appts {
                assert!(
                    !(start < appt.end_time && end > appt.start_time),
                    "slot {} overlaps {}..{}",
                    slot,
                    appt.start_time,
                    appt.end_time
                );
            }
        }
    }

    #[test]
    fn test_cancelled_appointments_do_not_block() {
        let hours = open_week("09:00", "13:00");
        let appts = vec![make_appt(monday(), "10:00", "11:00", STATUS_CANCELLED)];
        let slots = compute_available_slots(monday(), &hours, 60, &appts, 30).unwrap();
        assert!(slots.contains(&t("10:00")));
    }

    #[test]
    fn test_other_date_appointments_are_ignored() {
        let hours = open_week("09:00", "13:00");
        let tuesday = monday().succ_opt().unwrap();
        let appts = vec![make_appt(tuesday, "09:00", "13:00", STATUS_SCHEDULED)];
        let slots = compute_available_slots(monday(), &hours, 60, &appts, 30).unwrap();
        assert_eq!(times(&slots)[0], "09:00");
        assert_eq!(slots.len(), 6);
    }

    #[test]
    fn test_fully_booked_day_is_empty_not_error() {
        let hours = open_week("09:00", "11:00");
        let appts = vec![make_appt(monday(), "09:00", "11:00", STATUS_SCHEDULED)];
        let slots = compute_available_slots(monday(), &hours, 30, &appts, 30).unwrap();
        assert!(slots.is_empty());
    }

    // ── Calculator: determinism and faults ──

    #[test]
    fn test_identical_inputs_identical_output() {
        let hours = open_week("09:00", "18:00");
        let appts = vec![make_appt(monday(), "12:00", "12:45", STATUS_SCHEDULED)];
        let first = compute_available_slots(monday(), &hours, 45, &appts, 30).unwrap();
        let second = compute_available_slots(monday(), &hours, 45, &appts, 30).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_duration_is_a_fault() {
        let hours = open_week("09:00", "18:00");
        assert_eq!(
            compute_available_slots(monday(), &hours, 0, &[], 30),
            Err(SlotError::InvalidDuration(0))
        );
    }

    #[test]
    fn test_negative_duration_is_a_fault() {
        let hours = open_week("09:00", "18:00");
        assert_eq!(
            compute_available_slots(monday(), &hours, -15, &[], 30),
            Err(SlotError::InvalidDuration(-15))
        );
    }

    #[test]
    fn test_zero_granularity_is_a_fault() {
        let hours = open_week("09:00", "18:00");
        assert_eq!(
            compute_available_slots(monday(), &hours, 30, &[], 0),
            Err(SlotError::InvalidGranularity(0))
        );
    }

    // ── day_bounds ──

    #[test]
    fn test_day_bounds_cover_one_day() {
        let (start, end) = day_bounds(monday());
        assert_eq!(start.to_string(), "2026-03-02 00:00:00");
        assert_eq!(end.to_string(), "2026-03-03 00:00:00");
    }
}
