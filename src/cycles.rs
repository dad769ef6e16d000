use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::models::EventCycle;
use crate::sheet::Cell;

const MAX_SERIAL: f64 = 2_958_465.0;
const MS_PER_DAY: f64 = 86_400_000.0;

/// Text timestamp layouts seen in survey exports. Two-digit years are tried before four-digit
/// years because `%Y` happily accepts `24` as the year 24.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y"];

pub fn serial_to_datetime(serial: f64) -> Option<DateTime<Utc>> {
    if !serial.is_finite() || !(0.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = Utc.with_ymd_and_hms(1899, 12, 30, 0, 0, 0).single()?;
    let millis = (serial * MS_PER_DAY).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

/// Parses a timestamp typed into a text cell.
///
/// Offsets are discarded: the wall-clock reading is taken as UTC so that the calendar date the
/// respondent saw is the one used for cycle lookup.
pub fn parse_timestamp_text(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(serial) = text.parse::<f64>() {
        return serial_to_datetime(serial);
    }
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(text) {
        return Some(with_offset.naive_local().and_utc());
    }
    if let Ok(with_offset) = DateTime::parse_from_rfc2822(text) {
        return Some(with_offset.naive_local().and_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(day) = NaiveDate::parse_from_str(text, format) {
            return day.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}

pub fn cell_timestamp(cell: &Cell) -> Option<DateTime<Utc>> {
    match cell {
        Cell::DateTime(dt) => Some(*dt),
        Cell::Number(serial) => serial_to_datetime(*serial),
        Cell::Text(text) => parse_timestamp_text(text),
        Cell::Empty | Cell::Bool(_) => None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct CycleResolver {
    cycles: Vec<EventCycle>,
}

impl CycleResolver {
    pub fn new(mut cycles: Vec<EventCycle>) -> CycleResolver {
        cycles.sort_by(|a, b| {
            a.start_date
                .cmp(&b.start_date)
                .then(a.created_at.cmp(&b.created_at))
        });
        CycleResolver { cycles }
    }

    pub fn resolve(&self, at: DateTime<Utc>) -> Option<&EventCycle> {
        let day = at.date_naive();
        self.cycles.iter().find(|cycle| cycle.contains_day(day))
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCycle {
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl NewCycle {
    pub fn from_days(name: &str, start: NaiveDate, end: NaiveDate) -> Option<NewCycle> {
        if end < start {
            return None;
        }
        Some(NewCycle {
            name: name.to_string(),
            start_date: start.and_hms_opt(0, 0, 0)?.and_utc(),
            end_date: end.and_hms_opt(0, 0, 0)?.and_utc(),
        })
    }
}

const DEFAULT_CYCLES: &[(&str, i32, u32)] = &[
    ("Cycle 1 - Brazil", 2024, 1),
    ("Cycle 2 - Denmark", 2024, 8),
    ("Cycle 3 - Brazil", 2025, 1),
    ("Cycle 4 - Netherlands", 2025, 8),
    ("Cycle 5 - Brazil", 2026, 1),
    ("Cycle 6 - Portugal", 2026, 8),
];

pub fn default_cycles() -> Vec<NewCycle> {
    DEFAULT_CYCLES
        .iter()
        .filter_map(|(name, year, month)| {
            let start = NaiveDate::from_ymd_opt(*year, *month, 1)?;
            let end = start
                .checked_add_months(chrono::Months::new(1))?
                .pred_opt()?;
            NewCycle::from_days(name, start, end)
        })
        .collect()
}
