use chrono::{Local, NaiveDate};

/// Wire format for every date annotation.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a strict `YYYY-MM-DD` date. Anything else (including impossible
/// calendar days like `2024-02-30`) yields `None`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let bytes = s.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

/// The current local calendar day.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn is_overdue(date: NaiveDate, today: NaiveDate) -> bool {
    date < today
}

pub fn is_today(date: NaiveDate, today: NaiveDate) -> bool {
    date == today
}

/// How a due date relates to the current day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DueStatus {
    Overdue,
    Today,
    Upcoming,
}

impl DueStatus {
    pub fn classify(date: NaiveDate, today: NaiveDate) -> DueStatus {
        if is_overdue(date, today) {
            DueStatus::Overdue
        } else if is_today(date, today) {
            DueStatus::Today
        } else {
            DueStatus::Upcoming
        }
    }
}
