use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::util::date::parse_date;

pub const DUE_MARKER: &str = "📅";
pub const DONE_MARKER: &str = "✅";
pub const CREATED_MARKER: &str = "➕";

static ANNOTATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(📅|✅|➕)\s+(\d{4}-\d{2}-\d{2})").expect("annotation pattern is valid")
});

/// Dates pulled out of a task line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Annotations {
    pub created: Option<NaiveDate>,
    pub due: Option<NaiveDate>,
    pub done: Option<NaiveDate>,
}

/// Split a task line's text into its clean display text and its date
/// annotations. The first annotation of each kind wins; every recognised
/// annotation is removed from the text. An annotation whose date is not a
/// real calendar day is left in the text untouched.
pub fn extract_annotations(text: &str) -> (String, Annotations) {
    let mut found = Annotations::default();
    let mut clean = String::with_capacity(text.len());
    let mut last = 0;

    for caps in ANNOTATION_RE.captures_iter(text) {
        let (Some(whole), Some(marker), Some(raw_date)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        let Some(date) = parse_date(raw_date.as_str()) else {
            continue;
        };
        let slot = match marker.as_str() {
            DUE_MARKER => &mut found.due,
            DONE_MARKER => &mut found.done,
            _ => &mut found.created,
        };
        if slot.is_none() {
            *slot = Some(date);
        }
        clean.push_str(&text[last..whole.start()]);
        last = whole.end();
    }
    clean.push_str(&text[last..]);

    (clean.trim().to_string(), found)
}

/// Remove date annotations from free text.
pub fn strip_annotations(text: &str) -> String {
    extract_annotations(text).0
}
