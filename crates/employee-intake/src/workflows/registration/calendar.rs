use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%m/%d/%Y",
    "%m-%d-%Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
    "%Y.%m.%d %H:%M",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y.%m.%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m-%d-%Y %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parses the date portion of the loosely formatted values accepted at intake.
///
/// Formats are tried in order, so `01/02/2020` resolves day-first.
pub fn parse_flexible_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if value.is_empty() {
        return None;
    }

    if let Some(date) = parse_compact(&value) {
        return Some(date);
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(&value) {
        return Some(instant.date_naive());
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&value, format).ok())
        .or_else(|| {
            DATETIME_FORMATS.iter().find_map(|format| {
                NaiveDateTime::parse_from_str(&value, format)
                    .ok()
                    .map(|moment| moment.date())
            })
        })
}

// yyyyMMdd first, then ddMMyyyy.
fn parse_compact(value: &str) -> Option<NaiveDate> {
    if value.len() != 8 || !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }

    let part = |range: std::ops::Range<usize>| value[range].parse::<u32>().ok();
    let year_first = part(0..4).and_then(|year| {
        NaiveDate::from_ymd_opt(year as i32, part(4..6)?, part(6..8)?)
    });
    year_first.or_else(|| {
        NaiveDate::from_ymd_opt(part(4..8)? as i32, part(2..4)?, part(0..2)?)
    })
}

/// Calendar distance expressed as whole years, months and days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub years: i32,
    pub months: i32,
    pub days: i32,
}

impl Period {
    /// Distance from `start` to `end`; a start after the end yields zero.
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        if end <= start {
            return Self::default();
        }

        let mut total_months = (end.year() - start.year()) * 12 + end.month() as i32
            - start.month() as i32;
        let mut days = end.day() as i32 - start.day() as i32;

        if total_months > 0 && days < 0 {
            total_months -= 1;
            let anchor = start
                .checked_add_months(Months::new(total_months as u32))
                .unwrap_or(start);
            days = (end - anchor).num_days() as i32;
        }

        Self {
            years: total_months / 12,
            months: total_months % 12,
            days,
        }
    }
}
