//! Date helper functions

use chrono::{DateTime, Datelike, FixedOffset, TimeZone};

const MONTHS_PT: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

const MONTHS_EN: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Parse a publication date as returned by the API
///
/// # Examples
/// ```ignore
/// parse_prismic_date("2021-03-15T19:25:28+0000")
/// ```
pub fn parse_prismic_date(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z")
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .ok()
}

/// Format a publication date for display, in the given timezone
///
/// # Examples
/// ```ignore
/// format_date(&date, "pt-BR", chrono_tz::UTC) // -> "15 mar 2021"
/// format_date(&date, "en", chrono_tz::UTC)    // -> "15 Mar 2021"
/// ```
pub fn format_date<Tz: TimeZone>(date: &DateTime<FixedOffset>, language: &str, tz: &Tz) -> String {
    let local = date.with_timezone(tz);
    let month = local.month0() as usize;
    let name = if language.to_ascii_lowercase().starts_with("pt") {
        MONTHS_PT[month]
    } else {
        MONTHS_EN[month]
    };
    format!("{:02} {} {}", local.day(), name, local.year())
}

/// Format an optional raw API date; missing or unparsable dates render empty
pub fn format_publication_date<Tz: TimeZone>(date: Option<&str>, language: &str, tz: &Tz) -> String {
    match date {
        Some(raw) => match parse_prismic_date(raw) {
            Some(parsed) => format_date(&parsed, language, tz),
            None => {
                tracing::warn!("Unparsable publication date {:?}", raw);
                String::new()
            }
        },
        None => String::new(),
    }
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}

/// ISO form of an optional raw API date, empty if missing
pub fn publication_date_xml(date: Option<&str>) -> String {
    date.and_then(parse_prismic_date)
        .map(|d| date_xml(&d))
        .unwrap_or_default()
}
