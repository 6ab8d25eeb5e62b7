//! Custom Askama template filters.

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// First letter of a name, upper-cased, for avatar placeholders.
///
/// Usage in templates: `{{ user.first_name|initial }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn initial(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(first_letter(&value.to_string()))
}

/// A date in French long form ("14 mars 2077").
///
/// Usage in templates: `{{ booking.booking_date|date_fr }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn date_fr(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let raw = value.to_string();
    Ok(french_date(&raw).unwrap_or(raw))
}

fn first_letter(value: &str) -> String {
    value
        .trim()
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default()
}

const MONTHS_FR: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

/// Accepts `YYYY-MM-DD` optionally followed by a time part.
fn french_date(raw: &str) -> Option<String> {
    use chrono::Datelike;

    let date_part = raw.get(..10)?;
    let date = chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    let month = MONTHS_FR.get(usize::try_from(date.month0()).ok()?)?;
    Some(format!("{} {month} {}", date.day(), date.year()))
}
