use chrono::{Datelike, NaiveDate};

/// Dutch month names as they appear in card statements, full and abbreviated.
const MONTHS: [(&str, &str, u32); 12] = [
    ("januari", "jan", 1),
    ("februari", "feb", 2),
    ("maart", "mrt", 3),
    ("april", "apr", 4),
    ("mei", "mei", 5),
    ("juni", "jun", 6),
    ("juli", "jul", 7),
    ("augustus", "aug", 8),
    ("september", "sep", 9),
    ("oktober", "okt", 10),
    ("november", "nov", 11),
    ("december", "dec", 12),
];

pub fn parse_date(raw: &str, format: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), format)
        .map_err(|e| format!("cannot parse date {raw:?} with format {format:?}: {e}"))
}

fn month_number(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    MONTHS
        .iter()
        .find(|(full, short, _)| *full == name || *short == name)
        .map(|(_, _, n)| *n)
}

/// Parse a fully spelled Dutch date such as `17 september 2019`.
///
/// Month names are resolved by table lookup; the process locale is never
/// touched.
pub fn parse_dutch_date(raw: &str) -> Result<NaiveDate, String> {
    let parts: Vec<&str> = raw.split_whitespace().collect();
    let [day, month, year] = parts.as_slice() else {
        return Err(format!("expected 'day month year', got {raw:?}"));
    };
    let day: u32 = day.parse().map_err(|_| format!("bad day in {raw:?}"))?;
    let month = month_number(month).ok_or_else(|| format!("unknown month in {raw:?}"))?;
    let year: i32 = year.parse().map_err(|_| format!("bad year in {raw:?}"))?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| format!("invalid date {raw:?}"))
}

/// Parse a year-less Dutch `dd mon` cell (`05 mei`), anchored to the
/// statement period end: the resolved date is never after `anchor`, so a
/// December transaction on a January statement lands in the previous year.
pub fn parse_day_month_anchored(raw: &str, anchor: NaiveDate) -> Result<NaiveDate, String> {
    let parts: Vec<&str> = raw.split_whitespace().collect();
    let [day, month] = parts.as_slice() else {
        return Err(format!("expected 'day month', got {raw:?}"));
    };
    let day: u32 = day.parse().map_err(|_| format!("bad day in {raw:?}"))?;
    let month = month_number(month).ok_or_else(|| format!("unknown month in {raw:?}"))?;
    let date = NaiveDate::from_ymd_opt(anchor.year(), month, day)
        .ok_or_else(|| format!("invalid date {raw:?} in year {}", anchor.year()))?;
    if date > anchor {
        Ok(add_years(date, -1))
    } else {
        Ok(date)
    }
}

/// Shift a date by whole years, moving February 29 to March 1 when the
/// destination year has no leap day.
fn add_years(d: NaiveDate, years: i32) -> NaiveDate {
    if d.month() == 2 && d.day() == 29 {
        if let Some(shifted) = NaiveDate::from_ymd_opt(d.year() + years, 2, 29) {
            return shifted;
        }
        return NaiveDate::from_ymd_opt(d.year() + years, 3, 1)
            .expect("March 1 exists in every year");
    }
    NaiveDate::from_ymd_opt(d.year() + years, d.month(), d.day())
        .expect("same calendar date exists outside February 29")
}
