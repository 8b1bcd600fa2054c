//! Date normalization for dates scraped from listing sites.
//!
//! Sites publish dates in many shapes ("5.5.2025", "10 April 2025",
//! "1. März 2025", "2025-06-01T08:00:00Z"). Each strategy below either yields a
//! `DD/MM/YYYY` date or declines; the first match wins. Unparseable input is
//! returned verbatim.

use chrono::NaiveDate;

type Strategy = fn(&str) -> Option<NaiveDate>;

/// Tried in order. Numeric day-first comes before ISO so "01-06-2025" stays day-first.
const STRATEGIES: &[Strategy] = &[numeric_day_first, iso_date, dotted_month_name, spaced_month_name];

const OUTPUT_FORMAT: &str = "%d/%m/%Y";

/// Normalizes a scraped date to `DD/MM/YYYY`, or returns the input unchanged.
pub fn normalize_date(raw: &str) -> String {
    parse_scraped_date(raw)
        .map(|d| d.format(OUTPUT_FORMAT).to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Parses a scraped date, also trying the part before a trailing ", HH:MM".
pub fn parse_scraped_date(raw: &str) -> Option<NaiveDate> {
    let clean = raw.replace('\u{a0}', " ");
    let clean = clean.trim();
    if clean.is_empty() {
        return None;
    }

    let mut candidates = vec![clean];
    if let Some((head, _)) = clean.split_once(',') {
        candidates.push(head.trim());
    }

    candidates
        .into_iter()
        .find_map(|candidate| STRATEGIES.iter().find_map(|strategy| strategy(candidate)))
}

fn numeric_day_first(s: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = s.split(&['.', '-', '/'][..]).collect();
    let [day, month, year] = parts.as_slice() else {
        return None;
    };
    if day.len() > 2 || month.len() > 2 || year.len() != 4 {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

fn iso_date(s: &str) -> Option<NaiveDate> {
    let date_part = s.split('T').next()?;
    if date_part.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// "1. März 2025", "5. mai 2025"
fn dotted_month_name(s: &str) -> Option<NaiveDate> {
    let (day, rest) = s.split_once('.')?;
    let mut words = rest.split_whitespace();
    let (month, year) = (words.next()?, words.next()?);
    if words.next().is_some() {
        return None;
    }
    build(day.trim(), month, year)
}

/// "05 May 2025", "10 April 2025"
fn spaced_month_name(s: &str) -> Option<NaiveDate> {
    let words: Vec<&str> = s.split_whitespace().collect();
    let [day, month, year] = words.as_slice() else {
        return None;
    };
    build(day, month, year)
}

fn build(day: &str, month_name: &str, year: &str) -> Option<NaiveDate> {
    if day.is_empty() || day.len() > 2 || year.len() != 4 {
        return None;
    }
    let month = month_number(month_name)?;
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, day.parse().ok()?)
}

/// Norwegian, German and English month names.
fn month_number(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().as_str() {
        "januar" | "january" => 1,
        "februar" | "february" => 2,
        "mars" | "märz" | "maerz" | "march" => 3,
        "april" => 4,
        "mai" | "may" => 5,
        "juni" | "june" => 6,
        "juli" | "july" => 7,
        "august" => 8,
        "september" => 9,
        "oktober" | "october" => 10,
        "november" => 11,
        "desember" | "dezember" | "december" => 12,
        _ => return None,
    };
    Some(month)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_dates_are_zero_padded() {
        assert_eq!(normalize_date("5.5.2025"), "05/05/2025");
        assert_eq!(normalize_date("05-05-2025"), "05/05/2025");
        assert_eq!(normalize_date("01/06/2025"), "01/06/2025");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let once = normalize_date("3. juni 2025");
        assert_eq!(once, "03/06/2025");
        assert_eq!(normalize_date(&once), once);
    }

    #[test]
    fn test_textual_dates_in_three_languages() {
        assert_eq!(normalize_date("1. März 2025"), "01/03/2025");
        assert_eq!(normalize_date("1. januar 2025"), "01/01/2025");
        assert_eq!(normalize_date("10 April 2025"), "10/04/2025");
        assert_eq!(normalize_date("5 May 2025"), "05/05/2025");
        assert_eq!(normalize_date("24. desember 2024"), "24/12/2024");
    }

    #[test]
    fn test_iso_dates_and_timestamps() {
        assert_eq!(normalize_date("2025-06-01"), "01/06/2025");
        assert_eq!(normalize_date("2025-06-01T08:30:00Z"), "01/06/2025");
    }

    #[test]
    fn test_trailing_time_is_ignored() {
        assert_eq!(normalize_date("12.05.2025, 14:32"), "12/05/2025");
    }

    #[test]
    fn test_non_breaking_spaces_are_handled() {
        assert_eq!(normalize_date("5\u{a0}May\u{a0}2025"), "05/05/2025");
    }

    #[test]
    fn test_unparseable_input_passes_through() {
        assert_eq!(normalize_date("Snarest"), "Snarest");
        assert_eq!(normalize_date("jobs.ch"), "jobs.ch");
        assert_eq!(normalize_date("32.13.2025"), "32.13.2025");
        assert_eq!(normalize_date("5 Smarch 2025"), "5 Smarch 2025");
        assert_eq!(normalize_date(""), "");
    }
}
