//! Date cell coercion to the `dd/mm/yyyy` text used throughout the tracker.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use super::Cell;

/// Render a date the way the entry form expects it.
pub fn format_date(date: NaiveDate) -> String {
    format!("{:02}/{:02}/{:04}", date.day(), date.month(), date.year())
}

/// Convert a spreadsheet serial number (1900 date system) to a date.
///
/// Fractions carry the time of day and are discarded. Serial 60 is the
/// nonexistent 29/02/1900 kept by the 1900 system and yields `None`.
pub fn from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > 2_958_465.0 {
        return None;
    }
    let days = serial.floor() as i64;
    let epoch = match days {
        1..=59 => NaiveDate::from_ymd_opt(1899, 12, 31)?,
        60 => return None,
        _ => NaiveDate::from_ymd_opt(1899, 12, 30)?,
    };
    epoch.checked_add_signed(Duration::days(days))
}

static DAY_FIRST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4})$").expect("invalid day-first date regex")
});

/// Parse free text into a date. Slash, dash and dot separated dates are
/// read day first; ISO and RFC 3339 forms are also accepted.
pub fn parse_text_date(text: &str) -> Option<NaiveDate> {
    let clean = text.trim();
    if clean.is_empty() {
        return None;
    }
    if let Some(caps) = DAY_FIRST_RE.captures(clean) {
        let day = caps.get(1)?.as_str().parse().ok()?;
        let month = caps.get(2)?.as_str().parse().ok()?;
        let year = caps.get(3)?.as_str().parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    if let Ok(date) = NaiveDate::parse_from_str(clean, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(clean, "%Y/%m/%d") {
        return Some(date);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(clean) {
        return Some(datetime.date_naive());
    }
    NaiveDateTime::parse_from_str(clean, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(clean, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(|datetime| datetime.date())
}

/// Coerce any cell to `dd/mm/yyyy`; unparseable text is kept trimmed.
pub fn cell_to_date_string(cell: &Cell) -> String {
    match cell {
        Cell::Date(date) => format_date(*date),
        Cell::Number(serial) => from_serial(*serial).map(format_date).unwrap_or_default(),
        Cell::Text(text) => {
            let clean = text.trim();
            match parse_text_date(clean) {
                Some(date) => format_date(date),
                None => clean.to_string(),
            }
        }
        Cell::Bool(_) | Cell::Empty => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_padding() {
        let date = NaiveDate::from_ymd_opt(2021, 3, 7).expect("valid date");
        assert_eq!(format_date(date), "07/03/2021");
    }

    #[test]
    fn converts_serial_numbers() {
        assert_eq!(cell_to_date_string(&Cell::Number(44197.0)), "01/01/2021");
        assert_eq!(cell_to_date_string(&Cell::Number(44197.75)), "01/01/2021");
        assert_eq!(cell_to_date_string(&Cell::Number(-4.0)), "");
    }

    #[test]
    fn early_serials_follow_the_1900_system() {
        assert_eq!(cell_to_date_string(&Cell::Number(1.0)), "01/01/1900");
        assert_eq!(cell_to_date_string(&Cell::Number(59.0)), "28/02/1900");
        assert_eq!(cell_to_date_string(&Cell::Number(60.0)), "");
        assert_eq!(cell_to_date_string(&Cell::Number(61.0)), "01/03/1900");
    }

    #[test]
    fn parses_text_dates() {
        assert_eq!(cell_to_date_string(&Cell::Text("2020-11-10".into())), "10/11/2020");
        assert_eq!(cell_to_date_string(&Cell::Text(" 5/3/2019 ".into())), "05/03/2019");
        assert_eq!(cell_to_date_string(&Cell::Text("5.3.2019".into())), "05/03/2019");
        assert_eq!(
            cell_to_date_string(&Cell::Text("2023-06-01T12:30:00.000Z".into())),
            "01/06/2023"
        );
    }

    #[test]
    fn keeps_unparseable_text() {
        assert_eq!(cell_to_date_string(&Cell::Text(" early 2000s ".into())), "early 2000s");
        assert_eq!(cell_to_date_string(&Cell::Text("31/02/2020".into())), "31/02/2020");
        assert_eq!(cell_to_date_string(&Cell::Empty), "");
    }

    #[test]
    fn native_dates_pass_through() {
        let date = NaiveDate::from_ymd_opt(1998, 11, 21).expect("valid date");
        assert_eq!(cell_to_date_string(&Cell::Date(date)), "21/11/1998");
    }
}
