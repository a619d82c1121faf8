use chrono::{Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::process::raw_table::Cell;

static DAY_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4}|\d{2})(?:[ T].*)?$").unwrap()
});
static ISO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})[/\-](\d{1,2})[/\-](\d{1,2})(?:[ T].*)?$").unwrap());

/// Largest serial day a spreadsheet can hold (9999-12-31).
const MAX_SERIAL_DAY: f64 = 2_958_465.0;

/// Parse `dd/mm/yyyy`-style text (also `-` and `.` separators, two-digit years,
/// a trailing time part) or ISO `yyyy-mm-dd`.
pub fn parse_day_first(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if let Some(caps) = ISO.captures(s) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    let caps = DAY_FIRST.captures(s)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year = match &caps[3] {
        y if y.len() == 2 => {
            // strptime %y pivot
            let yy: i32 = y.parse().ok()?;
            if yy < 69 {
                2000 + yy
            } else {
                1900 + yy
            }
        }
        y => y.parse().ok()?,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Spreadsheet serial day (1900 date system, epoch 1899-12-30).
pub fn from_serial_day(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_SERIAL_DAY {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

/// Date coercion for a cell; anything unparsable becomes `None`.
pub fn coerce_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(dt) => Some(dt.date()),
        Cell::Number(n) => from_serial_day(*n),
        Cell::Text(s) => parse_day_first(s),
        Cell::Empty | Cell::Bool(_) => None,
    }
}
