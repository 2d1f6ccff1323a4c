use chrono::NaiveDate;

use crate::cell::Cell;

// Spreadsheet serial day-counts use the 1899-12-30 epoch (the 1900 leap-year
// bug offset). The plausibility window keeps full-row date scans from turning
// ordinary amounts into dates: 10_959 = 1930-01-01, 73_050 = 2099-12-31.
const SERIAL_MIN: f64 = 10_959.0;
const SERIAL_MAX: f64 = 73_050.0;

/// Convert a spreadsheet serial day-count into a calendar date.
/// Values outside the 1930–2099 window resolve to `None`.
pub fn from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(SERIAL_MIN..=SERIAL_MAX).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(chrono::Days::new(serial.trunc() as u64))
}

/// Resolve a grid cell to a calendar date, or `None`. Never returns a
/// partially-correct date.
pub fn resolve_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Number(n) => from_serial(*n),
        Cell::Text(s) => resolve_date_str(s),
        Cell::Empty => None,
    }
}

/// Resolve a textual date, trying ISO, separator-delimited forms with a
/// day/month disambiguation heuristic, and a handful of spelled-out formats.
///
/// The heuristic: first part > 12 reads day-first, else second part > 12 reads
/// month-first, else month-first. The final arm is a guess with no signal in
/// the data itself; it is applied uniformly and documented as a limitation.
pub fn resolve_date_str(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }

    if let Some(d) = try_separated_triple(s) {
        return Some(d);
    }

    for fmt in &[
        "%B %d, %Y", "%b %d, %Y", "%B %d %Y", "%b %d %Y", "%d %B %Y", "%d %b %Y", "%d-%b-%Y",
        "%d-%b-%y", "%Y%m%d",
    ] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }

    // A bare digit run may be a serial that arrived as text (CSV exports).
    if s.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(n) = s.parse::<f64>() {
            return from_serial(n);
        }
    }

    None
}

/// `P1<sep>P2<sep>P3` with `/`, `-` or `.` separators.
fn try_separated_triple(s: &str) -> Option<NaiveDate> {
    let sep = ['/', '-', '.'].into_iter().find(|c| s.contains(*c))?;
    let parts: Vec<&str> = s.split(sep).map(str::trim).collect();
    if parts.len() != 3 {
        return None;
    }

    let p1: u32 = parts[0].parse().ok()?;
    let p2: u32 = parts[1].parse().ok()?;
    let p3: i32 = parts[2].parse().ok()?;

    // Year-first exports ("2024/01/15") — the first part cannot be a day.
    if p1 > 31 {
        return NaiveDate::from_ymd_opt(p1 as i32, p2, p3 as u32);
    }

    let year = expand_year(p3);
    let (month, day) = if p1 > 12 {
        (p2, p1)
    } else if p2 > 12 {
        (p1, p2)
    } else {
        // Genuinely ambiguous; month-first by convention.
        (p1, p2)
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn expand_year(y: i32) -> i32 {
    if y < 100 {
        2000 + y
    } else {
        y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── serial conversion ─────────────────────────────────────────────────────

    #[test]
    fn serial_known_value() {
        // 45306 = 2024-01-15
        assert_eq!(from_serial(45306.0), Some(date(2024, 1, 15)));
    }

    #[test]
    fn serial_fractional_time_is_truncated() {
        assert_eq!(from_serial(45306.75), Some(date(2024, 1, 15)));
    }

    #[test]
    fn serial_outside_window_rejected() {
        assert_eq!(from_serial(123.45), None);
        assert_eq!(from_serial(1_000_000.0), None);
        assert_eq!(from_serial(f64::NAN), None);
    }

    // ── string parsing ────────────────────────────────────────────────────────

    #[test]
    fn iso_string() {
        assert_eq!(resolve_date_str("2024-01-15"), Some(date(2024, 1, 15)));
    }

    #[test]
    fn slash_month_first_default() {
        assert_eq!(resolve_date_str("01/15/2024"), Some(date(2024, 1, 15)));
        // Both parts ≤ 12: ambiguous, month-first wins.
        assert_eq!(resolve_date_str("02/03/2024"), Some(date(2024, 2, 3)));
    }

    #[test]
    fn slash_day_first_when_first_part_exceeds_twelve() {
        assert_eq!(resolve_date_str("13/02/2024"), Some(date(2024, 2, 13)));
        assert_eq!(resolve_date_str("25/12/2023"), Some(date(2023, 12, 25)));
    }

    #[test]
    fn dot_and_dash_separators() {
        assert_eq!(resolve_date_str("15.01.2024"), Some(date(2024, 1, 15)));
        assert_eq!(resolve_date_str("01-15-2024"), Some(date(2024, 1, 15)));
    }

    #[test]
    fn two_digit_year_expands() {
        assert_eq!(resolve_date_str("01/15/24"), Some(date(2024, 1, 15)));
    }

    #[test]
    fn year_first_slash() {
        assert_eq!(resolve_date_str("2024/01/15"), Some(date(2024, 1, 15)));
    }

    #[test]
    fn spelled_out_months() {
        assert_eq!(resolve_date_str("January 15, 2024"), Some(date(2024, 1, 15)));
        assert_eq!(resolve_date_str("15 Jan 2024"), Some(date(2024, 1, 15)));
        assert_eq!(resolve_date_str("Jan 15 2024"), Some(date(2024, 1, 15)));
    }

    #[test]
    fn compact_iso() {
        assert_eq!(resolve_date_str("20240115"), Some(date(2024, 1, 15)));
    }

    #[test]
    fn serial_arriving_as_text() {
        assert_eq!(resolve_date_str("45306"), Some(date(2024, 1, 15)));
    }

    #[test]
    fn invalid_inputs_yield_none() {
        assert_eq!(resolve_date_str("not a date"), None);
        assert_eq!(resolve_date_str("99/99/2024"), None);
        assert_eq!(resolve_date_str(""), None);
        assert_eq!(resolve_date_str("2024-13-40"), None);
    }

    #[test]
    fn round_trip_is_idempotent() {
        for input in &["2024-01-15", "01/15/2024", "13/02/2024", "15 Jan 2024", "45306"] {
            let first = resolve_date_str(input).unwrap();
            let formatted = first.format("%Y-%m-%d").to_string();
            assert_eq!(resolve_date_str(&formatted), Some(first), "input {input}");
        }
    }

    // ── cell dispatch ─────────────────────────────────────────────────────────

    #[test]
    fn cell_variants() {
        assert_eq!(resolve_date(&Cell::Date(date(2024, 1, 15))), Some(date(2024, 1, 15)));
        assert_eq!(resolve_date(&Cell::Number(45306.0)), Some(date(2024, 1, 15)));
        assert_eq!(resolve_date(&Cell::Text("2024-01-15".into())), Some(date(2024, 1, 15)));
        assert_eq!(resolve_date(&Cell::Empty), None);
        assert_eq!(resolve_date(&Cell::Number(123.45)), None);
    }
}
