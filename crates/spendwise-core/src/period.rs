//! Date windows used for budgets and expense listings
//!
//! Every window is half-open: `start <= date < end`.

use chrono::{DateTime, Datelike, Duration, NaiveDate};

use crate::error::{Error, Result};

/// Half-open range of calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// The calendar month containing `date`
    pub fn month_of(date: NaiveDate) -> Self {
        let start = month_start(date);
        Self {
            start,
            end: next_month_start(start),
        }
    }

    /// A whole calendar year
    pub fn year(year: i32) -> Result<Self> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| Error::validation(format!("Invalid year: {}", year)))?;
        let end = NaiveDate::from_ymd_opt(year + 1, 1, 1)
            .ok_or_else(|| Error::validation(format!("Invalid year: {}", year)))?;
        Ok(Self { start, end })
    }

    /// The Sunday-to-Saturday week containing `date`
    pub fn week_of(date: NaiveDate) -> Self {
        let offset = date.weekday().num_days_from_sunday() as i64;
        let start = date - Duration::days(offset);
        Self {
            start,
            end: start + Duration::days(7),
        }
    }

    /// Week `week` (1-based) of a month
    ///
    /// Weeks are counted from the 1st of the month in blocks of seven days;
    /// the last week is clipped at the end of the month.
    pub fn week_of_month(month: NaiveDate, week: u32) -> Result<Self> {
        let month = Self::month_of(month);
        if week == 0 {
            return Err(Error::validation("Week number must start at 1"));
        }
        let start = month
            .start
            .checked_add_signed(Duration::days(7 * (i64::from(week) - 1)))
            .filter(|start| *start < month.end)
            .ok_or_else(|| {
                Error::validation(format!(
                    "Week {} is outside of {}",
                    week,
                    month.start.format("%Y-%m")
                ))
            })?;
        let end = std::cmp::min(start + Duration::days(7), month.end);
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

/// First day of the month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn next_month_start(start: NaiveDate) -> NaiveDate {
    let (year, month) = if start.month() == 12 {
        (start.year() + 1, 1)
    } else {
        (start.year(), start.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(start)
}

/// Parse a calendar date
///
/// Accepts `YYYY-MM-DD` and full RFC 3339 timestamps (the date part is kept).
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.date_naive())
        .map_err(|_| Error::validation(format!("Invalid date '{}' (use YYYY-MM-DD)", s)))
}

/// Parse a month as `YYYY-MM`, or any date inside it
pub fn parse_month(s: &str) -> Result<DateRange> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d") {
        return Ok(DateRange::month_of(date));
    }
    parse_date(s)
        .map(DateRange::month_of)
        .map_err(|_| Error::validation(format!("Invalid month '{}' (use YYYY-MM)", s)))
}

/// Parse `YYYY` as a whole year or `YYYY-MM` as a month
pub fn parse_year_or_month(s: &str) -> Result<DateRange> {
    let s = s.trim();
    if s.len() == 4 {
        let year: i32 = s
            .parse()
            .map_err(|_| Error::validation(format!("Invalid year '{}' (use YYYY)", s)))?;
        return DateRange::year(year);
    }
    parse_month(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_month_of() {
        let march = DateRange::month_of(d(2024, 3, 17));
        assert_eq!(march.start, d(2024, 3, 1));
        assert_eq!(march.end, d(2024, 4, 1));
        assert!(march.contains(d(2024, 3, 31)));
        assert!(!march.contains(d(2024, 4, 1)));

        let december = DateRange::month_of(d(2023, 12, 5));
        assert_eq!(december.end, d(2024, 1, 1));
    }

    #[test]
    fn test_week_of_starts_on_sunday() {
        // 2024-03-06 is a Wednesday
        let week = DateRange::week_of(d(2024, 3, 6));
        assert_eq!(week.start, d(2024, 3, 3));
        assert_eq!(week.end, d(2024, 3, 10));

        // A Sunday is the first day of its own week
        let week = DateRange::week_of(d(2024, 3, 3));
        assert_eq!(week.start, d(2024, 3, 3));
    }

    #[test]
    fn test_week_of_month() {
        let first = DateRange::week_of_month(d(2024, 2, 1), 1).unwrap();
        assert_eq!(first.start, d(2024, 2, 1));
        assert_eq!(first.end, d(2024, 2, 8));

        // Leap February: week 5 is just the 29th
        let last = DateRange::week_of_month(d(2024, 2, 1), 5).unwrap();
        assert_eq!(last.start, d(2024, 2, 29));
        assert_eq!(last.end, d(2024, 3, 1));

        assert!(DateRange::week_of_month(d(2023, 2, 1), 5).is_err());
        assert!(DateRange::week_of_month(d(2024, 2, 1), 0).is_err());
    }

    #[test]
    fn test_week_of_month_huge_week_is_an_error() {
        let result = DateRange::week_of_month(d(2024, 3, 1), 20_000_000);
        assert!(matches!(result, Err(Error::Validation(_))));

        let result = DateRange::week_of_month(d(2024, 3, 1), u32::MAX);
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-03-05").unwrap(), d(2024, 3, 5));
        assert_eq!(
            parse_date("2024-03-05T00:00:00.000Z").unwrap(),
            d(2024, 3, 5)
        );
        assert!(matches!(parse_date("05/03/2024"), Err(Error::Validation(_))));
    }

    #[test]
    fn test_parse_month_and_year() {
        assert_eq!(parse_month("2024-03").unwrap().start, d(2024, 3, 1));
        assert_eq!(parse_month("2024-03-19").unwrap().start, d(2024, 3, 1));
        assert!(parse_month("2024-13").is_err());

        let year = parse_year_or_month("2024").unwrap();
        assert_eq!(year.start, d(2024, 1, 1));
        assert_eq!(year.end, d(2025, 1, 1));
        assert_eq!(
            parse_year_or_month("2024-11").unwrap().end,
            d(2024, 12, 1)
        );
        assert!(parse_year_or_month("20x4").is_err());
    }
}
