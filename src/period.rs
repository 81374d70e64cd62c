use chrono::{Datelike, Months, NaiveDate};

use crate::error::ConfigError;

/// Format of period bounds in the settings file
pub const PERIOD_DATE_FORMAT: &str = "%Y-%m-%d";
const LABEL_DATE_FORMAT: &str = "%b %d, %Y";

/// A closed date interval, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ConfigError> {
        if start > end {
            return Err(ConfigError::PeriodOutOfOrder {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Parses a pair of `YYYY-MM-DD` bounds
    pub fn parse(start: &str, end: &str) -> Result<Self, ConfigError> {
        Self::new(parse_bound(start)?, parse_bound(end)?)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Title shown at the top of the period's statement block
    pub fn label(&self) -> String {
        format!(
            "{} - {}",
            self.start.format(LABEL_DATE_FORMAT),
            self.end.format(LABEL_DATE_FORMAT)
        )
    }

    /// The period following this one, one month later.
    ///
    /// Month-end periods stay aligned on month ends, so January 1-31 is followed by
    /// February 1-28 (or 29), not February 1 - March 3.
    pub fn next_month(&self) -> Option<Self> {
        let start = self.start.checked_add_months(Months::new(1))?;
        let mut end = self.end.checked_add_months(Months::new(1))?;
        if is_last_day_of_month(self.end) {
            end = last_day_of_month(end)?;
        }
        Some(Self { start, end })
    }

    /// January of `year`, used when no period has been configured yet
    pub fn default_for_year(year: i32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
        let end = NaiveDate::from_ymd_opt(year, 1, 31)?;
        Some(Self { start, end })
    }

    pub fn bounds(&self) -> [String; 2] {
        [
            self.start.format(PERIOD_DATE_FORMAT).to_string(),
            self.end.format(PERIOD_DATE_FORMAT).to_string(),
        ]
    }
}

/// Index of the first period containing `date`, in configured order.
///
/// Overlapping periods are resolved by list order, not by the tightest match.
pub fn period_index(date: NaiveDate, periods: &[Period]) -> Option<usize> {
    periods.iter().position(|period| period.contains(date))
}

fn parse_bound(s: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(s.trim(), PERIOD_DATE_FORMAT)
        .map_err(|_| ConfigError::InvalidDate(s.to_owned()))
}

fn is_last_day_of_month(date: NaiveDate) -> bool {
    date.succ_opt()
        .map_or(true, |next| next.month() != date.month())
}

fn last_day_of_month(date: NaiveDate) -> Option<NaiveDate> {
    date.with_day(1)?
        .checked_add_months(Months::new(1))?
        .pred_opt()
}
