use chrono::{NaiveDate, NaiveDateTime};

use crate::error::ReconError;

/// Billing reference window for one run. Calls up to two months older than
/// the reference month may legitimately appear in a DETRAF file; anything
/// outside [start, end] is flagged as account recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingContext {
    pub period: String,
    pub window_start: NaiveDateTime,
    pub window_end: NaiveDateTime,
}

impl BillingContext {
    /// Build the window for a YYYYMM reference period:
    /// start = first day of (period - 2 months), end = last day of period.
    pub fn from_period(period: &str) -> Result<Self, ReconError> {
        let invalid = || ReconError::InvalidPeriod(period.to_string());

        if period.len() != 6 || !period.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let year: i32 = period[..4].parse().map_err(|_| invalid())?;
        let month: u32 = period[4..].parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }

        let (start_year, start_month) = if month > 2 {
            (year, month - 2)
        } else {
            (year - 1, month + 10)
        };

        let start = NaiveDate::from_ymd_opt(start_year, start_month, 1)
            .ok_or_else(invalid)?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(invalid)?;

        // Last day of the reference month = day before the 1st of the next one
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .ok_or_else(invalid)?
            .pred_opt()
            .ok_or_else(invalid)?
            .and_hms_opt(23, 59, 59)
            .ok_or_else(invalid)?;

        Ok(Self {
            period: period.to_string(),
            window_start: start,
            window_end: end,
        })
    }

    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.window_start <= t && t <= self.window_end
    }
}
