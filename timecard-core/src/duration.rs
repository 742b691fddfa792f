//! Decimal-hours durations split into whole hours and minutes.
//!
//! The backend stores day entries as separate hour/minute fields plus a
//! two-decimal representation; tool callers supply a single decimal number.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A validated day-entry duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoursMinutes {
    pub hours: u32,
    pub minutes: u32,
}

impl HoursMinutes {
    /// Convert decimal hours (e.g. `8.5`) to whole hours and minutes.
    ///
    /// Rejects values outside (0, 24] and anything whose minute component
    /// rounds to zero, before any write is attempted.
    pub fn from_decimal(hours: f64) -> Result<Self> {
        if !hours.is_finite() || hours <= 0.0 || hours > 24.0 {
            return Err(Error::InvalidArgument(format!(
                "hours must be between 0 (exclusive) and 24 (inclusive), got {hours}"
            )));
        }
        let total_minutes = (hours * 60.0).round() as i64;
        if total_minutes < 1 {
            return Err(Error::InvalidArgument(
                "hours too small: rounds to 0 minutes (minimum is ~0.02, i.e. 1 minute)".into(),
            ));
        }
        Ok(Self {
            hours: (total_minutes / 60) as u32,
            minutes: (total_minutes % 60) as u32,
        })
    }

    /// Two-decimal representation, as the backend stores it.
    pub fn decimal(&self) -> f64 {
        let dec = f64::from(self.hours) + f64::from(self.minutes) / 60.0;
        (dec * 100.0).round() / 100.0
    }

    /// `HH:MM` form used by the fallback creation endpoint.
    pub fn time_spent(&self) -> String {
        format!("{:02}:{:02}", self.hours, self.minutes)
    }
}
