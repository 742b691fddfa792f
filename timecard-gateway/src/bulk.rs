//! Bulk fill orchestration.
//!
//! Fills a date range with one identical entry per day, sequentially and
//! under a wall-clock deadline. Per-day failures are collected rather than
//! aborting the run, so a partially filled range reports exactly which days
//! made it. Weekends are written too unless the caller asks to skip them.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use tokio::time::Instant;

use timecard_core::{Error, Result};

use crate::timelogs::{EntrySpec, TimelogEngine};

#[derive(Debug, Clone, Serialize)]
pub struct DayError {
    pub date: String,
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FillStatus {
    /// Every targeted day in the range was written.
    Success,
    /// Some days were written, some failed.
    PartialError,
    /// No day was written.
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct FillReport {
    pub status: FillStatus,
    pub start_date: String,
    pub end_date: String,
    pub updated: u32,
    pub skipped_weekend_days: u32,
    pub total_days: u32,
    pub errors: Vec<DayError>,
}

pub struct FillRequest<'a> {
    pub project_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub description: &'a str,
    pub duration: timecard_core::HoursMinutes,
    pub label_id: i64,
    pub skip_weekends: bool,
}

/// Fill every day in `[start_date, end_date]` with the same entry,
/// leaving Saturdays and Sundays out only when `skip_weekends` is set.
///
/// Days are written in order, one at a time, so the backend never sees two
/// overlapping writes to the same week container from a single fill. When
/// `deadline` passes mid-run the run stops: the day that was about to be
/// written gets one error entry, and later days are left untouched.
pub async fn fill_days(
    engine: &TimelogEngine<'_>,
    token: &str,
    request: &FillRequest<'_>,
    max_days: i64,
    deadline: Instant,
) -> Result<FillReport> {
    if request.start_date > request.end_date {
        return Err(Error::InvalidArgument(
            "start_date must not be after end_date".into(),
        ));
    }
    let span = (request.end_date - request.start_date).num_days() + 1;
    if span > max_days {
        return Err(Error::InvalidArgument(format!(
            "range covers {span} days, more than the {max_days}-day maximum"
        )));
    }

    let mut updated = 0u32;
    let mut skipped = 0u32;
    let mut errors = Vec::new();

    let mut current = request.start_date;
    while current <= request.end_date {
        if Instant::now() >= deadline {
            tracing::warn!(date = %current, "bulk fill deadline reached, stopping early");
            errors.push(DayError {
                date: current.format("%Y-%m-%d").to_string(),
                error: "bulk fill deadline reached before this day was written".into(),
            });
            break;
        }
        if request.skip_weekends && matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            skipped += 1;
        } else {
            let entry = EntrySpec {
                project_id: request.project_id,
                date: current,
                description: request.description,
                duration: request.duration,
                label_id: request.label_id,
            };
            match engine.upsert_entry(token, &entry).await {
                Ok(_) => updated += 1,
                Err(e) => errors.push(DayError {
                    date: current.format("%Y-%m-%d").to_string(),
                    error: e.to_string(),
                }),
            }
        }
        match current.succ_opt() {
            Some(next) => current = next,
            None => break,
        }
    }

    let status = if errors.is_empty() {
        FillStatus::Success
    } else if updated > 0 {
        FillStatus::PartialError
    } else {
        FillStatus::Error
    };
    Ok(FillReport {
        status,
        start_date: request.start_date.format("%Y-%m-%d").to_string(),
        end_date: request.end_date.format("%Y-%m-%d").to_string(),
        updated,
        skipped_weekend_days: skipped,
        total_days: span as u32,
        errors,
    })
}
