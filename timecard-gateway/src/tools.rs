//! Typed tool surface.
//!
//! Each function is one tool a caller can invoke. The shape is uniform:
//! validate arguments, exchange the identity assertion for a session token,
//! admit the write against the rate guard (writes only), resolve names to
//! ids, run the operation, and emit one audit line per applied write.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use timecard_core::duration::HoursMinutes;
use timecard_core::{Error, Result};
use tokio::time::{Duration, Instant};

use crate::bulk::{self, FillRequest};
use crate::context::Context;
use crate::leaves::ApplyLeave;
use crate::rate::WriteDomain;
use crate::resolvers;

const MAX_LEAVE_REASON_LEN: usize = 2000;
const MAX_LEAVE_SPAN_DAYS: i64 = 90;
const MAX_ENCASH_DAYS: i64 = 90;

fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| Error::InvalidArgument(format!("{field} must be a YYYY-MM-DD date")))
}

fn check_description(description: &str, max_len: usize) -> Result<()> {
    if description.trim().is_empty() {
        return Err(Error::InvalidArgument("description must not be empty".into()));
    }
    if description.chars().count() > max_len {
        return Err(Error::InvalidArgument(format!(
            "description exceeds the {max_len}-character maximum"
        )));
    }
    Ok(())
}

fn check_month(month: u32) -> Result<()> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(Error::InvalidArgument("month must be between 1 and 12".into()))
    }
}

// ---------------------------------------------------------------------------
// Time-log reads

pub async fn list_projects(ctx: &Context, assertion: &str) -> Result<Value> {
    let (token, _) = ctx.authenticate(assertion).await?;
    ctx.timelogs().active_projects(&token).await
}

pub async fn list_labels(ctx: &Context, assertion: &str) -> Result<Value> {
    let (token, _) = ctx.authenticate(assertion).await?;
    ctx.timelogs().log_labels(&token).await
}

pub async fn get_week(ctx: &Context, assertion: &str, date: &str) -> Result<Value> {
    let date = parse_date("date", date)?;
    let (token, _) = ctx.authenticate(assertion).await?;
    ctx.timelogs().get_week_logs(&token, date).await
}

pub async fn get_day(ctx: &Context, assertion: &str, date: &str) -> Result<Value> {
    let date = parse_date("date", date)?;
    let (token, _) = ctx.authenticate(assertion).await?;
    ctx.timelogs().get_day_logs(&token, date).await
}

pub async fn get_month(
    ctx: &Context,
    assertion: &str,
    year: i32,
    month: u32,
) -> Result<Value> {
    check_month(month)?;
    let (token, _) = ctx.authenticate(assertion).await?;
    ctx.timelogs().get_month_logs(&token, year, month).await
}

pub async fn get_range(
    ctx: &Context,
    assertion: &str,
    start_date: &str,
    end_date: &str,
) -> Result<Value> {
    let start = parse_date("start_date", start_date)?;
    let end = parse_date("end_date", end_date)?;
    if start > end {
        return Err(Error::InvalidArgument(
            "start_date must not be after end_date".into(),
        ));
    }
    let span = (end - start).num_days() + 1;
    if span > ctx.config.max_query_days {
        return Err(Error::InvalidArgument(format!(
            "range covers {span} days, more than the {}-day maximum",
            ctx.config.max_query_days
        )));
    }
    let (token, _) = ctx.authenticate(assertion).await?;
    ctx.timelogs().get_range_logs(&token, start, end).await
}

pub async fn check_week_project(
    ctx: &Context,
    assertion: &str,
    date: &str,
    project_id: Option<i64>,
    project_name: Option<&str>,
) -> Result<Value> {
    let date = parse_date("date", date)?;
    let (token, _) = ctx.authenticate(assertion).await?;
    let project_id = resolvers::resolve_project(&ctx.api, &token, project_id, project_name).await?;
    ctx.timelogs()
        .check_week_project(&token, date, project_id)
        .await
}

// ---------------------------------------------------------------------------
// Time-log writes

#[derive(Debug, Clone, Deserialize)]
pub struct UpsertEntryArgs {
    pub date: String,
    pub description: String,
    pub hours: f64,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub label_id: Option<i64>,
    #[serde(default)]
    pub label_name: Option<String>,
}

pub async fn upsert_entry(ctx: &Context, assertion: &str, args: &UpsertEntryArgs) -> Result<Value> {
    let date = parse_date("date", &args.date)?;
    check_description(&args.description, ctx.config.max_description_len)?;
    let duration = HoursMinutes::from_decimal(args.hours)?;

    let (token, email) = ctx.authenticate(assertion).await?;
    ctx.rate
        .admit(&email, WriteDomain::Timelogs, ctx.config.rate_ceiling_timelogs)?;

    let project_id = resolvers::resolve_project(
        &ctx.api,
        &token,
        args.project_id,
        args.project_name.as_deref(),
    )
    .await?;
    let label_id = resolvers::resolve_label(
        &ctx.api,
        &token,
        args.label_id,
        args.label_name.as_deref(),
        ctx.config.default_label_id,
    )
    .await?;

    let entry = crate::timelogs::EntrySpec {
        project_id,
        date,
        description: &args.description,
        duration,
        label_id,
    };
    let result = ctx.timelogs().upsert_entry(&token, &entry).await?;
    tracing::info!(
        target: "audit",
        tool = "upsert_entry",
        user = %email,
        project_id,
        date = %date,
        time_spent = %duration.time_spent(),
        "time log written"
    );
    Ok(result)
}

pub async fn delete_entry(
    ctx: &Context,
    assertion: &str,
    date: &str,
    description: &str,
    project_id: Option<i64>,
    project_name: Option<&str>,
) -> Result<Value> {
    let date = parse_date("date", date)?;
    if description.trim().is_empty() {
        return Err(Error::InvalidArgument("description must not be empty".into()));
    }

    let (token, email) = ctx.authenticate(assertion).await?;
    ctx.rate
        .admit(&email, WriteDomain::Timelogs, ctx.config.rate_ceiling_timelogs)?;

    let project_id =
        resolvers::resolve_project(&ctx.api, &token, project_id, project_name).await?;
    let result = ctx
        .timelogs()
        .delete_entry(&token, project_id, date, description)
        .await?;
    tracing::info!(
        target: "audit",
        tool = "delete_entry",
        user = %email,
        project_id,
        date = %date,
        "time log deleted"
    );
    Ok(result)
}

pub async fn complete_week(
    ctx: &Context,
    assertion: &str,
    date: &str,
    save_draft: bool,
) -> Result<Value> {
    let date = parse_date("date", date)?;
    let (token, email) = ctx.authenticate(assertion).await?;
    ctx.rate
        .admit(&email, WriteDomain::Timelogs, ctx.config.rate_ceiling_timelogs)?;

    let result = ctx.timelogs().complete_week(&token, date, save_draft).await?;
    tracing::info!(
        target: "audit",
        tool = "complete_week",
        user = %email,
        date = %date,
        save_draft,
        "week submitted"
    );
    Ok(result)
}

#[derive(Debug, Clone, Deserialize)]
pub struct FillDaysArgs {
    pub start_date: String,
    pub end_date: String,
    pub description: String,
    pub hours: f64,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub label_id: Option<i64>,
    #[serde(default)]
    pub label_name: Option<String>,
    /// Leave Saturdays and Sundays unwritten. Off by default.
    #[serde(default)]
    pub skip_weekends: bool,
}

/// Fill a date range with one identical entry per day. Counts as a single
/// admission against the rate guard.
pub async fn fill_days(ctx: &Context, assertion: &str, args: &FillDaysArgs) -> Result<Value> {
    let start_date = parse_date("start_date", &args.start_date)?;
    let end_date = parse_date("end_date", &args.end_date)?;
    check_description(&args.description, ctx.config.max_description_len)?;
    let duration = HoursMinutes::from_decimal(args.hours)?;

    let (token, email) = ctx.authenticate(assertion).await?;
    ctx.rate
        .admit(&email, WriteDomain::Timelogs, ctx.config.rate_ceiling_timelogs)?;

    let project_id = resolvers::resolve_project(
        &ctx.api,
        &token,
        args.project_id,
        args.project_name.as_deref(),
    )
    .await?;
    let label_id = resolvers::resolve_label(
        &ctx.api,
        &token,
        args.label_id,
        args.label_name.as_deref(),
        ctx.config.default_label_id,
    )
    .await?;

    let request = FillRequest {
        project_id,
        start_date,
        end_date,
        description: &args.description,
        duration,
        label_id,
        skip_weekends: args.skip_weekends,
    };
    let deadline = Instant::now() + Duration::from_secs(ctx.config.bulk_deadline_secs);
    let engine = ctx.timelogs();
    let report = bulk::fill_days(
        &engine,
        &token,
        &request,
        ctx.config.max_fill_days,
        deadline,
    )
    .await?;
    tracing::info!(
        target: "audit",
        tool = "fill_days",
        user = %email,
        project_id,
        start_date = %start_date,
        end_date = %end_date,
        updated = report.updated,
        errors = report.errors.len(),
        "bulk fill finished"
    );
    Ok(json!(report))
}

// ---------------------------------------------------------------------------
// Leaves

pub async fn leave_choices(ctx: &Context, assertion: &str) -> Result<Value> {
    let (token, _) = ctx.authenticate(assertion).await?;
    ctx.leaves().choices(&token).await
}

pub async fn leave_summary(
    ctx: &Context,
    assertion: &str,
    fiscal_year: Option<i32>,
) -> Result<Value> {
    let (token, _) = ctx.authenticate(assertion).await?;
    ctx.leaves().summary(&token, fiscal_year).await
}

pub async fn leave_month_overview(
    ctx: &Context,
    assertion: &str,
    year: i32,
    month: u32,
) -> Result<Value> {
    check_month(month)?;
    let (token, _) = ctx.authenticate(assertion).await?;
    ctx.leaves().month_overview(&token, year, month).await
}

pub async fn list_my_leaves(
    ctx: &Context,
    assertion: &str,
    year: i32,
    month: u32,
) -> Result<Value> {
    check_month(month)?;
    let (token, _) = ctx.authenticate(assertion).await?;
    ctx.leaves().list_mine(&token, year, month).await
}

pub async fn list_team_leaves(ctx: &Context, assertion: &str) -> Result<Value> {
    let (token, _) = ctx.authenticate(assertion).await?;
    ctx.leaves().list_team(&token).await
}

pub async fn list_leave_encashments(ctx: &Context, assertion: &str) -> Result<Value> {
    let (token, _) = ctx.authenticate(assertion).await?;
    ctx.leaves().list_encashments(&token).await
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplyLeaveArgs {
    pub leave_type: i64,
    pub start_date: String,
    pub end_date: String,
    pub reason: String,
    #[serde(default)]
    pub half_day: bool,
    #[serde(default)]
    pub half_day_period: Option<String>,
}

pub async fn apply_leave(ctx: &Context, assertion: &str, args: &ApplyLeaveArgs) -> Result<Value> {
    let start_date = parse_date("start_date", &args.start_date)?;
    let end_date = parse_date("end_date", &args.end_date)?;
    if start_date > end_date {
        return Err(Error::InvalidArgument(
            "start_date must not be after end_date".into(),
        ));
    }
    if (end_date - start_date).num_days() + 1 > MAX_LEAVE_SPAN_DAYS {
        return Err(Error::InvalidArgument(format!(
            "leave range exceeds the {MAX_LEAVE_SPAN_DAYS}-day maximum"
        )));
    }
    if args.reason.trim().is_empty() {
        return Err(Error::InvalidArgument("reason must not be empty".into()));
    }
    if args.reason.chars().count() > MAX_LEAVE_REASON_LEN {
        return Err(Error::InvalidArgument(format!(
            "reason exceeds the {MAX_LEAVE_REASON_LEN}-character maximum"
        )));
    }

    let (token, email) = ctx.authenticate(assertion).await?;
    ctx.rate
        .admit(&email, WriteDomain::Leaves, ctx.config.rate_ceiling_leaves)?;

    let request = ApplyLeave {
        leave_type: args.leave_type,
        start_date,
        end_date,
        reason: &args.reason,
        half_day: args.half_day,
        half_day_period: args.half_day_period.as_deref(),
    };
    let result = ctx.leaves().apply(&token, &request).await?;
    tracing::info!(
        target: "audit",
        tool = "apply_leave",
        user = %email,
        leave_type = args.leave_type,
        start_date = %start_date,
        end_date = %end_date,
        "leave applied"
    );
    Ok(result)
}

pub async fn cancel_leave(ctx: &Context, assertion: &str, leave_id: i64) -> Result<Value> {
    let (token, email) = ctx.authenticate(assertion).await?;
    ctx.rate
        .admit(&email, WriteDomain::Leaves, ctx.config.rate_ceiling_leaves)?;

    let result = ctx.leaves().cancel(&token, leave_id).await?;
    tracing::info!(
        target: "audit",
        tool = "cancel_leave",
        user = %email,
        leave_id,
        "leave cancelled"
    );
    Ok(result)
}

pub async fn encash_leave(
    ctx: &Context,
    assertion: &str,
    leave_type: i64,
    days: i64,
) -> Result<Value> {
    if !(1..=MAX_ENCASH_DAYS).contains(&days) {
        return Err(Error::InvalidArgument(format!(
            "days must be between 1 and {MAX_ENCASH_DAYS}"
        )));
    }
    let (token, email) = ctx.authenticate(assertion).await?;
    ctx.rate
        .admit(&email, WriteDomain::Leaves, ctx.config.rate_ceiling_leaves)?;

    let result = ctx.leaves().create_encashment(&token, leave_type, days).await?;
    tracing::info!(
        target: "audit",
        tool = "encash_leave",
        user = %email,
        leave_type,
        days,
        "leave encashment requested"
    );
    Ok(result)
}
