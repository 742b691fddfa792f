//! Leave operations.
//!
//! Thin wrappers over the backend's leave endpoints. The two composite
//! reads fan out concurrently: a missing fiscal summary degrades to null
//! rather than failing the whole call, and a month overview only fails when
//! both of its halves do.

use chrono::NaiveDate;
use reqwest::Method;
use serde_json::{json, Value};
use timecard_core::Result;

use crate::executor::ApiClient;

const CHOICES_PATH: &str = "leaves/choices/get/";
const SUMMARY_PATH: &str = "leaves/leave_summary/get/";
const FISCAL_SUMMARY_PATH: &str = "leaves/individual_fiscal_summary/";
const MONTH_LEAVES_PATH: &str = "leaves/person/month_leaves/";
const HOLIDAYS_PATH: &str = "leaves/holiday_records/";
const LIST_MINE_PATH: &str = "leaves/list/";
const LIST_TEAM_PATH: &str = "leaves/team_leaves/list/";
const ENCASHMENTS_PATH: &str = "leaves/person-leave-encashments/";
const APPLY_PATH: &str = "leaves/request/apply/";

fn cancel_path(leave_id: i64) -> String {
    format!("leaves/delete_leave/{leave_id}/")
}

pub struct ApplyLeave<'a> {
    pub leave_type: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: &'a str,
    pub half_day: bool,
    pub half_day_period: Option<&'a str>,
}

pub struct LeavesClient<'a> {
    api: &'a ApiClient,
}

impl<'a> LeavesClient<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    /// Leave types and the caller's approver.
    pub async fn choices(&self, token: &str) -> Result<Value> {
        self.api
            .execute(Method::GET, CHOICES_PATH, token, None, None)
            .await
    }

    /// Leave balances plus the fiscal summary. Without a `fiscal_year` the
    /// backend reports the currently active fiscal year, so callers never
    /// need to look the year up first. The fiscal half is best-effort: when
    /// it fails the balances still come back, with `fiscal_summary` set to
    /// null.
    pub async fn summary(&self, token: &str, fiscal_year: Option<i32>) -> Result<Value> {
        let fiscal_params = fiscal_year.map(|y| [("year", y.to_string())]);
        let (summary, fiscal) = tokio::join!(
            self.api.execute(Method::GET, SUMMARY_PATH, token, None, None),
            self.api.execute(
                Method::GET,
                FISCAL_SUMMARY_PATH,
                token,
                fiscal_params.as_ref().map(|p| p.as_slice()),
                None,
            ),
        );
        let summary = summary?;
        Ok(json!({
            "summary": summary,
            "fiscal_summary": fiscal.unwrap_or(Value::Null),
        }))
    }

    /// Approved leaves and holidays for one month, fetched concurrently.
    /// Fails only when both halves fail.
    pub async fn month_overview(&self, token: &str, year: i32, month: u32) -> Result<Value> {
        let (leaves, holidays) = tokio::join!(
            self.month_leaves(token, year, month),
            self.holidays(token, year, month),
        );
        if let (Err(e), Err(_)) = (&leaves, &holidays) {
            tracing::warn!(year, month, error = %e, "both halves of month overview failed");
            return Err(leaves.unwrap_err());
        }
        Ok(json!({
            "year": year,
            "month": month,
            "leaves": leaves.unwrap_or(Value::Null),
            "holidays": holidays.unwrap_or(Value::Null),
        }))
    }

    pub async fn month_leaves(&self, token: &str, year: i32, month: u32) -> Result<Value> {
        let params = [("year", year.to_string()), ("month", month.to_string())];
        self.api
            .execute(Method::GET, MONTH_LEAVES_PATH, token, Some(&params), None)
            .await
    }

    pub async fn holidays(&self, token: &str, year: i32, month: u32) -> Result<Value> {
        let params = [("year", year.to_string()), ("month", month.to_string())];
        self.api
            .execute(Method::GET, HOLIDAYS_PATH, token, Some(&params), None)
            .await
    }

    /// The caller's own leaves for a month, every status included.
    pub async fn list_mine(&self, token: &str, year: i32, month: u32) -> Result<Value> {
        let params = [("year", year.to_string()), ("month", month.to_string())];
        self.api
            .execute(Method::GET, LIST_MINE_PATH, token, Some(&params), None)
            .await
    }

    /// Team members currently on leave.
    pub async fn list_team(&self, token: &str) -> Result<Value> {
        self.api
            .execute(Method::GET, LIST_TEAM_PATH, token, None, None)
            .await
    }

    pub async fn list_encashments(&self, token: &str) -> Result<Value> {
        self.api
            .execute(Method::GET, ENCASHMENTS_PATH, token, None, None)
            .await
    }

    pub async fn apply(&self, token: &str, request: &ApplyLeave<'_>) -> Result<Value> {
        let mut payload = json!({
            "leave_type": request.leave_type,
            "start_date": request.start_date.format("%Y-%m-%d").to_string(),
            "end_date": request.end_date.format("%Y-%m-%d").to_string(),
            "reason": request.reason,
            "half_day": request.half_day,
        });
        if let Some(period) = request.half_day_period {
            payload["half_day_period"] = json!(period);
        }
        self.api
            .execute(Method::POST, APPLY_PATH, token, None, Some(&payload))
            .await
    }

    /// Cancel a pending leave request.
    pub async fn cancel(&self, token: &str, leave_id: i64) -> Result<Value> {
        self.api
            .execute(Method::POST, &cancel_path(leave_id), token, None, None)
            .await
    }

    pub async fn create_encashment(
        &self,
        token: &str,
        leave_type: i64,
        days: i64,
    ) -> Result<Value> {
        let payload = json!({ "leave_type": leave_type, "days": days });
        self.api
            .execute(Method::POST, ENCASHMENTS_PATH, token, None, Some(&payload))
            .await
    }
}
