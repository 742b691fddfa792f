//! Week-container read and reconciliation operations.
//!
//! Every write follows the same discipline: discover the current state of
//! the target week by reading it, merge the mutation in memory
//! (`timecard_core::reconcile`), and send the whole container back. When no
//! container exists yet, creation goes through the backend's bulk-create
//! endpoint instead, since only the backend can mint containers.

use chrono::{Datelike, NaiveDate};
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};
use timecard_core::duration::HoursMinutes;
use timecard_core::reconcile::{self, DeleteOutcome, UpsertOutcome, WeekState};
use timecard_core::week::{
    extract_day, extract_log_list, find_week_log_id, monday_of, parse_week_starting,
    unwrap_person_week_logs, value_as_i64, ProjectEntry, WeekLog,
};
use timecard_core::{Error, Result};

use crate::executor::ApiClient;
use crate::resolvers::{ACTIVE_PROJECTS_PATH, LOG_LABELS_PATH};

const YEAR_LIST_PATH: &str = "project-logs/person/list/";
const MONTH_LIST_PATH: &str = "project-logs/person/month-list/";
const SLACK_CREATE_PATH: &str = "project-logs/person/person-week-log-from-slack/";

fn get_path(id: i64) -> String {
    format!("project-logs/person/get/{id}/")
}

fn save_path(id: i64) -> String {
    format!("project-logs/person/person-week-log/save/{id}/")
}

fn complete_path(id: i64) -> String {
    format!("project-logs/person/person-week-log/complete/{id}/")
}

/// One logical day entry to merge into a week.
#[derive(Debug, Clone)]
pub struct EntrySpec<'a> {
    pub project_id: i64,
    pub date: NaiveDate,
    pub description: &'a str,
    pub duration: HoursMinutes,
    pub label_id: i64,
}

pub struct TimelogEngine<'a> {
    api: &'a ApiClient,
}

impl<'a> TimelogEngine<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self { api }
    }

    pub async fn active_projects(&self, token: &str) -> Result<Value> {
        self.api
            .execute(Method::GET, ACTIVE_PROJECTS_PATH, token, None, None)
            .await
    }

    pub async fn log_labels(&self, token: &str) -> Result<Value> {
        self.api
            .execute(Method::GET, LOG_LABELS_PATH, token, None, None)
            .await
    }

    async fn year_list(&self, token: &str, year: i32) -> Result<Value> {
        let params = [("year", year.to_string())];
        self.api
            .execute(Method::GET, YEAR_LIST_PATH, token, Some(&params), None)
            .await
    }

    /// The id of the week container whose Monday is `monday`, or `None` when
    /// no container exists yet. The backend encodes "none" both by omission
    /// and by an id of zero.
    pub async fn week_log_id(&self, token: &str, monday: NaiveDate) -> Result<Option<i64>> {
        let data = self.year_list(token, monday.year()).await?;
        let logs = Value::Array(unwrap_person_week_logs(&data));
        let target = monday.format("%Y-%m-%d").to_string();
        Ok(find_week_log_id(&logs, &target).filter(|id| *id != 0))
    }

    async fn fetch_container(&self, token: &str, id: i64) -> Result<WeekLog> {
        let data = self
            .api
            .execute(Method::GET, &get_path(id), token, None, None)
            .await?;
        let week: WeekLog = serde_json::from_value(data)
            .map_err(|e| Error::backend(format!("unexpected week container shape: {e}"), None))?;
        // A container missing its bookkeeping fields would be written back
        // truncated by the PATCH, so refuse to work on one.
        if !week.extra.contains_key("modified_at") {
            return Err(Error::backend(
                "ERP returned an incomplete week container",
                None,
            ));
        }
        Ok(week)
    }

    /// Full week view for the week containing `date`.
    pub async fn get_week_logs(&self, token: &str, date: NaiveDate) -> Result<Value> {
        let monday = monday_of(date);
        let week_starting = monday.format("%Y-%m-%d").to_string();
        match self.week_log_id(token, monday).await? {
            None => Ok(json!({
                "week_starting": week_starting,
                "week_log_id": Value::Null,
                "log": { "projects": [] },
            })),
            Some(id) => {
                let week = self.fetch_container(token, id).await?;
                Ok(json!({
                    "week_starting": week_starting,
                    "week_log_id": id,
                    "log": to_json(&week)?,
                }))
            }
        }
    }

    /// Single-day view, derived from the containing week.
    pub async fn get_day_logs(&self, token: &str, date: NaiveDate) -> Result<Value> {
        let monday = monday_of(date);
        let week_starting = monday.format("%Y-%m-%d").to_string();
        let target = date.format("%Y-%m-%d").to_string();
        let (week_log_id, week) = match self.week_log_id(token, monday).await? {
            None => (
                Value::Null,
                WeekLog {
                    id: None,
                    week_starting: Some(week_starting.clone()),
                    projects: Vec::new(),
                    extra: serde_json::Map::new(),
                },
            ),
            Some(id) => (json!(id), self.fetch_container(token, id).await?),
        };
        Ok(json!({
            "week_starting": week_starting,
            "week_log_id": week_log_id,
            "day": to_json(&extract_day(&week, &target))?,
        }))
    }

    /// Week summaries for one calendar month.
    pub async fn get_month_logs(&self, token: &str, year: i32, month: u32) -> Result<Value> {
        let params = [("year", year.to_string()), ("month", month.to_string())];
        let data = self
            .api
            .execute(Method::GET, MONTH_LIST_PATH, token, Some(&params), None)
            .await?;
        Ok(json!({
            "year": year,
            "month": month,
            "logs": extract_log_list(&data),
        }))
    }

    /// Week summaries overlapping `[start, end]`, gathered month by month.
    /// A failed month is skipped unless every month fails.
    pub async fn get_range_logs(
        &self,
        token: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Value> {
        if start > end {
            return Err(Error::InvalidArgument(
                "start_date must not be after end_date".into(),
            ));
        }

        let range_start = monday_of(start);
        let mut logs = Vec::new();
        let mut seen_ids = Vec::new();
        let mut months_failed = 0u32;
        let mut last_error = None;

        let mut cursor = (start.year(), start.month());
        let stop = (end.year(), end.month());
        loop {
            let (year, month) = cursor;
            let params = [("year", year.to_string()), ("month", month.to_string())];
            match self
                .api
                .execute(Method::GET, MONTH_LIST_PATH, token, Some(&params), None)
                .await
            {
                Ok(data) => {
                    for log in extract_log_list(&data) {
                        let Some(week_start) = log
                            .get("week_starting")
                            .and_then(Value::as_str)
                            .and_then(|ws| parse_week_starting(ws, year))
                        else {
                            continue;
                        };
                        let week_end = week_start + chrono::Duration::days(6);
                        if week_start > end || week_end < range_start {
                            continue;
                        }
                        let id = log.get("id").and_then(value_as_i64);
                        if let Some(id) = id {
                            if seen_ids.contains(&id) {
                                continue;
                            }
                            seen_ids.push(id);
                        }
                        logs.push(log);
                    }
                }
                Err(e) => {
                    tracing::warn!(year, month, error = %e, "month fetch failed during range read");
                    months_failed += 1;
                    last_error = Some(e);
                }
            }
            if cursor == stop {
                break;
            }
            cursor = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        }

        if logs.is_empty() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }
        Ok(json!({
            "start_date": start.format("%Y-%m-%d").to_string(),
            "end_date": end.format("%Y-%m-%d").to_string(),
            "weeks": logs,
            "months_failed": months_failed,
        }))
    }

    /// Merge one day entry into the caller's week, creating whatever level
    /// of the tree is missing. The target project must be in the caller's
    /// active list.
    pub async fn upsert_entry(&self, token: &str, entry: &EntrySpec<'_>) -> Result<Value> {
        let active = self.active_projects(token).await?;
        let Some(team) = find_active_project(&active, entry.project_id) else {
            return Err(Error::NotFound(format!(
                "project {} is not in your active project list",
                entry.project_id
            )));
        };

        let monday = monday_of(entry.date);
        match self.week_log_id(token, monday).await? {
            Some(id) => self.patch_upsert(token, id, &team, entry).await,
            None => self.create_via_bulk(token, &team, entry).await,
        }
    }

    async fn patch_upsert(
        &self,
        token: &str,
        week_log_id: i64,
        team: &str,
        entry: &EntrySpec<'_>,
    ) -> Result<Value> {
        let mut week = self.fetch_container(token, week_log_id).await?;
        let index = match reconcile::find_project_index(&week, team) {
            Some(index) => index,
            None => {
                week.projects
                    .push(ProjectEntry::for_team(entry.project_id, team));
                week.projects.len() - 1
            }
        };

        let date = entry.date.format("%Y-%m-%d").to_string();
        let outcome = reconcile::upsert_day(
            &mut week.projects[index],
            &date,
            entry.description,
            entry.duration,
            entry.label_id,
        );
        tracing::debug!(
            week_log_id,
            state = ?outcome.discovered_state(),
            outcome = ?outcome,
            "merged day entry into week container"
        );

        self.api
            .execute(
                Method::PATCH,
                &save_path(week_log_id),
                token,
                None,
                Some(&to_json(&week)?),
            )
            .await?;
        Ok(json!({
            "status": "ok",
            "week_log_id": week_log_id,
            "action": action_name(outcome),
            "date": date,
            "time_spent": entry.duration.time_spent(),
        }))
    }

    async fn create_via_bulk(
        &self,
        token: &str,
        team: &str,
        entry: &EntrySpec<'_>,
    ) -> Result<Value> {
        tracing::debug!(
            date = %entry.date,
            state = ?WeekState::NoContainer,
            "no week container yet, creating via bulk endpoint"
        );
        let body = json!({
            "logs": [{
                "date": entry.date.format("%Y-%m-%d").to_string(),
                "time_spent": entry.duration.time_spent(),
                "description": entry.description,
                "subteam": team,
                "label_id": entry.label_id,
            }]
        });
        match self
            .api
            .execute(Method::POST, SLACK_CREATE_PATH, token, None, Some(&body))
            .await
        {
            Ok(_) => Ok(json!({
                "status": "ok",
                "week_log_id": Value::Null,
                "action": "created_week",
                "date": entry.date.format("%Y-%m-%d").to_string(),
                "time_spent": entry.duration.time_spent(),
            })),
            Err(Error::Backend { message, .. })
                if message.to_lowercase().contains("not part of") =>
            {
                Err(Error::PrerequisiteMissing(format!(
                    "you are not yet part of project \"{team}\" in the ERP; \
                     ask a project lead to add you, then retry"
                )))
            }
            Err(e) => Err(e),
        }
    }

    /// Remove one day entry. Deletion never creates: a missing container,
    /// project, task, or day is reported, not papered over.
    pub async fn delete_entry(
        &self,
        token: &str,
        project_id: i64,
        date: NaiveDate,
        description: &str,
    ) -> Result<Value> {
        let monday = monday_of(date);
        let week_starting = monday.format("%Y-%m-%d").to_string();
        let Some(week_log_id) = self.week_log_id(token, monday).await? else {
            return Err(Error::NotFound(format!(
                "no week log exists for the week of {week_starting}; nothing to delete"
            )));
        };

        let active = self.active_projects(token).await?;
        let Some(team) = find_active_project(&active, project_id) else {
            return Err(Error::NotFound(format!(
                "project {project_id} is not in your active project list"
            )));
        };

        let mut week = self.fetch_container(token, week_log_id).await?;
        let Some(index) = reconcile::find_project_index(&week, &team) else {
            return Err(Error::NotFound(format!(
                "project \"{team}\" has no entries in the week of {week_starting}"
            )));
        };

        let target = date.format("%Y-%m-%d").to_string();
        let outcome = reconcile::delete_day(&mut week.projects[index], &target, description)?;
        if week.projects[index].tasks.is_empty() {
            week.projects.remove(index);
        }

        self.api
            .execute(
                Method::PATCH,
                &save_path(week_log_id),
                token,
                None,
                Some(&to_json(&week)?),
            )
            .await?;
        Ok(json!({
            "status": "ok",
            "week_log_id": week_log_id,
            "action": match outcome {
                DeleteOutcome::RemovedDay => "removed_day",
                DeleteOutcome::RemovedTask => "removed_task",
            },
            "date": target,
        }))
    }

    /// Mark the week containing `date` as complete (or save it as a draft).
    pub async fn complete_week(
        &self,
        token: &str,
        date: NaiveDate,
        save_draft: bool,
    ) -> Result<Value> {
        let monday = monday_of(date);
        let week_starting = monday.format("%Y-%m-%d").to_string();
        let Some(week_log_id) = self.week_log_id(token, monday).await? else {
            return Err(Error::NotFound(format!(
                "no week log exists for the week of {week_starting}; log time first"
            )));
        };
        self.api
            .execute(
                Method::PATCH,
                &complete_path(week_log_id),
                token,
                None,
                Some(&json!({ "save_draft": save_draft })),
            )
            .await?;
        Ok(json!({
            "status": "ok",
            "week_log_id": week_log_id,
            "week_starting": week_starting,
            "save_draft": save_draft,
        }))
    }

    /// Does the week containing `date` already carry entries for `project_id`?
    pub async fn check_week_project(
        &self,
        token: &str,
        date: NaiveDate,
        project_id: i64,
    ) -> Result<Value> {
        let monday = monday_of(date);
        let week_starting = monday.format("%Y-%m-%d").to_string();
        let Some(week_log_id) = self.week_log_id(token, monday).await? else {
            return Ok(json!({
                "week_starting": week_starting,
                "week_log_id": Value::Null,
                "project_present": false,
            }));
        };
        let week = self.fetch_container(token, week_log_id).await?;
        let present = week.projects.iter().any(|p| p.id == Some(project_id));
        Ok(json!({
            "week_starting": week_starting,
            "week_log_id": week_log_id,
            "project_present": present,
        }))
    }
}

fn action_name(outcome: UpsertOutcome) -> &'static str {
    match outcome {
        UpsertOutcome::UpdatedDay => "updated_day",
        UpsertOutcome::AddedDay => "added_day",
        UpsertOutcome::AddedTask => "added_task",
    }
}

/// Find `project_id` in the active-project response and return its team
/// name.
fn find_active_project(data: &Value, project_id: i64) -> Option<String> {
    let items = match data {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => map.get("results").and_then(Value::as_array)?.as_slice(),
        _ => return None,
    };
    items
        .iter()
        .find(|item| item.get("id").and_then(value_as_i64) == Some(project_id))
        .and_then(|item| item.get("team").and_then(Value::as_str))
        .map(str::to_string)
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| Error::backend(format!("failed to encode request body: {e}"), None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn active_project_lookup_matches_by_id() {
        let data = json!([
            {"id": 7, "team": "Workstream"},
            {"id": "8", "team": "Platform"},
        ]);
        assert_eq!(find_active_project(&data, 7).as_deref(), Some("Workstream"));
        assert_eq!(find_active_project(&data, 8).as_deref(), Some("Platform"));
        assert!(find_active_project(&data, 9).is_none());

        let envelope = json!({"results": [{"id": 7, "team": "Workstream"}]});
        assert_eq!(
            find_active_project(&envelope, 7).as_deref(),
            Some("Workstream")
        );
    }
}
