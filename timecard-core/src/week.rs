//! Week-container data model and lookup helpers.
//!
//! The backend nests one week container per person per week: projects hold
//! tasks, tasks span days. Unknown backend fields are carried in `extra`
//! maps so a fetched container round-trips unchanged through a PATCH.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Depth cap for the recursive week-log-id search, guarding against
/// pathological API responses.
const MAX_SEARCH_DEPTH: u32 = 20;

/// One person-week container, addressed by its Monday.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekLog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_starting: Option<String>,
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subteam: Option<String>,
    #[serde(default)]
    pub tasks: Vec<TaskEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProjectEntry {
    /// A fresh entry for a project not yet present in the container.
    pub fn for_team(id: i64, team: &str) -> Self {
        Self {
            id: Some(id),
            team: Some(team.to_string()),
            subteam: None,
            tasks: Vec::new(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub days: Vec<DayEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayEntry {
    pub date: String,
    #[serde(default)]
    pub hours: i64,
    #[serde(default)]
    pub minutes: i64,
    #[serde(default)]
    pub decimal_hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Monday of the ISO week containing `d`. Every date maps to exactly one
/// Monday, which is how containers are addressed.
pub fn monday_of(d: NaiveDate) -> NaiveDate {
    d - Duration::days(i64::from(d.weekday().num_days_from_monday()))
}

/// Parse the backend's abbreviated date form (`"Mon, Jan 12"`) against a
/// known year. Returns `None` if the shape does not match.
pub fn parse_abbreviated_date(text: &str, year: i32) -> Option<NaiveDate> {
    let (_, rest) = text.split_once(", ")?;
    let mut parts = rest.split_whitespace();
    let month = match parts.next()? {
        "Jan" => 1,
        "Feb" => 2,
        "Mar" => 3,
        "Apr" => 4,
        "May" => 5,
        "Jun" => 6,
        "Jul" => 7,
        "Aug" => 8,
        "Sep" => 9,
        "Oct" => 10,
        "Nov" => 11,
        "Dec" => 12,
        _ => return None,
    };
    let day: u32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse a `week_starting` field, accepting ISO and abbreviated forms.
pub fn parse_week_starting(text: &str, year: i32) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_abbreviated_date(text, year))
}

/// Numeric id that may arrive as a JSON number or a string.
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Recursively search a list response for the week-log id whose
/// `week_starting` matches `target_week` (always an ISO Monday). The
/// backend sometimes reports the abbreviated `"Mon, Jan 12"` form instead.
pub fn find_week_log_id(data: &Value, target_week: &str) -> Option<i64> {
    search_week_id(data, target_week, 0)
}

fn search_week_id(data: &Value, target_week: &str, depth: u32) -> Option<i64> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }
    match data {
        Value::Object(map) => {
            if let Some(ws) = map.get("week_starting").and_then(Value::as_str) {
                if !ws.is_empty() && week_starting_matches(ws, target_week) {
                    if let Some(id) = map.get("id") {
                        return value_as_i64(id);
                    }
                }
            }
            map.values()
                .find_map(|v| search_week_id(v, target_week, depth + 1))
        }
        Value::Array(items) => items
            .iter()
            .find_map(|v| search_week_id(v, target_week, depth + 1)),
        _ => None,
    }
}

fn week_starting_matches(week_starting: &str, target_week: &str) -> bool {
    if week_starting == target_week {
        return true;
    }
    if !week_starting.contains(", ") || target_week.len() < 4 {
        return false;
    }
    let Ok(year) = target_week[..4].parse::<i32>() else {
        return false;
    };
    parse_abbreviated_date(week_starting, year)
        .is_some_and(|d| d.format("%Y-%m-%d").to_string() == target_week)
}

/// Normalise the person/list response into a flat list of week-log objects.
///
/// Handles three shapes: a plain array, the
/// `{"person_week_logs": [{"months_log": [...]}]}` envelope, and a
/// JSON-encoded string wrapping either of the above.
pub fn unwrap_person_week_logs(data: &Value) -> Vec<Value> {
    if let Value::String(s) = data {
        return match serde_json::from_str::<Value>(s) {
            Ok(inner) => unwrap_week_logs_inner(&inner),
            Err(_) => Vec::new(),
        };
    }
    unwrap_week_logs_inner(data)
}

fn unwrap_week_logs_inner(data: &Value) -> Vec<Value> {
    match data {
        Value::Array(items) => items.iter().filter(|v| v.is_object()).cloned().collect(),
        Value::Object(map) if map.contains_key("person_week_logs") => {
            let mut out = Vec::new();
            for month in map
                .get("person_week_logs")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
            {
                for item in month
                    .get("months_log")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                {
                    if item.is_object() {
                        out.push(item.clone());
                    }
                }
            }
            out
        }
        _ => Vec::new(),
    }
}

/// Pull the list of week logs out of a month-list response, whichever of the
/// backend's envelope keys it used.
pub fn extract_log_list(data: &Value) -> Vec<Value> {
    if let Value::Array(items) = data {
        return items.iter().filter(|v| v.is_object()).cloned().collect();
    }
    if let Value::Object(map) = data {
        for key in ["results", "data", "items", "logs", "month_logs"] {
            if let Some(Value::Array(items)) = map.get(key) {
                return items.iter().filter(|v| v.is_object()).cloned().collect();
            }
        }
    }
    Vec::new()
}

/// One task's contribution to a single day.
#[derive(Debug, Clone, Serialize)]
pub struct DayTask {
    pub id: Option<i64>,
    pub description: String,
    pub hours: i64,
    pub minutes: i64,
    pub decimal_hours: f64,
    pub label_id: Option<i64>,
}

/// One project's contribution to a single day.
#[derive(Debug, Clone, Serialize)]
pub struct DayProject {
    pub project_id: Option<i64>,
    pub project_name: String,
    pub team_name: String,
    pub tasks: Vec<DayTask>,
    pub total_hours: i64,
    pub total_minutes: i64,
    pub total_decimal_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TotalTime {
    pub hours: i64,
    pub minutes: i64,
    pub decimal_hours: f64,
}

/// A single day's view across the whole container.
#[derive(Debug, Clone, Serialize)]
pub struct DaySummary {
    pub date: String,
    pub projects: Vec<DayProject>,
    pub total_logged_time: TotalTime,
    pub total_projects: usize,
    pub total_tasks: usize,
}

/// Derive a single day's logs from a full week container, carrying minute
/// overflow into hours at each aggregation level.
pub fn extract_day(week: &WeekLog, target_date: &str) -> DaySummary {
    let mut projects_out = Vec::new();

    for project in &week.projects {
        let mut day_tasks = Vec::new();
        for task in &project.tasks {
            for day in &task.days {
                if day.date == target_date {
                    day_tasks.push(DayTask {
                        id: task.id,
                        description: task.description.clone(),
                        hours: day.hours,
                        minutes: day.minutes,
                        decimal_hours: day.decimal_hours,
                        label_id: day.label,
                    });
                }
            }
        }
        if day_tasks.is_empty() {
            continue;
        }

        let raw_hours: i64 = day_tasks.iter().map(|t| t.hours).sum();
        let raw_minutes: i64 = day_tasks.iter().map(|t| t.minutes).sum();
        let total_decimal_hours: f64 = day_tasks.iter().map(|t| t.decimal_hours).sum();
        projects_out.push(DayProject {
            project_id: project.id,
            project_name: project
                .subteam
                .clone()
                .filter(|s| !s.is_empty())
                .or_else(|| project.team.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            team_name: project.team.clone().unwrap_or_default(),
            tasks: day_tasks,
            total_hours: raw_hours + raw_minutes / 60,
            total_minutes: raw_minutes % 60,
            total_decimal_hours,
        });
    }

    let all_hours: i64 = projects_out
        .iter()
        .flat_map(|p| p.tasks.iter())
        .map(|t| t.hours)
        .sum();
    let all_minutes: i64 = projects_out
        .iter()
        .flat_map(|p| p.tasks.iter())
        .map(|t| t.minutes)
        .sum();
    let decimal: f64 = projects_out.iter().map(|p| p.total_decimal_hours).sum();

    DaySummary {
        date: target_date.to_string(),
        total_projects: projects_out.len(),
        total_tasks: projects_out.iter().map(|p| p.tasks.len()).sum(),
        total_logged_time: TotalTime {
            hours: all_hours + all_minutes / 60,
            minutes: all_minutes % 60,
            decimal_hours: (decimal * 100.0).round() / 100.0,
        },
        projects: projects_out,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn monday_floor() {
        let wed = NaiveDate::from_ymd_opt(2026, 1, 28).unwrap();
        assert_eq!(monday_of(wed), NaiveDate::from_ymd_opt(2026, 1, 26).unwrap());
        let mon = NaiveDate::from_ymd_opt(2026, 1, 26).unwrap();
        assert_eq!(monday_of(mon), mon);
        let sun = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        assert_eq!(monday_of(sun), NaiveDate::from_ymd_opt(2026, 1, 26).unwrap());
    }

    #[test]
    fn abbreviated_date_parsing() {
        assert_eq!(
            parse_abbreviated_date("Mon, Jan 12", 2026),
            NaiveDate::from_ymd_opt(2026, 1, 12)
        );
        assert_eq!(parse_abbreviated_date("Jan 12", 2026), None);
        assert_eq!(parse_abbreviated_date("Mon, Foo 12", 2026), None);
        assert_eq!(parse_abbreviated_date("Mon, Jan 12 extra", 2026), None);
    }

    #[test]
    fn finds_week_id_in_iso_and_abbreviated_forms() {
        let data = json!([
            {"week_starting": "2026-01-05", "id": 3},
            {"week_starting": "Mon, Jan 12", "id": 4},
        ]);
        assert_eq!(find_week_log_id(&data, "2026-01-05"), Some(3));
        assert_eq!(find_week_log_id(&data, "2026-01-12"), Some(4));
        assert_eq!(find_week_log_id(&data, "2026-01-19"), None);
    }

    #[test]
    fn finds_week_id_with_string_id_and_nesting() {
        let data = json!({
            "outer": [{"inner": {"week_starting": "2026-01-05", "id": "17"}}]
        });
        assert_eq!(find_week_log_id(&data, "2026-01-05"), Some(17));
    }

    #[test]
    fn unwraps_list_envelope_and_string() {
        let plain = json!([{"id": 1}, 42, {"id": 2}]);
        assert_eq!(unwrap_person_week_logs(&plain).len(), 2);

        let envelope = json!({
            "person_week_logs": [
                {"months_log": [{"id": 1}, {"id": 2}]},
                {"months_log": [{"id": 3}]},
            ]
        });
        assert_eq!(unwrap_person_week_logs(&envelope).len(), 3);

        let wrapped = Value::String(envelope.to_string());
        assert_eq!(unwrap_person_week_logs(&wrapped).len(), 3);

        let garbage = Value::String("not json".to_string());
        assert!(unwrap_person_week_logs(&garbage).is_empty());
    }

    #[test]
    fn week_log_round_trips_unknown_fields() {
        let raw = json!({
            "id": 9,
            "week_starting": "2026-01-05",
            "modified_at": "2026-01-07T10:00:00Z",
            "is_completed": false,
            "projects": [{
                "id": 7,
                "team": "Workstream",
                "person_team": 55,
                "tasks": [{
                    "id": 100,
                    "description": "Testing",
                    "order": 1,
                    "days": [{
                        "date": "2026-01-05",
                        "hours": 2,
                        "minutes": 30,
                        "decimal_hours": 2.5,
                        "label": 66,
                        "label_option": "General"
                    }]
                }]
            }]
        });
        let week: WeekLog = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(week.extra.get("modified_at").and_then(Value::as_str),
                   Some("2026-01-07T10:00:00Z"));
        let back = serde_json::to_value(&week).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn extracts_single_day_with_minute_carry() {
        let week = WeekLog {
            id: Some(9),
            week_starting: Some("2026-01-05".into()),
            projects: vec![ProjectEntry {
                id: Some(7),
                team: Some("Workstream".into()),
                subteam: None,
                tasks: vec![
                    TaskEntry {
                        id: Some(1),
                        description: "A".into(),
                        days: vec![DayEntry {
                            date: "2026-01-05".into(),
                            hours: 1,
                            minutes: 40,
                            decimal_hours: 1.67,
                            label: Some(66),
                            extra: Map::new(),
                        }],
                        extra: Map::new(),
                    },
                    TaskEntry {
                        id: Some(2),
                        description: "B".into(),
                        days: vec![DayEntry {
                            date: "2026-01-05".into(),
                            hours: 0,
                            minutes: 30,
                            decimal_hours: 0.5,
                            label: Some(66),
                            extra: Map::new(),
                        }],
                        extra: Map::new(),
                    },
                ],
                extra: Map::new(),
            }],
            extra: Map::new(),
        };
        let day = extract_day(&week, "2026-01-05");
        assert_eq!(day.total_tasks, 2);
        assert_eq!(day.total_logged_time.hours, 2);
        assert_eq!(day.total_logged_time.minutes, 10);
        assert_eq!(day.projects[0].project_name, "Workstream");

        let other = extract_day(&week, "2026-01-06");
        assert_eq!(other.total_projects, 0);
    }
}
