//! Common test utilities: an in-process mock of the ERP backend.
//!
//! Tests spawn a real HTTP server on a loopback port so the whole gateway
//! stack, transport included, is exercised. Handlers record what the
//! gateway sent so tests can assert on call counts and PATCH bodies.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use timecard_gateway::{Config, Context};

#[derive(Default)]
pub struct ErpState {
    pub exchange_calls: u32,
    pub exchange_delay_ms: u64,
    pub exchange_email: String,
    pub exchange_token: String,
    pub projects: Value,
    pub labels: Value,
    /// Year-list entries, `{"week_starting": ..., "id": ...}`.
    pub week_index: Vec<Value>,
    /// Full containers by id.
    pub week_logs: HashMap<i64, Value>,
    /// `(week_log_id, body)` for every PATCH to the save endpoint.
    pub saved: Vec<(i64, Value)>,
    /// `(week_log_id, body)` for every PATCH to the complete endpoint.
    pub completed: Vec<(i64, Value)>,
    /// Bodies posted to the bulk-create endpoint.
    pub slack_calls: Vec<Value>,
    /// Forced `(status, body)` response for the bulk-create endpoint.
    pub slack_response: Option<(u16, Value)>,
    pub month_logs: Value,
    pub next_id: i64,
    pub leave_summary: Value,
    /// When false the fiscal-summary endpoint fails with a 500.
    pub fiscal_ok: bool,
    pub leaves_applied: Vec<Value>,
    pub leaves_cancelled: Vec<i64>,
    pub encashments: Vec<Value>,
}

pub type SharedState = Arc<Mutex<ErpState>>;

pub fn default_state() -> SharedState {
    Arc::new(Mutex::new(ErpState {
        exchange_email: "dev@example.com".to_string(),
        exchange_token: "session-token-12345".to_string(),
        projects: json!([
            {"id": 7, "team": "Workstream"},
            {"id": 8, "team": "Platform"},
        ]),
        labels: json!([
            {"id": 66, "name": "General"},
            {"id": 67, "name": "Deep Work"},
        ]),
        month_logs: json!([]),
        next_id: 100,
        leave_summary: json!({"casual": 10, "sick": 7}),
        fiscal_ok: true,
        ..ErpState::default()
    }))
}

/// A full week container the way the backend serves one.
pub fn week_container(id: i64, monday: &str, projects: Value) -> Value {
    json!({
        "id": id,
        "week_starting": monday,
        "modified_at": "2026-01-01T00:00:00Z",
        "is_completed": false,
        "projects": projects,
    })
}

/// Register a container under its Monday so the year list finds it.
pub fn seed_week(state: &SharedState, id: i64, monday: &str, projects: Value) {
    let mut s = state.lock().unwrap();
    s.week_index.push(json!({"week_starting": monday, "id": id}));
    s.week_logs.insert(id, week_container(id, monday, projects));
}

/// Spawn the mock backend, returning its base URL.
pub async fn spawn(state: SharedState) -> String {
    let app = Router::new()
        .route("/core/google-login/", post(exchange))
        .route("/project-logs/person/active_project_list/", get(projects))
        .route("/project-logs/log_labels/", get(labels))
        .route("/project-logs/person/list/", get(year_list))
        .route("/project-logs/person/get/:id/", get(get_week))
        .route(
            "/project-logs/person/person-week-log/save/:id/",
            patch(save_week),
        )
        .route(
            "/project-logs/person/person-week-log/complete/:id/",
            patch(complete_week),
        )
        .route(
            "/project-logs/person/person-week-log-from-slack/",
            post(slack_create),
        )
        .route("/project-logs/person/month-list/", get(month_list))
        .route("/leaves/choices/get/", get(leave_choices))
        .route("/leaves/leave_summary/get/", get(leave_summary))
        .route("/leaves/individual_fiscal_summary/", get(fiscal_summary))
        .route("/leaves/person/month_leaves/", get(empty_list))
        .route("/leaves/holiday_records/", get(empty_list))
        .route("/leaves/list/", get(empty_list))
        .route("/leaves/team_leaves/list/", get(empty_list))
        .route(
            "/leaves/person-leave-encashments/",
            get(empty_list).post(create_encashment),
        )
        .route("/leaves/request/apply/", post(apply_leave))
        .route("/leaves/delete_leave/:id/", post(cancel_leave))
        .route("/redirect/", get(redirect))
        .route("/error/", get(server_error))
        .route("/garbage/", get(garbage))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server");
    });
    format!("http://{addr}")
}

/// A gateway context pointed at the mock backend.
pub fn test_context(base_url: &str) -> Context {
    let config = Config {
        base_url: base_url.to_string(),
        allowed_domain: "example.com".to_string(),
        connect_timeout_secs: 2,
        request_timeout_secs: 5,
        ..Config::default()
    };
    Context::new(config).expect("test context")
}

async fn exchange(State(state): State<SharedState>, Json(body): Json<Value>) -> Response {
    let (delay, token, email) = {
        let mut s = state.lock().unwrap();
        s.exchange_calls += 1;
        (s.exchange_delay_ms, s.exchange_token.clone(), s.exchange_email.clone())
    };
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if body.get("access_token").and_then(Value::as_str).unwrap_or("").is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "missing access_token"})))
            .into_response();
    }
    Json(json!({"token": token, "email": email})).into_response()
}

async fn projects(State(state): State<SharedState>) -> Json<Value> {
    Json(state.lock().unwrap().projects.clone())
}

async fn labels(State(state): State<SharedState>) -> Json<Value> {
    Json(state.lock().unwrap().labels.clone())
}

async fn year_list(State(state): State<SharedState>) -> Json<Value> {
    Json(Value::Array(state.lock().unwrap().week_index.clone()))
}

async fn get_week(State(state): State<SharedState>, Path(id): Path<i64>) -> Response {
    match state.lock().unwrap().week_logs.get(&id) {
        Some(log) => Json(log.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "week log not found"})))
            .into_response(),
    }
}

async fn save_week(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut s = state.lock().unwrap();
    if !s.week_logs.contains_key(&id) {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "week log not found"})))
            .into_response();
    }
    s.week_logs.insert(id, body.clone());
    s.saved.push((id, body));
    Json(json!({"status": "success"})).into_response()
}

async fn complete_week(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut s = state.lock().unwrap();
    if !s.week_logs.contains_key(&id) {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "week log not found"})))
            .into_response();
    }
    s.completed.push((id, body));
    Json(json!({"status": "success"})).into_response()
}

async fn slack_create(State(state): State<SharedState>, Json(body): Json<Value>) -> Response {
    let mut s = state.lock().unwrap();
    s.slack_calls.push(body.clone());
    if let Some((status, response)) = &s.slack_response {
        let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST);
        return (status, Json(response.clone())).into_response();
    }

    // Mint an empty container for the week of the first posted log, the way
    // the real backend does.
    if let Some(date) = body
        .pointer("/logs/0/date")
        .and_then(Value::as_str)
        .and_then(|d| chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    {
        let monday = timecard_core::week::monday_of(date).format("%Y-%m-%d").to_string();
        let id = s.next_id;
        s.next_id += 1;
        s.week_index.push(json!({"week_starting": monday, "id": id}));
        s.week_logs.insert(id, week_container(id, &monday, json!([])));
    }
    Json(json!({"status": "success"})).into_response()
}

async fn month_list(State(state): State<SharedState>) -> Json<Value> {
    Json(state.lock().unwrap().month_logs.clone())
}

async fn leave_choices() -> Json<Value> {
    Json(json!({"leave_types": [{"id": 1, "name": "Casual"}], "approver": "lead@example.com"}))
}

async fn leave_summary(State(state): State<SharedState>) -> Json<Value> {
    Json(state.lock().unwrap().leave_summary.clone())
}

async fn fiscal_summary(State(state): State<SharedState>) -> Response {
    if state.lock().unwrap().fiscal_ok {
        Json(json!({"fiscal_year": 2026, "taken": 3})).into_response()
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "fiscal summary unavailable"})),
        )
            .into_response()
    }
}

async fn empty_list() -> Json<Value> {
    Json(json!([]))
}

async fn apply_leave(State(state): State<SharedState>, Json(body): Json<Value>) -> Json<Value> {
    state.lock().unwrap().leaves_applied.push(body);
    Json(json!({"status": "success", "id": 1}))
}

async fn cancel_leave(State(state): State<SharedState>, Path(id): Path<i64>) -> Json<Value> {
    state.lock().unwrap().leaves_cancelled.push(id);
    Json(json!({"status": "success"}))
}

async fn create_encashment(
    State(state): State<SharedState>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.lock().unwrap().encashments.push(body);
    Json(json!({"status": "success"}))
}

async fn redirect() -> Response {
    (StatusCode::FOUND, [("location", "/elsewhere/")]).into_response()
}

async fn server_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"detail": "upstream exploded"})),
    )
        .into_response()
}

async fn garbage() -> Response {
    (StatusCode::OK, "this is not json").into_response()
}
