//! Whole-week reconciliation walkthrough on the public API.

use serde_json::json;
use timecard_core::reconcile::{
    delete_day, find_project_index, upsert_day, DeleteOutcome, UpsertOutcome,
};
use timecard_core::week::{monday_of, ProjectEntry, WeekLog};
use timecard_core::HoursMinutes;

fn fetch_week() -> WeekLog {
    serde_json::from_value(json!({
        "id": 9,
        "week_starting": "2026-01-26",
        "modified_at": "2026-01-27T09:00:00Z",
        "projects": [{
            "id": 7,
            "team": "Workstream",
            "tasks": [{
                "id": 100,
                "description": "testing",
                "days": [
                    {"date": "2026-01-26", "hours": 2, "minutes": 0, "decimal_hours": 2.0, "label": 66},
                ],
            }],
        }],
    }))
    .unwrap()
}

#[test]
fn a_week_of_edits_round_trips() {
    let mut week = fetch_week();

    // Tuesday: same task, new day.
    let index = find_project_index(&week, "Workstream").unwrap();
    let two = HoursMinutes::from_decimal(2.0).unwrap();
    let outcome = upsert_day(&mut week.projects[index], "2026-01-27", "Testing", two, 66);
    assert_eq!(outcome, UpsertOutcome::AddedDay);

    // Wednesday: a brand-new task.
    let outcome = upsert_day(&mut week.projects[index], "2026-01-28", "Code review", two, 67);
    assert_eq!(outcome, UpsertOutcome::AddedTask);

    // A second project joins the container mid-week.
    week.projects.push(ProjectEntry::for_team(8, "Platform"));
    let platform = find_project_index(&week, "Platform").unwrap();
    upsert_day(&mut week.projects[platform], "2026-01-28", "Incident triage", two, 66);

    // Thursday: correct Monday's entry in place.
    let half = HoursMinutes::from_decimal(3.5).unwrap();
    let outcome = upsert_day(&mut week.projects[index], "2026-01-26", "TESTING", half, 66);
    assert_eq!(outcome, UpsertOutcome::UpdatedDay);

    // Friday: drop the review task again.
    let outcome = delete_day(&mut week.projects[index], "2026-01-28", "code review").unwrap();
    assert_eq!(outcome, DeleteOutcome::RemovedTask);

    assert_eq!(week.projects.len(), 2);
    assert_eq!(week.projects[index].tasks.len(), 1);
    assert_eq!(week.projects[index].tasks[0].days.len(), 2);

    // Bookkeeping fields survive every edit.
    let back = serde_json::to_value(&week).unwrap();
    assert_eq!(back["modified_at"], "2026-01-27T09:00:00Z");
}

#[test]
fn every_date_addresses_one_monday() {
    let dates = [
        ("2026-01-26", "2026-01-26"),
        ("2026-01-28", "2026-01-26"),
        ("2026-02-01", "2026-01-26"),
        ("2026-02-02", "2026-02-02"),
    ];
    for (date, monday) in dates {
        let d = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        assert_eq!(monday_of(d).format("%Y-%m-%d").to_string(), monday);
    }
}
