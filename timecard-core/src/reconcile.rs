//! In-memory reconciliation of a week container.
//!
//! The backend has no upsert primitive, so the gateway fetches the full
//! container, merges the mutation into the nested project/task/day tree
//! here, and patches the whole container back. These functions operate on a
//! freshly fetched copy, never a cached one.

use serde_json::Map;

use crate::duration::HoursMinutes;
use crate::week::{DayEntry, ProjectEntry, TaskEntry, WeekLog};
use crate::{Error, Result};

/// Discovery state for a single write, decided by reads rather than
/// assumptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekState {
    /// No container exists for the target Monday.
    NoContainer,
    /// The container exists but holds no task matching the description.
    ContainerWithoutTask,
    /// The container holds a matching task.
    ContainerWithTask,
}

/// What an upsert did to the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Replaced the values of an existing day entry.
    UpdatedDay,
    /// Appended a day entry to an existing task.
    AddedDay,
    /// Appended a whole new task.
    AddedTask,
}

impl UpsertOutcome {
    /// The discovery state this outcome implies for the target container.
    pub fn discovered_state(self) -> WeekState {
        match self {
            UpsertOutcome::UpdatedDay | UpsertOutcome::AddedDay => WeekState::ContainerWithTask,
            UpsertOutcome::AddedTask => WeekState::ContainerWithoutTask,
        }
    }
}

/// What a delete did to the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Removed the target day, leaving other days on the task.
    RemovedDay,
    /// Removed the task entirely (the target day was its last).
    RemovedTask,
}

/// Find the container's project entry matching `team_name`: exact match on
/// team or subteam first, then substring against the combined
/// `"team / subteam"` form.
pub fn find_project_index(week: &WeekLog, team_name: &str) -> Option<usize> {
    let needle = team_name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    let mut combined_hit = None;
    for (i, project) in week.projects.iter().enumerate() {
        let team = project.team.as_deref().unwrap_or("").trim().to_lowercase();
        let subteam = project.subteam.as_deref().unwrap_or("").trim().to_lowercase();
        if team == needle || subteam == needle {
            return Some(i);
        }
        if combined_hit.is_none() && format!("{team} / {subteam}").contains(&needle) {
            combined_hit = Some(i);
        }
    }
    combined_hit
}

fn task_matches(task: &TaskEntry, description: &str) -> bool {
    task.description.trim().to_lowercase() == description.trim().to_lowercase()
}

fn new_day(date: &str, duration: HoursMinutes, label: i64) -> DayEntry {
    DayEntry {
        date: date.to_string(),
        hours: i64::from(duration.hours),
        minutes: i64::from(duration.minutes),
        decimal_hours: duration.decimal(),
        label: Some(label),
        extra: Map::new(),
    }
}

/// Merge one day entry into a project: update the day on a
/// case-insensitively matching task, append a day to it, or append a whole
/// new task. Idempotent for identical inputs.
pub fn upsert_day(
    project: &mut ProjectEntry,
    date: &str,
    description: &str,
    duration: HoursMinutes,
    label: i64,
) -> UpsertOutcome {
    if let Some(task) = project.tasks.iter_mut().find(|t| task_matches(t, description)) {
        if let Some(day) = task.days.iter_mut().find(|d| d.date == date) {
            day.hours = i64::from(duration.hours);
            day.minutes = i64::from(duration.minutes);
            day.decimal_hours = duration.decimal();
            day.label = Some(label);
            UpsertOutcome::UpdatedDay
        } else {
            task.days.push(new_day(date, duration, label));
            UpsertOutcome::AddedDay
        }
    } else {
        project.tasks.push(TaskEntry {
            id: None,
            description: description.to_string(),
            days: vec![new_day(date, duration, label)],
            extra: Map::new(),
        });
        UpsertOutcome::AddedTask
    }
}

/// Remove one day entry from the task matching `description`. When the
/// target day was the task's last, the task goes with it.
pub fn delete_day(
    project: &mut ProjectEntry,
    date: &str,
    description: &str,
) -> Result<DeleteOutcome> {
    let Some(index) = project.tasks.iter().position(|t| task_matches(t, description)) else {
        let tried: Vec<String> = project
            .tasks
            .iter()
            .map(|t| t.description.chars().take(50).collect())
            .collect();
        return Err(Error::NotFound(format!(
            "no task matching \"{}\" in that project; tasks present: {tried:?}",
            clip(description)
        )));
    };

    let task = &mut project.tasks[index];
    let before = task.days.len();
    task.days.retain(|d| d.date != date);
    if task.days.len() == before {
        return Err(Error::NotFound(format!(
            "task \"{}\" has no entry on {date}",
            clip(description)
        )));
    }

    if task.days.is_empty() {
        project.tasks.remove(index);
        Ok(DeleteOutcome::RemovedTask)
    } else {
        Ok(DeleteOutcome::RemovedDay)
    }
}

fn clip(text: &str) -> String {
    text.chars().take(50).collect()
}
