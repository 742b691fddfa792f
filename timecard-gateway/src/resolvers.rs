//! Project and label resolution.
//!
//! Tool callers hand us human-readable names; the backend wants ids. Both
//! resolvers share the ranking rules in `timecard_core::resolve`: exact
//! match wins, a single substring hit resolves, several hits are an error
//! that lists the candidates rather than picking one.

use reqwest::Method;
use serde_json::Value;
use timecard_core::resolve::{rank_by_name, NameMatch};
use timecard_core::week::value_as_i64;
use timecard_core::{Error, Result};

use crate::executor::ApiClient;

pub(crate) const ACTIVE_PROJECTS_PATH: &str = "project-logs/person/active_project_list/";
pub(crate) const LOG_LABELS_PATH: &str = "project-logs/log_labels/";

/// Resolve a project reference to its id. Exactly one of `id` and `name`
/// must be given.
pub async fn resolve_project(
    api: &ApiClient,
    token: &str,
    id: Option<i64>,
    name: Option<&str>,
) -> Result<i64> {
    match (id, name) {
        (Some(_), Some(_)) => Err(Error::InvalidArgument(
            "give either project_id or project_name, not both".into(),
        )),
        (None, None) => Err(Error::InvalidArgument(
            "a project_id or project_name is required".into(),
        )),
        (Some(id), None) => Ok(id),
        (None, Some(name)) => {
            let data = api
                .execute(Method::GET, ACTIVE_PROJECTS_PATH, token, None, None)
                .await?;
            let candidates = name_candidates(&data, "team");
            finish("project", name, rank_by_name(&candidates, name))
        }
    }
}

/// Resolve a label reference to its id. With neither id nor name the
/// configured default applies; with both the call is rejected.
pub async fn resolve_label(
    api: &ApiClient,
    token: &str,
    id: Option<i64>,
    name: Option<&str>,
    default_label_id: i64,
) -> Result<i64> {
    match (id, name) {
        (Some(_), Some(_)) => Err(Error::InvalidArgument(
            "give either label_id or label_name, not both".into(),
        )),
        (None, None) => Ok(default_label_id),
        (Some(id), None) => Ok(id),
        (None, Some(name)) => {
            let data = api
                .execute(Method::GET, LOG_LABELS_PATH, token, None, None)
                .await?;
            let candidates = name_candidates(&data, "name");
            finish("label", name, rank_by_name(&candidates, name))
        }
    }
}

fn finish(kind: &str, query: &str, ranked: NameMatch) -> Result<i64> {
    match ranked {
        NameMatch::Exact(id) | NameMatch::Substring(id) => Ok(id),
        NameMatch::Ambiguous(candidates) => Err(Error::Ambiguous {
            name: query.to_string(),
            candidates,
        }),
        NameMatch::NotFound(available) => Err(Error::NotFound(format!(
            "no {kind} matching \"{query}\"; available: {available:?}"
        ))),
    }
}

/// Collect `(id, name)` pairs from a list response, tolerating ids encoded
/// as strings and skipping entries missing either field.
pub(crate) fn name_candidates(data: &Value, name_field: &str) -> Vec<(i64, String)> {
    let items = match data {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("results").and_then(Value::as_array) {
            Some(items) => items.as_slice(),
            None => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    items
        .iter()
        .filter_map(|item| {
            let id = item.get("id").and_then(value_as_i64)?;
            let name = item.get(name_field).and_then(Value::as_str)?;
            if name.trim().is_empty() {
                return None;
            }
            Some((id, name.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn candidates_tolerate_string_ids_and_skip_incomplete_rows() {
        let data = json!([
            {"id": 1, "team": "Platform"},
            {"id": "2", "team": "Workstream"},
            {"id": 3},
            {"team": "Orphan"},
            {"id": 4, "team": "  "},
        ]);
        let pairs = name_candidates(&data, "team");
        assert_eq!(
            pairs,
            vec![(1, "Platform".to_string()), (2, "Workstream".to_string())]
        );
    }

    #[test]
    fn candidates_unwrap_results_envelope() {
        let data = json!({"results": [{"id": 66, "name": "General"}]});
        assert_eq!(
            name_candidates(&data, "name"),
            vec![(66, "General".to_string())]
        );
        assert!(name_candidates(&json!("nope"), "name").is_empty());
    }
}
