//! Name-resolution ranking shared by project and label lookups.
//!
//! An exact case-insensitive match always outranks a substring match; two or
//! more equally-ranked substring hits are an ambiguity, never an arbitrary
//! pick.

/// Outcome of ranking a query against candidate `(id, name)` pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMatch {
    /// Exact case-insensitive match on the full name.
    Exact(i64),
    /// Single substring match with no exact hit.
    Substring(i64),
    /// Multiple substring matches with no exact hit; carries their names.
    Ambiguous(Vec<String>),
    /// No match at all; carries the available names for the error message.
    NotFound(Vec<String>),
}

pub fn rank_by_name(candidates: &[(i64, String)], query: &str) -> NameMatch {
    let needle = query.trim().to_lowercase();

    for (id, name) in candidates {
        if name.trim().to_lowercase() == needle {
            return NameMatch::Exact(*id);
        }
    }

    let hits: Vec<&(i64, String)> = candidates
        .iter()
        .filter(|(_, name)| name.to_lowercase().contains(&needle))
        .collect();
    match hits.as_slice() {
        [] => NameMatch::NotFound(candidates.iter().map(|(_, n)| n.clone()).collect()),
        [single] => NameMatch::Substring(single.0),
        many => NameMatch::Ambiguous(many.iter().map(|(_, n)| n.clone()).collect()),
    }
}
