//! Field helpers shared by the provider normalizers.

use serde::Deserialize;

/// An external identifier that a provider may send as a JSON string or a
/// JSON number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ExternalId {
    Text(String),
    Number(serde_json::Number),
}

impl ExternalId {
    /// String form, `None` for blank strings.
    #[must_use]
    pub fn normalized(&self) -> Option<String> {
        match self {
            ExternalId::Text(s) => non_blank(Some(s.as_str())),
            ExternalId::Number(n) => Some(n.to_string()),
        }
    }
}

/// Trimmed value, `None` when absent or blank.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// First present id in priority order.
pub fn first_id(candidates: &[Option<&ExternalId>]) -> Option<String> {
    candidates
        .iter()
        .flatten()
        .find_map(|id| id.normalized())
}

/// Drop duplicates, keeping first occurrence order.
pub fn unique_ids(ids: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}
