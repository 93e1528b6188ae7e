use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{error::SyncError, model::InternshipPhase};

/// Normalized identity of a set of filter/search params. Two param values
/// that mean the same query produce the same key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterKey(String);

impl FilterKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Field names whose string values compare case-insensitively.
const CASE_INSENSITIVE_FIELDS: &[&str] = &["search", "q", "query"];

/// Deterministic key for `params`:
/// - object keys sorted
/// - strings trimmed; search text lowercased
/// - nulls, empty strings, empty arrays and empty objects dropped
pub fn filter_key<P: Serialize + ?Sized>(params: &P) -> Result<FilterKey, SyncError> {
    let value = serde_json::to_value(params).map_err(|e| SyncError::InvalidFilter(e.to_string()))?;
    let mut out = String::new();
    if let Some(v) = normalize(value, false) {
        write_canonical(&v, &mut out);
    }
    // An all-empty filter still gets a non-empty key so a loaded collection
    // is distinguishable from a pristine one.
    if out.is_empty() {
        out.push_str("{}");
    }
    Ok(FilterKey(out))
}

fn normalize(value: Value, fold_case: bool) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                None
            } else if fold_case {
                Some(Value::String(t.to_lowercase()))
            } else {
                Some(Value::String(t.to_string()))
            }
        }
        Value::Array(items) => {
            let items: Vec<Value> = items.into_iter().filter_map(|v| normalize(v, fold_case)).collect();
            (!items.is_empty()).then_some(Value::Array(items))
        }
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                let fold = CASE_INSENSITIVE_FIELDS.contains(&k.as_str());
                if let Some(v) = normalize(v, fold) {
                    out.insert(k, v);
                }
            }
            (!out.is_empty()).then_some(Value::Object(out))
        }
        other => Some(other),
    }
}

// Written by hand so key order does not depend on serde_json's map feature.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, k) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(k.clone()).to_string());
                out.push(':');
                write_canonical(&map[k], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, v) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(v, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Params for the institute-wide student listing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub batch: Option<String>,
    #[serde(default)]
    pub phase: Option<InternshipPhase>,
    #[serde(default)]
    pub sort: Option<String>,
}

impl StudentQuery {
    pub fn search(text: impl Into<String>) -> Self {
        Self { search: Some(text.into()), ..Default::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equivalent_queries_share_a_key() {
        let a = StudentQuery { search: Some("  Asha ".into()), department: Some("CSE".into()), ..Default::default() };
        let b = StudentQuery { search: Some("asha".into()), department: Some("CSE".into()), batch: Some("".into()), ..Default::default() };
        assert_eq!(filter_key(&a).unwrap(), filter_key(&b).unwrap());
    }

    #[test]
    fn test_department_is_case_sensitive_search_is_not() {
        let a = StudentQuery { department: Some("CSE".into()), ..Default::default() };
        let b = StudentQuery { department: Some("cse".into()), ..Default::default() };
        assert_ne!(filter_key(&a).unwrap(), filter_key(&b).unwrap());
    }

    #[test]
    fn test_empty_query_has_non_empty_key() {
        let k = filter_key(&StudentQuery::default()).unwrap();
        assert_eq!(k.as_str(), "{}");
        assert!(!k.is_empty());
    }

    #[test]
    fn test_keys_are_sorted() {
        let k = filter_key(&serde_json::json!({"z": 1, "a": {"d": true, "b": "x"}})).unwrap();
        assert_eq!(k.as_str(), r#"{"a":{"b":"x","d":true},"z":1}"#);
    }
}
