use core_types::{ScriptOutcome, User};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The `{code, data | message}` wrapper used by the stock and script services.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    /// The human-readable failure text, if the service sent one.
    pub fn failure_text(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .filter(|m| !m.trim().is_empty())
    }
}

/// List payloads come either as a bare array or wrapped as `{items: [...]}`.
///
/// Both shapes are accepted here and flattened by [`ListPayload::into_items`],
/// so callers only ever see a `Vec`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListPayload<T> {
    Items(Vec<T>),
    Paged {
        items: Vec<T>,
        #[serde(default)]
        total: Option<u64>,
    },
}

impl<T> ListPayload<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            ListPayload::Items(items) => items,
            ListPayload::Paged { items, .. } => items,
        }
    }
}

/// Body of a failed plain (non-envelope) response, e.g. `{"error": "..."}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn text(&self) -> Option<&str> {
        self.error.as_deref().or(self.message.as_deref())
    }
}

/// Response of the login call. The service may or may not echo the user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub data: Option<LoginData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginData {
    #[serde(default)]
    pub user: Option<User>,
}

impl LoginResponse {
    pub fn into_user(self) -> Option<User> {
        self.data.and_then(|d| d.user).or(self.user)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ResultRow {
    symbol: String,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ResultShape {
    Rows(Vec<ResultRow>),
    BySymbol(BTreeMap<String, ScriptOutcome>),
}

impl ResultShape {
    fn into_map(self) -> BTreeMap<String, ScriptOutcome> {
        match self {
            ResultShape::BySymbol(map) => map,
            ResultShape::Rows(rows) => rows
                .into_iter()
                .map(|row| (row.symbol, ScriptOutcome::from(Value::Object(row.rest))))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawExecution {
    Wrapped {
        #[serde(default)]
        column_name: Option<String>,
        results: ResultShape,
    },
    Bare(ResultShape),
}

/// Per-symbol outcomes of one script execution.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionResults {
    pub column_name: Option<String>,
    pub results: BTreeMap<String, ScriptOutcome>,
}

impl ExecutionResults {
    /// Normalizes the `data` field of an execute response.
    ///
    /// Accepted: `{column_name?, results: {...} | [...]}`, a bare
    /// `{symbol: outcome}` map, or a bare list of `{symbol, result | error}`.
    pub fn from_value(data: Value) -> Result<Self, serde_json::Error> {
        let raw: RawExecution = serde_json::from_value(data)?;
        Ok(match raw {
            RawExecution::Wrapped {
                column_name,
                results,
            } => ExecutionResults {
                column_name,
                results: results.into_map(),
            },
            RawExecution::Bare(results) => ExecutionResults {
                column_name: None,
                results: results.into_map(),
            },
        })
    }

    /// Symbols whose execution failed, with the reported error.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.results.iter().filter_map(|(symbol, outcome)| match outcome {
            ScriptOutcome::Failed { error } => Some((symbol.as_str(), error.as_str())),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_payload_accepts_both_shapes() {
        let bare: ListPayload<u32> = serde_json::from_value(json!([1, 2])).unwrap();
        let paged: ListPayload<u32> =
            serde_json::from_value(json!({"items": [3], "total": 1})).unwrap();
        assert_eq!(bare.into_items(), vec![1, 2]);
        assert_eq!(paged.into_items(), vec![3]);
    }

    #[test]
    fn execution_results_normalize_rows_and_maps() {
        let wrapped = ExecutionResults::from_value(json!({
            "column_name": "ratio",
            "results": [
                {"symbol": "600000", "result": 1.5},
                {"symbol": "000001", "error": "division by zero"}
            ]
        }))
        .unwrap();
        assert_eq!(wrapped.column_name.as_deref(), Some("ratio"));
        assert_eq!(wrapped.results["600000"], ScriptOutcome::Value(json!(1.5)));
        assert_eq!(
            wrapped.failures().collect::<Vec<_>>(),
            vec![("000001", "division by zero")]
        );

        let bare = ExecutionResults::from_value(json!({"600000": 2, "000001": null})).unwrap();
        assert_eq!(bare.column_name, None);
        assert_eq!(bare.results["000001"], ScriptOutcome::Missing);
    }

    #[test]
    fn login_user_prefers_nested_data() {
        let response: LoginResponse =
            serde_json::from_value(json!({"data": {"user": {"username": "admin"}}})).unwrap();
        assert_eq!(response.into_user().unwrap().username, "admin");
        let response: LoginResponse = serde_json::from_value(json!({"ok": true})).unwrap();
        assert!(response.into_user().is_none());
    }
}
