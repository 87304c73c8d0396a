use rust_decimal::Decimal;
use serde::de::{self, Deserializer, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a saved script.
///
/// The remote store is inconsistent about whether ids are JSON numbers or
/// strings (`1` vs `"1"`), and result maps always key by string. Both forms
/// deserialize into the same `ScriptId`, so lookups downstream are plain
/// equality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScriptId(String);

impl ScriptId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Header used for a script column whose script is not in the library.
    pub fn fallback_label(&self) -> String {
        format!("Script {}", self.0)
    }
}

impl fmt::Display for ScriptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScriptId {
    fn from(id: &str) -> Self {
        ScriptId::new(id)
    }
}

impl From<i64> for ScriptId {
    fn from(id: i64) -> Self {
        ScriptId(id.to_string())
    }
}

impl Serialize for ScriptId {
    // Numeric ids go back out as numbers, matching what the store handed us.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.parse::<i64>() {
            Ok(n) => serializer.serialize_i64(n),
            Err(_) => serializer.serialize_str(&self.0),
        }
    }
}

struct ScriptIdVisitor;

impl Visitor<'_> for ScriptIdVisitor {
    type Value = ScriptId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a script id as a string or an integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<ScriptId, E> {
        Ok(ScriptId::new(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<ScriptId, E> {
        Ok(ScriptId::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<ScriptId, E> {
        Ok(ScriptId(v.to_string()))
    }
}

impl<'de> Deserialize<'de> for ScriptId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ScriptIdVisitor)
    }
}

/// The outcome of one script for one stock, normalized from the wire.
///
/// The executor returns either a bare value or an object of the form
/// `{ "result": ..., "error": ... }`. Both shapes collapse into this enum on
/// ingress so nothing downstream has to inspect JSON shapes.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ScriptOutcome {
    Value(Value),
    Failed { error: String },
    #[default]
    Missing,
}

impl ScriptOutcome {
    pub fn value(&self) -> Option<&Value> {
        match self {
            ScriptOutcome::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl From<Value> for ScriptOutcome {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ScriptOutcome::Missing,
            Value::Object(mut fields) => match fields.remove("result") {
                Some(result) if !result.is_null() => ScriptOutcome::Value(result),
                _ => match fields.remove("error") {
                    Some(Value::Null) | None => ScriptOutcome::Missing,
                    Some(Value::String(error)) => ScriptOutcome::Failed { error },
                    Some(other) => ScriptOutcome::Failed {
                        error: other.to_string(),
                    },
                },
            },
            scalar => ScriptOutcome::Value(scalar),
        }
    }
}

impl<'de> Deserialize<'de> for ScriptOutcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(ScriptOutcome::from)
    }
}

impl Serialize for ScriptOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ScriptOutcome::Value(value) => value.serialize(serializer),
            ScriptOutcome::Failed { error } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", error)?;
                map.end()
            }
            ScriptOutcome::Missing => serializer.serialize_none(),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    deserializer
        .deserialize_any(ScriptIdVisitor)
        .map(|id| id.0)
}

/// One row of the stock list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub symbol: String,
    #[serde(default)]
    pub stock_name: Option<String>,
    #[serde(default)]
    pub close_price: Option<Decimal>,
    #[serde(default)]
    pub price_change_pct: Option<Decimal>,
    #[serde(default)]
    pub volume: Option<Decimal>,
    #[serde(default)]
    pub market_code: Option<String>,
    /// Only populated for the scripts requested with the list call.
    #[serde(default, deserialize_with = "null_as_default")]
    pub script_results: BTreeMap<ScriptId, ScriptOutcome>,
}

impl Stock {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            stock_name: None,
            close_price: None,
            price_change_pct: None,
            volume: None,
            market_code: None,
            script_results: BTreeMap::new(),
        }
    }

    pub fn script_outcome(&self, id: &ScriptId) -> Option<&ScriptOutcome> {
        self.script_results.get(id)
    }
}

/// A saved custom-calculation script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub id: ScriptId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub code: String,
}

impl Script {
    /// Column header for this script: name, then description, then the id.
    pub fn display_label(&self) -> String {
        non_blank(self.name.as_deref())
            .or_else(|| non_blank(self.description.as_deref()))
            .map(str::to_string)
            .unwrap_or_else(|| self.id.fallback_label())
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

/// Body for creating or updating a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptDraft {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub code: String,
}

/// Visibility of one base column, persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSetting {
    pub key: String,
    pub label: String,
    pub visible: bool,
}

/// A single close price from the history query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    #[serde(default)]
    pub trade_date: Option<String>,
    #[serde(default)]
    pub close_price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fund {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub code: String,
    pub name: String,
    #[serde(default, rename = "type", alias = "fund_type")]
    pub fund_type: Option<String>,
    #[serde(default, alias = "netValue")]
    pub net_value: Option<Decimal>,
    #[serde(default, alias = "dailyChange")]
    pub daily_change: Option<Decimal>,
    #[serde(default, alias = "yearReturn")]
    pub year_return: Option<Decimal>,
    #[serde(default, alias = "riskLevel")]
    pub risk_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    #[serde(alias = "fundId", deserialize_with = "string_or_number")]
    pub fund_id: String,
    #[serde(default, alias = "fundName")]
    pub fund_name: Option<String>,
    #[serde(default)]
    pub shares: Option<Decimal>,
    #[serde(default, alias = "avgCost")]
    pub avg_cost: Option<Decimal>,
    #[serde(default, alias = "currentValue")]
    pub current_value: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default, alias = "totalValue")]
    pub total_value: Option<Decimal>,
    #[serde(default, alias = "totalCost")]
    pub total_cost: Option<Decimal>,
    #[serde(default, alias = "totalReturn")]
    pub total_return: Option<Decimal>,
    #[serde(default, alias = "returnPercentage")]
    pub return_percentage: Option<Decimal>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub holdings: Vec<Holding>,
}

/// The signed-in user, as reported by the login call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn numeric_and_string_ids_are_equal() {
        let a: ScriptId = serde_json::from_value(json!(7)).unwrap();
        let b: ScriptId = serde_json::from_value(json!("7")).unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_value(&a).unwrap(), json!(7));
        assert_eq!(serde_json::to_value(ScriptId::new("abc")).unwrap(), json!("abc"));
    }

    #[test]
    fn outcomes_normalize_every_wire_shape() {
        assert_eq!(ScriptOutcome::from(json!(0.5)), ScriptOutcome::Value(json!(0.5)));
        assert_eq!(
            ScriptOutcome::from(json!({"result": "x"})),
            ScriptOutcome::Value(json!("x"))
        );
        assert_eq!(
            ScriptOutcome::from(json!({"error": "boom"})),
            ScriptOutcome::Failed { error: "boom".into() }
        );
        assert_eq!(
            ScriptOutcome::from(json!({"result": null, "error": null})),
            ScriptOutcome::Missing
        );
        assert_eq!(ScriptOutcome::from(json!(null)), ScriptOutcome::Missing);
    }

    #[test]
    fn stock_rows_tolerate_sparse_payloads() {
        let stock: Stock = serde_json::from_value(json!({
            "symbol": "600000",
            "stock_name": "浦发银行",
            "close_price": 10.25,
            "volume": "123456",
            "market_code": "SH",
            "script_results": {"1": 0.12345, "2": {"result": "x"}, "3": {"error": "boom"}}
        }))
        .unwrap();
        assert_eq!(stock.close_price, Some(dec!(10.25)));
        assert_eq!(stock.volume, Some(dec!(123456)));
        assert_eq!(stock.price_change_pct, None);
        assert_eq!(
            stock.script_outcome(&ScriptId::from(1)),
            Some(&ScriptOutcome::Value(json!(0.12345)))
        );
        assert!(matches!(
            stock.script_outcome(&ScriptId::from(3)),
            Some(ScriptOutcome::Failed { .. })
        ));

        let bare: Stock =
            serde_json::from_value(json!({"symbol": "1", "script_results": null})).unwrap();
        assert!(bare.script_results.is_empty());
    }

    #[test]
    fn script_label_falls_back_in_order() {
        let mut script = Script {
            id: ScriptId::from(4),
            name: Some("Momentum".into()),
            description: Some("26 day".into()),
            code: String::new(),
        };
        assert_eq!(script.display_label(), "Momentum");
        script.name = Some("  ".into());
        assert_eq!(script.display_label(), "26 day");
        script.description = None;
        assert_eq!(script.display_label(), "Script 4");
    }
}
