// Instant-query response body of the time-series backend

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// `{status, data: {resultType, result: [...]}}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub status: String,
    #[serde(default)]
    pub data: QueryData,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryData {
    #[serde(default)]
    pub result_type: String,
    #[serde(default)]
    pub result: Vec<ResultEntry>,
}

/// One series: its labels plus `[timestamp, "value"]`.
/// `value` stays untyped so one malformed series cannot fail the whole body.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultEntry {
    #[serde(default)]
    pub metric: HashMap<String, String>,
    #[serde(default)]
    pub value: Value,
}

/// Sample value as carried in element 1 of `value`.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue<'a> {
    Text(&'a str),
    Number(f64),
    Missing,
}

impl ResultEntry {
    pub fn label(&self, name: &str) -> Option<&str> {
        self.metric.get(name).map(String::as_str)
    }

    pub fn raw_value(&self) -> RawValue<'_> {
        match self.value.as_array().and_then(|pair| pair.get(1)) {
            Some(Value::String(s)) => RawValue::Text(s),
            Some(Value::Number(n)) => n.as_f64().map_or(RawValue::Missing, RawValue::Number),
            _ => RawValue::Missing,
        }
    }
}
