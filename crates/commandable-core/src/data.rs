//! Filter, paging and sort parameters for data queries.
//!
//! On the wire these travel as query values: `filter=key=abc;flag=true`,
//! `skip=0&take=100&total=true` and `sort=name=true;time=false`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Free-form `key=value` filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterParams(BTreeMap<String, String>);

impl FilterParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `k1=v1;k2=v2`. Entries without `=` map to an empty value.
    pub fn from_string(line: &str) -> Self {
        Self(parse_pairs(line).collect())
    }

    /// Filter from a JSON object; scalars are stringified.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self(
                map.iter()
                    .filter_map(|(k, v)| scalar_string(v).map(|s| (k.clone(), s)))
                    .collect(),
            ),
            Value::String(s) => Self::from_string(s),
            _ => Self::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl std::fmt::Display for FilterParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let line = self
            .0
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(";");
        f.write_str(&line)
    }
}

/// Skip/take paging with an optional total count request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take: Option<i64>,
    #[serde(default)]
    pub total: bool,
}

impl PagingParams {
    pub fn new(skip: Option<i64>, take: Option<i64>, total: bool) -> Self {
        Self { skip, take, total }
    }

    /// Paging from raw query values.
    pub fn from_strings(skip: Option<&str>, take: Option<&str>, total: Option<&str>) -> Self {
        Self {
            skip: skip.and_then(|s| s.trim().parse().ok()),
            take: take.and_then(|s| s.trim().parse().ok()),
            total: total.is_some_and(|s| s.trim().eq_ignore_ascii_case("true")),
        }
    }

    /// Paging from a JSON object; numeric strings are accepted.
    pub fn from_value(value: &Value) -> Self {
        let int = |key: &str| match value.get(key) {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };
        let total = match value.get("total") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        };
        Self {
            skip: int("skip"),
            take: int("take"),
            total,
        }
    }

    pub fn skip_or(&self, default: i64) -> i64 {
        self.skip.filter(|s| *s >= 0).unwrap_or(default)
    }

    /// `take`, defaulted and capped at `max`.
    pub fn take_or(&self, max: i64) -> i64 {
        self.take.filter(|t| *t >= 0).map_or(max, |t| t.min(max))
    }
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub name: String,
    pub ascending: bool,
}

/// Ordered list of sort keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortParams(Vec<SortField>);

impl SortParams {
    /// Parse `name=true;time=false`. A missing value means ascending.
    pub fn from_string(line: &str) -> Self {
        Self(
            parse_pairs(line)
                .map(|(name, asc)| SortField {
                    name,
                    ascending: !asc.eq_ignore_ascii_case("false"),
                })
                .collect(),
        )
    }

    pub fn fields(&self) -> &[SortField] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPage<T> {
    pub data: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
}

impl<T> DataPage<T> {
    pub fn new(data: Vec<T>, total: Option<i64>) -> Self {
        Self { data, total }
    }
}

fn parse_pairs(line: &str) -> impl Iterator<Item = (String, String)> + '_ {
    line.split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((k, v)) => (k.trim().to_string(), v.trim().to_string()),
            None => (part.to_string(), String::new()),
        })
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
