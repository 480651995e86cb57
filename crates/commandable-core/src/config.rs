//! Flat configuration map with dotted keys.
//!
//! Keys look like `connection.port` or `options.retries`. Values are kept as
//! strings and converted on read. A TOML document can be loaded directly;
//! nested tables flatten into dotted keys.

use crate::ApplicationError;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigParams {
    values: BTreeMap<String, String>,
}

impl ConfigParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(key, value)` pairs.
    pub fn from_tuples<I, K, V>(tuples: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        let values = tuples
            .into_iter()
            .map(|(k, v)| (k.into(), v.to_string()))
            .collect();
        Self { values }
    }

    /// Parse a TOML document into a flat map.
    pub fn from_toml_str(content: &str) -> Result<Self, ApplicationError> {
        let table: toml::Table = content.parse().map_err(|e| {
            ApplicationError::config(None, "BAD_CONFIG", "Failed to parse TOML configuration")
                .with_cause(e)
        })?;
        let mut config = Self::new();
        flatten("", &toml::Value::Table(table), &mut config.values);
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ApplicationError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ApplicationError::config(
                None,
                "CANNOT_READ_CONFIG",
                "Failed to read configuration file",
            )
            .with_details("path", path.display().to_string())
            .with_cause(e)
        })?;
        Self::from_toml_str(&content)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) {
        self.values.insert(key.into(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Non-empty string value.
    pub fn get_as_nullable_string(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.is_empty()).map(str::to_string)
    }

    pub fn get_as_string_or(&self, key: &str, default: &str) -> String {
        self.get_as_nullable_string(key)
            .unwrap_or_else(|| default.to_string())
    }

    pub fn get_as_nullable_integer(&self, key: &str) -> Option<i64> {
        let value = self.get(key)?.trim();
        value
            .parse::<i64>()
            .ok()
            .or_else(|| value.parse::<f64>().ok().map(|f| f as i64))
    }

    pub fn get_as_integer_or(&self, key: &str, default: i64) -> i64 {
        self.get_as_nullable_integer(key).unwrap_or(default)
    }

    pub fn get_as_nullable_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)?.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" | "t" => Some(true),
            "false" | "0" | "no" | "n" | "f" => Some(false),
            _ => None,
        }
    }

    pub fn get_as_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_as_nullable_bool(key).unwrap_or(default)
    }

    /// Keys under `name.` with the prefix stripped.
    pub fn section(&self, name: &str) -> ConfigParams {
        let prefix = format!("{name}.");
        let values = self
            .values
            .iter()
            .filter_map(|(k, v)| k.strip_prefix(&prefix).map(|rest| (rest.to_string(), v.clone())))
            .collect();
        Self { values }
    }

    /// First segments of all dotted keys, in key order and without duplicates.
    pub fn section_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for key in self.values.keys() {
            if let Some((head, _)) = key.split_once('.')
                && !names.iter().any(|n| n == head)
            {
                names.push(head.to_string());
            }
        }
        names
    }

    /// A copy where `defaults` fill in every key this map does not set.
    pub fn set_defaults(&self, defaults: &ConfigParams) -> ConfigParams {
        let mut values = defaults.values.clone();
        values.extend(self.values.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self { values }
    }
}

fn flatten(prefix: &str, value: &toml::Value, out: &mut BTreeMap<String, String>) {
    let key_for = |k: &str| {
        if prefix.is_empty() {
            k.to_string()
        } else {
            format!("{prefix}.{k}")
        }
    };
    match value {
        toml::Value::Table(table) => {
            for (k, v) in table {
                flatten(&key_for(k), v, out);
            }
        }
        toml::Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                flatten(&key_for(&i.to_string()), v, out);
            }
        }
        toml::Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        other => {
            out.insert(prefix.to_string(), other.to_string());
        }
    }
}
