//! Input records and cell values.
//!
//! A [`Record`] is one input data row: column key → raw string, in the order
//! the fields were read. Rows coerce the raw strings into [`Value`]s when
//! they are built, following a [`Coercion`] policy.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::TexTableError;
use crate::Result;

/// A typed cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Numeric view of the value, `None` for text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(_) => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Value::Text(_))
    }

    /// Parse a raw field as a number.
    ///
    /// Finite integral numbers become `Int`, other finite numbers `Float`.
    /// Anything else stays text.
    pub fn coerce(raw: &str) -> Value {
        match raw.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => {
                if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    Value::Int(f as i64)
                } else {
                    Value::Float(f)
                }
            }
            _ => Value::Text(raw.to_string()),
        }
    }

    /// Total order used for sorting: numbers numerically, then text lexicographically.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Text(_), _) => Ordering::Greater,
            (_, Value::Text(_)) => Ordering::Less,
            (a, b) => {
                let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

/// One input data row as ordered key → raw string fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    fields: IndexMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from key/value pairs, rejecting repeated keys.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut record = Record::new();
        for (key, value) in pairs {
            record.insert(key, value)?;
        }
        Ok(record)
    }

    /// Add a field. Fails with `DuplicateAttribute` if the key is already present.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let key = key.into();
        if self.fields.contains_key(&key) {
            return Err(TexTableError::DuplicateAttribute { key });
        }
        self.fields.insert(key, value.into());
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(|s| s.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Field keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Policy for turning numeric-looking raw fields into numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coercion {
    /// Coerce numeric-looking fields at all
    pub enabled: bool,
    /// Columns that always stay text
    pub text_columns: HashSet<String>,
}

impl Default for Coercion {
    fn default() -> Self {
        Self {
            enabled: true,
            text_columns: HashSet::new(),
        }
    }
}

impl Coercion {
    /// Never coerce.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            text_columns: HashSet::new(),
        }
    }

    pub fn value(&self, column: &str, raw: &str) -> Value {
        if self.enabled && !self.text_columns.contains(column) {
            Value::coerce(raw)
        } else {
            Value::Text(raw.to_string())
        }
    }
}
