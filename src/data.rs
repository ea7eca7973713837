use anyhow::{anyhow, Result};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;

/// A single cell of a tabular record: either numeric or textual.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    /// Best-effort typing of a raw field: numeric-looking text becomes a
    /// number, everything else stays text.
    pub fn coerce(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Value::Number(n),
            _ => Value::Text(raw.to_string()),
        }
    }

    /// Numeric coercion: numbers pass through, text is parsed.
    /// Unparseable text yields NaN; callers decide the fallback.
    pub fn as_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Text(t) => t.trim().parse::<f64>().unwrap_or(f64::NAN),
        }
    }

    pub fn empty() -> Self {
        Value::Text(String::new())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Whole numbers print without a decimal point so exports
            // round-trip through the CSV decoder unchanged.
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(t) => write!(f, "{}", t),
        }
    }
}

/// An in-memory dataset: column names plus rows of values.
///
/// The schema is inferred once when the source is decoded (CSV header row,
/// first JSON object's keys, first worksheet row); every row is padded to
/// the schema width, so missing trailing fields read as empty text rather
/// than being an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, mut rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        for row in &mut rows {
            if row.len() < width {
                row.resize(width, Value::empty());
            } else {
                row.truncate(width);
            }
        }
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up a column by name (case-insensitive).
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .ok_or_else(|| anyhow!("Column '{}' not found", name))
    }

    /// Build a dataset from a JSON array of objects. Column order follows
    /// the first object's key order; keys missing from later objects read
    /// as empty text.
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        let array = value
            .as_array()
            .ok_or_else(|| anyhow!("Input data must be a JSON array of objects"))?;

        if array.is_empty() {
            return Err(anyhow!("Input data array is empty"));
        }

        let first_obj = array[0]
            .as_object()
            .ok_or_else(|| anyhow!("Items in array must be objects"))?;

        let columns: Vec<String> = first_obj.keys().cloned().collect();

        let mut rows = Vec::new();
        for item in array {
            let obj = item
                .as_object()
                .ok_or_else(|| anyhow!("Items in array must be objects"))?;

            let mut row = Vec::new();
            for column in &columns {
                let value = match obj.get(column) {
                    Some(JsonValue::String(s)) => Value::Text(s.clone()),
                    Some(JsonValue::Number(n)) => {
                        Value::Number(n.as_f64().unwrap_or(f64::NAN))
                    }
                    Some(JsonValue::Bool(b)) => Value::Text(b.to_string()),
                    Some(JsonValue::Null) | None => Value::empty(),
                    _ => return Err(anyhow!("Unsupported value type for field '{}'", column)),
                };
                row.push(value);
            }
            rows.push(row);
        }

        Ok(Self::new(columns, rows))
    }
}
