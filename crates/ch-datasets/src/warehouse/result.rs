//! Decoding of `JSONCompact` client output.

use serde::Deserialize;
use serde_json::Value;

/// Name and type of one result column.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Deserialize)]
struct JsonCompact {
    meta: Vec<ColumnMeta>,
    data: Vec<Vec<Value>>,
}

/// Decoded result set. A `None` cell is a SQL NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl QueryResult {
    /// Parse the body the client prints for `--format=JSONCompact`.
    pub fn from_json_compact(body: &str) -> serde_json::Result<Self> {
        let parsed: JsonCompact = serde_json::from_str(body)?;
        Ok(Self {
            columns: parsed.meta,
            rows: parsed
                .data
                .into_iter()
                .map(|row| row.into_iter().map(cell_text).collect())
                .collect(),
        })
    }

    /// Type of the first column.
    pub fn first_type(&self) -> Option<&str> {
        self.columns.first().map(|c| c.type_name.as_str())
    }

    /// First column of every row.
    pub fn first_column(&self) -> Vec<Option<String>> {
        self.rows
            .iter()
            .filter_map(|row| row.first().cloned())
            .collect()
    }

    /// First column of the first row, when it is not NULL.
    pub fn scalar(&self) -> Option<&str> {
        self.rows.first()?.first()?.as_deref()
    }
}

// 64-bit integers arrive quoted, smaller ones as JSON numbers.
fn cell_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
