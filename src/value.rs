//! Dynamic values and rows exchanged between data models and the database.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{UuSqlError, UuSqlResult};

/// A single SQLite value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short type name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer(_) => "INTEGER",
            Self::Real(_) => "REAL",
            Self::Text(_) => "TEXT",
            Self::Blob(_) => "BLOB",
        }
    }
}

/// Column name -> value, in the order the columns should be written.
pub type RowValues = IndexMap<String, SqlValue>;

/// A fetched row, addressed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: RowValues,
}

impl Row {
    pub fn new(values: RowValues) -> Self {
        Self { values }
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.values.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> RowValues {
        self.values
    }

    /// Integer value of a column. Missing columns and NULL both read as `None`.
    pub fn get_i64(&self, column: &str) -> UuSqlResult<Option<i64>> {
        match self.get(column) {
            None | Some(SqlValue::Null) => Ok(None),
            Some(SqlValue::Integer(v)) => Ok(Some(*v)),
            Some(other) => Err(mismatch(column, "INTEGER", other)),
        }
    }

    pub fn get_f64(&self, column: &str) -> UuSqlResult<Option<f64>> {
        match self.get(column) {
            None | Some(SqlValue::Null) => Ok(None),
            Some(SqlValue::Real(v)) => Ok(Some(*v)),
            Some(SqlValue::Integer(v)) => Ok(Some(*v as f64)),
            Some(other) => Err(mismatch(column, "REAL", other)),
        }
    }

    pub fn get_text(&self, column: &str) -> UuSqlResult<Option<String>> {
        match self.get(column) {
            None | Some(SqlValue::Null) => Ok(None),
            Some(SqlValue::Text(v)) => Ok(Some(v.clone())),
            Some(other) => Err(mismatch(column, "TEXT", other)),
        }
    }

    pub fn get_blob(&self, column: &str) -> UuSqlResult<Option<Vec<u8>>> {
        match self.get(column) {
            None | Some(SqlValue::Null) => Ok(None),
            Some(SqlValue::Blob(v)) => Ok(Some(v.clone())),
            Some(other) => Err(mismatch(column, "BLOB", other)),
        }
    }

    /// Booleans are stored as INTEGER 0/1.
    pub fn get_bool(&self, column: &str) -> UuSqlResult<Option<bool>> {
        Ok(self.get_i64(column)?.map(|v| v != 0))
    }
}

fn mismatch(column: &str, expected: &str, found: &SqlValue) -> UuSqlError {
    UuSqlError::invalid_value(
        column,
        format!("expected {}, found {}", expected, found.kind()),
    )
}

impl From<RowValues> for Row {
    fn from(values: RowValues) -> Self {
        Self::new(values)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Integer(v as i64)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Integer(v as i64)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Blob(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}
