//! Column Types
//!
//! Immutable SQLite column descriptors. Every modifier returns a fresh
//! `ColumnType`, so a shared base such as `ColumnType::text()` can be
//! specialised any number of times without the variants affecting each other.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::UuSqlError;

/// Storage class of a SQLite column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SqlAffinity {
    Integer,
    Text,
    Real,
    Blob,
}

impl SqlAffinity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Text => "TEXT",
            Self::Real => "REAL",
            Self::Blob => "BLOB",
        }
    }
}

impl fmt::Display for SqlAffinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single column's affinity, nullability, default and primary-key role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnType {
    pub affinity: SqlAffinity,
    pub primary_key_autoincrement: bool,
    pub not_null: bool,
    pub default_value: Option<String>,
}

/// Ordered column name -> type mapping. Iteration order is the order of every
/// generated statement.
pub type ColumnMap = IndexMap<String, ColumnType>;

impl ColumnType {
    pub const fn new(affinity: SqlAffinity) -> Self {
        Self {
            affinity,
            primary_key_autoincrement: false,
            not_null: false,
            default_value: None,
        }
    }

    pub const fn integer() -> Self {
        Self::new(SqlAffinity::Integer)
    }

    pub const fn text() -> Self {
        Self::new(SqlAffinity::Text)
    }

    pub const fn real() -> Self {
        Self::new(SqlAffinity::Real)
    }

    pub const fn blob() -> Self {
        Self::new(SqlAffinity::Blob)
    }

    /// `INTEGER PRIMARY KEY AUTOINCREMENT`
    pub const fn integer_primary_key_autoincrement() -> Self {
        Self {
            affinity: SqlAffinity::Integer,
            primary_key_autoincrement: true,
            not_null: false,
            default_value: None,
        }
    }

    /// Copy of this type with `NOT NULL` set.
    #[must_use]
    pub fn not_null(&self) -> Self {
        Self {
            not_null: true,
            ..self.clone()
        }
    }

    /// Copy of this type with a `DEFAULT` literal. The literal is emitted
    /// verbatim, so string defaults must carry their own quotes.
    #[must_use]
    pub fn with_default(&self, literal: impl Into<String>) -> Self {
        Self {
            default_value: Some(literal.into()),
            ..self.clone()
        }
    }

    /// True when the default is evaluated per row: `CURRENT_TIME`,
    /// `CURRENT_DATE`, `CURRENT_TIMESTAMP` or a parenthesized expression.
    pub fn has_non_constant_default(&self) -> bool {
        self.default_value.as_deref().is_some_and(|default| {
            let default = default.trim();
            default.starts_with('(')
                || ["CURRENT_TIME", "CURRENT_DATE", "CURRENT_TIMESTAMP"]
                    .iter()
                    .any(|kw| default.eq_ignore_ascii_case(kw))
        })
    }

    /// Render the column type as it appears after the column name.
    pub fn to_sql(&self) -> String {
        let mut sql = String::from(self.affinity.as_str());
        if self.primary_key_autoincrement {
            sql.push_str(" PRIMARY KEY AUTOINCREMENT");
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default_value {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        sql
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// Parse a declaration such as `TEXT NOT NULL DEFAULT 'x'`.
impl std::str::FromStr for ColumnType {
    type Err = UuSqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        super::parser::parse_column_type(s)
    }
}
