//! Data model capabilities.
//!
//! A [`DataModel`] describes one table: its name, its cumulative column map at
//! every schema version, its primary key, and how a row maps onto the entity.
//! Instances are short lived: one is created to describe a table's shape for a
//! migration, and one per fetched row when marshaling query results.
//!
//! ```ignore
//! #[derive(Default)]
//! struct Player { id: Option<i64>, name: String }
//!
//! impl DataModel for Player {
//!     fn table_name(&self) -> String { "players".into() }
//!
//!     fn column_map(&self, version: u32) -> ColumnMap {
//!         let mut map = ColumnMap::new();
//!         if version >= 1 {
//!             map.insert("id".into(), ColumnType::integer_primary_key_autoincrement());
//!             map.insert("name".into(), ColumnType::text().not_null());
//!         }
//!         map
//!     }
//!     // ...
//! }
//! ```

use super::types::ColumnMap;
use crate::error::UuSqlResult;
use crate::value::{Row, RowValues, SqlValue};

/// The contract every persistable entity satisfies.
pub trait DataModel: Send + Sync {
    /// Table name, stable across every version the model exists in.
    fn table_name(&self) -> String;

    /// Complete column set at `version`. Empty for versions before the model
    /// existed.
    fn column_map(&self, version: u32) -> ColumnMap;

    /// Explicit primary key, emitted as a `PRIMARY KEY(...)` table
    /// constraint. Compound keys are comma separated (`"team, number"`).
    ///
    /// Return `None` when the column map already declares an
    /// `INTEGER PRIMARY KEY AUTOINCREMENT` column.
    fn primary_key_column_name(&self) -> Option<String> {
        None
    }

    /// WHERE clause template identifying this instance's row, e.g. `id = ?`.
    fn primary_key_where_clause(&self) -> String;

    /// Arguments bound to [`DataModel::primary_key_where_clause`], in order.
    fn primary_key_where_args(&self) -> Vec<SqlValue>;

    /// Populate this instance from a fetched row.
    fn fill_from_row(&mut self, row: &Row) -> UuSqlResult<()>;

    /// Column values to write at `version`.
    fn to_row_values(&self, version: u32) -> RowValues;
}

/// A versioned database: which models exist at which schema version.
///
/// Passed explicitly to [`crate::engine::Database::open`]; there is no global
/// registry.
pub trait DatabaseDefinition: Send + Sync {
    fn database_name(&self) -> String;

    /// The version the running code expects.
    fn current_version(&self) -> u32;

    /// Cumulative snapshot of every model present at `version`.
    fn models(&self, version: u32) -> Vec<Box<dyn DataModel>>;
}

/// Split a comma separated primary key declaration into column names.
pub fn split_key_columns(key: &str) -> Vec<String> {
    key.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}
