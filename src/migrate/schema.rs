//! Declarative Schemas
//!
//! Describes tables without writing a [`DataModel`] impl per entity. A
//! [`Schema`] is a [`DatabaseDefinition`] whose models are [`Record`]s: rows
//! of a [`TableSchema`] holding dynamic values.
//!
//! ```
//! use uusql::migrate::{ColumnMap, ColumnType, Schema, TableSchema};
//!
//! let mut v1 = ColumnMap::new();
//! v1.insert("id".into(), ColumnType::integer_primary_key_autoincrement());
//! v1.insert("name".into(), ColumnType::text());
//!
//! let mut schema = Schema::new("league");
//! schema.add_table(TableSchema::new("players").version(1, v1));
//! assert_eq!(schema.latest_version(), 1);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use super::generator::{build_multi_column_where_clause, build_single_column_where_clause};
use super::model::{DataModel, DatabaseDefinition, split_key_columns};
use super::types::ColumnMap;
use crate::error::UuSqlResult;
use crate::value::{Row, RowValues, SqlValue};

/// A table and its column map at every version it exists in.
///
/// A version without an entry inherits nothing: the table is absent there.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub name: String,
    pub versions: BTreeMap<u32, ColumnMap>,
    pub primary_key: Option<String>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            versions: BTreeMap::new(),
            primary_key: None,
        }
    }

    /// Declare the complete column set at `version`.
    pub fn version(mut self, version: u32, columns: ColumnMap) -> Self {
        self.versions.insert(version, columns);
        self
    }

    /// Explicit (possibly compound, comma separated) primary key.
    pub fn primary_key(mut self, key: impl Into<String>) -> Self {
        self.primary_key = Some(key.into());
        self
    }

    pub fn exists_at(&self, version: u32) -> bool {
        self.versions.contains_key(&version)
    }

    pub fn columns_at(&self, version: u32) -> ColumnMap {
        self.versions.get(&version).cloned().unwrap_or_default()
    }

    /// Columns at the newest version this table is declared in.
    pub fn latest_columns(&self) -> ColumnMap {
        self.versions
            .last_key_value()
            .map(|(_, columns)| columns.clone())
            .unwrap_or_default()
    }

    /// Columns identifying a row: the explicit key, else the autoincrement
    /// column of the newest declaration.
    pub fn key_columns(&self) -> Vec<String> {
        if let Some(key) = &self.primary_key {
            return split_key_columns(key);
        }
        self.latest_columns()
            .iter()
            .filter(|(_, t)| t.primary_key_autoincrement)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// A row of a [`TableSchema`].
#[derive(Debug, Clone)]
pub struct Record {
    table: Arc<TableSchema>,
    values: RowValues,
}

impl Record {
    pub fn new(table: Arc<TableSchema>) -> Self {
        Self {
            table,
            values: RowValues::new(),
        }
    }

    pub fn table(&self) -> &TableSchema {
        &self.table
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> &mut Self {
        self.values.insert(column.into(), value.into());
        self
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.set(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.values.get(column)
    }

    pub fn values(&self) -> &RowValues {
        &self.values
    }
}

impl DataModel for Record {
    fn table_name(&self) -> String {
        self.table.name.clone()
    }

    fn column_map(&self, version: u32) -> ColumnMap {
        self.table.columns_at(version)
    }

    fn primary_key_column_name(&self) -> Option<String> {
        self.table.primary_key.clone()
    }

    fn primary_key_where_clause(&self) -> String {
        let keys = self.table.key_columns();
        match keys.as_slice() {
            [single] => build_single_column_where_clause(single),
            many => build_multi_column_where_clause(many),
        }
        .unwrap_or_default()
    }

    fn primary_key_where_args(&self) -> Vec<SqlValue> {
        self.table
            .key_columns()
            .iter()
            .map(|key| self.values.get(key).cloned().unwrap_or(SqlValue::Null))
            .collect()
    }

    fn fill_from_row(&mut self, row: &Row) -> UuSqlResult<()> {
        for column in row.columns() {
            if let Some(value) = row.get(column) {
                self.values.insert(column.to_string(), value.clone());
            }
        }
        Ok(())
    }

    fn to_row_values(&self, version: u32) -> RowValues {
        self.table
            .columns_at(version)
            .keys()
            .filter_map(|name| self.values.get(name).map(|v| (name.clone(), v.clone())))
            .collect()
    }
}

/// A named database made of declared tables.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub name: String,
    pub tables: Vec<Arc<TableSchema>>,
    current_version: Option<u32>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a table, replacing any earlier declaration with the same name.
    pub fn add_table(&mut self, table: TableSchema) {
        let table = Arc::new(table);
        match self.tables.iter_mut().find(|t| t.name == table.name) {
            Some(existing) => *existing = table,
            None => self.tables.push(table),
        }
    }

    pub fn table(&self, name: &str) -> Option<&Arc<TableSchema>> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Pin the target version instead of using the newest declared one.
    pub fn with_current_version(mut self, version: u32) -> Self {
        self.current_version = Some(version);
        self
    }

    /// Newest version any table is declared in, 0 for an empty schema.
    pub fn latest_version(&self) -> u32 {
        self.tables
            .iter()
            .filter_map(|t| t.versions.keys().next_back().copied())
            .max()
            .unwrap_or(0)
    }

    /// Every version declared by at least one table, ascending.
    pub fn versions(&self) -> Vec<u32> {
        let mut versions: Vec<u32> = self
            .tables
            .iter()
            .flat_map(|t| t.versions.keys().copied())
            .collect();
        versions.sort_unstable();
        versions.dedup();
        versions
    }

    /// Empty record for `table`, ready to be filled and inserted.
    pub fn record(&self, table: &str) -> Option<Record> {
        self.table(table).map(|t| Record::new(Arc::clone(t)))
    }
}

impl DatabaseDefinition for Schema {
    fn database_name(&self) -> String {
        self.name.clone()
    }

    fn current_version(&self) -> u32 {
        self.current_version.unwrap_or_else(|| self.latest_version())
    }

    fn models(&self, version: u32) -> Vec<Box<dyn DataModel>> {
        self.tables
            .iter()
            .filter(|t| t.exists_at(version))
            .map(|t| Box::new(Record::new(Arc::clone(t))) as Box<dyn DataModel>)
            .collect()
    }
}
