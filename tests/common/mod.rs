//! Typed models shared by the integration tests.

#![allow(dead_code)]

use uusql::prelude::*;

pub const FAKE_MODEL_TABLE: &str = "fake_model";
pub const FAKE_COMPOUND_TABLE: &str = "fake_compound_key_model";

/// Autoincrement key; gains `number` at version 2.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FakeModel {
    pub id: Option<i64>,
    pub name: String,
    pub team: String,
    pub number: Option<i64>,
}

impl FakeModel {
    pub fn new(name: &str, team: &str) -> Self {
        Self {
            name: name.to_string(),
            team: team.to_string(),
            ..Default::default()
        }
    }
}

impl DataModel for FakeModel {
    fn table_name(&self) -> String {
        FAKE_MODEL_TABLE.to_string()
    }

    fn column_map(&self, version: u32) -> ColumnMap {
        let mut map = ColumnMap::new();
        if version >= 1 {
            map.insert("id".into(), ColumnType::integer_primary_key_autoincrement());
            map.insert("name".into(), ColumnType::text());
            map.insert("team".into(), ColumnType::text());
        }
        if version >= 2 {
            map.insert("number".into(), ColumnType::integer());
        }
        map
    }

    fn primary_key_where_clause(&self) -> String {
        "id = ?".to_string()
    }

    fn primary_key_where_args(&self) -> Vec<SqlValue> {
        vec![self.id.into()]
    }

    fn fill_from_row(&mut self, row: &Row) -> UuSqlResult<()> {
        self.id = row.get_i64("id")?;
        self.name = row.get_text("name")?.unwrap_or_default();
        self.team = row.get_text("team")?.unwrap_or_default();
        self.number = row.get_i64("number")?;
        Ok(())
    }

    fn to_row_values(&self, version: u32) -> RowValues {
        let mut values = RowValues::new();
        values.insert("id".into(), self.id.into());
        values.insert("name".into(), self.name.clone().into());
        values.insert("team".into(), self.team.clone().into());
        if version >= 2 {
            values.insert("number".into(), self.number.into());
        }
        values
    }
}

/// Identified by `(team, number)` instead of a rowid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FakeCompoundKeyModel {
    pub team: String,
    pub number: i64,
    pub name: String,
}

impl FakeCompoundKeyModel {
    pub fn new(team: &str, number: i64, name: &str) -> Self {
        Self {
            team: team.to_string(),
            number,
            name: name.to_string(),
        }
    }
}

impl DataModel for FakeCompoundKeyModel {
    fn table_name(&self) -> String {
        FAKE_COMPOUND_TABLE.to_string()
    }

    fn column_map(&self, version: u32) -> ColumnMap {
        let mut map = ColumnMap::new();
        if version >= 1 {
            map.insert("team".into(), ColumnType::text().not_null());
            map.insert("number".into(), ColumnType::integer().not_null());
            map.insert("name".into(), ColumnType::text());
        }
        map
    }

    fn primary_key_column_name(&self) -> Option<String> {
        Some("team, number".to_string())
    }

    fn primary_key_where_clause(&self) -> String {
        "team = ? AND number = ?".to_string()
    }

    fn primary_key_where_args(&self) -> Vec<SqlValue> {
        vec![self.team.clone().into(), self.number.into()]
    }

    fn fill_from_row(&mut self, row: &Row) -> UuSqlResult<()> {
        self.team = row.get_text("team")?.unwrap_or_default();
        self.number = row.get_i64("number")?.unwrap_or_default();
        self.name = row.get_text("name")?.unwrap_or_default();
        Ok(())
    }

    fn to_row_values(&self, _version: u32) -> RowValues {
        let mut values = RowValues::new();
        values.insert("team".into(), self.team.clone().into());
        values.insert("number".into(), self.number.into());
        values.insert("name".into(), self.name.clone().into());
        values
    }
}

/// Both models, targeting `version`.
pub struct FakeDatabase {
    pub version: u32,
}

impl DatabaseDefinition for FakeDatabase {
    fn database_name(&self) -> String {
        "fake".to_string()
    }

    fn current_version(&self) -> u32 {
        self.version
    }

    fn models(&self, version: u32) -> Vec<Box<dyn DataModel>> {
        if version == 0 {
            return Vec::new();
        }
        vec![
            Box::new(FakeModel::default()),
            Box::new(FakeCompoundKeyModel::default()),
        ]
    }
}
