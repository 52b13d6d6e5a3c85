//! Schema Diff
//!
//! Compares two cumulative model-set snapshots and produces the ordered SQL
//! that evolves a database from one schema version to the other.
//!
//! SQLite cannot drop or retype a column through `ALTER TABLE`, so any
//! removal or type change goes through rename, recreate, copy and drop of the
//! renamed table.

use std::collections::HashSet;

use tracing::debug;

use super::generator::{
    build_alter_add_column, build_create_statement, build_drop_table, build_rename_table,
    build_select_into_copy, build_select_into_copy_columns,
};
use super::model::{DataModel, DatabaseDefinition};
use super::types::{ColumnMap, ColumnType};
use crate::error::{UuSqlError, UuSqlResult};

/// A table present in both snapshots.
#[derive(Clone, Copy)]
pub struct MigratedModel<'a> {
    pub from: &'a dyn DataModel,
    pub to: &'a dyn DataModel,
}

/// Classification of two model sets by table name.
#[derive(Default)]
pub struct ModelSetAnalysis<'a> {
    pub added: Vec<&'a dyn DataModel>,
    pub deleted: Vec<&'a dyn DataModel>,
    pub migrated: Vec<MigratedModel<'a>>,
}

impl ModelSetAnalysis<'_> {
    pub fn added_tables(&self) -> Vec<String> {
        self.added.iter().map(|m| m.table_name()).collect()
    }

    pub fn deleted_tables(&self) -> Vec<String> {
        self.deleted.iter().map(|m| m.table_name()).collect()
    }

    pub fn migrated_tables(&self) -> Vec<String> {
        self.migrated.iter().map(|m| m.to.table_name()).collect()
    }
}

/// Classify models as added, deleted or migrated.
///
/// A table name present in both sets is always migrated, whether or not its
/// columns changed. Each group keeps the order of the list it came from.
pub fn analyze_model_sets<'a>(
    from: &'a [Box<dyn DataModel>],
    to: &'a [Box<dyn DataModel>],
) -> ModelSetAnalysis<'a> {
    let from_names: HashSet<String> = from.iter().map(|m| m.table_name()).collect();
    let to_names: HashSet<String> = to.iter().map(|m| m.table_name()).collect();

    let mut analysis = ModelSetAnalysis::default();

    for model in to {
        let name = model.table_name();
        if from_names.contains(&name) {
            if let Some(old) = from.iter().find(|m| m.table_name() == name) {
                analysis.migrated.push(MigratedModel {
                    from: old.as_ref(),
                    to: model.as_ref(),
                });
            }
        } else {
            analysis.added.push(model.as_ref());
        }
    }

    for model in from {
        if !to_names.contains(&model.table_name()) {
            analysis.deleted.push(model.as_ref());
        }
    }

    analysis
}

/// Append the statements migrating `model` forward from `from_version` to
/// `to_version`.
pub fn append_upgrade_statements(
    model: &dyn DataModel,
    from_version: u32,
    to_version: u32,
    statements: &mut Vec<String>,
) -> UuSqlResult<()> {
    if from_version >= to_version {
        return Err(UuSqlError::InvalidArgument(format!(
            "upgrade requires from < to, got {} -> {}",
            from_version, to_version
        )));
    }
    append_column_migration(model, from_version, to_version, statements)
}

/// Append the statements migrating `model` back from `from_version` to the
/// older `to_version`.
pub fn append_downgrade_statements(
    model: &dyn DataModel,
    from_version: u32,
    to_version: u32,
    statements: &mut Vec<String>,
) -> UuSqlResult<()> {
    if from_version <= to_version {
        return Err(UuSqlError::InvalidArgument(format!(
            "downgrade requires from > to, got {} -> {}",
            from_version, to_version
        )));
    }
    append_column_migration(model, from_version, to_version, statements)
}

/// Columns of `model` at `version`, rejecting declarations that cannot
/// produce a table.
pub fn schema_columns(model: &dyn DataModel, version: u32) -> UuSqlResult<ColumnMap> {
    let table = model.table_name();
    if table.trim().is_empty() {
        return Err(UuSqlError::InvalidSchema("table name is empty".into()));
    }
    let columns = model.column_map(version);
    if columns.is_empty() {
        return Err(UuSqlError::InvalidSchema(format!(
            "table '{}' has no columns at version {}",
            table, version
        )));
    }
    if let Some(name) = columns.keys().find(|name| name.trim().is_empty()) {
        return Err(UuSqlError::InvalidSchema(format!(
            "table '{}' declares an unnamed column '{}' at version {}",
            table, name, version
        )));
    }
    Ok(columns)
}

/// `CREATE TABLE` for `model` as declared at `version`.
pub fn create_statement(model: &dyn DataModel, version: u32) -> UuSqlResult<String> {
    let columns = schema_columns(model, version)?;
    let key = model.primary_key_column_name();
    build_create_statement(&model.table_name(), &columns, key.as_deref())
        .map_err(|e| invalid_schema(&model.table_name(), e))
}

fn invalid_schema(table: &str, err: UuSqlError) -> UuSqlError {
    match err {
        UuSqlError::InvalidArgument(msg) => {
            UuSqlError::InvalidSchema(format!("table '{}': {}", table, msg))
        }
        other => other,
    }
}

/// SQLite only adds nullable-or-defaulted, non-key columns in place, and
/// only when the default is a constant.
fn can_add_in_place(column_type: &ColumnType) -> bool {
    !column_type.primary_key_autoincrement
        && !(column_type.not_null && column_type.default_value.is_none())
        && !column_type.has_non_constant_default()
}

fn append_column_migration(
    model: &dyn DataModel,
    from_version: u32,
    to_version: u32,
    statements: &mut Vec<String>,
) -> UuSqlResult<()> {
    let table = model.table_name();
    let old_columns = schema_columns(model, from_version)?;
    let new_columns = schema_columns(model, to_version)?;

    let removed: Vec<&str> = old_columns
        .keys()
        .filter(|name| !new_columns.contains_key(*name))
        .map(String::as_str)
        .collect();
    let retyped: Vec<&str> = old_columns
        .iter()
        .filter(|(name, old_type)| new_columns.get(*name).is_some_and(|t| t != *old_type))
        .map(|(name, _)| name.as_str())
        .collect();
    let added: Vec<(&String, &ColumnType)> = new_columns
        .iter()
        .filter(|(name, _)| !old_columns.contains_key(*name))
        .collect();

    let in_place = removed.is_empty()
        && retyped.is_empty()
        && added.iter().all(|(_, t)| can_add_in_place(t));

    if in_place {
        for (name, column_type) in added {
            debug!(table = %table, column = %name, "adding column");
            statements.push(build_alter_add_column(&table, name, column_type)?);
        }
        return Ok(());
    }

    debug!(
        table = %table,
        removed = ?removed,
        retyped = ?retyped,
        "recreating table"
    );

    let temp_table = format!("{}_old_{}", table, from_version);
    statements.push(build_rename_table(&table, &temp_table)?);

    let key = model.primary_key_column_name();
    statements.push(
        build_create_statement(&table, &new_columns, key.as_deref())
            .map_err(|e| invalid_schema(&table, e))?,
    );

    let shared: Vec<&str> = new_columns
        .keys()
        .filter(|name| old_columns.contains_key(*name))
        .map(String::as_str)
        .collect();
    if shared.len() == new_columns.len() {
        statements.push(build_select_into_copy(&temp_table, &table, &shared)?);
    } else if !shared.is_empty() {
        statements.push(build_select_into_copy_columns(&temp_table, &table, &shared)?);
    }

    statements.push(build_drop_table(&temp_table)?);
    Ok(())
}

/// CREATE statements for every model of `definition` at `version`.
pub fn plan_creation(definition: &dyn DatabaseDefinition, version: u32) -> UuSqlResult<Vec<String>> {
    definition
        .models(version)
        .iter()
        .map(|model| create_statement(model.as_ref(), version))
        .collect()
}

/// Ordered statements moving a database from `from_version` to `to_version`.
///
/// Version 0 denotes an empty database. Emission order: creates of added
/// tables, column migrations of migrated tables (both in target order), then
/// drops of deleted tables (in source order).
pub fn plan_migration(
    definition: &dyn DatabaseDefinition,
    from_version: u32,
    to_version: u32,
) -> UuSqlResult<Vec<String>> {
    if from_version == to_version {
        return Ok(Vec::new());
    }
    if from_version == 0 {
        return plan_creation(definition, to_version);
    }

    let from_models = definition.models(from_version);
    let to_models = definition.models(to_version);
    let analysis = analyze_model_sets(&from_models, &to_models);

    debug!(
        from = from_version,
        to = to_version,
        added = ?analysis.added_tables(),
        deleted = ?analysis.deleted_tables(),
        migrated = ?analysis.migrated_tables(),
        "analyzed model sets"
    );

    let mut statements = Vec::new();

    for model in &analysis.added {
        statements.push(create_statement(*model, to_version)?);
    }

    for pair in &analysis.migrated {
        if from_version < to_version {
            append_upgrade_statements(pair.to, from_version, to_version, &mut statements)?;
        } else {
            append_downgrade_statements(pair.to, from_version, to_version, &mut statements)?;
        }
    }

    for model in &analysis.deleted {
        statements.push(build_drop_table(&model.table_name())?);
    }

    Ok(statements)
}
