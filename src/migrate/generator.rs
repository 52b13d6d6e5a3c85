//! SQL Generator
//!
//! Pure translation from column maps into SQLite statements. Nothing here
//! touches a connection; identifiers are emitted verbatim, so callers are
//! trusted to pass valid names.

use super::types::{ColumnMap, ColumnType};
use crate::error::{UuSqlError, UuSqlResult};
use crate::value::{RowValues, SqlValue};

/// A statement together with the values bound to its `?` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    pub args: Vec<SqlValue>,
}

fn require(value: &str, what: &str) -> UuSqlResult<()> {
    if value.trim().is_empty() {
        return Err(UuSqlError::InvalidArgument(format!("{} must not be empty", what)));
    }
    Ok(())
}

fn require_columns<S: AsRef<str>>(columns: &[S], what: &str) -> UuSqlResult<()> {
    if columns.is_empty() {
        return Err(UuSqlError::InvalidArgument(format!("{} must not be empty", what)));
    }
    for column in columns {
        require(column.as_ref(), "column name")?;
    }
    Ok(())
}

fn join<S: AsRef<str>>(columns: &[S]) -> String {
    columns
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(", ")
}

/// `CREATE TABLE <table> (<col> <type>, ...[, PRIMARY KEY(<key>)]);`
///
/// `explicit_primary_key` is only valid when no column declares itself as an
/// autoincrement primary key.
pub fn build_create_statement(
    table: &str,
    columns: &ColumnMap,
    explicit_primary_key: Option<&str>,
) -> UuSqlResult<String> {
    require(table, "table name")?;
    if columns.is_empty() {
        return Err(UuSqlError::InvalidArgument(format!(
            "column map for '{}' must not be empty",
            table
        )));
    }

    let mut defs = Vec::with_capacity(columns.len() + 1);
    for (name, column_type) in columns {
        require(name, "column name")?;
        defs.push(format!("{} {}", name, column_type.to_sql()));
    }

    if let Some(key) = explicit_primary_key {
        require(key, "primary key column")?;
        if let Some((name, _)) = columns.iter().find(|(_, t)| t.primary_key_autoincrement) {
            return Err(UuSqlError::InvalidArgument(format!(
                "table '{}' declares both PRIMARY KEY({}) and autoincrement column '{}'",
                table, key, name
            )));
        }
        defs.push(format!("PRIMARY KEY({})", key.trim()));
    }

    Ok(format!("CREATE TABLE {} ({});", table, defs.join(", ")))
}

/// `ALTER TABLE <table> ADD COLUMN <column> <type>;`
pub fn build_alter_add_column(
    table: &str,
    column: &str,
    column_type: &ColumnType,
) -> UuSqlResult<String> {
    require(table, "table name")?;
    require(column, "column name")?;
    Ok(format!(
        "ALTER TABLE {} ADD COLUMN {} {};",
        table,
        column,
        column_type.to_sql()
    ))
}

/// `ALTER TABLE <old> RENAME TO <new>;`
pub fn build_rename_table(old_name: &str, new_name: &str) -> UuSqlResult<String> {
    require(old_name, "table name")?;
    require(new_name, "new table name")?;
    Ok(format!("ALTER TABLE {} RENAME TO {};", old_name, new_name))
}

/// `INSERT INTO <dest> SELECT <cols> FROM <source>;`
///
/// Positional: `columns` must be exactly the destination's column set, in the
/// destination's order.
pub fn build_select_into_copy<S: AsRef<str>>(
    source_table: &str,
    dest_table: &str,
    columns: &[S],
) -> UuSqlResult<String> {
    require(source_table, "source table")?;
    require(dest_table, "destination table")?;
    require_columns(columns, "copied column list")?;
    Ok(format!(
        "INSERT INTO {} SELECT {} FROM {};",
        dest_table,
        join(columns),
        source_table
    ))
}

/// `INSERT INTO <dest> (<cols>) SELECT <cols> FROM <source>;`
///
/// Used when the destination has columns the source lacks; those keep their
/// defaults.
pub fn build_select_into_copy_columns<S: AsRef<str>>(
    source_table: &str,
    dest_table: &str,
    columns: &[S],
) -> UuSqlResult<String> {
    require(source_table, "source table")?;
    require(dest_table, "destination table")?;
    require_columns(columns, "copied column list")?;
    let cols = join(columns);
    Ok(format!(
        "INSERT INTO {} ({}) SELECT {} FROM {};",
        dest_table, cols, cols, source_table
    ))
}

/// `DROP TABLE IF EXISTS <table>;`
pub fn build_drop_table(table: &str) -> UuSqlResult<String> {
    require(table, "table name")?;
    Ok(format!("DROP TABLE IF EXISTS {};", table))
}

/// `<column> = ?`
pub fn build_single_column_where_clause(column: &str) -> UuSqlResult<String> {
    require(column, "column name")?;
    Ok(format!("{} = ?", column.trim()))
}

/// `a = ? AND b = ?`
pub fn build_multi_column_where_clause<S: AsRef<str>>(columns: &[S]) -> UuSqlResult<String> {
    require_columns(columns, "key column list")?;
    let clauses = columns
        .iter()
        .map(|c| build_single_column_where_clause(c.as_ref()))
        .collect::<UuSqlResult<Vec<_>>>()?;
    Ok(clauses.join(" AND "))
}

/// `INSERT INTO <table> (<cols>) VALUES (?, ...);`
///
/// Columns are written in column-map order. Values for columns outside the
/// map are ignored, absent columns keep their defaults, and an autoincrement
/// primary key is only written when the caller supplies a non-null value.
pub fn build_insert_statement(
    table: &str,
    columns: &ColumnMap,
    values: &RowValues,
) -> UuSqlResult<BoundStatement> {
    require(table, "table name")?;

    let mut names = Vec::new();
    let mut args = Vec::new();
    for (name, column_type) in columns {
        let Some(value) = values.get(name) else {
            continue;
        };
        if column_type.primary_key_autoincrement && value.is_null() {
            continue;
        }
        names.push(name.as_str());
        args.push(value.clone());
    }

    if names.is_empty() {
        return Ok(BoundStatement {
            sql: format!("INSERT INTO {} DEFAULT VALUES;", table),
            args,
        });
    }

    let placeholders = vec!["?"; names.len()].join(", ");
    Ok(BoundStatement {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({});",
            table,
            join(&names),
            placeholders
        ),
        args,
    })
}

/// `UPDATE <table> SET a = ?, ... WHERE <clause>;`
///
/// Autoincrement primary keys are never rewritten.
pub fn build_update_statement(
    table: &str,
    columns: &ColumnMap,
    values: &RowValues,
    where_clause: &str,
    where_args: &[SqlValue],
) -> UuSqlResult<BoundStatement> {
    require(table, "table name")?;
    require(where_clause, "where clause")?;

    let mut sets = Vec::new();
    let mut args = Vec::new();
    for (name, column_type) in columns {
        if column_type.primary_key_autoincrement {
            continue;
        }
        if let Some(value) = values.get(name) {
            sets.push(format!("{} = ?", name));
            args.push(value.clone());
        }
    }
    if sets.is_empty() {
        return Err(UuSqlError::InvalidArgument(format!(
            "nothing to update in '{}'",
            table
        )));
    }
    args.extend_from_slice(where_args);

    Ok(BoundStatement {
        sql: format!(
            "UPDATE {} SET {} WHERE {};",
            table,
            sets.join(", "),
            where_clause
        ),
        args,
    })
}

/// `DELETE FROM <table> WHERE <clause>;`
pub fn build_delete_statement(table: &str, where_clause: &str) -> UuSqlResult<String> {
    require(table, "table name")?;
    require(where_clause, "where clause")?;
    Ok(format!("DELETE FROM {} WHERE {};", table, where_clause))
}

/// `SELECT <cols> FROM <table>[ WHERE ..][ ORDER BY ..][ LIMIT n];`
pub fn build_select_statement<S: AsRef<str>>(
    table: &str,
    columns: &[S],
    where_clause: Option<&str>,
    order_by: Option<&str>,
    limit: Option<u32>,
) -> UuSqlResult<String> {
    require(table, "table name")?;
    let cols = if columns.is_empty() {
        "*".to_string()
    } else {
        require_columns(columns, "selected column list")?;
        join(columns)
    };

    let mut sql = format!("SELECT {} FROM {}", cols, table);
    if let Some(clause) = where_clause.filter(|c| !c.trim().is_empty()) {
        sql.push_str(" WHERE ");
        sql.push_str(clause);
    }
    if let Some(order) = order_by.filter(|o| !o.trim().is_empty()) {
        sql.push_str(" ORDER BY ");
        sql.push_str(order);
    }
    if let Some(n) = limit {
        sql.push_str(&format!(" LIMIT {}", n));
    }
    sql.push(';');
    Ok(sql)
}

/// `SELECT COUNT(*) FROM <table>[ WHERE ..];`
pub fn build_count_statement(table: &str, where_clause: Option<&str>) -> UuSqlResult<String> {
    require(table, "table name")?;
    let mut sql = format!("SELECT COUNT(*) FROM {}", table);
    if let Some(clause) = where_clause.filter(|c| !c.trim().is_empty()) {
        sql.push_str(" WHERE ");
        sql.push_str(clause);
    }
    sql.push(';');
    Ok(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fake_columns() -> ColumnMap {
        let mut map = ColumnMap::new();
        map.insert("id".into(), ColumnType::integer_primary_key_autoincrement());
        map.insert("name".into(), ColumnType::text());
        map.insert("team".into(), ColumnType::text().not_null().with_default("'none'"));
        map
    }

    #[test]
    fn test_create_statement_keeps_column_order() {
        let sql = build_create_statement("fake_model", &fake_columns(), None).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE fake_model (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, team TEXT NOT NULL DEFAULT 'none');"
        );
        assert!(!sql.contains("PRIMARY KEY("));
        assert_eq!(sql.matches(';').count(), 1);
        assert!(!sql.contains(",)"));
    }

    #[test]
    fn test_create_statement_with_explicit_key() {
        let mut map = ColumnMap::new();
        map.insert("team".into(), ColumnType::text().not_null());
        map.insert("number".into(), ColumnType::integer().not_null());

        let sql = build_create_statement("roster", &map, Some("team, number")).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE roster (team TEXT NOT NULL, number INTEGER NOT NULL, PRIMARY KEY(team, number));"
        );
        assert!(sql.ends_with("PRIMARY KEY(team, number));"));
    }

    #[test]
    fn test_create_statement_rejects_double_key() {
        let err = build_create_statement("fake_model", &fake_columns(), Some("name")).unwrap_err();
        assert!(matches!(err, UuSqlError::InvalidArgument(_)));
    }

    #[test]
    fn test_create_statement_rejects_empty_inputs() {
        assert!(build_create_statement("", &fake_columns(), None).is_err());
        assert!(build_create_statement("t", &ColumnMap::new(), None).is_err());
        assert!(build_create_statement("t", &fake_columns(), Some(" ")).is_err());
    }

    #[test]
    fn test_simple_statements() {
        assert_eq!(
            build_alter_add_column("fake_model", "number", &ColumnType::integer()).unwrap(),
            "ALTER TABLE fake_model ADD COLUMN number INTEGER;"
        );
        assert_eq!(
            build_rename_table("fake_model", "fake_model_old_2").unwrap(),
            "ALTER TABLE fake_model RENAME TO fake_model_old_2;"
        );
        assert_eq!(
            build_select_into_copy("fake_model_old_2", "fake_model", &["id", "name"]).unwrap(),
            "INSERT INTO fake_model SELECT id, name FROM fake_model_old_2;"
        );
        assert_eq!(
            build_select_into_copy_columns("a_old", "a", &["id", "name"]).unwrap(),
            "INSERT INTO a (id, name) SELECT id, name FROM a_old;"
        );
        assert_eq!(build_drop_table("t").unwrap(), "DROP TABLE IF EXISTS t;");
        assert_eq!(build_single_column_where_clause("id").unwrap(), "id = ?");
        assert_eq!(
            build_multi_column_where_clause(&["team", "number"]).unwrap(),
            "team = ? AND number = ?"
        );
    }

    #[test]
    fn test_empty_arguments_are_rejected() {
        assert!(build_alter_add_column("t", "", &ColumnType::text()).is_err());
        assert!(build_rename_table("t", "").is_err());
        assert!(build_select_into_copy::<&str>("a", "b", &[]).is_err());
        assert!(build_drop_table(" ").is_err());
        assert!(build_single_column_where_clause("").is_err());
    }

    #[test]
    fn test_insert_skips_null_autoincrement_key() {
        let mut values = RowValues::new();
        values.insert("id".into(), SqlValue::Null);
        values.insert("name".into(), "Ada".into());
        values.insert("team".into(), "red".into());
        values.insert("unknown".into(), SqlValue::Integer(1));

        let stmt = build_insert_statement("fake_model", &fake_columns(), &values).unwrap();
        assert_eq!(stmt.sql, "INSERT INTO fake_model (name, team) VALUES (?, ?);");
        assert_eq!(stmt.args, vec![SqlValue::from("Ada"), SqlValue::from("red")]);

        values.insert("id".into(), SqlValue::Integer(42));
        let stmt = build_insert_statement("fake_model", &fake_columns(), &values).unwrap();
        assert_eq!(stmt.sql, "INSERT INTO fake_model (id, name, team) VALUES (?, ?, ?);");
        assert_eq!(stmt.args[0], SqlValue::Integer(42));
    }

    #[test]
    fn test_insert_without_values_uses_defaults() {
        let stmt = build_insert_statement("fake_model", &fake_columns(), &RowValues::new()).unwrap();
        assert_eq!(stmt.sql, "INSERT INTO fake_model DEFAULT VALUES;");
        assert!(stmt.args.is_empty());
    }

    #[test]
    fn test_update_appends_where_args() {
        let mut values = RowValues::new();
        values.insert("id".into(), SqlValue::Integer(1));
        values.insert("name".into(), "Grace".into());

        let stmt = build_update_statement(
            "fake_model",
            &fake_columns(),
            &values,
            "id = ?",
            &[SqlValue::Integer(1)],
        )
        .unwrap();
        assert_eq!(stmt.sql, "UPDATE fake_model SET name = ? WHERE id = ?;");
        assert_eq!(stmt.args, vec![SqlValue::from("Grace"), SqlValue::Integer(1)]);
    }

    #[test]
    fn test_select_and_count() {
        assert_eq!(
            build_select_statement("t", &["id", "name"], Some("id = ?"), Some("name ASC"), Some(5))
                .unwrap(),
            "SELECT id, name FROM t WHERE id = ? ORDER BY name ASC LIMIT 5;"
        );
        assert_eq!(
            build_select_statement::<&str>("t", &[], None, None, None).unwrap(),
            "SELECT * FROM t;"
        );
        assert_eq!(
            build_count_statement("t", Some("team = ?")).unwrap(),
            "SELECT COUNT(*) FROM t WHERE team = ?;"
        );
        assert_eq!(
            build_delete_statement("t", "id = ?").unwrap(),
            "DELETE FROM t WHERE id = ?;"
        );
    }
}
