//! SQLite execution engine for uusql.
//!
//! Opens a database, brings its schema to the version the running code
//! expects, and reads and writes [`DataModel`]s through sqlx.
//!
//! The installed schema version lives in `PRAGMA user_version`. A migration
//! plan runs inside one transaction together with the version update, so a
//! failing statement leaves the database exactly as it was.

use std::str::FromStr;
use std::sync::Arc;

use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Row as _, Sqlite, TypeInfo, ValueRef};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{UuSqlError, UuSqlResult};
use crate::migrate::diff::{plan_migration, schema_columns};
use crate::migrate::generator::{
    build_count_statement, build_delete_statement, build_insert_statement, build_select_statement,
    build_update_statement,
};
use crate::migrate::model::{DataModel, DatabaseDefinition};
use crate::value::{Row, RowValues, SqlValue};

/// WHERE / ORDER BY / LIMIT for reads.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    where_clause: Option<String>,
    args: Vec<SqlValue>,
    order_by: Option<String>,
    limit: Option<u32>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// WHERE clause with `?` placeholders; bind its values with [`Filter::bind`].
    pub fn where_clause(mut self, clause: impl Into<String>) -> Self {
        self.where_clause = Some(clause.into());
        self
    }

    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn order_by(mut self, order: impl Into<String>) -> Self {
        self.order_by = Some(order.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// An open, migrated SQLite database.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    definition: Arc<dyn DatabaseDefinition>,
}

impl Database {
    /// Open `url` and migrate it to `definition.current_version()`.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let schema = Arc::new(uusql::migrate::parse_schema(&text)?);
    /// let db = Database::open("sqlite::memory:", schema).await?;
    /// ```
    pub async fn open(url: &str, definition: Arc<dyn DatabaseDefinition>) -> UuSqlResult<Self> {
        let config = Config::builder().database(url).build();
        Self::open_with(&config, definition).await
    }

    /// Open using a [`Config`] and migrate to the current version.
    pub async fn open_with(
        config: &Config,
        definition: Arc<dyn DatabaseDefinition>,
    ) -> UuSqlResult<Self> {
        let db = Self::connect(config, definition).await?;
        let target = db.definition.current_version();
        db.migrate_to(target).await?;
        Ok(db)
    }

    /// Open without touching the schema.
    pub async fn connect(
        config: &Config,
        definition: Arc<dyn DatabaseDefinition>,
    ) -> UuSqlResult<Self> {
        let url = config
            .database_url
            .as_deref()
            .ok_or_else(|| UuSqlError::Config("no database URL configured".into()))?;

        let options =
            SqliteConnectOptions::from_str(url)?.create_if_missing(config.create_if_missing);

        // Every connection to an in-memory database sees its own empty
        // database, so the pool is pinned to a single long-lived connection.
        let pool_options = if config.is_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections)
        };

        let pool = pool_options.connect_with(options).await?;
        debug!(url, database = %definition.database_name(), "connected");
        Ok(Self { pool, definition })
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn definition(&self) -> &dyn DatabaseDefinition {
        self.definition.as_ref()
    }

    /// Schema version the running code reads and writes with.
    pub fn version(&self) -> u32 {
        self.definition.current_version()
    }

    /// Version recorded in the database file.
    pub async fn installed_version(&self) -> UuSqlResult<u32> {
        let row = sqlx::query("PRAGMA user_version;")
            .fetch_one(&self.pool)
            .await?;
        let version: i64 = row.try_get_unchecked(0)?;
        u32::try_from(version).map_err(|_| {
            UuSqlError::InvalidSchema(format!("installed version {} is out of range", version))
        })
    }

    /// Migrate from the installed version to `target`, returning the
    /// statements that were applied.
    pub async fn migrate_to(&self, target: u32) -> UuSqlResult<Vec<String>> {
        let installed = self.installed_version().await?;
        if installed == target {
            debug!(version = target, "schema is up to date");
            return Ok(Vec::new());
        }

        let plan = plan_migration(self.definition.as_ref(), installed, target)?;
        info!(
            database = %self.definition.database_name(),
            from = installed,
            to = target,
            statements = plan.len(),
            "migrating schema"
        );
        self.apply_plan(&plan, target).await?;
        Ok(plan)
    }

    /// Run `statements` and record `version`, all or nothing.
    pub async fn apply_plan(&self, statements: &[String], version: u32) -> UuSqlResult<()> {
        let mut tx = self.pool.begin().await?;

        for statement in statements {
            debug!(sql = %statement, "executing");
            if let Err(e) = sqlx::query(statement).execute(&mut *tx).await {
                warn!(sql = %statement, error = %e, "migration statement failed, rolling back");
                return Err(e.into());
            }
        }

        sqlx::query(&format!("PRAGMA user_version = {};", version))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Insert `model`, returning the new row id.
    pub async fn insert(&self, model: &dyn DataModel) -> UuSqlResult<i64> {
        let version = self.version();
        let table = model.table_name();
        let columns = schema_columns(model, version)?;
        let stmt = build_insert_statement(&table, &columns, &model.to_row_values(version))?;

        debug!(sql = %stmt.sql, "insert");
        let result = bind_all(sqlx::query(&stmt.sql), &stmt.args)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Update the row identified by `model`'s primary key.
    pub async fn update(&self, model: &dyn DataModel) -> UuSqlResult<u64> {
        let version = self.version();
        let table = model.table_name();
        let columns = schema_columns(model, version)?;
        let where_clause = key_where_clause(model)?;
        let stmt = build_update_statement(
            &table,
            &columns,
            &model.to_row_values(version),
            &where_clause,
            &model.primary_key_where_args(),
        )?;

        debug!(sql = %stmt.sql, "update");
        let result = bind_all(sqlx::query(&stmt.sql), &stmt.args)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete the row identified by `model`'s primary key.
    pub async fn delete(&self, model: &dyn DataModel) -> UuSqlResult<u64> {
        let sql = build_delete_statement(&model.table_name(), &key_where_clause(model)?)?;
        let args = model.primary_key_where_args();

        debug!(sql = %sql, "delete");
        let result = bind_all(sqlx::query(&sql), &args)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Fetch every `M` matching `filter`.
    pub async fn query<M: DataModel + Default>(&self, filter: &Filter) -> UuSqlResult<Vec<M>> {
        self.query_with(M::default, filter).await
    }

    /// Fetch the first `M` matching `filter`.
    pub async fn query_single<M: DataModel + Default>(
        &self,
        filter: &Filter,
    ) -> UuSqlResult<Option<M>> {
        let filter = filter.clone().limit(1);
        Ok(self.query(&filter).await?.into_iter().next())
    }

    /// Fetch matching rows, building each model with `factory`.
    pub async fn query_with<M, F>(&self, factory: F, filter: &Filter) -> UuSqlResult<Vec<M>>
    where
        M: DataModel,
        F: Fn() -> M,
    {
        let version = self.version();
        let (table, columns) = {
            let prototype = factory();
            (prototype.table_name(), schema_columns(&prototype, version)?)
        };
        let names: Vec<&str> = columns.keys().map(String::as_str).collect();
        let sql = build_select_statement(
            &table,
            &names,
            filter.where_clause.as_deref(),
            filter.order_by.as_deref(),
            filter.limit,
        )?;

        let rows = self.fetch_rows(&sql, &filter.args).await?;
        rows.iter()
            .map(|row| {
                let mut model = factory();
                model.fill_from_row(row)?;
                Ok(model)
            })
            .collect()
    }

    /// Number of rows in `table` matching `filter`.
    pub async fn count(&self, table: &str, filter: &Filter) -> UuSqlResult<i64> {
        let sql = build_count_statement(table, filter.where_clause.as_deref())?;
        let row = bind_all(sqlx::query(&sql), &filter.args)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get_unchecked::<i64, _>(0)?)
    }

    /// Run arbitrary SQL, returning the number of affected rows.
    pub async fn execute_raw(&self, sql: &str, args: &[SqlValue]) -> UuSqlResult<u64> {
        let result = bind_all(sqlx::query(sql), args).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Run arbitrary SQL and decode every row dynamically.
    pub async fn fetch_rows(&self, sql: &str, args: &[SqlValue]) -> UuSqlResult<Vec<Row>> {
        debug!(sql, "fetch");
        let rows = bind_all(sqlx::query(sql), args)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(decode_row).collect()
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

/// WHERE clause identifying `model`'s row; tables without a key cannot be
/// updated or deleted by model.
fn key_where_clause(model: &dyn DataModel) -> UuSqlResult<String> {
    let clause = model.primary_key_where_clause();
    if clause.trim().is_empty() {
        return Err(UuSqlError::InvalidSchema(format!(
            "table '{}' has no primary key to identify a row",
            model.table_name()
        )));
    }
    Ok(clause)
}

fn bind_all<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    args: &[SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for arg in args {
        query = match arg {
            SqlValue::Null => query.bind(None::<i64>),
            SqlValue::Integer(v) => query.bind(*v),
            SqlValue::Real(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
            SqlValue::Blob(v) => query.bind(v.clone()),
        };
    }
    query
}

/// Decode by each value's storage class rather than the declared type.
fn decode_row(row: &SqliteRow) -> UuSqlResult<Row> {
    let mut values = RowValues::new();

    for (idx, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(idx)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            let storage = raw.type_info().name().to_string();
            match storage.as_str() {
                "INTEGER" | "BOOLEAN" => SqlValue::Integer(row.try_get_unchecked::<i64, _>(idx)?),
                "REAL" | "NUMERIC" => SqlValue::Real(row.try_get_unchecked::<f64, _>(idx)?),
                "BLOB" => SqlValue::Blob(row.try_get_unchecked::<Vec<u8>, _>(idx)?),
                _ => SqlValue::Text(row.try_get_unchecked::<String, _>(idx)?),
            }
        };
        values.insert(sqlx::Column::name(column).to_string(), value);
    }

    Ok(Row::new(values))
}
