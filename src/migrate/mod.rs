//! Schema-versioned migrations.
//!
//! A database is declared as a set of [`DataModel`]s, each of which reports
//! its complete column map at every schema version. Migrating compares two of
//! those cumulative snapshots:
//!
//! - tables only in the target version are created,
//! - tables only in the source version are dropped,
//! - tables in both are altered column by column, or rebuilt when a column
//!   disappears or changes type.
//!
//! ## Example
//! ```text
//! version 1 {
//!   table fake_model {
//!     id INTEGER PRIMARY KEY AUTOINCREMENT
//!     name TEXT
//!   }
//! }
//! ```

pub mod diff;
pub mod generator;
pub mod model;
pub mod parser;
pub mod schema;
pub mod types;

pub use diff::{
    MigratedModel, ModelSetAnalysis, analyze_model_sets, append_downgrade_statements,
    append_upgrade_statements, create_statement, plan_creation, plan_migration,
};
pub use generator::BoundStatement;
pub use model::{DataModel, DatabaseDefinition};
pub use parser::{parse_column_type, parse_schema, to_schema_string};
pub use schema::{Record, Schema, TableSchema};
pub use types::{ColumnMap, ColumnType, SqlAffinity};
