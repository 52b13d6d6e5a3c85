//! # uusql: schema-versioned SQLite
//!
//! Declare each table's complete column set per schema version and let uusql
//! work out the migration: new tables are created, removed ones dropped, and
//! changed ones altered in place or rebuilt when SQLite cannot alter them.
//!
//! ## Quick Example
//!
//! ```rust
//! use uusql::migrate::{parse_schema, plan_migration};
//!
//! let schema = parse_schema(r#"
//!     version 1 {
//!         table fake_model {
//!             id INTEGER PRIMARY KEY AUTOINCREMENT
//!             name TEXT
//!         }
//!     }
//!     version 2 {
//!         table fake_model {
//!             id INTEGER PRIMARY KEY AUTOINCREMENT
//!             name TEXT
//!             number INTEGER
//!         }
//!     }
//! "#).unwrap();
//!
//! let plan = plan_migration(&schema, 1, 2).unwrap();
//! assert_eq!(plan, vec!["ALTER TABLE fake_model ADD COLUMN number INTEGER;"]);
//! ```
//!
//! | Change between versions          | Statements                              |
//! |----------------------------------|-----------------------------------------|
//! | table added                      | `CREATE TABLE`                          |
//! | table removed                    | `DROP TABLE IF EXISTS`                  |
//! | columns only added               | `ALTER TABLE .. ADD COLUMN` per column  |
//! | column removed or retyped        | rename, create, copy, drop              |

pub mod config;
pub mod engine;
pub mod error;
pub mod migrate;
pub mod value;

pub mod prelude {
    pub use crate::config::Config;
    pub use crate::engine::{Database, Filter};
    pub use crate::error::*;
    pub use crate::migrate::{
        ColumnMap, ColumnType, DataModel, DatabaseDefinition, Record, Schema, SqlAffinity,
        TableSchema, parse_schema, plan_migration,
    };
    pub use crate::value::{Row, RowValues, SqlValue};
}

/// Parse a `.uusql` schema file.
///
/// # Example
///
/// ```
/// let schema = uusql::parse("version 1 { table t { id INTEGER PRIMARY KEY AUTOINCREMENT } }").unwrap();
/// assert_eq!(schema.tables.len(), 1);
/// ```
pub fn parse(input: &str) -> Result<migrate::Schema, error::UuSqlError> {
    migrate::parse_schema(input)
}
