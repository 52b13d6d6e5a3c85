//! Migration planning against typed models and parsed schema files.

mod common;

use common::{FakeCompoundKeyModel, FakeDatabase, FakeModel};
use pretty_assertions::assert_eq;
use uusql::migrate::{
    analyze_model_sets, append_downgrade_statements, append_upgrade_statements, create_statement,
    plan_creation,
};
use uusql::prelude::*;

#[test]
fn test_upgrade_adds_column_in_place() {
    let mut statements = Vec::new();
    append_upgrade_statements(&FakeModel::default(), 1, 2, &mut statements).unwrap();
    assert_eq!(
        statements,
        vec!["ALTER TABLE fake_model ADD COLUMN number INTEGER;"]
    );
}

#[test]
fn test_downgrade_rebuilds_table() {
    let mut statements = Vec::new();
    append_downgrade_statements(&FakeModel::default(), 2, 1, &mut statements).unwrap();
    assert_eq!(
        statements,
        vec![
            "ALTER TABLE fake_model RENAME TO fake_model_old_2;",
            "CREATE TABLE fake_model (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, team TEXT);",
            "INSERT INTO fake_model SELECT id, name, team FROM fake_model_old_2;",
            "DROP TABLE IF EXISTS fake_model_old_2;",
        ]
    );
}

#[test]
fn test_direction_is_checked() {
    let mut statements = Vec::new();
    let err = append_upgrade_statements(&FakeModel::default(), 2, 1, &mut statements).unwrap_err();
    assert!(matches!(err, UuSqlError::InvalidArgument(_)));
    let err = append_downgrade_statements(&FakeModel::default(), 1, 1, &mut statements).unwrap_err();
    assert!(matches!(err, UuSqlError::InvalidArgument(_)));
    assert!(statements.is_empty());
}

#[test]
fn test_empty_source_set_marks_models_added() {
    let from: Vec<Box<dyn DataModel>> = Vec::new();
    let to: Vec<Box<dyn DataModel>> = vec![Box::new(FakeModel::default())];

    let analysis = analyze_model_sets(&from, &to);
    assert_eq!(analysis.added_tables(), vec!["fake_model"]);
    assert!(analysis.deleted.is_empty());
    assert!(analysis.migrated.is_empty());
}

#[test]
fn test_unchanged_model_is_migrated() {
    let from: Vec<Box<dyn DataModel>> = vec![Box::new(FakeModel::default())];
    let to: Vec<Box<dyn DataModel>> = vec![Box::new(FakeModel::default())];

    let analysis = analyze_model_sets(&from, &to);
    assert!(analysis.added.is_empty());
    assert!(analysis.deleted.is_empty());
    assert_eq!(analysis.migrated_tables(), vec!["fake_model"]);
}

#[test]
fn test_removed_model_is_deleted() {
    let from: Vec<Box<dyn DataModel>> = vec![
        Box::new(FakeModel::default()),
        Box::new(FakeCompoundKeyModel::default()),
    ];
    let to: Vec<Box<dyn DataModel>> = vec![Box::new(FakeCompoundKeyModel::default())];

    let analysis = analyze_model_sets(&from, &to);
    assert_eq!(analysis.deleted_tables(), vec!["fake_model"]);
    assert_eq!(analysis.migrated_tables(), vec!["fake_compound_key_model"]);
}

#[test]
fn test_compound_key_create_statement() {
    let sql = create_statement(&FakeCompoundKeyModel::default(), 1).unwrap();
    assert_eq!(
        sql,
        "CREATE TABLE fake_compound_key_model (team TEXT NOT NULL, number INTEGER NOT NULL, name TEXT, PRIMARY KEY(team, number));"
    );
}

#[test]
fn test_plan_for_fake_database() {
    let definition = FakeDatabase { version: 2 };

    let create = plan_creation(&definition, 2).unwrap();
    assert_eq!(create.len(), 2);
    assert!(create[0].starts_with("CREATE TABLE fake_model ("));
    assert!(create[0].contains("number INTEGER"));

    assert_eq!(plan_migration(&definition, 0, 2).unwrap(), create);
    assert_eq!(
        plan_migration(&definition, 1, 2).unwrap(),
        vec!["ALTER TABLE fake_model ADD COLUMN number INTEGER;"]
    );
    assert_eq!(plan_migration(&definition, 2, 1).unwrap().len(), 4);
    assert!(plan_migration(&definition, 2, 2).unwrap().is_empty());
}

#[test]
fn test_schema_file_plan() {
    let schema = parse_schema(
        r#"
        database league

        version 1 {
            table players {
                id INTEGER PRIMARY KEY AUTOINCREMENT
                name TEXT NOT NULL
                rating REAL
            }
            table teams {
                name TEXT NOT NULL
                city TEXT
                primary key (name)
            }
        }

        version 2 {
            table players {
                id INTEGER PRIMARY KEY AUTOINCREMENT
                name TEXT NOT NULL
                rating INTEGER
                joined TEXT DEFAULT 'never'
            }
            table seasons {
                year INTEGER NOT NULL
                primary key (year)
            }
        }
        "#,
    )
    .unwrap();

    assert_eq!(schema.name, "league");
    assert_eq!(schema.current_version(), 2);

    let plan = plan_migration(&schema, 1, 2).unwrap();
    assert_eq!(
        plan,
        vec![
            "CREATE TABLE seasons (year INTEGER NOT NULL, PRIMARY KEY(year));",
            "ALTER TABLE players RENAME TO players_old_1;",
            "CREATE TABLE players (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, rating INTEGER, joined TEXT DEFAULT 'never');",
            "INSERT INTO players (id, name, rating) SELECT id, name, rating FROM players_old_1;",
            "DROP TABLE IF EXISTS players_old_1;",
            "DROP TABLE IF EXISTS teams;",
        ]
    );
}

#[test]
fn test_not_null_column_without_default_forces_rebuild() {
    let mut v1 = ColumnMap::new();
    v1.insert("id".into(), ColumnType::integer_primary_key_autoincrement());
    let mut v2 = v1.clone();
    v2.insert("points".into(), ColumnType::integer().not_null());

    let mut schema = Schema::new("main");
    schema.add_table(TableSchema::new("scores").version(1, v1).version(2, v2));

    let plan = plan_migration(&schema, 1, 2).unwrap();
    assert_eq!(plan[0], "ALTER TABLE scores RENAME TO scores_old_1;");
    assert_eq!(plan.len(), 4);
    assert_eq!(
        plan[2],
        "INSERT INTO scores (id) SELECT id FROM scores_old_1;"
    );
}
