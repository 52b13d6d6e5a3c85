//! Schema File Parser
//!
//! Parses the `.uusql` text format into a [`Schema`].
//!
//! ## Grammar
//! ```text
//! schema      = [ "database" IDENT ] version_def*
//! version_def = "version" NUMBER "{" table_def* "}"
//! table_def   = "table" IDENT "{" ( column_def | key_def )* "}"
//! column_def  = IDENT column_type [","]
//! key_def     = "primary" "key" "(" IDENT ( "," IDENT )* ")"
//! column_type = AFFINITY ( "PRIMARY KEY AUTOINCREMENT" | "NOT NULL" | "DEFAULT" LITERAL )*
//! ```
//!
//! Keywords are case-insensitive and `#` starts a comment. Each version
//! block lists the complete set of tables at that version.

use std::collections::HashSet;

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{is_not, tag, tag_no_case, take_while, take_while1},
    character::complete::{char, digit1, multispace1, not_line_ending},
    combinator::{all_consuming, cut, map, map_res, opt, recognize, value},
    error::ErrorKind,
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
};

use super::schema::{Schema, TableSchema};
use super::types::{ColumnMap, ColumnType, SqlAffinity};
use crate::error::{UuSqlError, UuSqlResult};

/// Name given to schemas without a `database` declaration.
pub const DEFAULT_DATABASE_NAME: &str = "main";

#[derive(Debug, Clone)]
enum Modifier {
    PrimaryKeyAutoincrement,
    NotNull,
    Default(String),
}

enum TableItem<'a> {
    Column(&'a str, ColumnType),
    Key(Vec<&'a str>),
}

struct TableBlock<'a> {
    name: &'a str,
    items: Vec<TableItem<'a>>,
}

struct VersionBlock<'a> {
    keyword: &'a str,
    number: u32,
    tables: Vec<TableBlock<'a>>,
}

/// Whitespace and `#` comments.
fn sp(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((multispace1, recognize(pair(char('#'), not_line_ending))))),
    )(input)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Case-insensitive keyword that is not the prefix of a longer word.
fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    move |input: &'a str| {
        let (rest, word) = tag_no_case::<_, _, nom::error::Error<&'a str>>(kw)(input)?;
        if rest.starts_with(is_ident_char) {
            return Err(nom::Err::Error(nom::error::Error::new(input, ErrorKind::Tag)));
        }
        Ok((rest, word))
    }
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(is_ident_char),
    ))(input)
}

fn affinity(input: &str) -> IResult<&str, SqlAffinity> {
    alt((
        value(SqlAffinity::Integer, keyword("INTEGER")),
        value(SqlAffinity::Text, keyword("TEXT")),
        value(SqlAffinity::Real, keyword("REAL")),
        value(SqlAffinity::Blob, keyword("BLOB")),
    ))(input)
}

/// `'quoted '' string'`, signed number, `(expression)` or bare word.
fn default_literal(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(delimited(
            char('\''),
            many0(alt((tag("''"), is_not("'")))),
            char('\''),
        )),
        recognize(tuple((
            opt(alt((char('-'), char('+')))),
            digit1,
            opt(pair(char('.'), digit1)),
        ))),
        recognize(delimited(char('('), is_not(")"), char(')'))),
        identifier,
    ))(input)
}

fn modifier(input: &str) -> IResult<&str, Modifier> {
    alt((
        value(
            Modifier::PrimaryKeyAutoincrement,
            tuple((
                keyword("PRIMARY"),
                sp,
                keyword("KEY"),
                sp,
                keyword("AUTOINCREMENT"),
            )),
        ),
        value(Modifier::NotNull, tuple((keyword("NOT"), sp, keyword("NULL")))),
        map(
            preceded(pair(keyword("DEFAULT"), sp), default_literal),
            |literal: &str| Modifier::Default(literal.to_string()),
        ),
    ))(input)
}

fn column_type(input: &str) -> IResult<&str, ColumnType> {
    let (input, affinity) = affinity(input)?;
    let (input, modifiers) = many0(preceded(sp, modifier))(input)?;

    let mut column_type = ColumnType::new(affinity);
    for m in modifiers {
        match m {
            Modifier::PrimaryKeyAutoincrement => column_type.primary_key_autoincrement = true,
            Modifier::NotNull => column_type.not_null = true,
            Modifier::Default(literal) => column_type.default_value = Some(literal),
        }
    }
    Ok((input, column_type))
}

fn key_def(input: &str) -> IResult<&str, Vec<&str>> {
    preceded(
        tuple((keyword("primary"), sp, keyword("key"), sp)),
        cut(delimited(
            char('('),
            separated_list1(preceded(sp, char(',')), preceded(sp, identifier)),
            preceded(sp, char(')')),
        )),
    )(input)
}

fn column_def(input: &str) -> IResult<&str, (&str, ColumnType)> {
    terminated(
        pair(identifier, preceded(sp, column_type)),
        opt(preceded(sp, char(','))),
    )(input)
}

fn table_item(input: &str) -> IResult<&str, TableItem<'_>> {
    alt((
        map(key_def, TableItem::Key),
        map(column_def, |(name, t)| TableItem::Column(name, t)),
    ))(input)
}

fn table_def(input: &str) -> IResult<&str, TableBlock<'_>> {
    let (input, _) = keyword("table")(input)?;
    let (input, (name, items)) = cut(pair(
        preceded(sp, identifier),
        delimited(
            preceded(sp, char('{')),
            many0(preceded(sp, table_item)),
            preceded(sp, char('}')),
        ),
    ))(input)?;
    Ok((input, TableBlock { name, items }))
}

fn version_def(input: &str) -> IResult<&str, VersionBlock<'_>> {
    let (input, kw) = keyword("version")(input)?;
    let (input, (number, tables)) = cut(pair(
        preceded(sp, map_res(digit1, str::parse::<u32>)),
        delimited(
            preceded(sp, char('{')),
            many0(preceded(sp, table_def)),
            preceded(sp, char('}')),
        ),
    ))(input)?;
    Ok((
        input,
        VersionBlock {
            keyword: kw,
            number,
            tables,
        },
    ))
}

fn database_def(input: &str) -> IResult<&str, &str> {
    preceded(pair(keyword("database"), sp), cut(identifier))(input)
}

fn schema_file(input: &str) -> IResult<&str, (Option<&str>, Vec<VersionBlock<'_>>)> {
    all_consuming(delimited(
        sp,
        pair(
            opt(terminated(database_def, sp)),
            many0(terminated(version_def, sp)),
        ),
        sp,
    ))(input)
}

/// 1-based line of `fragment`, which must be a slice of `source`.
fn line_of(source: &str, fragment: &str) -> usize {
    let offset = (fragment.as_ptr() as usize)
        .saturating_sub(source.as_ptr() as usize)
        .min(source.len());
    source[..offset].matches('\n').count() + 1
}

fn parse_error(source: &str, err: nom::Err<nom::error::Error<&str>>) -> UuSqlError {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let found: String = e.input.chars().take_while(|c| *c != '\n').take(40).collect();
            let message = if found.is_empty() {
                "unexpected end of input".to_string()
            } else {
                format!("unexpected input '{}'", found.trim())
            };
            UuSqlError::parse(line_of(source, e.input), message)
        }
        nom::Err::Incomplete(_) => UuSqlError::parse(0, "incomplete input"),
    }
}

/// Parse a column type declaration such as `INTEGER NOT NULL DEFAULT 0`.
pub fn parse_column_type(input: &str) -> UuSqlResult<ColumnType> {
    all_consuming(delimited(sp, column_type, sp))(input)
        .map(|(_, column_type)| column_type)
        .map_err(|_| UuSqlError::parse(1, format!("invalid column type '{}'", input.trim())))
}

/// Parse a `.uusql` schema file.
pub fn parse_schema(input: &str) -> UuSqlResult<Schema> {
    let (_, (database, versions)) = schema_file(input).map_err(|e| parse_error(input, e))?;

    let mut schema = Schema::new(database.unwrap_or(DEFAULT_DATABASE_NAME));
    let mut tables: Vec<TableSchema> = Vec::new();
    let mut seen_versions = HashSet::new();

    for block in versions {
        let line = line_of(input, block.keyword);
        if block.number == 0 {
            return Err(UuSqlError::parse(line, "version 0 is reserved for an empty database"));
        }
        if !seen_versions.insert(block.number) {
            return Err(UuSqlError::parse(
                line,
                format!("version {} is declared twice", block.number),
            ));
        }

        let mut seen_tables = HashSet::new();
        for table in block.tables {
            let line = line_of(input, table.name);
            if !seen_tables.insert(table.name) {
                return Err(UuSqlError::parse(
                    line,
                    format!("table '{}' is declared twice in version {}", table.name, block.number),
                ));
            }

            let mut columns = ColumnMap::new();
            let mut key = None;
            for item in table.items {
                match item {
                    TableItem::Column(name, column_type) => {
                        if columns.insert(name.to_string(), column_type).is_some() {
                            return Err(UuSqlError::parse(
                                line_of(input, name),
                                format!("column '{}.{}' is declared twice", table.name, name),
                            ));
                        }
                    }
                    TableItem::Key(cols) => key = Some(cols.join(", ")),
                }
            }
            if columns.is_empty() {
                return Err(UuSqlError::parse(
                    line,
                    format!("table '{}' has no columns", table.name),
                ));
            }

            match tables.iter_mut().find(|t| t.name == table.name) {
                Some(entry) => {
                    if entry.primary_key != key {
                        let first = entry.versions.keys().next().copied().unwrap_or_default();
                        return Err(UuSqlError::parse(
                            line,
                            format!(
                                "table '{}' declares {} in version {} but {} in version {}",
                                table.name,
                                describe_key(key.as_deref()),
                                block.number,
                                describe_key(entry.primary_key.as_deref()),
                                first
                            ),
                        ));
                    }
                    entry.versions.insert(block.number, columns);
                }
                None => {
                    let mut entry = TableSchema::new(table.name);
                    entry.versions.insert(block.number, columns);
                    entry.primary_key = key;
                    tables.push(entry);
                }
            }
        }
    }

    for table in tables {
        schema.add_table(table);
    }
    Ok(schema)
}

fn describe_key(key: Option<&str>) -> String {
    match key {
        Some(key) => format!("primary key ({})", key),
        None => "no primary key".to_string(),
    }
}

/// Format a [`Schema`] back into `.uusql` text.
pub fn to_schema_string(schema: &Schema) -> String {
    let mut output = format!("database {}\n", schema.name);

    for version in schema.versions() {
        output.push_str(&format!("\nversion {} {{\n", version));
        for table in schema.tables.iter().filter(|t| t.exists_at(version)) {
            output.push_str(&format!("    table {} {{\n", table.name));
            for (name, column_type) in table.columns_at(version) {
                output.push_str(&format!("        {} {}\n", name, column_type));
            }
            if let Some(key) = &table.primary_key {
                output.push_str(&format!("        primary key ({})\n", key));
            }
            output.push_str("    }\n");
        }
        output.push_str("}\n");
    }

    output
}
