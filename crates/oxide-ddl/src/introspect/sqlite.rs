//! SQLite introspection.
//!
//! Columns, indices and foreign keys come from the `pragma_*` table-valued
//! functions. SQLite keeps no catalog of constraint names, so those are
//! recovered from the stored `CREATE TABLE` text.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use oxide_ddl_core::model::{
    Autoincrement, Column, ForeignKey, Generated, Index, QualifiedName, Table, TableConstraint,
    UNKNOWN_EXPR,
};
use regex::Regex;
use sqlx::sqlite::SqlitePool;

use super::{foreign_key_action, primary_key_name, Introspect};
use crate::error::Result;

const DEFAULT_SCHEMA: &str = "main";

/// `CONSTRAINT <name> PRIMARY KEY|UNIQUE|CHECK`, with the name bare or
/// quoted.
static NAMED_CONSTRAINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)CONSTRAINT\s+(?:"((?:[^"]|"")+)"|`([^`]+)`|\[([^\]]+)\]|(\w+))\s+(PRIMARY\s+KEY|UNIQUE|CHECK)\s*\("#,
    )
    .expect("Invalid constraint pattern regex")
});

static AUTOINCREMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bAUTOINCREMENT\b").expect("Invalid autoincrement regex"));

static PARTIAL_WHERE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\)\s*WHERE\s+(.+)$").expect("Invalid where clause regex"));

/// A constraint named in the table DDL.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NamedConstraint {
    name: String,
    kind: String,
    /// Text between the parentheses following the keyword.
    body: String,
}

/// Reads the schema of a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteIntrospector {
    pool: SqlitePool,
}

impl SqliteIntrospector {
    /// Creates an introspector over `pool`.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn table_sql(&self, schema: &str, table: &str) -> Result<String> {
        let row: Option<(Option<String>,)> = sqlx::query_as(&format!(
            "SELECT sql FROM {}.sqlite_master WHERE type = 'table' AND name = ?1",
            quote(schema)
        ))
        .bind(table)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.and_then(|(sql,)| sql).unwrap_or_default())
    }

    async fn columns(&self, schema: &str, table: &mut Table, ddl: &str) -> Result<()> {
        let rows: Vec<(String, Option<String>, i64, Option<String>, i64, i64)> = sqlx::query_as(
            "SELECT name, type, \"notnull\", dflt_value, pk, hidden \
             FROM pragma_table_xinfo(?1, ?2) ORDER BY cid",
        )
        .bind(&table.name)
        .bind(schema)
        .fetch_all(&self.pool)
        .await?;

        let mut primary_key: Vec<(i64, String)> = Vec::new();
        for (name, column_type, not_null, default, pk, hidden) in rows {
            // Hidden columns of virtual tables.
            if hidden == 1 {
                continue;
            }
            let mut column = Column::new(name.clone(), column_type.unwrap_or_default());
            column.not_null = not_null != 0;
            column.default = default;
            if hidden >= 2 {
                column.generated = Some(Generated {
                    expr: String::new(),
                    stored: hidden == 3,
                });
            }
            if pk > 0 {
                primary_key.push((pk, name));
            }
            table.columns.push(column);
        }

        primary_key.sort();
        match primary_key.as_slice() {
            [] => {}
            [(_, name)] => {
                let autoincrement = if AUTOINCREMENT.is_match(ddl) {
                    Autoincrement::RowidAutoincrement
                } else {
                    Autoincrement::Rowid
                };
                if let Some(column) = table.column_mut(name) {
                    column.primary_key = true;
                    column.not_null = true;
                    if column.column_type.eq_ignore_ascii_case("INTEGER") {
                        column.autoincrement = autoincrement;
                    }
                }
            }
            columns => {
                let columns: Vec<String> = columns.iter().map(|(_, c)| c.clone()).collect();
                let name = named_constraints(ddl)
                    .into_iter()
                    .find(|c| c.kind == "PRIMARY KEY")
                    .map_or_else(|| primary_key_name(&table.name), |c| c.name);
                table
                    .constraints
                    .push(TableConstraint::primary_key(name, columns));
            }
        }
        Ok(())
    }

    async fn indices(&self, schema: &str, table: &mut Table, ddl: &str) -> Result<()> {
        let rows: Vec<(String, i64, String, i64)> = sqlx::query_as(
            "SELECT name, \"unique\", origin, partial FROM pragma_index_list(?1, ?2)",
        )
        .bind(&table.name)
        .bind(schema)
        .fetch_all(&self.pool)
        .await?;

        let named = named_constraints(ddl);
        for (index_name, unique, origin, partial) in rows {
            let keys: Vec<(i64, Option<String>)> = sqlx::query_as(
                "SELECT cid, name FROM pragma_index_info(?1, ?2) ORDER BY seqno",
            )
            .bind(&index_name)
            .bind(schema)
            .fetch_all(&self.pool)
            .await?;

            match origin.as_str() {
                "pk" => {}
                "u" => {
                    let columns: Vec<String> = keys.into_iter().filter_map(|(_, c)| c).collect();
                    let name = named
                        .iter()
                        .find(|c| c.kind == "UNIQUE" && same_columns(&c.body, &columns))
                        .map_or_else(
                            || format!("{}_{}_key", table.name, columns.join("_")),
                            |c| c.name.clone(),
                        );
                    table.constraints.push(TableConstraint::unique(name, columns));
                }
                _ => {
                    let mut index = Index::new(&index_name);
                    index.schema = schema.to_string();
                    index.unique = unique != 0;
                    for (_, column) in keys {
                        index = match column {
                            Some(column) => index.column(column),
                            None => index.expr(UNKNOWN_EXPR),
                        };
                    }
                    if partial != 0 {
                        let predicate = self.index_predicate(schema, &index_name).await?;
                        index = index.where_clause(predicate);
                    }
                    table.indices.push(index);
                }
            }
        }

        for constraint in named.into_iter().filter(|c| c.kind == "CHECK") {
            table
                .constraints
                .push(TableConstraint::check(constraint.name, constraint.body));
        }
        Ok(())
    }

    async fn index_predicate(&self, schema: &str, index: &str) -> Result<String> {
        let row: Option<(Option<String>,)> = sqlx::query_as(&format!(
            "SELECT sql FROM {}.sqlite_master WHERE type = 'index' AND name = ?1",
            quote(schema)
        ))
        .bind(index)
        .fetch_optional(&self.pool)
        .await?;
        let sql = row.and_then(|(sql,)| sql).unwrap_or_default();
        Ok(PARTIAL_WHERE
            .captures(&sql)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default())
    }

    async fn foreign_keys(&self, schema: &str, table: &mut Table) -> Result<()> {
        let rows: Vec<(i64, String, String, Option<String>, String, String)> = sqlx::query_as(
            "SELECT id, \"from\", \"table\", \"to\", on_update, on_delete \
             FROM pragma_foreign_key_list(?1, ?2) ORDER BY id, seq",
        )
        .bind(&table.name)
        .bind(schema)
        .fetch_all(&self.pool)
        .await?;

        let mut by_id: BTreeMap<i64, Vec<_>> = BTreeMap::new();
        for row in rows {
            by_id.entry(row.0).or_default().push(row);
        }
        // Only single-column foreign keys map onto a column.
        for (_, from, target, to, on_update, on_delete) in
            by_id.into_values().filter(|rows| rows.len() == 1).flatten()
        {
            let mut fk = ForeignKey::new(QualifiedName::new(schema, target), to.unwrap_or_default());
            fk.on_update = foreign_key_action(&on_update);
            fk.on_delete = foreign_key_action(&on_delete);
            if let Some(column) = table.column_mut(&from) {
                column.references = Some(fk);
            }
        }
        Ok(())
    }
}

impl Introspect for SqliteIntrospector {
    async fn default_schema(&self) -> Result<String> {
        Ok(DEFAULT_SCHEMA.to_string())
    }

    async fn list_tables(&self) -> Result<Vec<QualifiedName>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT schema, name FROM pragma_table_list \
             WHERE type IN ('table', 'virtual') AND schema <> 'temp' \
             AND name NOT LIKE 'sqlite_%' ORDER BY schema, name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(schema, name)| QualifiedName::new(schema, name))
            .collect())
    }

    async fn table(&self, name: &QualifiedName) -> Result<Table> {
        let schema = if name.schema.is_empty() {
            DEFAULT_SCHEMA
        } else {
            name.schema.as_str()
        };
        let ddl = self.table_sql(schema, &name.name).await?;
        let mut table = Table::new(schema, name.name.clone());
        if ddl.trim_start().to_ascii_uppercase().starts_with("CREATE VIRTUAL TABLE") {
            table.fts5 = Some(String::new());
        }

        self.columns(schema, &mut table, &ddl).await?;
        self.indices(schema, &mut table, &ddl).await?;
        self.foreign_keys(schema, &mut table).await?;
        Ok(table)
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Finds `CONSTRAINT <name> <kind> (<body>)` clauses in table DDL.
fn named_constraints(ddl: &str) -> Vec<NamedConstraint> {
    NAMED_CONSTRAINT
        .captures_iter(ddl)
        .filter_map(|caps| {
            let name = caps
                .get(1)
                .map(|m| m.as_str().replace("\"\"", "\""))
                .or_else(|| (2..=4).find_map(|i| caps.get(i)).map(|m| m.as_str().to_string()))?;
            let kind = caps
                .get(5)?
                .as_str()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_ascii_uppercase();
            let open = caps.get(0)?.end();
            Some(NamedConstraint {
                name,
                kind,
                body: balanced(&ddl[open..])?.trim().to_string(),
            })
        })
        .collect()
}

/// Returns the text up to the parenthesis closing an already opened one.
fn balanced(s: &str) -> Option<&str> {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..i]);
                }
            }
            (None, _) => {}
        }
    }
    None
}

/// Compares a constraint column list from DDL with index columns.
fn same_columns(body: &str, columns: &[String]) -> bool {
    let declared: Vec<String> = body
        .split(',')
        .map(|c| c.trim().trim_matches(|q| q == '"' || q == '`').to_string())
        .collect();
    declared == columns
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMMY_TABLE: &str = "CREATE TABLE \"dummy_table\" (\n    \"id1\" INT,\n    \"id2\" TEXT,\n    \
        \"score\" INT,\n    \"color\" TEXT COLLATE nocase DEFAULT 'red',\n    \
        CONSTRAINT \"dummy_table_pkey\" PRIMARY KEY (\"id1\", \"id2\"),\n    \
        CONSTRAINT \"dummy_table_score_color_key\" UNIQUE (\"score\", \"color\"),\n    \
        CONSTRAINT \"dummy_table_score_positive_check\" CHECK (score > 0),\n    \
        CONSTRAINT dummy_table_score_id1_greater_than_check CHECK ((score) > (id1))\n)";

    #[test]
    fn test_named_constraints() {
        let named = named_constraints(DUMMY_TABLE);
        let summary: Vec<(&str, &str, &str)> = named
            .iter()
            .map(|c| (c.name.as_str(), c.kind.as_str(), c.body.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("dummy_table_pkey", "PRIMARY KEY", "\"id1\", \"id2\""),
                ("dummy_table_score_color_key", "UNIQUE", "\"score\", \"color\""),
                ("dummy_table_score_positive_check", "CHECK", "score > 0"),
                ("dummy_table_score_id1_greater_than_check", "CHECK", "(score) > (id1)"),
            ]
        );
    }

    #[test]
    fn test_balanced_ignores_quoted_parentheses() {
        assert_eq!(balanced("rating IN ('G)', 'PG')) rest"), Some("rating IN ('G)', 'PG')"));
        assert_eq!(balanced("unterminated ("), None);
    }

    #[test]
    fn test_same_columns() {
        let columns = vec!["score".to_string(), "color".to_string()];
        assert!(same_columns("\"score\", \"color\"", &columns));
        assert!(!same_columns("\"color\", \"score\"", &columns));
    }

    #[test]
    fn test_partial_where() {
        let sql = "CREATE INDEX \"customer_email_idx\" ON \"customer\" (\"email\") WHERE email LIKE '%gmail'";
        let predicate = PARTIAL_WHERE.captures(sql).and_then(|c| c.get(1)).unwrap();
        assert_eq!(predicate.as_str(), "email LIKE '%gmail'");
    }
}
