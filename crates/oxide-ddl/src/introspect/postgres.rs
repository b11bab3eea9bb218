//! PostgreSQL introspection through `pg_catalog`.

use oxide_ddl_core::model::{
    Autoincrement, Column, ConstraintKind, ForeignKey, ForeignKeyAction, Generated, Index,
    IndexType, QualifiedName, Table, TableConstraint,
};
use sqlx::postgres::PgPool;

use super::Introspect;
use crate::error::Result;

const LIST_TABLES_SQL: &str = r"
SELECT n.nspname::text, c.relname::text
FROM pg_class c
JOIN pg_namespace n ON n.oid = c.relnamespace
WHERE c.relkind IN ('r', 'p')
  AND n.nspname NOT IN ('pg_catalog', 'information_schema')
  AND n.nspname NOT LIKE 'pg_toast%'
  AND n.nspname NOT LIKE 'pg_temp%'
ORDER BY 1, 2
";

const COLUMNS_SQL: &str = r"
SELECT
    a.attname::text,
    format_type(a.atttypid, a.atttypmod),
    a.attnotnull,
    pg_get_expr(d.adbin, d.adrelid),
    a.attidentity::text,
    a.attgenerated::text,
    CASE WHEN a.attcollation <> t.typcollation THEN co.collname::text END
FROM pg_attribute a
JOIN pg_class c ON c.oid = a.attrelid
JOIN pg_namespace n ON n.oid = c.relnamespace
JOIN pg_type t ON t.oid = a.atttypid
LEFT JOIN pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
LEFT JOIN pg_collation co ON co.oid = a.attcollation
WHERE n.nspname = $1 AND c.relname = $2 AND a.attnum > 0 AND NOT a.attisdropped
ORDER BY a.attnum
";

const CONSTRAINTS_SQL: &str = r"
SELECT
    con.conname::text,
    con.contype::text,
    CASE WHEN con.contype = 'c' THEN pg_get_expr(con.conbin, con.conrelid) END,
    ARRAY(
        SELECT att.attname::text
        FROM unnest(con.conkey) WITH ORDINALITY AS k(attnum, ord)
        JOIN pg_attribute att ON att.attrelid = con.conrelid AND att.attnum = k.attnum
        ORDER BY k.ord
    )
FROM pg_constraint con
JOIN pg_class c ON c.oid = con.conrelid
JOIN pg_namespace n ON n.oid = c.relnamespace
WHERE n.nspname = $1 AND c.relname = $2 AND con.contype IN ('p', 'u', 'c')
ORDER BY con.conname
";

const FOREIGN_KEYS_SQL: &str = r"
SELECT
    att.attname::text,
    fn.nspname::text,
    fc.relname::text,
    fatt.attname::text,
    con.confupdtype::text,
    con.confdeltype::text
FROM pg_constraint con
JOIN pg_class c ON c.oid = con.conrelid
JOIN pg_namespace n ON n.oid = c.relnamespace
JOIN pg_class fc ON fc.oid = con.confrelid
JOIN pg_namespace fn ON fn.oid = fc.relnamespace
JOIN pg_attribute att ON att.attrelid = con.conrelid AND att.attnum = con.conkey[1]
JOIN pg_attribute fatt ON fatt.attrelid = con.confrelid AND fatt.attnum = con.confkey[1]
WHERE n.nspname = $1 AND c.relname = $2 AND con.contype = 'f'
  AND cardinality(con.conkey) = 1
";

const INDICES_SQL: &str = r"
SELECT
    i.relname::text,
    ix.indisunique,
    am.amname::text,
    pg_get_expr(ix.indpred, ix.indrelid),
    ARRAY(
        SELECT pg_get_indexdef(ix.indexrelid, k, true)
        FROM generate_series(1, ix.indnkeyatts::int) AS k
        ORDER BY k
    ),
    ARRAY(
        SELECT a.attname::text
        FROM generate_series(ix.indnkeyatts::int + 1, ix.indnatts::int) AS k
        JOIN pg_attribute a ON a.attrelid = ix.indrelid AND a.attnum = ix.indkey[k - 1]
        ORDER BY k
    )
FROM pg_index ix
JOIN pg_class i ON i.oid = ix.indexrelid
JOIN pg_class t ON t.oid = ix.indrelid
JOIN pg_namespace n ON n.oid = t.relnamespace
JOIN pg_am am ON am.oid = i.relam
WHERE n.nspname = $1 AND t.relname = $2 AND NOT ix.indisprimary
ORDER BY i.relname
";

/// Reads the schema of a PostgreSQL database.
#[derive(Debug, Clone)]
pub struct PostgresIntrospector {
    pool: PgPool,
}

impl PostgresIntrospector {
    /// Creates an introspector over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn columns(&self, table: &mut Table) -> Result<()> {
        type Row = (
            String,
            String,
            bool,
            Option<String>,
            String,
            String,
            Option<String>,
        );
        let rows: Vec<Row> = sqlx::query_as(COLUMNS_SQL)
            .bind(&table.schema)
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await?;

        for (name, column_type, not_null, default, identity, generated, collation) in rows {
            let mut column = Column::new(name, column_type);
            column.not_null = not_null;
            column.collation = collation;
            if !identity.is_empty() {
                column.autoincrement = Autoincrement::Identity;
            }
            // The generation expression is stored as the column default.
            if generated == "s" {
                column.generated = Some(Generated {
                    expr: default.unwrap_or_default(),
                    stored: true,
                });
            } else if let Some(default) = default {
                if default.starts_with("nextval(") {
                    column.autoincrement = Autoincrement::Serial;
                } else {
                    column.default = Some(default);
                }
            }
            table.columns.push(column);
        }
        Ok(())
    }

    async fn constraints(&self, table: &mut Table) -> Result<()> {
        let rows: Vec<(String, String, Option<String>, Vec<String>)> =
            sqlx::query_as(CONSTRAINTS_SQL)
                .bind(&table.schema)
                .bind(&table.name)
                .fetch_all(&self.pool)
                .await?;

        for (name, kind, check, columns) in rows {
            let constraint = match kind.as_str() {
                "p" => TableConstraint::primary_key(name, columns),
                "u" => TableConstraint::unique(name, columns),
                _ => TableConstraint::check(name, check.unwrap_or_default()),
            };
            table.constraints.push(constraint);
        }
        Ok(())
    }

    async fn foreign_keys(&self, table: &mut Table) -> Result<()> {
        let rows: Vec<(String, String, String, String, String, String)> =
            sqlx::query_as(FOREIGN_KEYS_SQL)
                .bind(&table.schema)
                .bind(&table.name)
                .fetch_all(&self.pool)
                .await?;

        for (column, schema, target, target_column, on_update, on_delete) in rows {
            let mut fk = ForeignKey::new(QualifiedName::new(schema, target), target_column);
            fk.on_update = referential_action(&on_update);
            fk.on_delete = referential_action(&on_delete);
            if let Some(column) = table.column_mut(&column) {
                column.references = Some(fk);
            }
        }
        Ok(())
    }

    async fn indices(&self, table: &mut Table) -> Result<()> {
        type Row = (String, bool, String, Option<String>, Vec<String>, Vec<String>);
        let rows: Vec<Row> = sqlx::query_as(INDICES_SQL)
            .bind(&table.schema)
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await?;

        let constraint_names: Vec<&str> = table
            .constraints
            .iter()
            .filter(|c| c.kind != ConstraintKind::Check)
            .map(|c| c.name.as_str())
            .collect();
        let mut indices = Vec::new();
        for (name, unique, method, predicate, keys, include) in rows {
            // UNIQUE constraints are backed by an index of the same name.
            if constraint_names.contains(&name.as_str()) {
                continue;
            }
            let mut index = Index::new(name).index_type(method.parse().unwrap_or(IndexType::BTree));
            index.schema.clone_from(&table.schema);
            index.unique = unique;
            for key in keys {
                index = if is_identifier(&key) {
                    index.column(key.trim_matches('"'))
                } else {
                    index.expr(key)
                };
            }
            index.include = include;
            if let Some(predicate) = predicate {
                index = index.where_clause(predicate);
            }
            indices.push(index);
        }
        table.indices.extend(indices);
        Ok(())
    }
}

impl Introspect for PostgresIntrospector {
    async fn default_schema(&self) -> Result<String> {
        let (schema,): (Option<String>,) = sqlx::query_as("SELECT current_schema()::text")
            .fetch_one(&self.pool)
            .await?;
        Ok(schema.unwrap_or_else(|| "public".to_string()))
    }

    async fn list_tables(&self) -> Result<Vec<QualifiedName>> {
        let rows: Vec<(String, String)> = sqlx::query_as(LIST_TABLES_SQL)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(schema, name)| QualifiedName::new(schema, name))
            .collect())
    }

    async fn table(&self, name: &QualifiedName) -> Result<Table> {
        let schema = if name.schema.is_empty() {
            self.default_schema().await?
        } else {
            name.schema.clone()
        };
        let mut table = Table::new(schema, name.name.clone());
        self.columns(&mut table).await?;
        self.constraints(&mut table).await?;
        self.foreign_keys(&mut table).await?;
        self.indices(&mut table).await?;
        Ok(table)
    }
}

/// Decodes `pg_constraint.confupdtype` and `confdeltype`.
fn referential_action(code: &str) -> Option<ForeignKeyAction> {
    match code {
        "r" => Some(ForeignKeyAction::Restrict),
        "c" => Some(ForeignKeyAction::Cascade),
        "n" => Some(ForeignKeyAction::SetNull),
        "d" => Some(ForeignKeyAction::SetDefault),
        _ => None,
    }
}

/// True for index keys that are a plain, possibly quoted, column name.
fn is_identifier(key: &str) -> bool {
    if let Some(inner) = key.strip_prefix('"').and_then(|k| k.strip_suffix('"')) {
        return !inner.contains('"');
    }
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
