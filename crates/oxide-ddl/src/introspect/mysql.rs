//! MySQL introspection through `information_schema`.
//!
//! Text columns are cast to `CHAR` because several `information_schema`
//! views report them with binary collations.

use std::collections::BTreeMap;

use oxide_ddl_core::model::{
    Autoincrement, Column, ConstraintKind, ForeignKey, Generated, Index, IndexType, QualifiedName,
    Table, TableConstraint, UNKNOWN_EXPR,
};
use sqlx::mysql::MySqlPool;

use super::{foreign_key_action, primary_key_name, split_columns, Introspect};
use crate::error::Result;

const LIST_TABLES_SQL: &str = r"
SELECT CAST(table_schema AS CHAR), CAST(table_name AS CHAR)
FROM information_schema.tables
WHERE table_type = 'BASE TABLE'
  AND table_schema NOT IN ('mysql', 'information_schema', 'performance_schema', 'sys')
ORDER BY 1, 2
";

const COLUMNS_SQL: &str = r"
SELECT
    CAST(column_name AS CHAR),
    CAST(column_type AS CHAR),
    CAST(is_nullable AS CHAR),
    CAST(column_default AS CHAR),
    CAST(extra AS CHAR),
    CAST(generation_expression AS CHAR)
FROM information_schema.columns
WHERE table_schema = ? AND table_name = ?
ORDER BY ordinal_position
";

const CONSTRAINTS_SQL: &str = r"
SELECT
    CAST(tc.constraint_name AS CHAR),
    CAST(tc.constraint_type AS CHAR),
    CAST(GROUP_CONCAT(kcu.column_name ORDER BY kcu.ordinal_position) AS CHAR),
    CAST(MAX(cc.check_clause) AS CHAR)
FROM information_schema.table_constraints tc
LEFT JOIN information_schema.key_column_usage kcu
    ON kcu.constraint_schema = tc.constraint_schema
    AND kcu.constraint_name = tc.constraint_name
    AND kcu.table_name = tc.table_name
LEFT JOIN information_schema.check_constraints cc
    ON cc.constraint_schema = tc.constraint_schema
    AND cc.constraint_name = tc.constraint_name
WHERE tc.table_schema = ? AND tc.table_name = ?
  AND tc.constraint_type IN ('PRIMARY KEY', 'UNIQUE', 'CHECK')
GROUP BY tc.constraint_name, tc.constraint_type
ORDER BY 1
";

const FOREIGN_KEYS_SQL: &str = r"
SELECT
    CAST(kcu.constraint_name AS CHAR),
    CAST(kcu.column_name AS CHAR),
    CAST(kcu.referenced_table_schema AS CHAR),
    CAST(kcu.referenced_table_name AS CHAR),
    CAST(kcu.referenced_column_name AS CHAR),
    CAST(rc.update_rule AS CHAR),
    CAST(rc.delete_rule AS CHAR)
FROM information_schema.key_column_usage kcu
JOIN information_schema.referential_constraints rc
    ON rc.constraint_schema = kcu.constraint_schema
    AND rc.constraint_name = kcu.constraint_name
WHERE kcu.table_schema = ? AND kcu.table_name = ?
  AND kcu.referenced_table_name IS NOT NULL
ORDER BY kcu.constraint_name, kcu.ordinal_position
";

const INDICES_SQL: &str = r"
SELECT
    CAST(index_name AS CHAR),
    CAST(MIN(non_unique) AS SIGNED),
    CAST(MIN(index_type) AS CHAR),
    CAST(GROUP_CONCAT(COALESCE(column_name, '') ORDER BY seq_in_index) AS CHAR)
FROM information_schema.statistics
WHERE table_schema = ? AND table_name = ? AND index_name <> 'PRIMARY'
GROUP BY index_name
ORDER BY index_name
";

/// Reads the schema of a MySQL database.
#[derive(Debug, Clone)]
pub struct MySqlIntrospector {
    pool: MySqlPool,
}

impl MySqlIntrospector {
    /// Creates an introspector over `pool`.
    #[must_use]
    pub const fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn columns(&self, table: &mut Table) -> Result<()> {
        type Row = (String, String, String, Option<String>, String, Option<String>);
        let rows: Vec<Row> = sqlx::query_as(COLUMNS_SQL)
            .bind(&table.schema)
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await?;

        for (name, column_type, nullable, default, extra, generation) in rows {
            let mut column = Column::new(name, column_type);
            column.not_null = nullable.eq_ignore_ascii_case("NO");
            let extra = extra.to_ascii_uppercase();
            if extra.contains("AUTO_INCREMENT") {
                column.autoincrement = Autoincrement::AutoIncrement;
            }
            if extra.contains("ON UPDATE CURRENT_TIMESTAMP") {
                column.on_update_current_timestamp = true;
            }
            if extra.contains("GENERATED") && !extra.contains("DEFAULT_GENERATED") {
                column.generated = Some(Generated {
                    expr: generation.unwrap_or_default(),
                    stored: extra.contains("STORED"),
                });
            } else {
                column.default = default;
            }
            table.columns.push(column);
        }
        Ok(())
    }

    async fn constraints(&self, table: &mut Table) -> Result<()> {
        let rows: Vec<(String, String, Option<String>, Option<String>)> =
            sqlx::query_as(CONSTRAINTS_SQL)
                .bind(&table.schema)
                .bind(&table.name)
                .fetch_all(&self.pool)
                .await?;

        for (name, kind, columns, check) in rows {
            let columns = split_columns(columns.as_deref().unwrap_or_default());
            let constraint = match kind.as_str() {
                // Every MySQL primary key is called PRIMARY.
                "PRIMARY KEY" => TableConstraint::primary_key(primary_key_name(&table.name), columns),
                "UNIQUE" => TableConstraint::unique(name, columns),
                _ => TableConstraint::check(name, check.unwrap_or_default()),
            };
            table.constraints.push(constraint);
        }
        Ok(())
    }

    async fn foreign_keys(&self, table: &mut Table) -> Result<()> {
        type Row = (String, String, String, String, String, String, String);
        let rows: Vec<Row> = sqlx::query_as(FOREIGN_KEYS_SQL)
            .bind(&table.schema)
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await?;

        let mut by_name: BTreeMap<String, Vec<Row>> = BTreeMap::new();
        for row in rows {
            by_name.entry(row.0.clone()).or_default().push(row);
        }
        for (_, column, schema, target, target_column, on_update, on_delete) in
            by_name.into_values().filter(|rows| rows.len() == 1).flatten()
        {
            let mut fk = ForeignKey::new(QualifiedName::new(schema, target), target_column);
            fk.on_update = foreign_key_action(&on_update);
            fk.on_delete = foreign_key_action(&on_delete);
            if let Some(column) = table.column_mut(&column) {
                column.references = Some(fk);
            }
        }
        Ok(())
    }

    async fn indices(&self, table: &mut Table) -> Result<()> {
        let rows: Vec<(String, i64, String, Option<String>)> = sqlx::query_as(INDICES_SQL)
            .bind(&table.schema)
            .bind(&table.name)
            .fetch_all(&self.pool)
            .await?;

        let mut indices = Vec::new();
        for (name, non_unique, index_type, keys) in rows {
            // UNIQUE constraints are also listed as indices.
            let is_constraint = table
                .constraints
                .iter()
                .any(|c| c.kind == ConstraintKind::Unique && c.name == name);
            if is_constraint {
                continue;
            }
            let mut index =
                Index::new(name).index_type(index_type.parse().unwrap_or(IndexType::BTree));
            index.schema.clone_from(&table.schema);
            index.unique = non_unique == 0;
            for key in keys.as_deref().unwrap_or_default().split(',') {
                // Functional key parts have no column name.
                index = if key.is_empty() {
                    index.expr(UNKNOWN_EXPR)
                } else {
                    index.column(key)
                };
            }
            indices.push(index);
        }
        table.indices.extend(indices);
        Ok(())
    }
}

impl Introspect for MySqlIntrospector {
    async fn default_schema(&self) -> Result<String> {
        let (schema,): (Option<String>,) = sqlx::query_as("SELECT CAST(DATABASE() AS CHAR)")
            .fetch_one(&self.pool)
            .await?;
        Ok(schema.unwrap_or_default())
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
