//! PostgreSQL dialect.

use super::{canonical_type, is_current_timestamp, split_type, Dialect, DialectKind, GenerateError};
use crate::model::{Autoincrement, Column, FieldKind, QualifiedName};

/// PostgreSQL DDL generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn serial_type(column_type: &str) -> Option<&'static str> {
        match canonical_type(column_type).as_str() {
            "INT" | "INTEGER" | "INT4" => Some("SERIAL"),
            "BIGINT" | "INT8" => Some("BIGSERIAL"),
            "SMALLINT" | "INT2" => Some("SMALLSERIAL"),
            _ => None,
        }
    }
}

impl Dialect for PostgresDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
    }

    fn default_type(&self, kind: FieldKind) -> &'static str {
        match kind {
            FieldKind::Blob => "BYTEA",
            FieldKind::Boolean => "BOOLEAN",
            FieldKind::Json => "JSONB",
            FieldKind::Number => "INT",
            FieldKind::String => "TEXT",
            FieldKind::Time => "TIMESTAMPTZ",
            FieldKind::Expr => "",
        }
    }

    fn native_autoincrement(&self) -> Autoincrement {
        Autoincrement::Identity
    }

    fn normalize_type(&self, column_type: &str) -> String {
        let canonical = canonical_type(column_type);
        let (base, rest) = split_type(&canonical);
        let base = match base {
            "INT" | "INTEGER" | "INT4" | "SERIAL" | "SERIAL4" => "INT",
            "BIGINT" | "INT8" | "BIGSERIAL" | "SERIAL8" => "BIGINT",
            "SMALLINT" | "INT2" | "SMALLSERIAL" | "SERIAL2" => "SMALLINT",
            "CHARACTER VARYING" | "VARCHAR" => "VARCHAR",
            "CHARACTER" | "CHAR" | "BPCHAR" => "CHAR",
            "BOOL" | "BOOLEAN" => "BOOLEAN",
            "DECIMAL" | "NUMERIC" => "NUMERIC",
            "FLOAT8" | "DOUBLE PRECISION" => "DOUBLE PRECISION",
            "FLOAT4" | "REAL" => "REAL",
            "TIMESTAMP" | "TIMESTAMP WITHOUT TIME ZONE" => "TIMESTAMP",
            "TIMESTAMPTZ" | "TIMESTAMP WITH TIME ZONE" => "TIMESTAMPTZ",
            "TIME" | "TIME WITHOUT TIME ZONE" => "TIME",
            "TIMETZ" | "TIME WITH TIME ZONE" => "TIMETZ",
            other => other,
        };
        format!("{base}{rest}")
    }

    fn render_default(&self, expr: &str) -> String {
        if is_current_timestamp(expr) {
            "NOW()".to_string()
        } else {
            expr.to_string()
        }
    }

    fn column_definition(
        &self,
        table: &QualifiedName,
        column: &Column,
    ) -> Result<String, GenerateError> {
        let context = format!("{table}.{}", column.name);
        let data_type = match column.autoincrement {
            Autoincrement::Serial => Self::serial_type(&column.column_type).ok_or_else(|| {
                GenerateError::unsupported(
                    self,
                    format!("SERIAL for type {}", column.column_type),
                    &context,
                )
            })?,
            Autoincrement::None | Autoincrement::Identity => column.column_type.as_str(),
            other => {
                return Err(GenerateError::unsupported(
                    self,
                    format!("{} autoincrement", other.as_str()),
                    &context,
                ))
            }
        };

        let mut sql = format!("{} {}", self.quote_identifier(&column.name), data_type);

        if column.autoincrement == Autoincrement::Identity {
            sql.push_str(" GENERATED BY DEFAULT AS IDENTITY");
        }

        // Virtual generated columns are not available, so every generated
        // column is stored.
        if let Some(generated) = &column.generated {
            sql.push_str(&format!(" GENERATED ALWAYS AS ({}) STORED", generated.expr));
        }

        if let Some(collation) = &column.collation {
            sql.push_str(&format!(" COLLATE {}", self.quote_identifier(collation)));
        }

        if column.primary_key {
            sql.push_str(" PRIMARY KEY");
        } else {
            if column.not_null {
                sql.push_str(" NOT NULL");
            }
            if column.unique {
                sql.push_str(" UNIQUE");
            }
        }

        if let Some(default) = &column.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&self.render_default(default));
        }

        if let Some(fk) = &column.references {
            sql.push(' ');
            sql.push_str(&self.references_clause(fk));
        }

        Ok(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ForeignKey, ForeignKeyAction, Index, IndexType, Table, TableConstraint};

    fn actor() -> QualifiedName {
        QualifiedName::new("public", "actor")
    }

    #[test]
    fn test_identity_primary_key() {
        let col = Column::new("actor_id", "INTEGER")
            .primary_key()
            .autoincrement(Autoincrement::Identity);
        assert_eq!(
            PostgresDialect::new()
                .column_definition(&actor(), &col)
                .unwrap(),
            "\"actor_id\" INTEGER GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY"
        );
    }

    #[test]
    fn test_serial_maps_type() {
        let col = Column::new("id", "BIGINT")
            .primary_key()
            .autoincrement(Autoincrement::Serial);
        assert_eq!(
            PostgresDialect::new()
                .column_definition(&actor(), &col)
                .unwrap(),
            "\"id\" BIGSERIAL PRIMARY KEY"
        );
    }

    #[test]
    fn test_rowid_is_unsupported() {
        let col = Column::new("id", "INTEGER").autoincrement(Autoincrement::Rowid);
        let err = PostgresDialect::new()
            .column_definition(&actor(), &col)
            .unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_generated_is_always_stored() {
        let col = Column::new("full_name", "TEXT").generated("first_name || ' ' || last_name", false);
        assert_eq!(
            PostgresDialect::new()
                .column_definition(&actor(), &col)
                .unwrap(),
            "\"full_name\" TEXT GENERATED ALWAYS AS (first_name || ' ' || last_name) STORED"
        );
    }

    #[test]
    fn test_default_translation() {
        let col = Column::new("last_update", "TIMESTAMPTZ")
            .not_null()
            .default_expr("DATETIME('now')");
        assert_eq!(
            PostgresDialect::new()
                .column_definition(&actor(), &col)
                .unwrap(),
            "\"last_update\" TIMESTAMPTZ NOT NULL DEFAULT NOW()"
        );
    }

    #[test]
    fn test_references_are_schema_qualified() {
        let col = Column::new("country_id", "INT").not_null().references(
            ForeignKey::new(QualifiedName::new("public", "country"), "country_id")
                .on_update(ForeignKeyAction::Cascade)
                .on_delete(ForeignKeyAction::Restrict),
        );
        assert_eq!(
            PostgresDialect::new()
                .column_definition(&QualifiedName::new("public", "city"), &col)
                .unwrap(),
            "\"country_id\" INT NOT NULL REFERENCES \"public\".\"country\" (\"country_id\") \
             ON UPDATE CASCADE ON DELETE RESTRICT"
        );
    }

    #[test]
    fn test_create_table_with_constraints_and_indices() {
        let table = Table::new("public", "dummy_table")
            .with_column(Column::new("id1", "INT"))
            .with_column(Column::new("id2", "TEXT"))
            .with_constraint(TableConstraint::primary_key(
                "dummy_table_pkey",
                vec!["id1".into(), "id2".into()],
            ))
            .with_constraint(TableConstraint::check("dummy_table_id1_check", "id1 > 0"))
            .with_index(
                Index::new("dummy_table_id2_idx")
                    .column("id2")
                    .where_clause("id1 > 10"),
            );
        let statements = PostgresDialect::new().create_table(&table).unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(
            statements[0].sql,
            "CREATE TABLE \"public\".\"dummy_table\" (\n    \"id1\" INT,\n    \"id2\" TEXT,\n    \
             CONSTRAINT \"dummy_table_pkey\" PRIMARY KEY (\"id1\", \"id2\"),\n    \
             CONSTRAINT \"dummy_table_id1_check\" CHECK (id1 > 0)\n)"
        );
        assert_eq!(
            statements[1].sql,
            "CREATE INDEX \"dummy_table_id2_idx\" ON \"public\".\"dummy_table\" (\"id2\") WHERE id1 > 10"
        );
        assert!(statements.iter().all(|s| s.args.is_empty()));
    }

    #[test]
    fn test_create_index_with_method_expression_and_include() {
        let index = Index::new("customer_data_idx")
            .expr("data->>'age'")
            .index_type(IndexType::Gin)
            .include("email");
        let stmt = PostgresDialect::new()
            .create_index(&QualifiedName::new("public", "customer"), &index)
            .unwrap();
        assert_eq!(
            stmt.sql,
            "CREATE INDEX \"customer_data_idx\" ON \"public\".\"customer\" USING gin \
             ((data->>'age')) INCLUDE (\"email\")"
        );
    }

    #[test]
    fn test_fulltext_index_is_unsupported() {
        let index = Index::new("film_text_idx")
            .column("title")
            .index_type(IndexType::FullText);
        assert!(PostgresDialect::new()
            .create_index(&QualifiedName::new("public", "film_text"), &index)
            .unwrap_err()
            .is_unsupported());
    }

    #[test]
    fn test_add_column_and_foreign_key() {
        let dialect = PostgresDialect::new();
        let table = QualifiedName::new("public", "staff");
        let stmt = dialect
            .create_column(&table, &Column::new("email", "TEXT"))
            .unwrap();
        assert_eq!(
            stmt.sql,
            "ALTER TABLE \"public\".\"staff\" ADD COLUMN \"email\" TEXT"
        );

        let fk = ForeignKey::new(QualifiedName::new("public", "store"), "store_id");
        let stmt = dialect.add_foreign_key(&table, "store_id", &fk).unwrap();
        assert_eq!(
            stmt.sql,
            "ALTER TABLE \"public\".\"staff\" ADD CONSTRAINT \"staff_store_id_fkey\" \
             FOREIGN KEY (\"store_id\") REFERENCES \"public\".\"store\" (\"store_id\")"
        );
    }

    #[test]
    fn test_normalize_type() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.normalize_type("character varying(45)"), "VARCHAR(45)");
        assert_eq!(dialect.normalize_type("VARCHAR(45)"), "VARCHAR(45)");
        assert_eq!(dialect.normalize_type("integer"), "INT");
        assert_eq!(dialect.normalize_type("numeric(4,2)"), "NUMERIC(4,2)");
        assert_eq!(dialect.normalize_type("DECIMAL(4, 2)"), "NUMERIC(4,2)");
        assert_eq!(
            dialect.normalize_type("timestamp with time zone"),
            "TIMESTAMPTZ"
        );
        assert_eq!(dialect.normalize_type("text[]"), "TEXT[]");
    }
}
