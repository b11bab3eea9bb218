//! SQLite dialect.

use super::{
    canonical_type, is_current_timestamp, is_literal, render_create_table, split_type, Dialect,
    DialectKind, GenerateError, Statement,
};
use crate::model::{
    Autoincrement, Column, ConstraintKind, FieldKind, ForeignKey, Index, IndexType,
    QualifiedName, Table, TableConstraint,
};

/// SQLite DDL generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// SQLite puts the schema on the index name, not on the table.
    fn index_target(&self, table: &QualifiedName, index_name: &str) -> (String, String) {
        let name = QualifiedName::new(table.schema.clone(), index_name);
        (
            self.qualified_name(&name),
            self.quote_identifier(&table.name),
        )
    }
}

impl Dialect for SqliteDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn default_type(&self, kind: FieldKind) -> &'static str {
        match kind {
            FieldKind::Blob => "BLOB",
            FieldKind::Boolean => "BOOLEAN",
            FieldKind::Json => "JSON",
            FieldKind::Number => "INT",
            FieldKind::String => "TEXT",
            FieldKind::Time => "DATETIME",
            FieldKind::Expr => "",
        }
    }

    fn native_autoincrement(&self) -> Autoincrement {
        Autoincrement::Rowid
    }

    fn normalize_type(&self, column_type: &str) -> String {
        let canonical = canonical_type(column_type);
        let (base, rest) = split_type(&canonical);
        let base = match base {
            "INTEGER" => "INT",
            "BOOL" => "BOOLEAN",
            other => other,
        };
        format!("{base}{rest}")
    }

    fn render_default(&self, expr: &str) -> String {
        if is_current_timestamp(expr) {
            "(DATETIME('now'))".to_string()
        } else if is_literal(expr) {
            expr.to_string()
        } else {
            format!("({expr})")
        }
    }

    fn allows_forward_references(&self) -> bool {
        true
    }

    /// Foreign key targets cannot be schema-qualified.
    fn references_clause(&self, fk: &ForeignKey) -> String {
        let mut sql = format!(
            "REFERENCES {} ({})",
            self.quote_identifier(&fk.table.name),
            self.quote_identifier(&fk.column)
        );
        if let Some(action) = fk.on_update {
            sql.push_str(" ON UPDATE ");
            sql.push_str(action.as_sql());
        }
        if let Some(action) = fk.on_delete {
            sql.push_str(" ON DELETE ");
            sql.push_str(action.as_sql());
        }
        sql
    }

    fn column_definition(
        &self,
        table: &QualifiedName,
        column: &Column,
    ) -> Result<String, GenerateError> {
        let rowid = match column.autoincrement {
            Autoincrement::None => false,
            Autoincrement::Rowid | Autoincrement::RowidAutoincrement if column.primary_key => true,
            other => {
                return Err(GenerateError::unsupported(
                    self,
                    format!("{} autoincrement", other.as_str()),
                    format!("{table}.{}", column.name),
                ))
            }
        };
        // Only the exact spelling INTEGER makes a rowid alias.
        let data_type = if rowid {
            "INTEGER"
        } else {
            column.column_type.as_str()
        };

        let mut sql = format!("{} {}", self.quote_identifier(&column.name), data_type);

        if column.primary_key {
            sql.push_str(" PRIMARY KEY");
            if column.autoincrement == Autoincrement::RowidAutoincrement {
                sql.push_str(" AUTOINCREMENT");
            }
        }
        if column.not_null {
            sql.push_str(" NOT NULL");
        }
        if column.unique && !column.primary_key {
            sql.push_str(" UNIQUE");
        }
        if let Some(collation) = &column.collation {
            sql.push_str(" COLLATE ");
            sql.push_str(collation);
        }
        if let Some(default) = &column.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&self.render_default(default));
        }
        if let Some(generated) = &column.generated {
            sql.push_str(&format!(
                " GENERATED ALWAYS AS ({}) {}",
                generated.expr,
                if generated.stored { "STORED" } else { "VIRTUAL" }
            ));
        }
        if let Some(fk) = &column.references {
            sql.push(' ');
            sql.push_str(&self.references_clause(fk));
        }
        Ok(sql)
    }

    fn create_table(&self, table: &Table) -> Result<Vec<Statement>, GenerateError> {
        let Some(options) = &table.fts5 else {
            return render_create_table(self, table);
        };
        let mut args: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
        if !options.trim().is_empty() {
            args.push(options.trim().to_string());
        }
        Ok(vec![Statement::new(format!(
            "CREATE VIRTUAL TABLE {} USING fts5({})",
            self.qualified_name(&table.qualified_name()),
            args.join(", ")
        ))])
    }

    fn create_column(
        &self,
        table: &QualifiedName,
        column: &Column,
    ) -> Result<Statement, GenerateError> {
        let context = format!("{table}.{}", column.name);
        if column.primary_key {
            return Err(GenerateError::unsupported(self, "adding a PRIMARY KEY column", context));
        }
        if column.unique {
            return Err(GenerateError::unsupported(self, "adding a UNIQUE column", context));
        }
        if column.generated.as_ref().is_some_and(|g| g.stored) {
            return Err(GenerateError::unsupported(
                self,
                "adding a STORED generated column",
                context,
            ));
        }
        Ok(Statement::new(format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.qualified_name(table),
            self.column_definition(table, column)?
        )))
    }

    fn create_index(&self, table: &QualifiedName, index: &Index) -> Result<Statement, GenerateError> {
        if index.index_type != IndexType::BTree {
            return Err(GenerateError::unsupported(
                self,
                format!("{} indices", index.index_type.as_sql()),
                &index.name,
            ));
        }
        if !index.include.is_empty() {
            return Err(GenerateError::unsupported(self, "INCLUDE columns", &index.name));
        }
        let (name, on) = self.index_target(table, &index.name);
        let mut sql = format!(
            "CREATE {}INDEX {name} ON {on} ({})",
            if index.unique { "UNIQUE " } else { "" },
            self.index_keys(index)
        );
        if let Some(predicate) = &index.where_expr {
            sql.push_str(" WHERE ");
            sql.push_str(predicate);
        }
        Ok(Statement::new(sql))
    }

    /// Only UNIQUE can be added after the fact, as a unique index.
    fn create_constraint(
        &self,
        table: &QualifiedName,
        constraint: &TableConstraint,
    ) -> Result<Statement, GenerateError> {
        if constraint.kind != ConstraintKind::Unique {
            return Err(GenerateError::unsupported(
                self,
                format!("adding a {} constraint", constraint.kind.as_sql()),
                format!("{table}.{}", constraint.name),
            ));
        }
        let (name, on) = self.index_target(table, &constraint.name);
        Ok(Statement::new(format!(
            "CREATE UNIQUE INDEX {name} ON {on} ({})",
            self.column_list(&constraint.columns)
        )))
    }

    fn add_foreign_key(
        &self,
        table: &QualifiedName,
        column: &str,
        _fk: &ForeignKey,
    ) -> Result<Statement, GenerateError> {
        Err(GenerateError::unsupported(
            self,
            "adding a foreign key",
            format!("{table}.{column}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ForeignKeyAction;

    fn main(name: &str) -> QualifiedName {
        QualifiedName::new("main", name)
    }

    #[test]
    fn test_rowid_primary_key() {
        let dialect = SqliteDialect::new();
        let col = Column::new("actor_id", "INT")
            .primary_key()
            .autoincrement(Autoincrement::Rowid);
        assert_eq!(
            dialect.column_definition(&main("actor"), &col).unwrap(),
            "\"actor_id\" INTEGER PRIMARY KEY NOT NULL"
        );

        let col = col.autoincrement(Autoincrement::RowidAutoincrement);
        assert_eq!(
            dialect.column_definition(&main("actor"), &col).unwrap(),
            "\"actor_id\" INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL"
        );
    }

    #[test]
    fn test_rowid_requires_primary_key() {
        let col = Column::new("n", "INTEGER").autoincrement(Autoincrement::Rowid);
        assert!(SqliteDialect::new()
            .column_definition(&main("t"), &col)
            .unwrap_err()
            .is_unsupported());
    }

    #[test]
    fn test_defaults_are_parenthesized() {
        let dialect = SqliteDialect::new();
        let col = Column::new("last_update", "DATETIME")
            .not_null()
            .default_expr("NOW()");
        assert_eq!(
            dialect.column_definition(&main("actor"), &col).unwrap(),
            "\"last_update\" DATETIME NOT NULL DEFAULT (DATETIME('now'))"
        );
        let col = Column::new("color", "TEXT")
            .collate("nocase")
            .default_expr("'red'");
        assert_eq!(
            dialect.column_definition(&main("t"), &col).unwrap(),
            "\"color\" TEXT COLLATE nocase DEFAULT 'red'"
        );
    }

    #[test]
    fn test_references_are_unqualified() {
        let col = Column::new("country_id", "INT").references(
            ForeignKey::new(main("country"), "country_id").on_delete(ForeignKeyAction::Restrict),
        );
        assert_eq!(
            SqliteDialect::new()
                .column_definition(&main("city"), &col)
                .unwrap(),
            "\"country_id\" INT REFERENCES \"country\" (\"country_id\") ON DELETE RESTRICT"
        );
    }

    #[test]
    fn test_generated_virtual() {
        let col = Column::new("full_name", "TEXT").generated("first_name || ' ' || last_name", false);
        assert_eq!(
            SqliteDialect::new()
                .column_definition(&main("actor"), &col)
                .unwrap(),
            "\"full_name\" TEXT GENERATED ALWAYS AS (first_name || ' ' || last_name) VIRTUAL"
        );
    }

    #[test]
    fn test_fts5_virtual_table() {
        let mut table = Table::new("main", "film_text")
            .with_column(Column::new("title", "TEXT"))
            .with_column(Column::new("description", "TEXT"));
        table.fts5 = Some("content='film', content_rowid='film_id'".into());
        let statements = SqliteDialect::new().create_table(&table).unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(
            statements[0].sql,
            "CREATE VIRTUAL TABLE \"main\".\"film_text\" USING fts5(title, description, \
             content='film', content_rowid='film_id')"
        );
    }

    #[test]
    fn test_index_name_carries_schema() {
        let index = Index::new("customer_data_idx").expr("CAST(JSON_EXTRACT(data, '$.age') AS INT)");
        let stmt = SqliteDialect::new()
            .create_index(&main("customer"), &index)
            .unwrap();
        assert_eq!(
            stmt.sql,
            "CREATE INDEX \"main\".\"customer_data_idx\" ON \"customer\" \
             ((CAST(JSON_EXTRACT(data, '$.age') AS INT)))"
        );
    }

    #[test]
    fn test_add_column_restrictions() {
        let dialect = SqliteDialect::new();
        let table = main("staff");
        assert!(dialect
            .create_column(&table, &Column::new("code", "TEXT").unique())
            .unwrap_err()
            .is_unsupported());
        assert!(dialect
            .create_column(&table, &Column::new("x", "INT").generated("1", true))
            .unwrap_err()
            .is_unsupported());
        assert_eq!(
            dialect
                .create_column(&table, &Column::new("x", "INT").generated("1", false))
                .unwrap()
                .sql,
            "ALTER TABLE \"main\".\"staff\" ADD COLUMN \"x\" INT GENERATED ALWAYS AS (1) VIRTUAL"
        );
    }

    #[test]
    fn test_unique_constraint_becomes_index() {
        let stmt = SqliteDialect::new()
            .create_constraint(
                &main("customer"),
                &TableConstraint::unique(
                    "customer_email_first_name_key",
                    vec!["email".into(), "first_name".into()],
                ),
            )
            .unwrap();
        assert_eq!(
            stmt.sql,
            "CREATE UNIQUE INDEX \"main\".\"customer_email_first_name_key\" ON \"customer\" \
             (\"email\", \"first_name\")"
        );
        assert!(SqliteDialect::new()
            .create_constraint(&main("t"), &TableConstraint::check("t_check", "a > 0"))
            .unwrap_err()
            .is_unsupported());
    }
}
