//! MySQL dialect.

use super::{
    canonical_type, is_current_timestamp, is_literal, split_type, Dialect, DialectKind,
    GenerateError, Statement,
};
use crate::model::{Autoincrement, Column, FieldKind, Index, IndexType, QualifiedName};

/// MySQL DDL generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

const INTEGER_TYPES: &[&str] = &["TINYINT", "SMALLINT", "MEDIUMINT", "INT", "INTEGER", "BIGINT"];

impl Dialect for MySqlDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::MySql
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn default_type(&self, kind: FieldKind) -> &'static str {
        match kind {
            FieldKind::Blob => "LONGBLOB",
            FieldKind::Boolean => "BOOLEAN",
            FieldKind::Json => "JSON",
            FieldKind::Number => "INT",
            FieldKind::String => "VARCHAR(255)",
            FieldKind::Time => "DATETIME",
            FieldKind::Expr => "",
        }
    }

    fn native_autoincrement(&self) -> Autoincrement {
        Autoincrement::AutoIncrement
    }

    fn normalize_type(&self, column_type: &str) -> String {
        let canonical = canonical_type(column_type);
        let (base, rest) = split_type(&canonical);
        if base == "TINYINT" && rest.starts_with("(1)") {
            return "BOOLEAN".to_string();
        }
        let base = match base {
            "BOOL" | "BOOLEAN" => "BOOLEAN",
            "INTEGER" => "INT",
            "NUMERIC" | "DECIMAL" => "DECIMAL",
            "DOUBLE PRECISION" | "REAL" => "DOUBLE",
            other => other,
        };
        // Integer display widths carry no meaning.
        let rest = if INTEGER_TYPES.contains(&base) && rest.starts_with('(') {
            rest.find(')').map_or(rest, |end| rest[end + 1..].trim_start())
        } else {
            rest
        };
        if rest.is_empty() || rest.starts_with('(') {
            format!("{base}{rest}")
        } else {
            format!("{base} {rest}")
        }
    }

    fn render_default(&self, expr: &str) -> String {
        if is_current_timestamp(expr) {
            "CURRENT_TIMESTAMP".to_string()
        } else if is_literal(expr) {
            expr.to_string()
        } else {
            format!("({expr})")
        }
    }

    fn inline_references(&self) -> bool {
        false
    }

    fn column_definition(
        &self,
        table: &QualifiedName,
        column: &Column,
    ) -> Result<String, GenerateError> {
        let mut sql = format!("{} {}", self.quote_identifier(&column.name), column.column_type);

        if let Some(collation) = &column.collation {
            sql.push_str(" COLLATE ");
            sql.push_str(collation);
        }

        if let Some(generated) = &column.generated {
            sql.push_str(&format!(
                " GENERATED ALWAYS AS ({}) {}",
                generated.expr,
                if generated.stored { "STORED" } else { "VIRTUAL" }
            ));
        }

        if column.not_null || column.primary_key {
            sql.push_str(" NOT NULL");
        }

        if let Some(default) = &column.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&self.render_default(default));
        }

        if column.on_update_current_timestamp {
            sql.push_str(" ON UPDATE CURRENT_TIMESTAMP");
        }

        match column.autoincrement {
            Autoincrement::None => {}
            Autoincrement::AutoIncrement => sql.push_str(" AUTO_INCREMENT"),
            other => {
                return Err(GenerateError::unsupported(
                    self,
                    format!("{} autoincrement", other.as_str()),
                    format!("{table}.{}", column.name),
                ))
            }
        }

        if column.primary_key {
            sql.push_str(" PRIMARY KEY");
        } else if column.unique {
            sql.push_str(" UNIQUE");
        }

        Ok(sql)
    }

    fn create_index(&self, table: &QualifiedName, index: &Index) -> Result<Statement, GenerateError> {
        if index.partial || index.where_expr.is_some() {
            return Err(GenerateError::unsupported(self, "partial indices", &index.name));
        }
        if !index.include.is_empty() {
            return Err(GenerateError::unsupported(self, "INCLUDE columns", &index.name));
        }

        let (prefix, using) = match index.index_type {
            IndexType::BTree => ("", ""),
            IndexType::Hash => ("", " USING HASH"),
            IndexType::FullText => ("FULLTEXT ", ""),
            IndexType::Spatial => ("SPATIAL ", ""),
            other => {
                return Err(GenerateError::unsupported(
                    self,
                    format!("{} indices", other.as_sql()),
                    &index.name,
                ))
            }
        };
        let unique = if index.unique && prefix.is_empty() {
            "UNIQUE "
        } else {
            ""
        };

        Ok(Statement::new(format!(
            "CREATE {unique}{prefix}INDEX {}{using} ON {} ({})",
            self.quote_identifier(&index.name),
            self.qualified_name(table),
            self.index_keys(index)
        )))
    }
}
