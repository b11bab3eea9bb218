//! Dialect-specific DDL generation.
//!
//! Each supported database gets one [`Dialect`] implementation, selected
//! once per run through [`DialectKind::dialect`]. Default trait methods
//! produce PostgreSQL-flavoured standard SQL; dialects override what they
//! spell differently.

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{
    Autoincrement, Column, ConstraintKind, FieldKind, ForeignKey, Index, IndexKey,
    QualifiedName, Table, TableConstraint,
};

static POSTGRES: PostgresDialect = PostgresDialect::new();
static MYSQL: MySqlDialect = MySqlDialect::new();
static SQLITE: SqliteDialect = SqliteDialect::new();

/// The supported databases.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum DialectKind {
    #[serde(rename = "postgres")]
    Postgres,
    #[serde(rename = "mysql")]
    MySql,
    #[serde(rename = "sqlite3")]
    Sqlite,
}

impl DialectKind {
    /// Returns the dialect identifier (`postgres`, `mysql`, `sqlite3`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite3",
        }
    }

    /// Returns the code generator for this dialect.
    #[must_use]
    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            Self::Postgres => &POSTGRES,
            Self::MySql => &MYSQL,
            Self::Sqlite => &SQLITE,
        }
    }

    /// Infers the dialect from a database URL scheme.
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split(':').next().unwrap_or_default();
        match scheme.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Some(Self::Postgres),
            "mysql" | "mariadb" => Some(Self::MySql),
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DialectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" => Ok(Self::MySql),
            "sqlite3" | "sqlite" => Ok(Self::Sqlite),
            other => Err(format!("unknown dialect '{other}'")),
        }
    }
}

/// A single SQL statement with its positional bind arguments.
///
/// DDL is rendered with literals inlined, so `args` is empty for every
/// statement produced by this crate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<String>,
}

impl Statement {
    /// Creates a statement without arguments.
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// A requested property the target dialect cannot express.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    /// The dialect has no syntax for the feature.
    #[error("{dialect} does not support {feature} ({context})")]
    Unsupported {
        dialect: &'static str,
        feature: String,
        context: String,
    },
    /// A table would be created without any column.
    #[error("table {table} has no columns")]
    EmptyTable { table: String },
    /// The requested object is not part of the declared schema.
    #[error("{name} is not declared")]
    NotDeclared { name: String },
}

impl GenerateError {
    pub(crate) fn unsupported(
        dialect: &(impl Dialect + ?Sized),
        feature: impl Into<String>,
        context: impl ToString,
    ) -> Self {
        Self::Unsupported {
            dialect: dialect.name(),
            feature: feature.into(),
            context: context.to_string(),
        }
    }

    /// Returns true for [`GenerateError::Unsupported`].
    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

/// Dialect-specific DDL generation.
pub trait Dialect: Send + Sync {
    /// Returns which database this generator targets.
    fn kind(&self) -> DialectKind;

    /// Returns the dialect identifier.
    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Quotes an identifier.
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Quotes a possibly schema-qualified name.
    fn qualified_name(&self, name: &QualifiedName) -> String {
        if name.schema.is_empty() {
            self.quote_identifier(&name.name)
        } else {
            format!(
                "{}.{}",
                self.quote_identifier(&name.schema),
                self.quote_identifier(&name.name)
            )
        }
    }

    /// Column type used when a declaration does not set one.
    fn default_type(&self, kind: FieldKind) -> &'static str;

    /// Mode used for a bare `autoincrement` modifier.
    fn native_autoincrement(&self) -> Autoincrement;

    /// Canonical spelling of a column type, for drift comparison.
    fn normalize_type(&self, column_type: &str) -> String {
        canonical_type(column_type)
    }

    /// Renders a default expression.
    fn render_default(&self, expr: &str) -> String {
        expr.to_string()
    }

    /// Whether a table may reference a table created after it.
    fn allows_forward_references(&self) -> bool {
        false
    }

    /// Whether foreign keys are written inline on the column.
    fn inline_references(&self) -> bool {
        true
    }

    /// Renders one column definition.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Unsupported`] for properties the dialect
    /// cannot express.
    fn column_definition(
        &self,
        table: &QualifiedName,
        column: &Column,
    ) -> Result<String, GenerateError>;

    /// Renders a `REFERENCES` clause.
    fn references_clause(&self, fk: &ForeignKey) -> String {
        let mut sql = format!(
            "REFERENCES {} ({})",
            self.qualified_name(&fk.table),
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

    /// Renders a named `FOREIGN KEY` table constraint.
    fn foreign_key_constraint(&self, table: &QualifiedName, column: &str, fk: &ForeignKey) -> String {
        format!(
            "CONSTRAINT {} FOREIGN KEY ({}) {}",
            self.quote_identifier(&foreign_key_name(&table.name, column)),
            self.quote_identifier(column),
            self.references_clause(fk)
        )
    }

    /// Renders a table constraint as it appears inside CREATE TABLE.
    fn table_constraint(&self, constraint: &TableConstraint) -> String {
        let name = self.quote_identifier(&constraint.name);
        match constraint.kind {
            ConstraintKind::Check => format!(
                "CONSTRAINT {name} CHECK ({})",
                constraint.check_expr.as_deref().unwrap_or("TRUE")
            ),
            kind => format!(
                "CONSTRAINT {name} {} ({})",
                kind.as_sql(),
                self.column_list(&constraint.columns)
            ),
        }
    }

    /// Quotes and joins column names.
    fn column_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Renders one index key.
    fn index_key(&self, key: IndexKey<'_>) -> String {
        match key {
            IndexKey::Column(column) => self.quote_identifier(column),
            IndexKey::Expr(expr) => format!("({expr})"),
        }
    }

    /// Generates CREATE TABLE plus CREATE INDEX for the table's indices.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerateError`] if any part cannot be expressed.
    fn create_table(&self, table: &Table) -> Result<Vec<Statement>, GenerateError> {
        render_create_table(self, table)
    }

    /// Generates ALTER TABLE ... ADD COLUMN.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerateError`] if the column cannot be added.
    fn create_column(
        &self,
        table: &QualifiedName,
        column: &Column,
    ) -> Result<Statement, GenerateError> {
        let mut sql = format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.qualified_name(table),
            self.column_definition(table, column)?
        );
        if !self.inline_references() {
            if let Some(fk) = &column.references {
                sql.push_str(", ADD ");
                sql.push_str(&self.foreign_key_constraint(table, &column.name, fk));
            }
        }
        Ok(Statement::new(sql))
    }

    /// Generates CREATE INDEX.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerateError`] for unsupported index features.
    fn create_index(&self, table: &QualifiedName, index: &Index) -> Result<Statement, GenerateError> {
        use crate::model::IndexType;

        if matches!(index.index_type, IndexType::FullText | IndexType::Spatial) {
            return Err(GenerateError::unsupported(
                self,
                format!("{} indices", index.index_type.as_sql()),
                &index.name,
            ));
        }
        let mut sql = String::from("CREATE ");
        if index.unique {
            sql.push_str("UNIQUE ");
        }
        sql.push_str("INDEX ");
        sql.push_str(&self.quote_identifier(&index.name));
        sql.push_str(" ON ");
        sql.push_str(&self.qualified_name(table));
        if index.index_type != IndexType::BTree {
            sql.push_str(" USING ");
            sql.push_str(&index.index_type.as_sql().to_ascii_lowercase());
        }
        sql.push_str(&format!(" ({})", self.index_keys(index)));
        if !index.include.is_empty() {
            sql.push_str(&format!(" INCLUDE ({})", self.column_list(&index.include)));
        }
        if let Some(predicate) = &index.where_expr {
            sql.push_str(" WHERE ");
            sql.push_str(predicate);
        }
        Ok(Statement::new(sql))
    }

    /// Renders the key list of an index.
    fn index_keys(&self, index: &Index) -> String {
        index
            .keys()
            .into_iter()
            .map(|key| self.index_key(key))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Generates ALTER TABLE ... ADD CONSTRAINT.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerateError`] if the dialect cannot add the
    /// constraint to an existing table.
    fn create_constraint(
        &self,
        table: &QualifiedName,
        constraint: &TableConstraint,
    ) -> Result<Statement, GenerateError> {
        Ok(Statement::new(format!(
            "ALTER TABLE {} ADD {}",
            self.qualified_name(table),
            self.table_constraint(constraint)
        )))
    }

    /// Generates ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerateError`] if the dialect cannot add foreign keys
    /// to an existing table.
    fn add_foreign_key(
        &self,
        table: &QualifiedName,
        column: &str,
        fk: &ForeignKey,
    ) -> Result<Statement, GenerateError> {
        Ok(Statement::new(format!(
            "ALTER TABLE {} ADD {}",
            self.qualified_name(table),
            self.foreign_key_constraint(table, column, fk)
        )))
    }
}

/// Name given to the foreign key constraint of `table.column`.
#[must_use]
pub fn foreign_key_name(table: &str, column: &str) -> String {
    format!("{table}_{column}_fkey")
}

/// CREATE TABLE rendering shared by all dialects.
pub(crate) fn render_create_table<D: Dialect + ?Sized>(
    dialect: &D,
    table: &Table,
) -> Result<Vec<Statement>, GenerateError> {
    let name = table.qualified_name();
    if table.columns.is_empty() {
        return Err(GenerateError::EmptyTable {
            table: name.to_string(),
        });
    }

    let mut lines = Vec::with_capacity(table.columns.len() + table.constraints.len());
    for column in &table.columns {
        lines.push(dialect.column_definition(&name, column)?);
    }
    for constraint in &table.constraints {
        lines.push(dialect.table_constraint(constraint));
    }
    if !dialect.inline_references() {
        for column in &table.columns {
            if let Some(fk) = &column.references {
                lines.push(dialect.foreign_key_constraint(&name, &column.name, fk));
            }
        }
    }

    let mut sql = format!("CREATE TABLE {} (\n", dialect.qualified_name(&name));
    sql.push_str(
        &lines
            .iter()
            .map(|line| format!("    {line}"))
            .collect::<Vec<_>>()
            .join(",\n"),
    );
    sql.push_str("\n)");

    let mut statements = vec![Statement::new(sql)];
    for index in &table.indices {
        statements.push(dialect.create_index(&name, index)?);
    }
    Ok(statements)
}

/// Uppercases a type and collapses whitespace, dropping it around
/// parentheses and commas: `varchar (45)` becomes `VARCHAR(45)`.
#[must_use]
pub fn canonical_type(column_type: &str) -> String {
    let upper = column_type.trim().to_uppercase();
    let mut out = String::with_capacity(upper.len());
    let mut pending_space = false;
    for c in upper.chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space
            && !out.is_empty()
            && !matches!(c, '(' | ')' | ',' | '[')
            && !out.ends_with(|p: char| p == '(' || p == ',')
        {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }
    out
}

/// Splits a canonical type into its base name and the remainder starting
/// at the first `(` or `[`.
pub(crate) fn split_type(canonical: &str) -> (&str, &str) {
    match canonical.find(|c: char| c == '(' || c == '[') {
        Some(i) => (canonical[..i].trim_end(), &canonical[i..]),
        None => (canonical, ""),
    }
}

/// Returns true for spellings of "the current timestamp".
pub(crate) fn is_current_timestamp(expr: &str) -> bool {
    let compact: String = expr
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();
    matches!(
        compact.as_str(),
        "DATETIME('NOW')" | "NOW()" | "CURRENT_TIMESTAMP" | "CURRENT_TIMESTAMP()"
    )
}

/// Returns true if `expr` is a literal that needs no parentheses as a
/// default value.
pub(crate) fn is_literal(expr: &str) -> bool {
    let expr = expr.trim();
    if expr.is_empty() {
        return false;
    }
    if expr.parse::<f64>().is_ok() {
        return true;
    }
    if expr.starts_with('\'') || expr.starts_with('(') {
        return closes_at_end(expr);
    }
    matches!(
        expr.to_ascii_uppercase().as_str(),
        "NULL" | "TRUE" | "FALSE" | "CURRENT_TIMESTAMP" | "CURRENT_DATE" | "CURRENT_TIME"
    )
}

/// Returns true if the quote or parenthesis opening `expr` is closed by
/// its last character. Doubled quotes are escapes.
fn closes_at_end(expr: &str) -> bool {
    let mut depth = 0usize;
    let mut quoted = false;
    let mut chars = expr.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '\'' if quoted && chars.peek().map(|&(_, next)| next) == Some('\'') => {
                chars.next();
                continue;
            }
            '\'' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => depth = depth.saturating_sub(1),
            _ => continue,
        }
        if !quoted && depth == 0 {
            return i + c.len_utf8() == expr.len();
        }
    }
    false
}
