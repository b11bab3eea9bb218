//! Dialect-neutral schema metadata.
//!
//! Both sides of a reconciliation are expressed with these types: the
//! introspected ("got") schema read back from a database, and the declared
//! ("want") schema built from table definitions. Fields a database cannot
//! report are left as `None` and never compared.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Column type marker that excludes a column from reconciliation.
pub const IGNORE_TYPE: &str = "\0";

/// Index key text for an expression the database does not report.
pub const UNKNOWN_EXPR: &str = "?";

/// A `{schema, name}` pair. An empty schema means the connection default.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct QualifiedName {
    /// Schema (or database, for MySQL). Empty for the default.
    #[serde(default)]
    pub schema: String,
    /// Object name.
    pub name: String,
}

impl QualifiedName {
    /// Creates a qualified name.
    #[must_use]
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Creates a name in the default schema.
    #[must_use]
    pub fn unqualified(name: impl Into<String>) -> Self {
        Self::new(String::new(), name)
    }

    /// Returns this name with an empty schema replaced by `default_schema`.
    #[must_use]
    pub fn resolve(&self, default_schema: &str) -> Self {
        if self.schema.is_empty() {
            Self::new(default_schema, self.name.clone())
        } else {
            self.clone()
        }
    }

    /// Returns true if a schema is set.
    #[must_use]
    pub fn is_qualified(&self) -> bool {
        !self.schema.is_empty()
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.schema.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.schema, self.name)
        }
    }
}

/// Semantic kind of a declared field, used to pick a default column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Blob,
    Boolean,
    Json,
    Number,
    String,
    Time,
    /// An arbitrary expression; must carry an explicit `type`.
    Expr,
}

impl FieldKind {
    /// Returns the lowercase name of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Boolean => "boolean",
            Self::Json => "json",
            Self::Number => "number",
            Self::String => "string",
            Self::Time => "time",
            Self::Expr => "expr",
        }
    }
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blob" => Ok(Self::Blob),
            "boolean" => Ok(Self::Boolean),
            "json" => Ok(Self::Json),
            "number" => Ok(Self::Number),
            "string" => Ok(Self::String),
            "time" => Ok(Self::Time),
            "expr" => Ok(Self::Expr),
            other => Err(format!("unknown field kind '{other}'")),
        }
    }
}

/// How a column generates its own values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Autoincrement {
    #[default]
    None,
    /// SQLite `INTEGER PRIMARY KEY` rowid alias.
    Rowid,
    /// SQLite `INTEGER PRIMARY KEY AUTOINCREMENT`.
    RowidAutoincrement,
    /// PostgreSQL `GENERATED BY DEFAULT AS IDENTITY`.
    Identity,
    /// PostgreSQL `SERIAL` family.
    Serial,
    /// MySQL `AUTO_INCREMENT`.
    AutoIncrement,
}

impl Autoincrement {
    /// Returns true for any mode other than [`Autoincrement::None`].
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Returns the directive spelling of the mode.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Rowid => "rowid",
            Self::RowidAutoincrement => "rowid_autoincrement",
            Self::Identity => "identity",
            Self::Serial => "serial",
            Self::AutoIncrement => "auto_increment",
        }
    }
}

impl FromStr for Autoincrement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "rowid" => Ok(Self::Rowid),
            "rowid_autoincrement" => Ok(Self::RowidAutoincrement),
            "identity" => Ok(Self::Identity),
            "serial" => Ok(Self::Serial),
            "auto_increment" => Ok(Self::AutoIncrement),
            other => Err(format!("unknown autoincrement mode '{other}'")),
        }
    }
}

/// Foreign key referential action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKeyAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ForeignKeyAction {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

impl FromStr for ForeignKeyAction {
    type Err = String;

    /// Accepts `cascade`, `setnull`, `set null`, `SET_NULL` and so on.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "noaction" => Ok(Self::NoAction),
            "restrict" => Ok(Self::Restrict),
            "cascade" => Ok(Self::Cascade),
            "setnull" => Ok(Self::SetNull),
            "setdefault" => Ok(Self::SetDefault),
            _ => Err(format!("unknown foreign key action '{s}'")),
        }
    }
}

/// A generated column expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generated {
    /// The generating expression.
    pub expr: String,
    /// Whether the value is stored (as opposed to computed on read).
    #[serde(default)]
    pub stored: bool,
}

/// A single-column foreign key reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Referenced table.
    pub table: QualifiedName,
    /// Referenced column.
    pub column: String,
    /// ON UPDATE action.
    pub on_update: Option<ForeignKeyAction>,
    /// ON DELETE action.
    pub on_delete: Option<ForeignKeyAction>,
}

impl ForeignKey {
    /// Creates a reference to `table.column` with no actions.
    #[must_use]
    pub fn new(table: QualifiedName, column: impl Into<String>) -> Self {
        Self {
            table,
            column: column.into(),
            on_update: None,
            on_delete: None,
        }
    }

    /// Sets the ON UPDATE action.
    #[must_use]
    pub const fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = Some(action);
        self
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub const fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = Some(action);
        self
    }
}

/// A table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Concrete SQL type, as declared or as reported by the database.
    pub column_type: String,
    /// Declared field kind. `None` for introspected columns.
    pub kind: Option<FieldKind>,
    pub not_null: bool,
    /// Only set for single-column primary keys.
    pub primary_key: bool,
    pub unique: bool,
    pub autoincrement: Autoincrement,
    /// Default expression, as SQL text.
    pub default: Option<String>,
    pub generated: Option<Generated>,
    pub collation: Option<String>,
    pub references: Option<ForeignKey>,
    /// MySQL `ON UPDATE CURRENT_TIMESTAMP`.
    pub on_update_current_timestamp: bool,
}

impl Column {
    /// Creates a nullable column with the given type.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            kind: None,
            not_null: false,
            primary_key: false,
            unique: false,
            autoincrement: Autoincrement::None,
            default: None,
            generated: None,
            collation: None,
            references: None,
            on_update_current_timestamp: false,
        }
    }

    /// Sets NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Marks this column as the primary key. Implies NOT NULL.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.not_null = true;
        self
    }

    /// Sets UNIQUE.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the autoincrement mode.
    #[must_use]
    pub const fn autoincrement(mut self, mode: Autoincrement) -> Self {
        self.autoincrement = mode;
        self
    }

    /// Sets the default expression.
    #[must_use]
    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    /// Makes this a generated column.
    #[must_use]
    pub fn generated(mut self, expr: impl Into<String>, stored: bool) -> Self {
        self.generated = Some(Generated {
            expr: expr.into(),
            stored,
        });
        self
    }

    /// Sets the collation.
    #[must_use]
    pub fn collate(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    /// Sets the foreign key reference.
    #[must_use]
    pub fn references(mut self, fk: ForeignKey) -> Self {
        self.references = Some(fk);
        self
    }

    /// Returns true if the column carries the ignore marker type.
    #[must_use]
    pub fn is_ignored(&self) -> bool {
        self.column_type == IGNORE_TYPE
    }
}

/// Kind of a table-level constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
    Check,
}

impl ConstraintKind {
    /// Returns the SQL keyword(s).
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::PrimaryKey => "PRIMARY KEY",
            Self::Unique => "UNIQUE",
            Self::Check => "CHECK",
        }
    }
}

/// A named table-level constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConstraint {
    pub name: String,
    pub kind: ConstraintKind,
    /// Constrained columns, in key order. Empty for CHECK.
    pub columns: Vec<String>,
    /// CHECK expression.
    pub check_expr: Option<String>,
}

impl TableConstraint {
    /// Creates a PRIMARY KEY constraint.
    #[must_use]
    pub fn primary_key(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind: ConstraintKind::PrimaryKey,
            columns,
            check_expr: None,
        }
    }

    /// Creates a UNIQUE constraint.
    #[must_use]
    pub fn unique(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind: ConstraintKind::Unique,
            columns,
            check_expr: None,
        }
    }

    /// Creates a CHECK constraint.
    #[must_use]
    pub fn check(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ConstraintKind::Check,
            columns: Vec::new(),
            check_expr: Some(expr.into()),
        }
    }
}

/// Index access method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    #[default]
    BTree,
    Hash,
    Gist,
    SpGist,
    Gin,
    Brin,
    FullText,
    Spatial,
}

impl IndexType {
    /// Returns the SQL name of the method.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::BTree => "BTREE",
            Self::Hash => "HASH",
            Self::Gist => "GIST",
            Self::SpGist => "SPGIST",
            Self::Gin => "GIN",
            Self::Brin => "BRIN",
            Self::FullText => "FULLTEXT",
            Self::Spatial => "SPATIAL",
        }
    }
}

impl FromStr for IndexType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "" | "BTREE" => Ok(Self::BTree),
            "HASH" => Ok(Self::Hash),
            "GIST" => Ok(Self::Gist),
            "SPGIST" => Ok(Self::SpGist),
            "GIN" => Ok(Self::Gin),
            "BRIN" => Ok(Self::Brin),
            "FULLTEXT" => Ok(Self::FullText),
            "SPATIAL" => Ok(Self::Spatial),
            other => Err(format!("unknown index type '{other}'")),
        }
    }
}

/// One key of an index: a plain column or an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKey<'a> {
    Column(&'a str),
    Expr(&'a str),
}

/// A table index.
///
/// `columns` and `exprs` have the same length. At each position exactly one
/// of them is non-empty, which keeps mixed column/expression keys in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub schema: String,
    pub name: String,
    pub index_type: IndexType,
    pub unique: bool,
    pub partial: bool,
    pub where_expr: Option<String>,
    pub columns: Vec<String>,
    pub exprs: Vec<String>,
    /// Non-key columns (PostgreSQL `INCLUDE`).
    pub include: Vec<String>,
}

impl Index {
    /// Creates an empty btree index.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends a column key.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self.exprs.push(String::new());
        self
    }

    /// Appends an expression key.
    #[must_use]
    pub fn expr(mut self, expr: impl Into<String>) -> Self {
        self.columns.push(String::new());
        self.exprs.push(expr.into());
        self
    }

    /// Makes the index UNIQUE.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the access method.
    #[must_use]
    pub const fn index_type(mut self, index_type: IndexType) -> Self {
        self.index_type = index_type;
        self
    }

    /// Makes this a partial index.
    #[must_use]
    pub fn where_clause(mut self, predicate: impl Into<String>) -> Self {
        self.partial = true;
        self.where_expr = Some(predicate.into());
        self
    }

    /// Adds a non-key INCLUDE column.
    #[must_use]
    pub fn include(mut self, column: impl Into<String>) -> Self {
        self.include.push(column.into());
        self
    }

    /// Returns the index keys in order.
    #[must_use]
    pub fn keys(&self) -> Vec<IndexKey<'_>> {
        self.columns
            .iter()
            .zip(self.exprs.iter().map(String::as_str).chain(std::iter::repeat("")))
            .map(|(column, expr)| {
                if expr.is_empty() {
                    IndexKey::Column(column)
                } else {
                    IndexKey::Expr(expr)
                }
            })
            .collect()
    }

    /// Returns the `{schema, name}` key of this index.
    #[must_use]
    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(self.schema.clone(), self.name.clone())
    }
}

/// A table with everything it owns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub schema: String,
    pub name: String,
    pub columns: Vec<Column>,
    pub constraints: Vec<TableConstraint>,
    pub indices: Vec<Index>,
    /// SQLite FTS5 options. When set the table is a virtual FTS5 table.
    pub fts5: Option<String>,
}

impl Table {
    /// Creates an empty table.
    #[must_use]
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends a column.
    #[must_use]
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Appends a constraint.
    #[must_use]
    pub fn with_constraint(mut self, constraint: TableConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Appends an index.
    #[must_use]
    pub fn with_index(mut self, index: Index) -> Self {
        self.indices.push(index);
        self
    }

    /// Returns the `{schema, name}` key of this table.
    #[must_use]
    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(self.schema.clone(), self.name.clone())
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Looks up a column by name for modification.
    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Returns the primary key column if the key has exactly one column.
    #[must_use]
    pub fn single_primary_key(&self) -> Option<&str> {
        let flagged: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect();
        if let [only] = flagged.as_slice() {
            return Some(only);
        }
        if !flagged.is_empty() {
            return None;
        }
        self.constraints
            .iter()
            .find(|c| c.kind == ConstraintKind::PrimaryKey)
            .and_then(|c| match c.columns.as_slice() {
                [only] => Some(only.as_str()),
                _ => None,
            })
    }

    /// Folds single-column PRIMARY KEY and UNIQUE constraints into the
    /// flags of the column they cover.
    ///
    /// Databases disagree on whether `col UNIQUE` is reported as a column
    /// property or as a named constraint. Folding both sides keeps the
    /// comparison stable. A UNIQUE constraint is only folded when its name
    /// is one a database generates for `col UNIQUE`; any other name is
    /// kept so it can be matched by name.
    pub fn fold_single_column_keys(&mut self) {
        let mut folded = Vec::new();
        for (i, constraint) in self.constraints.iter().enumerate() {
            let [column] = constraint.columns.as_slice() else {
                continue;
            };
            let Some(col) = self.columns.iter_mut().find(|c| &c.name == column) else {
                continue;
            };
            match constraint.kind {
                ConstraintKind::PrimaryKey => {
                    col.primary_key = true;
                    col.not_null = true;
                }
                ConstraintKind::Unique
                    if is_generated_key_name(&self.name, column, &constraint.name) =>
                {
                    col.unique = true;
                }
                ConstraintKind::Unique | ConstraintKind::Check => continue,
            }
            folded.push(i);
        }
        for i in folded.into_iter().rev() {
            self.constraints.remove(i);
        }
    }

    /// Fills empty schemas of the table, its indices and its foreign key
    /// targets with `default_schema`.
    pub fn resolve_schema(&mut self, default_schema: &str) {
        if self.schema.is_empty() {
            self.schema = default_schema.to_string();
        }
        for index in &mut self.indices {
            if index.schema.is_empty() {
                index.schema.clone_from(&self.schema);
            }
        }
        for column in &mut self.columns {
            if let Some(fk) = &mut column.references {
                if fk.table.schema.is_empty() {
                    fk.table.schema.clone_from(&self.schema);
                }
            }
        }
    }
}

/// Names given to an unnamed `col UNIQUE`: `{table}_{col}_key` on
/// PostgreSQL and SQLite, the bare column name on MySQL.
fn is_generated_key_name(table: &str, column: &str, name: &str) -> bool {
    name.is_empty()
        || name == column
        || name
            .strip_prefix(table)
            .and_then(|rest| rest.strip_prefix('_'))
            .and_then(|rest| rest.strip_suffix("_key"))
            == Some(column)
}
