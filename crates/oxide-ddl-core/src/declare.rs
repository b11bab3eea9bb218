//! Declared table definitions.
//!
//! A [`TableDef`] is plain data: a table directive, one directive per field,
//! and an optional [`Customization`] per dialect. Definitions are usually
//! read from a JSON schema file, but can be built in code with the
//! builder-style methods below.
//!
//! ```rust
//! use oxide_ddl_core::declare::{ColumnDef, ColumnOverride, Customization, TableDef};
//! use oxide_ddl_core::dialect::DialectKind;
//! use oxide_ddl_core::model::{Autoincrement, FieldKind};
//!
//! let actor = TableDef::new("actor")
//!     .column(ColumnDef::new("actor_id", FieldKind::Number, "type=INTEGER primarykey"))
//!     .column(ColumnDef::new("last_name", FieldKind::String, "notnull index"))
//!     .customize(
//!         DialectKind::Postgres,
//!         Customization::default().column(
//!             "actor_id",
//!             ColumnOverride::default().autoincrement(Autoincrement::Identity),
//!         ),
//!     );
//! assert_eq!(actor.columns.len(), 2);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dialect::DialectKind;
use crate::model::{Autoincrement, FieldKind, Generated, IGNORE_TYPE};

/// One declared table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableDef {
    /// Table name. A `name=` table modifier takes precedence.
    pub name: String,
    /// Schema. Empty for the connection default.
    pub schema: String,
    /// Table-level directive, e.g. `index={. cols=store_id,film_id}`.
    pub directive: String,
    /// Fields in declaration order.
    pub columns: Vec<ColumnDef>,
    /// Per-dialect adjustments.
    pub dialects: BTreeMap<DialectKind, Customization>,
}

impl TableDef {
    /// Creates a definition for `name` in the default schema.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the schema.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Sets the table-level directive.
    #[must_use]
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directive = directive.into();
        self
    }

    /// Appends a field.
    #[must_use]
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Sets the customization for one dialect.
    #[must_use]
    pub fn customize(mut self, dialect: DialectKind, customization: Customization) -> Self {
        self.dialects.insert(dialect, customization);
        self
    }
}

/// One declared field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Field name, used as the column name unless `name=` overrides it.
    pub field: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub directive: String,
}

impl ColumnDef {
    /// Creates a field.
    #[must_use]
    pub fn new(field: impl Into<String>, kind: FieldKind, directive: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind,
            directive: directive.into(),
        }
    }
}

/// Adjustments to a table for one dialect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Customization {
    /// Overrides the table schema.
    pub schema: Option<String>,
    /// The table does not exist for this dialect.
    pub skip: bool,
    /// Overrides keyed by column name.
    pub columns: BTreeMap<String, ColumnOverride>,
    /// Extra indices, written as table-level `index=` values
    /// (`{. cols=title,description type=fulltext}`).
    pub indices: Vec<String>,
    /// Extra CHECK constraints.
    pub checks: Vec<CheckDef>,
}

impl Customization {
    /// A customization that removes the table for the dialect.
    #[must_use]
    pub fn skip() -> Self {
        Self {
            skip: true,
            ..Self::default()
        }
    }

    /// Overrides the schema.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Overrides one column.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>, column: ColumnOverride) -> Self {
        self.columns.insert(name.into(), column);
        self
    }

    /// Adds an index directive.
    #[must_use]
    pub fn index(mut self, directive: impl Into<String>) -> Self {
        self.indices.push(directive.into());
        self
    }

    /// Adds a named CHECK constraint.
    #[must_use]
    pub fn check(mut self, name: impl Into<String>, expr: impl Into<String>) -> Self {
        self.checks.push(CheckDef {
            name: name.into(),
            expr: expr.into(),
        });
        self
    }
}

/// Per-dialect column adjustments. Unset fields keep the directive value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnOverride {
    #[serde(rename = "type")]
    pub column_type: Option<String>,
    pub default: Option<String>,
    pub autoincrement: Option<Autoincrement>,
    pub generated: Option<Generated>,
    pub not_null: Option<bool>,
    pub on_update_current_timestamp: bool,
    /// Drops the column for this dialect.
    pub ignore: bool,
}

impl ColumnOverride {
    /// Drops the column for this dialect.
    #[must_use]
    pub fn ignored() -> Self {
        Self {
            ignore: true,
            ..Self::default()
        }
    }

    /// Replaces the column type. [`IGNORE_TYPE`] drops the column.
    #[must_use]
    pub fn column_type(mut self, column_type: impl Into<String>) -> Self {
        self.column_type = Some(column_type.into());
        self
    }

    /// Replaces the default expression.
    #[must_use]
    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    /// Replaces the autoincrement mode.
    #[must_use]
    pub const fn autoincrement(mut self, mode: Autoincrement) -> Self {
        self.autoincrement = Some(mode);
        self
    }

    /// Forces NOT NULL on or off.
    #[must_use]
    pub const fn not_null(mut self, not_null: bool) -> Self {
        self.not_null = Some(not_null);
        self
    }

    /// Adds MySQL `ON UPDATE CURRENT_TIMESTAMP`.
    #[must_use]
    pub const fn on_update_current_timestamp(mut self) -> Self {
        self.on_update_current_timestamp = true;
        self
    }

    /// Returns true if this override removes the column.
    #[must_use]
    pub fn drops_column(&self) -> bool {
        self.ignore || self.column_type.as_deref() == Some(IGNORE_TYPE)
    }
}

/// A named CHECK constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckDef {
    pub name: String,
    pub expr: String,
}
