//! Non-fatal conditions collected while building and reconciling.

use std::fmt;

use serde::Serialize;

use crate::model::{ForeignKey, QualifiedName};

/// A condition reported alongside a successful result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A directive used a modifier name the builder does not know.
    UnknownModifier { field: String, modifier: String },
    /// An existing column differs from its declaration. Never corrected.
    SchemaDrift {
        table: QualifiedName,
        column: String,
        detail: String,
    },
    /// A foreign key is created after its table to break a cycle.
    DeferredForeignKey {
        table: QualifiedName,
        column: String,
        references: ForeignKey,
    },
    /// A create-only item the dialect cannot express was skipped.
    Unsupported { table: QualifiedName, detail: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownModifier { field, modifier } => {
                write!(f, "{field}: unknown modifier '{modifier}'")
            }
            Self::SchemaDrift {
                table,
                column,
                detail,
            } => write!(f, "{table}.{column}: schema drift: {detail}"),
            Self::DeferredForeignKey {
                table,
                column,
                references,
            } => write!(
                f,
                "{table}.{column}: foreign key to {}.{} deferred until after table creation",
                references.table, references.column
            ),
            Self::Unsupported { table, detail } => write!(f, "{table}: skipped: {detail}"),
        }
    }
}
