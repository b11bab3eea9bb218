//! # oxide-ddl-core
//!
//! Declarative, additive-only schema reconciliation.
//!
//! This crate provides:
//! - A lexer for compact tag directives such as
//!   `notnull references={country onupdate=cascade}`
//! - A dialect-neutral schema model shared by declared and introspected
//!   schemas
//! - DDL generation for PostgreSQL, MySQL and SQLite
//! - A reconciler that only ever creates tables, columns, constraints and
//!   indices
//!
//! No I/O happens here. Introspecting a live database is the job of a
//! [`catalog::GotTables`] implementation, such as the sqlx-based ones in
//! the `oxide-ddl` crate.
//!
//! ## Declaring and reconciling
//!
//! ```rust
//! use oxide_ddl_core::builder::{BuildOptions, WantTables};
//! use oxide_ddl_core::catalog::Catalog;
//! use oxide_ddl_core::declare::{ColumnDef, TableDef};
//! use oxide_ddl_core::dialect::DialectKind;
//! use oxide_ddl_core::model::FieldKind;
//! use oxide_ddl_core::reconcile::reconcile;
//!
//! let defs = vec![
//!     TableDef::new("country")
//!         .column(ColumnDef::new("country_id", FieldKind::Number, "primarykey"))
//!         .column(ColumnDef::new("country", FieldKind::String, "notnull")),
//!     TableDef::new("city")
//!         .column(ColumnDef::new("city_id", FieldKind::Number, "primarykey"))
//!         .column(ColumnDef::new("country_id", FieldKind::Number, "notnull references=country")),
//! ];
//! let want = WantTables::build(&defs, DialectKind::Postgres, BuildOptions::new()).unwrap();
//!
//! // Nothing exists yet: both tables are created, country first.
//! let plan = reconcile(&Catalog::new("public"), &want).unwrap();
//! assert_eq!(plan.actions.len(), 2);
//!
//! for statement in plan.statements(want.dialect()).unwrap() {
//!     println!("{statement};");
//! }
//! ```

pub mod builder;
pub mod catalog;
pub mod declare;
pub mod dialect;
pub mod lexer;
pub mod model;
mod order;
pub mod reconcile;
pub mod warning;

pub use builder::{BuildOptions, ModifierPolicy, SchemaError, SchemaErrors, WantTables};
pub use catalog::{Catalog, GotTables, IntrospectionError};
pub use declare::{ColumnDef, ColumnOverride, Customization, TableDef};
pub use dialect::{Dialect, DialectKind, GenerateError, Statement};
pub use lexer::{cut_value, lex_modifiers, lex_value, LexError, Modifier};
pub use model::{Column, ForeignKey, Index, QualifiedName, Table, TableConstraint};
pub use reconcile::{reconcile, reconcile_with, Action, Plan, ReconcileError, ReconcileOptions};
pub use warning::Warning;
