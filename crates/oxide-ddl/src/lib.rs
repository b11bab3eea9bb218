//! Create missing tables, columns and indices from a declared schema.
//!
//! `oxide-ddl` connects the pure reconciler in `oxide-ddl-core` to live
//! databases:
//! - **Introspect** - reads PostgreSQL, MySQL and SQLite catalogs into the
//!   dialect-neutral table model
//! - **Database** - picks the dialect from the URL and owns the sqlx pool
//! - **Executor** - reconciles and runs the plan, with a dry-run mode
//! - **Schema files** - JSON documents of table definitions and directives
//!
//! Nothing is ever dropped or altered. Existing columns that differ from
//! their declaration are reported as drift warnings.
//!
//! # Example
//!
//! ```rust,no_run
//! use oxide_ddl::prelude::*;
//!
//! # async fn run() -> oxide_ddl::error::Result<()> {
//! let database = Database::connect("sqlite:app.db").await?;
//! let defs = load_schema_file("schema.json").await?;
//! let want = WantTables::build(&defs, database.kind(), BuildOptions::default())?;
//!
//! let report = Executor::new(database).apply(&want).await?;
//! println!("{} statements applied", report.statements.len());
//! # Ok(())
//! # }
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Show the SQL that would bring the database up to date
//! oxide-ddl --schema schema.json plan
//!
//! # Apply it
//! oxide-ddl --schema schema.json apply
//!
//! # Dump the live schema
//! oxide-ddl inspect
//! ```

pub mod database;
pub mod error;
pub mod executor;
pub mod introspect;
pub mod schema_file;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::database::Database;
    pub use crate::error::{EnsureError, Result};
    pub use crate::executor::{Executor, RunReport};
    pub use crate::introspect::{
        Introspect, MySqlIntrospector, PostgresIntrospector, SqliteIntrospector,
    };
    pub use crate::schema_file::{load_schema_file, parse_schema};
    pub use oxide_ddl_core::{
        BuildOptions, DialectKind, ModifierPolicy, Plan, ReconcileOptions, TableDef, WantTables,
        Warning,
    };
}
