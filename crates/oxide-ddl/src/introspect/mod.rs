//! Live schema introspection.
//!
//! Each database gets an [`Introspect`] implementation that reads its
//! catalog through sqlx and reports tables in the dialect-neutral
//! [`Table`] model. [`Introspect::snapshot`] collects every table into a
//! [`Catalog`], which implements `GotTables` for the reconciler.

mod mysql;
mod postgres;
mod sqlite;

use futures::future::try_join_all;
use oxide_ddl_core::catalog::{Catalog, IntrospectionError};
use oxide_ddl_core::model::{ForeignKeyAction, QualifiedName, Table};
use tracing::debug;

pub use mysql::MySqlIntrospector;
pub use postgres::PostgresIntrospector;
pub use sqlite::SqliteIntrospector;

use crate::error::{EnsureError, Result};

/// Reads the schema of a live database.
#[allow(async_fn_in_trait)]
pub trait Introspect {
    /// Returns the schema unqualified names resolve to.
    async fn default_schema(&self) -> Result<String>;

    /// Lists the user tables of every schema.
    async fn list_tables(&self) -> Result<Vec<QualifiedName>>;

    /// Reads one table: columns, constraints, indices and foreign keys.
    async fn table(&self, name: &QualifiedName) -> Result<Table>;

    /// Reads one table, naming it in any error.
    async fn read_table(&self, name: &QualifiedName) -> Result<Table> {
        self.table(name)
            .await
            .map_err(|cause| EnsureError::Introspection(IntrospectionError::new(name, cause)))
    }

    /// Reads every table into a [`Catalog`].
    async fn snapshot(&self) -> Result<Catalog> {
        let schema = self.default_schema().await?;
        let names = self.list_tables().await?;
        debug!(schema = %schema, tables = names.len(), "Introspecting database");

        let tables = try_join_all(names.iter().map(|name| self.read_table(name))).await?;
        let mut catalog = Catalog::new(schema);
        for table in tables {
            catalog.insert(table);
        }
        Ok(catalog)
    }
}

/// Parses a referential action as reported by a catalog. `NO ACTION` is
/// the default everywhere and is left unset.
fn foreign_key_action(rule: &str) -> Option<ForeignKeyAction> {
    match rule.parse() {
        Ok(ForeignKeyAction::NoAction) | Err(_) => None,
        Ok(action) => Some(action),
    }
}

/// Name given to a primary key the database does not name.
fn primary_key_name(table: &str) -> String {
    format!("{table}_pkey")
}

/// Splits a comma separated column list, as produced by `GROUP_CONCAT`.
fn split_columns(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_key_action() {
        assert_eq!(foreign_key_action("CASCADE"), Some(ForeignKeyAction::Cascade));
        assert_eq!(foreign_key_action("SET NULL"), Some(ForeignKeyAction::SetNull));
        assert_eq!(foreign_key_action("NO ACTION"), None);
        assert_eq!(foreign_key_action("bogus"), None);
    }

    #[test]
    fn test_split_columns() {
        assert_eq!(split_columns("actor_id, film_id"), vec!["actor_id", "film_id"]);
        assert!(split_columns("").is_empty());
    }
}
