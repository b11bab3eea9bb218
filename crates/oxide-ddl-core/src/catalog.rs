//! Read access to a schema, and an in-memory snapshot implementing it.
//!
//! [`GotTables`] is the contract the reconciler reads from. Driver crates
//! introspect a live database into a [`Catalog`]; the declared schema
//! ([`WantTables`](crate::builder::WantTables)) implements the same trait.

use std::collections::BTreeMap;

use crate::model::{Column, Index, QualifiedName, Table, TableConstraint};

/// Failure to read a table's metadata.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to introspect table {table}: {cause}")]
pub struct IntrospectionError {
    /// The table being read.
    pub table: String,
    /// What went wrong.
    pub cause: String,
}

impl IntrospectionError {
    /// Creates an error for `table`.
    pub fn new(table: impl ToString, cause: impl ToString) -> Self {
        Self {
            table: table.to_string(),
            cause: cause.to_string(),
        }
    }

    /// The table does not exist.
    pub fn missing(table: &QualifiedName) -> Self {
        Self::new(table, "table does not exist")
    }
}

/// Read-only view of the tables in a schema.
pub trait GotTables {
    /// Schema that unqualified names resolve to.
    fn default_schema(&self) -> &str;

    /// Lists every table, sorted by `{schema, name}`.
    fn list_tables(&self) -> Vec<QualifiedName>;

    /// Returns the columns of `table` keyed by name.
    ///
    /// # Errors
    ///
    /// Returns an [`IntrospectionError`] if the table does not exist.
    fn get_columns(
        &self,
        table: &QualifiedName,
    ) -> Result<BTreeMap<String, Column>, IntrospectionError>;

    /// Returns the table constraints of `table` keyed by name.
    ///
    /// # Errors
    ///
    /// Returns an [`IntrospectionError`] if the table does not exist.
    fn get_constraints(
        &self,
        table: &QualifiedName,
    ) -> Result<BTreeMap<String, TableConstraint>, IntrospectionError>;

    /// Returns the indices of `table` keyed by `{schema, name}`.
    ///
    /// # Errors
    ///
    /// Returns an [`IntrospectionError`] if the table does not exist.
    fn get_indices(
        &self,
        table: &QualifiedName,
    ) -> Result<BTreeMap<QualifiedName, Index>, IntrospectionError>;

    /// Returns true if `table` exists.
    fn has_table(&self, table: &QualifiedName) -> bool {
        let table = table.resolve(self.default_schema());
        self.list_tables().contains(&table)
    }
}

/// A snapshot of tables, keyed by resolved `{schema, name}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    default_schema: String,
    tables: BTreeMap<QualifiedName, Table>,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new(default_schema: impl Into<String>) -> Self {
        Self {
            default_schema: default_schema.into(),
            tables: BTreeMap::new(),
        }
    }

    /// Adds a table, replacing any table with the same name.
    ///
    /// Empty schemas are resolved against the catalog default and
    /// single-column keys are folded into column flags.
    pub fn insert(&mut self, mut table: Table) {
        table.resolve_schema(&self.default_schema);
        table.fold_single_column_keys();
        self.tables.insert(table.qualified_name(), table);
    }

    /// Builder-style [`Catalog::insert`].
    #[must_use]
    pub fn with_table(mut self, table: Table) -> Self {
        self.insert(table);
        self
    }

    /// Looks up a table.
    #[must_use]
    pub fn table(&self, name: &QualifiedName) -> Option<&Table> {
        self.tables.get(&name.resolve(&self.default_schema))
    }

    /// Iterates over tables in name order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    /// Returns the number of tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true if the catalog has no tables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    fn require(&self, name: &QualifiedName) -> Result<&Table, IntrospectionError> {
        let name = name.resolve(&self.default_schema);
        self.tables
            .get(&name)
            .ok_or_else(|| IntrospectionError::missing(&name))
    }
}

impl GotTables for Catalog {
    fn default_schema(&self) -> &str {
        &self.default_schema
    }

    fn list_tables(&self) -> Vec<QualifiedName> {
        self.tables.keys().cloned().collect()
    }

    fn get_columns(
        &self,
        table: &QualifiedName,
    ) -> Result<BTreeMap<String, Column>, IntrospectionError> {
        Ok(columns_by_name(self.require(table)?))
    }

    fn get_constraints(
        &self,
        table: &QualifiedName,
    ) -> Result<BTreeMap<String, TableConstraint>, IntrospectionError> {
        Ok(constraints_by_name(self.require(table)?))
    }

    fn get_indices(
        &self,
        table: &QualifiedName,
    ) -> Result<BTreeMap<QualifiedName, Index>, IntrospectionError> {
        Ok(indices_by_name(self.require(table)?))
    }
}

pub(crate) fn columns_by_name(table: &Table) -> BTreeMap<String, Column> {
    table
        .columns
        .iter()
        .map(|c| (c.name.clone(), c.clone()))
        .collect()
}

pub(crate) fn constraints_by_name(table: &Table) -> BTreeMap<String, TableConstraint> {
    table
        .constraints
        .iter()
        .map(|c| (c.name.clone(), c.clone()))
        .collect()
}

pub(crate) fn indices_by_name(table: &Table) -> BTreeMap<QualifiedName, Index> {
    table
        .indices
        .iter()
        .map(|i| {
            let mut key = i.qualified_name();
            if key.schema.is_empty() {
                key.schema.clone_from(&table.schema);
            }
            (key, i.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Column;

    fn catalog() -> Catalog {
        Catalog::new("public").with_table(
            Table::new("", "actor")
                .with_column(Column::new("actor_id", "integer"))
                .with_column(Column::new("last_name", "text").not_null())
                .with_constraint(TableConstraint::primary_key(
                    "actor_pkey",
                    vec!["actor_id".into()],
                ))
                .with_index(Index::new("actor_last_name_idx").column("last_name")),
        )
    }

    #[test]
    fn test_insert_resolves_schema() {
        let catalog = catalog();
        assert_eq!(
            catalog.list_tables(),
            vec![QualifiedName::new("public", "actor")]
        );
        assert!(catalog.has_table(&QualifiedName::unqualified("actor")));
        assert!(!catalog.has_table(&QualifiedName::new("other", "actor")));
    }

    #[test]
    fn test_get_columns_folds_primary_key() {
        let catalog = catalog();
        let columns = catalog
            .get_columns(&QualifiedName::unqualified("actor"))
            .unwrap();
        assert!(columns["actor_id"].primary_key);
        assert!(columns["last_name"].not_null);
        let constraints = catalog
            .get_constraints(&QualifiedName::unqualified("actor"))
            .unwrap();
        assert!(constraints.is_empty());
    }

    #[test]
    fn test_get_indices_keyed_by_qualified_name() {
        let catalog = catalog();
        let indices = catalog
            .get_indices(&QualifiedName::new("public", "actor"))
            .unwrap();
        assert!(indices.contains_key(&QualifiedName::new("public", "actor_last_name_idx")));
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let catalog = catalog();
        let err = catalog
            .get_columns(&QualifiedName::unqualified("film"))
            .unwrap_err();
        assert_eq!(err.table, "public.film");
        assert_eq!(
            err.to_string(),
            "failed to introspect table public.film: table does not exist"
        );
    }
}
