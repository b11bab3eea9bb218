//! Additive reconciliation of a declared schema against a live one.
//!
//! [`reconcile`] compares a [`WantTables`] with any [`GotTables`] and
//! returns a [`Plan`]: the creation actions needed to bring the database up
//! to the declared shape, in an order that is safe to execute one by one.
//! Nothing is ever dropped or altered. Differences in existing columns are
//! reported as [`Warning::SchemaDrift`] and left alone.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::builder::WantTables;
use crate::catalog::{GotTables, IntrospectionError};
use crate::dialect::{Dialect, GenerateError, Statement};
use crate::model::{
    Column, ConstraintKind, ForeignKey, Index, QualifiedName, Table, TableConstraint,
};
use crate::order::DependencyOrder;
pub use crate::warning::Warning;

// ================================================================
// Public types
// ================================================================

/// Options for [`reconcile_with`].
#[derive(Debug, Clone, Copy)]
pub struct ReconcileOptions {
    /// Report type and nullability differences of existing columns.
    pub detect_drift: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self { detect_drift: true }
    }
}

impl ReconcileOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables drift detection.
    #[must_use]
    pub const fn detect_drift(mut self, enabled: bool) -> Self {
        self.detect_drift = enabled;
        self
    }
}

/// One creation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Create a table with its constraints and indices.
    CreateTable { table: Table },
    /// Add a column to an existing table.
    CreateColumn { table: QualifiedName, column: Column },
    /// Add a constraint to an existing table.
    CreateConstraint {
        table: QualifiedName,
        constraint: TableConstraint,
    },
    /// Add an index to an existing table.
    CreateIndex { table: QualifiedName, index: Index },
    /// Add a foreign key that was left out of CREATE TABLE.
    AddForeignKey {
        table: QualifiedName,
        column: String,
        foreign_key: ForeignKey,
    },
}

impl Action {
    /// Returns the table this action touches.
    #[must_use]
    pub fn table(&self) -> QualifiedName {
        match self {
            Self::CreateTable { table } => table.qualified_name(),
            Self::CreateColumn { table, .. }
            | Self::CreateConstraint { table, .. }
            | Self::CreateIndex { table, .. }
            | Self::AddForeignKey { table, .. } => table.clone(),
        }
    }

    /// Renders the action in `dialect`.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerateError`] if the dialect cannot express it.
    pub fn statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>, GenerateError> {
        match self {
            Self::CreateTable { table } => dialect.create_table(table),
            Self::CreateColumn { table, column } => {
                Ok(vec![dialect.create_column(table, column)?])
            }
            Self::CreateConstraint { table, constraint } => {
                Ok(vec![dialect.create_constraint(table, constraint)?])
            }
            Self::CreateIndex { table, index } => Ok(vec![dialect.create_index(table, index)?]),
            Self::AddForeignKey {
                table,
                column,
                foreign_key,
            } => Ok(vec![dialect.add_foreign_key(table, column, foreign_key)?]),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateTable { table } => write!(f, "create table {}", table.qualified_name()),
            Self::CreateColumn { table, column } => {
                write!(f, "create column {table}.{}", column.name)
            }
            Self::CreateConstraint { table, constraint } => {
                write!(f, "create constraint {} on {table}", constraint.name)
            }
            Self::CreateIndex { table, index } => {
                write!(f, "create index {} on {table}", index.name)
            }
            Self::AddForeignKey {
                table,
                column,
                foreign_key,
            } => write!(
                f,
                "add foreign key {table}.{column} -> {}.{}",
                foreign_key.table, foreign_key.column
            ),
        }
    }
}

/// The ordered result of a reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub actions: Vec<Action>,
    /// Builder warnings followed by reconciliation warnings.
    pub warnings: Vec<Warning>,
}

impl Plan {
    /// Returns true if the database already matches the declaration.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Renders every action, in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`GenerateError`].
    pub fn statements(&self, dialect: &dyn Dialect) -> Result<Vec<Statement>, GenerateError> {
        let mut statements = Vec::new();
        for action in &self.actions {
            statements.extend(action.statements(dialect)?);
        }
        Ok(statements)
    }
}

/// Reconciliation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    #[error(
        "cyclic foreign key dependency between tables: {}",
        .tables.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    )]
    CyclicDependency { tables: Vec<QualifiedName> },

    #[error(transparent)]
    Introspection(#[from] IntrospectionError),

    #[error(transparent)]
    Generate(#[from] GenerateError),
}

// ================================================================
// Reconciliation
// ================================================================

/// Reconciles with the default options.
///
/// # Errors
///
/// See [`reconcile_with`].
pub fn reconcile<G: GotTables + ?Sized>(got: &G, want: &WantTables) -> Result<Plan, ReconcileError> {
    reconcile_with(got, want, ReconcileOptions::default())
}

/// Computes the creation actions that bring `got` up to `want`.
///
/// Missing tables are created whole. Existing tables get their missing
/// columns, constraints and indices, all matched by name. Items the
/// dialect cannot create are skipped with a [`Warning::Unsupported`].
///
/// # Errors
///
/// Returns [`ReconcileError::Introspection`] if `got` cannot be read and
/// [`ReconcileError::CyclicDependency`] if new tables reference each other
/// through NOT NULL foreign keys only.
pub fn reconcile_with<G: GotTables + ?Sized>(
    got: &G,
    want: &WantTables,
    options: ReconcileOptions,
) -> Result<Plan, ReconcileError> {
    let dialect = want.dialect();
    let default_schema = got.default_schema();
    let existing: BTreeSet<QualifiedName> = got
        .list_tables()
        .into_iter()
        .map(|name| name.resolve(default_schema))
        .collect();

    let mut warnings = want.warnings().to_vec();
    let mut new_tables = Vec::new();
    let mut changes = Vec::new();

    for declared in want.tables() {
        let mut table = declared.clone();
        table.resolve_schema(default_schema);
        let name = table.qualified_name();

        if existing.contains(&name) {
            changes.extend(diff_table(got, dialect, &table, options, &mut warnings)?);
        } else {
            let indices = std::mem::take(&mut table.indices);
            for index in indices {
                if supported(dialect.create_index(&name, &index), &name, &mut warnings)? {
                    table.indices.push(index);
                }
            }
            new_tables.push(table);
        }
    }

    let mut actions = Vec::new();
    let deferred = order_tables(&mut new_tables, dialect.allows_forward_references())?;
    for table in new_tables {
        actions.push(Action::CreateTable { table });
    }

    let mut supported_changes = Vec::new();
    for change in order_changes(changes) {
        if supported(change.statements(dialect), &change.table(), &mut warnings)? {
            supported_changes.push(change);
        }
    }
    actions.extend(supported_changes);

    for (table, column, foreign_key) in deferred {
        warnings.push(Warning::DeferredForeignKey {
            table: table.clone(),
            column: column.clone(),
            references: foreign_key.clone(),
        });
        actions.push(Action::AddForeignKey {
            table,
            column,
            foreign_key,
        });
    }

    for action in &actions {
        action.statements(dialect)?;
    }

    Ok(Plan { actions, warnings })
}

/// Turns an unsupported-feature error into a warning. Returns whether the
/// item can be created.
fn supported<T>(
    rendered: Result<T, GenerateError>,
    table: &QualifiedName,
    warnings: &mut Vec<Warning>,
) -> Result<bool, GenerateError> {
    match rendered {
        Ok(_) => Ok(true),
        Err(e) if e.is_unsupported() => {
            warnings.push(Warning::Unsupported {
                table: table.clone(),
                detail: e.to_string(),
            });
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Missing columns, constraints and indices of an existing table.
fn diff_table<G: GotTables + ?Sized>(
    got: &G,
    dialect: &dyn Dialect,
    table: &Table,
    options: ReconcileOptions,
    warnings: &mut Vec<Warning>,
) -> Result<Vec<Action>, IntrospectionError> {
    let name = table.qualified_name();
    let columns = got.get_columns(&name)?;
    let constraints = got.get_constraints(&name)?;
    let indices = got.get_indices(&name)?;
    let index_names: BTreeSet<&str> = indices.keys().map(|k| k.name.as_str()).collect();

    let mut actions = Vec::new();
    for column in &table.columns {
        match columns.get(&column.name) {
            None => actions.push(Action::CreateColumn {
                table: name.clone(),
                column: column.clone(),
            }),
            Some(existing) if options.detect_drift => {
                drift(dialect, &name, column, existing, warnings);
            }
            Some(_) => {}
        }
    }

    // A table has at most one primary key, and not every database keeps
    // its name. Some databases report a UNIQUE constraint as an index.
    let has_primary_key = columns.values().any(|c| c.primary_key)
        || constraints
            .values()
            .any(|c| c.kind == ConstraintKind::PrimaryKey);
    for constraint in &table.constraints {
        let exists = if constraint.kind == ConstraintKind::PrimaryKey {
            has_primary_key
        } else {
            constraints.contains_key(&constraint.name)
                || index_names.contains(constraint.name.as_str())
        };
        if !exists {
            actions.push(Action::CreateConstraint {
                table: name.clone(),
                constraint: constraint.clone(),
            });
        }
    }

    for index in &table.indices {
        let mut key = index.qualified_name();
        if key.schema.is_empty() {
            key.schema.clone_from(&name.schema);
        }
        if !indices.contains_key(&key) && !constraints.contains_key(&index.name) {
            actions.push(Action::CreateIndex {
                table: name.clone(),
                index: index.clone(),
            });
        }
    }
    Ok(actions)
}

/// Reports type and nullability differences. Columns whose type the
/// database does not report, primary keys and generated columns are
/// never compared on type.
fn drift(
    dialect: &dyn Dialect,
    table: &QualifiedName,
    want: &Column,
    got: &Column,
    warnings: &mut Vec<Warning>,
) {
    let mut report = |detail: String| {
        warnings.push(Warning::SchemaDrift {
            table: table.clone(),
            column: want.name.clone(),
            detail,
        });
    };

    if !got.column_type.is_empty() && !want.primary_key && got.generated.is_none() {
        let declared = dialect.normalize_type(&want.column_type);
        let actual = dialect.normalize_type(&got.column_type);
        if declared != actual {
            report(format!("type is {actual}, declared {declared}"));
        }
    }

    if want.not_null != got.not_null && !want.primary_key && !got.primary_key {
        report(if want.not_null {
            "column is nullable, declared NOT NULL".to_string()
        } else {
            "column is NOT NULL, declared nullable".to_string()
        });
    }
}

/// Sorts new tables so referenced tables come first.
///
/// A cycle is broken by deferring its first nullable foreign key, ordered
/// by table and column name. Dialects that accept forward references keep
/// every foreign key inline; others lose the deferred references from
/// CREATE TABLE and get them back as separate actions.
fn order_tables(
    tables: &mut Vec<Table>,
    forward_references: bool,
) -> Result<Vec<(QualifiedName, String, ForeignKey)>, ReconcileError> {
    let mut deferred: Vec<(QualifiedName, String, ForeignKey)> = Vec::new();
    let sorted = loop {
        match table_order(tables, &deferred).sort() {
            Ok(sorted) => break sorted,
            Err(cycle) => {
                let members: &[QualifiedName] = &cycle;
                let candidate = tables
                    .iter()
                    .filter(|t| members.contains(&t.qualified_name()))
                    .flat_map(|t| {
                        t.columns.iter().filter_map(move |c| {
                            let fk = c.references.as_ref()?;
                            let breaks = !c.not_null
                                && fk.table != t.qualified_name()
                                && members.contains(&fk.table);
                            breaks.then(|| (t.qualified_name(), c.name.clone(), fk.clone()))
                        })
                    })
                    .filter(|(t, c, _)| !deferred.iter().any(|(dt, dc, _)| dt == t && dc == c))
                    .min_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
                match candidate {
                    Some(edge) => deferred.push(edge),
                    None => return Err(ReconcileError::CyclicDependency { tables: cycle }),
                }
            }
        }
    };

    let mut by_name: Vec<Option<Table>> = std::mem::take(tables).into_iter().map(Some).collect();
    for name in sorted {
        if let Some(slot) = by_name
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|t| t.qualified_name() == name))
        {
            if let Some(table) = slot.take() {
                tables.push(table);
            }
        }
    }

    if forward_references {
        return Ok(Vec::new());
    }
    for (table_name, column, _) in &deferred {
        if let Some(col) = tables
            .iter_mut()
            .find(|t| t.qualified_name() == *table_name)
            .and_then(|t| t.column_mut(column))
        {
            col.references = None;
        }
    }
    Ok(deferred)
}

fn table_order(
    tables: &[Table],
    deferred: &[(QualifiedName, String, ForeignKey)],
) -> DependencyOrder<QualifiedName> {
    let mut order = DependencyOrder::new();
    for table in tables {
        order.add_node(table.qualified_name());
    }
    for table in tables {
        let name = table.qualified_name();
        for column in &table.columns {
            let Some(fk) = &column.references else {
                continue;
            };
            if deferred
                .iter()
                .any(|(t, c, _)| *t == name && *c == column.name)
            {
                continue;
            }
            order.add_dependency(&name, &fk.table);
        }
    }
    order
}

/// Groups changes by kind and orders new columns so a column referenced by
/// another new column is added first.
fn order_changes(changes: Vec<Action>) -> Vec<Action> {
    let mut columns = Vec::new();
    let mut constraints = Vec::new();
    let mut indices = Vec::new();
    for change in changes {
        match change {
            Action::CreateColumn { .. } => columns.push(change),
            Action::CreateConstraint { .. } => constraints.push(change),
            _ => indices.push(change),
        }
    }

    let key = |action: &Action| match action {
        Action::CreateColumn { table, column } => Some((table.clone(), column.name.clone())),
        _ => None,
    };
    let mut order = DependencyOrder::new();
    for action in &columns {
        if let Some(k) = key(action) {
            order.add_node(k);
        }
    }
    for action in &columns {
        if let (Some(k), Action::CreateColumn { column, .. }) = (key(action), action) {
            if let Some(fk) = &column.references {
                order.add_dependency(&k, &(fk.table.clone(), fk.column.clone()));
            }
        }
    }
    // A cycle among new columns can only be nullable references between
    // existing tables; they are added in declaration order.
    if let Ok(sorted) = order.sort() {
        columns.sort_by_key(|action| {
            key(action).and_then(|k| sorted.iter().position(|s| *s == k))
        });
    }

    columns.extend(constraints);
    columns.extend(indices);
    columns
}
