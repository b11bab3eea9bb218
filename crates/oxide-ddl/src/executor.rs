//! Plan execution.
//!
//! The executor introspects the database, reconciles it against a
//! [`WantTables`] and runs the resulting statements one at a time, in plan
//! order. A run that fails halfway can simply be repeated: the next plan
//! only contains what is still missing.

use oxide_ddl_core::builder::WantTables;
use oxide_ddl_core::dialect::Statement;
use oxide_ddl_core::reconcile::{reconcile_with, Plan, ReconcileOptions};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::database::Database;
use crate::error::{EnsureError, Result};

/// Outcome of [`Executor::apply`].
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub plan: Plan,
    /// Statements executed, or printed in dry-run mode.
    pub statements: Vec<Statement>,
    pub dry_run: bool,
}

/// Brings a database up to a declared schema.
pub struct Executor {
    database: Database,
    options: ReconcileOptions,
    dry_run: bool,
}

impl Executor {
    /// Creates a new executor.
    #[must_use]
    pub fn new(database: Database) -> Self {
        Self {
            database,
            options: ReconcileOptions::default(),
            dry_run: false,
        }
    }

    /// Enables dry-run mode (SQL is printed but not executed).
    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Sets the reconciliation options.
    #[must_use]
    pub const fn reconcile_options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the database.
    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.database
    }

    /// Computes the plan without touching the database.
    ///
    /// # Errors
    ///
    /// Fails if `want` was built for another dialect, if introspection
    /// fails, or if the tables cannot be ordered.
    pub async fn plan(&self, want: &WantTables) -> Result<Plan> {
        let database = self.database.kind();
        if want.dialect_kind() != database {
            return Err(EnsureError::DialectMismatch {
                declared: want.dialect_kind(),
                database,
            });
        }

        let got = self.database.snapshot().await?;
        let plan = reconcile_with(&got, want, self.options)?;
        info!(
            actions = plan.actions.len(),
            warnings = plan.warnings.len(),
            "Computed plan"
        );
        Ok(plan)
    }

    /// Computes the plan and executes it.
    ///
    /// # Errors
    ///
    /// Everything [`Executor::plan`] returns, plus
    /// [`EnsureError::Statement`] for the first statement the database
    /// rejects. Statements before it stay applied.
    pub async fn apply(&self, want: &WantTables) -> Result<RunReport> {
        let plan = self.plan(want).await?;
        for warning in &plan.warnings {
            warn!(warning = %warning, "Schema warning");
        }
        if plan.is_empty() {
            info!("Database is up to date");
        }

        let dialect = want.dialect();
        let mut statements = Vec::new();
        for action in &plan.actions {
            info!(action = %action, "Applying");
            for statement in action.statements(dialect)? {
                debug!(sql = %statement.sql, "Executing SQL");

                if self.dry_run {
                    println!("{};", statement.sql);
                } else {
                    self.database
                        .execute(&statement.sql)
                        .await
                        .map_err(|source| EnsureError::Statement {
                            sql: statement.sql.clone(),
                            source,
                        })?;
                }
                statements.push(statement);
            }
        }

        Ok(RunReport {
            plan,
            statements,
            dry_run: self.dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxide_ddl_core::builder::BuildOptions;
    use oxide_ddl_core::declare::{ColumnDef, TableDef};
    use oxide_ddl_core::dialect::DialectKind;
    use oxide_ddl_core::model::FieldKind;

    fn schema(dialect: DialectKind) -> WantTables {
        let defs = vec![
            TableDef::new("country")
                .column(ColumnDef::new("country_id", FieldKind::Number, "type=INTEGER primarykey"))
                .column(ColumnDef::new("country", FieldKind::String, "notnull")),
            TableDef::new("city")
                .column(ColumnDef::new("city_id", FieldKind::Number, "type=INTEGER primarykey"))
                .column(ColumnDef::new("city", FieldKind::String, "notnull index"))
                .column(ColumnDef::new(
                    "country_id",
                    FieldKind::Number,
                    "type=INTEGER notnull references=country",
                )),
        ];
        WantTables::build(&defs, dialect, BuildOptions::default()).unwrap()
    }

    async fn executor() -> Executor {
        Executor::new(Database::connect("sqlite::memory:").await.unwrap())
    }

    #[tokio::test]
    async fn test_apply_then_nothing_left() {
        let executor = executor().await;
        let want = schema(DialectKind::Sqlite);

        let report = executor.apply(&want).await.unwrap();
        assert!(!report.dry_run);
        assert_eq!(report.plan.actions.len(), 2);
        assert_eq!(report.plan.actions[0].table().name, "country");
        assert!(report.statements.len() >= 3);

        let plan = executor.plan(&want).await.unwrap();
        assert!(plan.is_empty(), "unexpected actions: {:?}", plan.actions);
    }

    #[tokio::test]
    async fn test_dry_run_leaves_database_untouched() {
        let executor = executor().await.dry_run(true);
        let want = schema(DialectKind::Sqlite);

        let report = executor.apply(&want).await.unwrap();
        assert!(report.dry_run);
        assert!(!report.statements.is_empty());

        let plan = executor.plan(&want).await.unwrap();
        assert_eq!(plan.actions.len(), 2);
    }

    #[tokio::test]
    async fn test_dialect_mismatch() {
        let executor = executor().await;
        let err = executor.plan(&schema(DialectKind::Postgres)).await.unwrap_err();
        assert!(matches!(
            err,
            EnsureError::DialectMismatch {
                declared: DialectKind::Postgres,
                database: DialectKind::Sqlite,
            }
        ));
    }
}
