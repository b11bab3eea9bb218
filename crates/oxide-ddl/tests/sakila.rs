//! End-to-end tests against an in-memory SQLite database.
//!
//! The sakila fixture is loaded from JSON, applied, introspected back and
//! planned again.

use std::path::PathBuf;

use oxide_ddl::prelude::*;
use oxide_ddl_core::model::{Autoincrement, ConstraintKind, IndexKey, QualifiedName};
use oxide_ddl_core::reconcile::Action;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sakila.json")
}

async fn want() -> WantTables {
    let defs = load_schema_file(fixture()).await.unwrap();
    WantTables::build(&defs, DialectKind::Sqlite, BuildOptions::new()).unwrap()
}

async fn memory() -> Database {
    Database::connect("sqlite::memory:").await.unwrap()
}

#[tokio::test]
async fn test_apply_creates_every_table_once() {
    let want = want().await;
    let executor = Executor::new(memory().await);

    let report = executor.apply(&want).await.unwrap();
    let created: Vec<String> = report
        .plan
        .actions
        .iter()
        .filter_map(|action| match action {
            Action::CreateTable { table } => Some(table.name.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        created,
        vec!["language", "actor", "film", "film_actor", "staff", "store"]
    );

    let again = executor.plan(&want).await.unwrap();
    assert!(again.is_empty(), "unexpected actions: {:?}", again.actions);
}

#[tokio::test]
async fn test_introspection_reads_back_applied_schema() {
    let want = want().await;
    let database = memory().await;
    Executor::new(database.clone()).apply(&want).await.unwrap();

    let catalog = database.snapshot().await.unwrap();
    assert_eq!(catalog.len(), 6);

    let language = catalog
        .table(&QualifiedName::new("main", "language"))
        .unwrap();
    let id = language.column("language_id").unwrap();
    assert!(id.primary_key);
    assert_eq!(id.autoincrement, Autoincrement::Rowid);

    let film = catalog.table(&QualifiedName::new("main", "film")).unwrap();
    let fk = film
        .column("language_id")
        .and_then(|c| c.references.as_ref())
        .unwrap();
    assert_eq!(fk.table, QualifiedName::new("main", "language"));
    assert_eq!(fk.column, "language_id");
    assert!(film
        .constraints
        .iter()
        .any(|c| c.kind == ConstraintKind::Check && c.name == "film_rating_check"));
    assert!(film.indices.iter().any(|i| i.name == "film_language_id_idx"));

    let film_actor = catalog
        .table(&QualifiedName::new("main", "film_actor"))
        .unwrap();
    let pk = film_actor
        .constraints
        .iter()
        .find(|c| c.kind == ConstraintKind::PrimaryKey)
        .unwrap();
    assert_eq!(pk.name, "film_actor_pkey");
    assert_eq!(pk.columns, vec!["actor_id", "film_id"]);

    let staff = catalog.table(&QualifiedName::new("main", "staff")).unwrap();
    assert!(staff.column("email").unwrap().unique);

    let store = catalog.table(&QualifiedName::new("main", "store")).unwrap();
    let manager = store
        .indices
        .iter()
        .find(|i| i.name == "store_manager_staff_id_idx")
        .unwrap();
    assert!(manager.unique);
    assert_eq!(manager.columns, vec!["manager_staff_id"]);
}

#[tokio::test]
async fn test_existing_table_gains_missing_column_and_index() {
    let database = memory().await;
    database
        .execute(
            "CREATE TABLE film (\
                film_id INTEGER PRIMARY KEY NOT NULL, \
                title TEXT NOT NULL, \
                language_id INT NOT NULL REFERENCES language (language_id), \
                last_update DATETIME NOT NULL DEFAULT (DATETIME('now')))",
        )
        .await
        .unwrap();

    let want = want().await;
    let executor = Executor::new(database);
    let plan = executor.plan(&want).await.unwrap();
    let film: Vec<String> = plan
        .actions
        .iter()
        .filter(|a| a.table().name == "film")
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        film,
        vec![
            "create column main.film.rating",
            "create index film_language_id_idx on main.film",
        ]
    );
    // SQLite cannot add a CHECK to an existing table.
    assert!(plan.warnings.iter().any(|w| matches!(
        w,
        Warning::Unsupported { detail, .. } if detail.contains("film_rating_check")
    )));

    executor.apply(&want).await.unwrap();
    assert!(executor.plan(&want).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_expression_index_keys_read_back_as_expressions() {
    let database = memory().await;
    database
        .execute("CREATE TABLE customer (customer_id INTEGER PRIMARY KEY, email TEXT, store_id INT)")
        .await
        .unwrap();
    database
        .execute("CREATE INDEX customer_email_idx ON customer (store_id, lower(email))")
        .await
        .unwrap();

    let catalog = database.snapshot().await.unwrap();
    let customer = catalog
        .table(&QualifiedName::new("main", "customer"))
        .unwrap();
    let index = customer
        .indices
        .iter()
        .find(|i| i.name == "customer_email_idx")
        .unwrap();
    assert!(matches!(
        index.keys().as_slice(),
        [IndexKey::Column("store_id"), IndexKey::Expr(_)]
    ));
}

#[tokio::test]
async fn test_dry_run_executes_nothing() {
    let want = want().await;
    let executor = Executor::new(memory().await).dry_run(true);

    let report = executor.apply(&want).await.unwrap();
    assert!(report.dry_run);
    assert!(report
        .statements
        .iter()
        .any(|s| s.sql.starts_with("CREATE TABLE \"main\".\"language\"")));

    let catalog = executor.database().snapshot().await.unwrap();
    assert!(catalog.is_empty());
}
