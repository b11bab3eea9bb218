//! Integration tests for declared schema reconciliation.
//!
//! A slice of the sakila sample database is declared once, with per-dialect
//! customizations, then planned against empty and partially populated
//! catalogs for every dialect.

use oxide_ddl_core::builder::{BuildOptions, WantTables};
use oxide_ddl_core::catalog::Catalog;
use oxide_ddl_core::declare::{ColumnDef, ColumnOverride, Customization, TableDef};
use oxide_ddl_core::dialect::DialectKind;
use oxide_ddl_core::model::{Autoincrement, Column, FieldKind, QualifiedName, Table, IGNORE_TYPE};
use oxide_ddl_core::reconcile::{reconcile, Action, Plan, ReconcileError, Warning};

// =============================================================================
// Declarations
// =============================================================================

fn last_update() -> ColumnDef {
    ColumnDef::new("last_update", FieldKind::Time, "notnull default=CURRENT_TIMESTAMP")
}

fn mysql_timestamps() -> Customization {
    Customization::default().column(
        "last_update",
        ColumnOverride::default()
            .column_type("TIMESTAMP")
            .on_update_current_timestamp(),
    )
}

fn sakila() -> Vec<TableDef> {
    vec![
        TableDef::new("language")
            .column(ColumnDef::new("language_id", FieldKind::Number, "primarykey autoincrement"))
            .column(ColumnDef::new("name", FieldKind::String, "notnull"))
            .column(last_update())
            .customize(DialectKind::MySql, mysql_timestamps()),
        TableDef::new("actor")
            .column(ColumnDef::new("actor_id", FieldKind::Number, "primarykey autoincrement"))
            .column(ColumnDef::new("first_name", FieldKind::String, "notnull"))
            .column(ColumnDef::new("last_name", FieldKind::String, "notnull index"))
            .column(ColumnDef::new(
                "full_name",
                FieldKind::String,
                "generated={{first_name || ' ' || last_name} virtual}",
            ))
            .column(last_update())
            .customize(DialectKind::MySql, mysql_timestamps()),
        TableDef::new("film")
            .column(ColumnDef::new("film_id", FieldKind::Number, "primarykey autoincrement"))
            .column(ColumnDef::new("title", FieldKind::String, "notnull"))
            .column(ColumnDef::new(
                "language_id",
                FieldKind::Number,
                "notnull references={language onupdate=cascade ondelete=restrict} index",
            ))
            .column(ColumnDef::new("rating", FieldKind::String, "default='G'"))
            .column(last_update())
            .customize(
                DialectKind::Sqlite,
                Customization::default().check("film_rating_check", "rating IN ('G','PG','PG-13','R','NC-17')"),
            )
            .customize(DialectKind::MySql, mysql_timestamps()),
        TableDef::new("film_actor")
            .directive("primarykey={. cols=actor_id,film_id}")
            .column(ColumnDef::new("actor_id", FieldKind::Number, "notnull references=actor"))
            .column(ColumnDef::new("film_id", FieldKind::Number, "notnull references=film index"))
            .column(last_update())
            .customize(DialectKind::MySql, mysql_timestamps()),
        TableDef::new("staff")
            .column(ColumnDef::new("staff_id", FieldKind::Number, "primarykey autoincrement"))
            .column(ColumnDef::new("first_name", FieldKind::String, "notnull"))
            .column(ColumnDef::new("store_id", FieldKind::Number, "references=store"))
            .column(last_update())
            .customize(DialectKind::MySql, mysql_timestamps()),
        TableDef::new("store")
            .column(ColumnDef::new("store_id", FieldKind::Number, "primarykey autoincrement"))
            .column(ColumnDef::new(
                "manager_staff_id",
                FieldKind::Number,
                "notnull references=staff index={. unique}",
            ))
            .column(last_update())
            .customize(DialectKind::MySql, mysql_timestamps()),
        TableDef::new("film_text")
            .directive("fts5={content='film' content_rowid='film_id'}")
            .column(ColumnDef::new("film_id", FieldKind::Number, ""))
            .column(ColumnDef::new("title", FieldKind::String, ""))
            .column(ColumnDef::new("description", FieldKind::String, ""))
            .customize(DialectKind::Postgres, Customization::skip())
            .customize(
                DialectKind::Sqlite,
                Customization::default()
                    .column("film_id", ColumnOverride::default().column_type(IGNORE_TYPE)),
            )
            .customize(
                DialectKind::MySql,
                Customization::default()
                    .column("title", ColumnOverride::default().not_null(true))
                    .index("{. cols=title,description type=fulltext}"),
            ),
    ]
}

fn want(dialect: DialectKind) -> WantTables {
    WantTables::build(&sakila(), dialect, BuildOptions::new()).unwrap()
}

fn empty(dialect: DialectKind) -> Catalog {
    Catalog::new(match dialect {
        DialectKind::Postgres => "public",
        DialectKind::MySql => "db",
        DialectKind::Sqlite => "main",
    })
}

fn created_tables(plan: &Plan) -> Vec<String> {
    plan.actions
        .iter()
        .filter_map(|action| match action {
            Action::CreateTable { table } => Some(table.name.clone()),
            _ => None,
        })
        .collect()
}

/// Simulates applying a plan: every created table lands in the catalog as
/// declared.
fn applied(dialect: DialectKind, plan: &Plan) -> Catalog {
    let mut catalog = empty(dialect);
    for action in &plan.actions {
        if let Action::CreateTable { table } = action {
            catalog.insert(table.clone());
        }
    }
    catalog
}

// =============================================================================
// Fresh database
// =============================================================================

#[test]
fn postgres_creates_sakila_in_dependency_order() {
    let want = want(DialectKind::Postgres);
    assert_eq!(want.skipped(), &[QualifiedName::unqualified("film_text")]);

    let plan = reconcile(&empty(DialectKind::Postgres), &want).unwrap();
    assert_eq!(
        created_tables(&plan),
        vec!["language", "actor", "film", "film_actor", "staff", "store"]
    );
    assert!(matches!(
        plan.actions.last(),
        Some(Action::AddForeignKey { column, .. }) if column == "store_id"
    ));
    assert!(matches!(
        plan.warnings.as_slice(),
        [Warning::DeferredForeignKey { .. }]
    ));

    let sql: Vec<String> = plan
        .statements(want.dialect())
        .unwrap()
        .into_iter()
        .map(|s| s.sql)
        .collect();
    assert!(sql[0].contains("\"language_id\" INT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY"));
    assert!(sql[0].contains("\"last_update\" TIMESTAMPTZ NOT NULL DEFAULT NOW()"));
    assert!(sql
        .iter()
        .any(|s| s.contains("GENERATED ALWAYS AS (first_name || ' ' || last_name) STORED")));
    assert!(sql.iter().any(|s| s.contains(
        "REFERENCES \"public\".\"language\" (\"language_id\") ON UPDATE CASCADE ON DELETE RESTRICT"
    )));
    assert!(sql
        .iter()
        .any(|s| s.contains("CONSTRAINT \"film_actor_pkey\" PRIMARY KEY (\"actor_id\", \"film_id\")")));
    assert!(sql.contains(
        &"CREATE UNIQUE INDEX \"store_manager_staff_id_idx\" ON \"public\".\"store\" (\"manager_staff_id\")"
            .to_string()
    ));
    assert_eq!(
        sql.last().map(String::as_str),
        Some(
            "ALTER TABLE \"public\".\"staff\" ADD CONSTRAINT \"staff_store_id_fkey\" \
             FOREIGN KEY (\"store_id\") REFERENCES \"public\".\"store\" (\"store_id\")"
        )
    );
    assert!(sql.iter().all(|s| !s.contains("film_text")));
}

#[test]
fn mysql_creates_sakila_with_table_level_foreign_keys() {
    let want = want(DialectKind::MySql);
    let plan = reconcile(&empty(DialectKind::MySql), &want).unwrap();
    assert_eq!(
        created_tables(&plan),
        vec!["language", "actor", "film", "film_actor", "staff", "store", "film_text"]
    );

    let sql: Vec<String> = plan
        .statements(want.dialect())
        .unwrap()
        .into_iter()
        .map(|s| s.sql)
        .collect();
    assert!(sql[0].contains("`language_id` INT NOT NULL AUTO_INCREMENT PRIMARY KEY"));
    assert!(sql[0].contains(
        "`last_update` TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP"
    ));
    assert!(sql.iter().any(|s| s.contains(
        "CONSTRAINT `film_language_id_fkey` FOREIGN KEY (`language_id`) REFERENCES `db`.`language` (`language_id`)"
    )));
    assert!(sql.contains(
        &"CREATE FULLTEXT INDEX `film_text_title_description_idx` ON `db`.`film_text` (`title`, `description`)"
            .to_string()
    ));
    assert!(sql.iter().any(|s| s.contains("`title` VARCHAR(255) NOT NULL")));
    assert!(sql
        .last()
        .is_some_and(|s| s.starts_with("ALTER TABLE `db`.`staff` ADD CONSTRAINT `staff_store_id_fkey`")));
}

#[test]
fn sqlite_creates_sakila_with_inline_references() {
    let want = want(DialectKind::Sqlite);
    let plan = reconcile(&empty(DialectKind::Sqlite), &want).unwrap();
    assert_eq!(
        created_tables(&plan),
        vec!["language", "actor", "film", "film_actor", "staff", "store", "film_text"]
    );
    assert!(plan
        .actions
        .iter()
        .all(|a| matches!(a, Action::CreateTable { .. })));
    assert!(plan.warnings.is_empty());

    let sql: Vec<String> = plan
        .statements(want.dialect())
        .unwrap()
        .into_iter()
        .map(|s| s.sql)
        .collect();
    assert!(sql[0].contains("\"language_id\" INTEGER PRIMARY KEY NOT NULL"));
    assert!(sql[0].contains("\"last_update\" DATETIME NOT NULL DEFAULT (DATETIME('now'))"));
    assert!(sql
        .iter()
        .any(|s| s.contains("\"store_id\" INT REFERENCES \"store\" (\"store_id\")")));
    assert!(sql.iter().any(|s| s.contains(
        "CONSTRAINT \"film_rating_check\" CHECK (rating IN ('G','PG','PG-13','R','NC-17'))"
    )));
    assert_eq!(
        sql.last().map(String::as_str),
        Some(
            "CREATE VIRTUAL TABLE \"main\".\"film_text\" USING fts5(title, description, \
             content='film', content_rowid='film_id')"
        )
    );
}

// =============================================================================
// Existing database
// =============================================================================

#[test]
fn second_run_is_a_no_op_for_every_dialect() {
    for dialect in [DialectKind::Postgres, DialectKind::MySql, DialectKind::Sqlite] {
        let want = want(dialect);
        let first = reconcile(&empty(dialect), &want).unwrap();
        assert!(!first.is_empty());

        let second = reconcile(&applied(dialect, &first), &want).unwrap();
        assert!(second.is_empty(), "{dialect}: {:?}", second.actions);
        assert!(second.warnings.is_empty(), "{dialect}: {:?}", second.warnings);
    }
}

#[test]
fn existing_table_only_gains_what_is_missing() {
    let defs: Vec<TableDef> = sakila().into_iter().filter(|d| d.name == "actor").collect();
    let want = WantTables::build(&defs, DialectKind::Sqlite, BuildOptions::new()).unwrap();
    let got = Catalog::new("main").with_table(
        Table::new("main", "actor")
            .with_column(
                Column::new("actor_id", "INTEGER")
                    .primary_key()
                    .autoincrement(Autoincrement::Rowid),
            )
            .with_column(Column::new("first_name", "TEXT").not_null())
            .with_column(Column::new("full_name", "TEXT").generated("first_name || ' ' || last_name", false))
            .with_column(Column::new("last_update", "DATETIME").not_null()),
    );

    let plan = reconcile(&got, &want).unwrap();
    let rendered: Vec<String> = plan.actions.iter().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        vec![
            "create column main.actor.last_name",
            "create index actor_last_name_idx on main.actor",
        ]
    );
    let sql: Vec<String> = plan
        .statements(want.dialect())
        .unwrap()
        .into_iter()
        .map(|s| s.sql)
        .collect();
    assert_eq!(
        sql,
        vec![
            "ALTER TABLE \"main\".\"actor\" ADD COLUMN \"last_name\" TEXT NOT NULL",
            "CREATE INDEX \"main\".\"actor_last_name_idx\" ON \"actor\" (\"last_name\")",
        ]
    );
}

#[test]
fn drift_on_existing_column_is_only_reported() {
    let defs: Vec<TableDef> = sakila().into_iter().filter(|d| d.name == "language").collect();
    let want = WantTables::build(&defs, DialectKind::Postgres, BuildOptions::new()).unwrap();
    let got = Catalog::new("public").with_table(
        Table::new("public", "language")
            .with_column(Column::new("language_id", "integer").primary_key())
            .with_column(Column::new("name", "character(20)").not_null())
            .with_column(Column::new("last_update", "timestamp with time zone").not_null()),
    );

    let plan = reconcile(&got, &want).unwrap();
    assert!(plan.is_empty());
    assert_eq!(plan.warnings.len(), 1);
    assert_eq!(
        plan.warnings[0].to_string(),
        "public.language.name: schema drift: type is CHAR(20), declared TEXT"
    );
}

// =============================================================================
// Cycles
// =============================================================================

#[test]
fn mutual_not_null_references_cannot_be_ordered() {
    let defs = vec![
        TableDef::new("staff")
            .column(ColumnDef::new("staff_id", FieldKind::Number, "primarykey"))
            .column(ColumnDef::new("store_id", FieldKind::Number, "notnull references=store")),
        TableDef::new("store")
            .column(ColumnDef::new("store_id", FieldKind::Number, "primarykey"))
            .column(ColumnDef::new("manager_staff_id", FieldKind::Number, "notnull references=staff")),
    ];
    for dialect in [DialectKind::Postgres, DialectKind::Sqlite] {
        let want = WantTables::build(&defs, dialect, BuildOptions::new()).unwrap();
        let err = reconcile(&empty(dialect), &want).unwrap_err();
        assert!(
            matches!(&err, ReconcileError::CyclicDependency { tables } if tables.len() == 2),
            "{dialect}: {err}"
        );
    }
}
