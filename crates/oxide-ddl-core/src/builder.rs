//! Declared schema construction.
//!
//! [`WantTables::build`] lexes every directive of a set of [`TableDef`]s,
//! applies the customization for the target dialect, and produces the same
//! [`Table`] model the introspectors produce. Errors are collected per
//! directive so a single run reports every broken definition.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::catalog::{
    columns_by_name, constraints_by_name, indices_by_name, GotTables, IntrospectionError,
};
use crate::declare::{ColumnDef, ColumnOverride, Customization, TableDef};
use crate::dialect::{Dialect, DialectKind, GenerateError, Statement};
use crate::lexer::{lex_modifiers, lex_value, LexError, Modifier};
use crate::model::{
    Column, FieldKind, ForeignKey, ForeignKeyAction, Generated, Index, IndexType, QualifiedName,
    Table, TableConstraint,
};
use crate::warning::Warning;

/// What to do with a modifier name the builder does not know.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModifierPolicy {
    /// Record a [`Warning::UnknownModifier`] and carry on.
    #[default]
    Warn,
    /// Reject the definition with [`SchemaError::UnknownModifier`].
    Deny,
}

/// Options for [`WantTables::build`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    pub unknown_modifiers: ModifierPolicy,
}

impl BuildOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the unknown modifier policy.
    #[must_use]
    pub const fn unknown_modifiers(mut self, policy: ModifierPolicy) -> Self {
        self.unknown_modifiers = policy;
        self
    }
}

/// A problem with one declared definition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("{field}: invalid directive {directive:?}: {source}")]
    Lex {
        field: String,
        directive: String,
        #[source]
        source: LexError,
    },

    #[error("{field}: unknown modifier '{modifier}'")]
    UnknownModifier { field: String, modifier: String },

    #[error("{field}: invalid value {value:?} for '{modifier}': {reason}")]
    InvalidValue {
        field: String,
        modifier: String,
        value: String,
        reason: String,
    },

    #[error("{field}: a generated column cannot have a default")]
    GeneratedWithDefault { field: String },

    #[error("{field}: expr fields need an explicit type")]
    MissingType { field: String },

    #[error("{field}: cannot resolve reference to {target}: {reason}")]
    UnresolvedReference {
        field: String,
        target: String,
        reason: String,
    },

    #[error("table {table} is declared more than once")]
    DuplicateTable { table: String },

    #[error("{table}: unknown column '{column}'")]
    UnknownColumn { table: String, column: String },
}

/// Every [`SchemaError`] found in one build.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid schema definitions:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
pub struct SchemaErrors(pub Vec<SchemaError>);

impl SchemaErrors {
    /// Returns the individual errors.
    #[must_use]
    pub fn errors(&self) -> &[SchemaError] {
        &self.0
    }
}

/// The declared schema for one dialect.
#[derive(Debug, Clone)]
pub struct WantTables {
    dialect: DialectKind,
    tables: Vec<Table>,
    skipped: Vec<QualifiedName>,
    warnings: Vec<Warning>,
}

impl WantTables {
    /// Creates an empty declared schema.
    #[must_use]
    pub const fn new(dialect: DialectKind) -> Self {
        Self {
            dialect,
            tables: Vec::new(),
            skipped: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Appends a table built directly from the model.
    #[must_use]
    pub fn with_table(mut self, mut table: Table) -> Self {
        table.fold_single_column_keys();
        self.tables.push(table);
        self
    }

    /// Builds the declared schema for `dialect` from table definitions.
    ///
    /// # Errors
    ///
    /// Returns every problem found across all definitions.
    pub fn build(
        defs: &[TableDef],
        dialect: DialectKind,
        options: BuildOptions,
    ) -> Result<Self, SchemaErrors> {
        let mut builder = Builder {
            kind: dialect,
            dialect: dialect.dialect(),
            options,
            errors: Vec::new(),
            warnings: Vec::new(),
        };
        let mut want = Self::new(dialect);

        for def in defs {
            let custom = def.dialects.get(&dialect);
            if custom.is_some_and(|c| c.skip) {
                let schema = custom.and_then(|c| c.schema.clone());
                want.skipped.push(QualifiedName::new(
                    schema.unwrap_or_else(|| def.schema.clone()),
                    def.name.clone(),
                ));
                continue;
            }
            let Some(table) = builder.table(def, custom) else {
                continue;
            };
            if want
                .tables
                .iter()
                .any(|t| t.qualified_name() == table.qualified_name())
            {
                builder.errors.push(SchemaError::DuplicateTable {
                    table: table.qualified_name().to_string(),
                });
                continue;
            }
            want.tables.push(table);
        }

        builder.resolve_references(&mut want.tables);

        if !builder.errors.is_empty() {
            return Err(SchemaErrors(builder.errors));
        }
        want.warnings = builder.warnings;
        Ok(want)
    }

    /// Returns the target dialect.
    #[must_use]
    pub const fn dialect_kind(&self) -> DialectKind {
        self.dialect
    }

    /// Returns the code generator for the target dialect.
    #[must_use]
    pub fn dialect(&self) -> &'static dyn Dialect {
        self.dialect.dialect()
    }

    /// Returns the tables in declaration order.
    #[must_use]
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Looks up a declared table.
    #[must_use]
    pub fn table(&self, name: &QualifiedName) -> Option<&Table> {
        self.tables.iter().find(|t| t.qualified_name() == *name)
    }

    /// Returns the tables declared as no-ops for this dialect.
    #[must_use]
    pub fn skipped(&self) -> &[QualifiedName] {
        &self.skipped
    }

    /// Returns the warnings raised while building.
    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Generates CREATE TABLE for a declared table.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerateError`] if the table is not declared or cannot
    /// be expressed in the dialect.
    pub fn create_table(&self, name: &QualifiedName) -> Result<Vec<Statement>, GenerateError> {
        let table = self.table(name).ok_or_else(|| not_declared(name))?;
        self.dialect().create_table(table)
    }

    /// Generates ADD COLUMN for a declared column.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerateError`] if the column is not declared or cannot
    /// be added in the dialect.
    pub fn create_column(
        &self,
        table: &QualifiedName,
        column: &str,
    ) -> Result<Statement, GenerateError> {
        let declared = self
            .table(table)
            .and_then(|t| t.column(column))
            .ok_or_else(|| GenerateError::NotDeclared {
                name: format!("{table}.{column}"),
            })?;
        self.dialect().create_column(table, declared)
    }

    /// Generates CREATE INDEX for a declared index.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerateError`] if the index is not declared or cannot
    /// be expressed in the dialect.
    pub fn create_index(&self, name: &QualifiedName) -> Result<Statement, GenerateError> {
        for table in &self.tables {
            if let Some(index) = indices_by_name(table).get(name) {
                return self.dialect().create_index(&table.qualified_name(), index);
            }
        }
        Err(not_declared(name))
    }

    fn require(&self, name: &QualifiedName) -> Result<&Table, IntrospectionError> {
        self.table(name)
            .ok_or_else(|| IntrospectionError::missing(name))
    }
}

fn not_declared(name: &QualifiedName) -> GenerateError {
    GenerateError::NotDeclared {
        name: name.to_string(),
    }
}

impl GotTables for WantTables {
    fn default_schema(&self) -> &str {
        ""
    }

    fn list_tables(&self) -> Vec<QualifiedName> {
        let mut names: Vec<QualifiedName> = self.tables.iter().map(Table::qualified_name).collect();
        names.sort();
        names
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

/// Indices declared on columns, before they are assembled.
#[derive(Debug, Default)]
struct IndexGroup {
    /// `None` for an index that belongs to a single column.
    label: Option<String>,
    members: Vec<IndexMember>,
    unique: bool,
    where_expr: Option<String>,
    index_type: IndexType,
}

#[derive(Debug)]
struct IndexMember {
    order: Option<usize>,
    column: String,
    expr: Option<String>,
}

/// Build state shared across all definitions.
struct Builder {
    kind: DialectKind,
    dialect: &'static dyn Dialect,
    options: BuildOptions,
    errors: Vec<SchemaError>,
    warnings: Vec<Warning>,
}

impl Builder {
    fn table(&mut self, def: &TableDef, custom: Option<&Customization>) -> Option<Table> {
        let modifiers = self.lex_list(&def.name, &def.directive)?;
        let name = modifiers
            .iter()
            .rev()
            .find(|m| m.name == "name")
            .map_or(def.name.as_str(), |m| m.value);
        if name.is_empty() {
            self.errors.push(SchemaError::InvalidValue {
                field: def.name.clone(),
                modifier: "name".into(),
                value: String::new(),
                reason: "table name is empty".into(),
            });
            return None;
        }
        let schema = custom
            .and_then(|c| c.schema.clone())
            .unwrap_or_else(|| def.schema.clone());
        let mut table = Table::new(schema, name);
        let errors_before = self.errors.len();

        let mut groups: Vec<IndexGroup> = Vec::new();
        for column in &def.columns {
            self.column(&mut table, &mut groups, column, custom);
        }
        for group in groups {
            table.indices.push(assemble_index(&table.name, group));
        }

        for modifier in &modifiers {
            self.table_modifier(&mut table, modifier);
        }
        if let Some(custom) = custom {
            for directive in &custom.indices {
                let directive = directive.trim();
                let directive = directive
                    .strip_prefix('{')
                    .and_then(|d| d.strip_suffix('}'))
                    .unwrap_or(directive);
                self.table_index(&mut table, directive);
            }
            for check in &custom.checks {
                table
                    .constraints
                    .push(TableConstraint::check(&check.name, &check.expr));
            }
        }

        if self.errors.len() > errors_before {
            return None;
        }
        table.fold_single_column_keys();
        Some(table)
    }

    fn column(
        &mut self,
        table: &mut Table,
        groups: &mut Vec<IndexGroup>,
        def: &ColumnDef,
        custom: Option<&Customization>,
    ) {
        let field = format!("{}.{}", table.name, def.field);
        let Some(modifiers) = self.lex_list(&field, &def.directive) else {
            return;
        };
        let name = modifiers
            .iter()
            .rev()
            .find(|m| m.name == "name")
            .map_or(def.field.as_str(), |m| m.value);
        let overrides = custom.and_then(|c| c.columns.get(name).or_else(|| c.columns.get(&def.field)));
        if overrides.is_some_and(ColumnOverride::drops_column) {
            return;
        }

        let mut column = Column::new(name, "");
        column.kind = Some(def.kind);
        let mut indexed = Vec::new();
        let mut checks = Vec::new();
        for modifier in &modifiers {
            match modifier.name {
                "name" => {}
                "type" => column.column_type = modifier.value.to_string(),
                "notnull" => column.not_null = true,
                "primarykey" => {
                    column.primary_key = true;
                    column.not_null = true;
                }
                "unique" => column.unique = true,
                "index" => indexed.push(modifier.value),
                "references" => {
                    if let Some(fk) = self.references(&field, modifier.value) {
                        column.references = Some(fk);
                    }
                }
                "default" => column.default = Some(modifier.value.to_string()),
                "generated" => {
                    if let Some(generated) = self.generated(&field, modifier.value) {
                        column.generated = Some(generated);
                    }
                }
                "collate" => column.collation = Some(modifier.value.to_string()),
                "autoincrement" => {
                    column.autoincrement = if modifier.is_flag() {
                        self.dialect.native_autoincrement()
                    } else {
                        match self.parse(&field, modifier) {
                            Some(mode) => mode,
                            None => continue,
                        }
                    };
                }
                "check" => checks.push(modifier.value),
                other => self.unknown(&field, other),
            }
        }

        if let Some(o) = overrides {
            apply_override(&mut column, o);
        }
        if column.is_ignored() {
            return;
        }
        for value in indexed {
            self.column_index(&field, &column.name, groups, value);
        }
        for expr in checks {
            table.constraints.push(TableConstraint::check(
                format!("{}_{}_check", table.name, column.name),
                expr,
            ));
        }
        if column.column_type.is_empty() {
            if def.kind == FieldKind::Expr {
                self.errors.push(SchemaError::MissingType { field });
                return;
            }
            column.column_type = self.dialect.default_type(def.kind).to_string();
        }
        if column.generated.is_some() && column.default.is_some() {
            self.errors.push(SchemaError::GeneratedWithDefault { field });
            return;
        }
        table.columns.push(column);
    }

    /// `index`, `index={. unique}` or `index={LABEL order=N expr={..} ..}`.
    fn column_index(
        &mut self,
        field: &str,
        column: &str,
        groups: &mut Vec<IndexGroup>,
        value: &str,
    ) {
        let (label, modifiers) = match lex_value(value) {
            Ok(lexed) => lexed,
            Err(source) => {
                self.lex_error(field, value, source);
                return;
            }
        };
        let label = match label {
            "" | "." => None,
            other => Some(other.to_string()),
        };

        let position = label
            .as_ref()
            .and_then(|l| groups.iter().position(|g| g.label.as_ref() == Some(l)));
        let group = if let Some(i) = position {
            &mut groups[i]
        } else {
            groups.push(IndexGroup {
                label,
                ..IndexGroup::default()
            });
            let last = groups.len() - 1;
            &mut groups[last]
        };

        let mut member = IndexMember {
            order: None,
            column: column.to_string(),
            expr: None,
        };
        for modifier in &modifiers {
            match modifier.name {
                "unique" => group.unique = true,
                "order" => member.order = self.parse(field, modifier),
                "expr" => member.expr = Some(modifier.value.to_string()),
                "where" => group.where_expr = Some(modifier.value.to_string()),
                "type" => {
                    if let Some(index_type) = self.parse(field, modifier) {
                        group.index_type = index_type;
                    }
                }
                other => self.unknown(field, other),
            }
        }
        group.members.push(member);
    }

    /// `table`, `table.column` or `schema.table.column`, followed by
    /// `onupdate=` and `ondelete=`.
    fn references(&mut self, field: &str, value: &str) -> Option<ForeignKey> {
        let (target, modifiers) = match lex_value(value) {
            Ok(lexed) => lexed,
            Err(source) => {
                self.lex_error(field, value, source);
                return None;
            }
        };
        let parts: Vec<&str> = target.split('.').collect();
        let (schema, table, column) = match parts.as_slice() {
            [table] if !table.is_empty() => ("", *table, ""),
            [table, column] => ("", *table, *column),
            [schema, table, column] => (*schema, *table, *column),
            _ => {
                self.errors.push(SchemaError::InvalidValue {
                    field: field.to_string(),
                    modifier: "references".into(),
                    value: value.to_string(),
                    reason: "expected table, table.column or schema.table.column".into(),
                });
                return None;
            }
        };

        let mut fk = ForeignKey::new(QualifiedName::new(schema, table), column);
        for modifier in &modifiers {
            match modifier.name {
                "onupdate" => fk.on_update = self.parse::<ForeignKeyAction>(field, modifier),
                "ondelete" => fk.on_delete = self.parse::<ForeignKeyAction>(field, modifier),
                other => self.unknown(field, other),
            }
        }
        Some(fk)
    }

    /// `{expr} stored` or `{expr} virtual`.
    fn generated(&mut self, field: &str, value: &str) -> Option<Generated> {
        let (expr, modifiers) = match lex_value(value) {
            Ok(lexed) => lexed,
            Err(source) => {
                self.lex_error(field, value, source);
                return None;
            }
        };
        let mut stored = false;
        for modifier in &modifiers {
            match modifier.name {
                "stored" => stored = true,
                "virtual" => stored = false,
                other => self.unknown(field, other),
            }
        }
        Some(Generated {
            expr: expr.to_string(),
            stored,
        })
    }

    fn table_modifier(&mut self, table: &mut Table, modifier: &Modifier<'_>) {
        match modifier.name {
            "name" => {}
            "index" => self.table_index(table, modifier.value),
            "unique" | "primarykey" => self.table_key(table, modifier),
            "check" => self.table_check(table, modifier.value),
            "fts5" => {
                if self.kind == DialectKind::Sqlite {
                    self.fts5(table, modifier.value);
                }
            }
            other => self.unknown(&table.name, other),
        }
    }

    /// `{NAME|. cols=a,b unique type=.. where={..} include=c,d}`.
    fn table_index(&mut self, table: &mut Table, value: &str) {
        let field = table.name.clone();
        let (label, modifiers) = match lex_value(value) {
            Ok(lexed) => lexed,
            Err(source) => {
                self.lex_error(&field, value, source);
                return;
            }
        };
        let mut columns = Vec::new();
        let mut index = Index::default();
        for modifier in &modifiers {
            match modifier.name {
                "cols" => columns = split_list(modifier.value),
                "unique" => index.unique = true,
                "type" => {
                    if let Some(index_type) = self.parse(&field, modifier) {
                        index.index_type = index_type;
                    }
                }
                "where" => index = index.where_clause(modifier.value),
                "include" => index.include = split_list(modifier.value),
                other => self.unknown(&field, other),
            }
        }
        if !self.check_columns(table, &columns, "index", value) {
            return;
        }
        index.name = match label {
            "" | "." => format!("{}_{}_idx", table.name, columns.join("_")),
            name => name.to_string(),
        };
        for column in columns {
            index = index.column(column);
        }
        table.indices.push(index);
    }

    /// `unique={NAME|. cols=a,b}` and `primarykey={NAME|. cols=a,b}`.
    fn table_key(&mut self, table: &mut Table, modifier: &Modifier<'_>) {
        let field = table.name.clone();
        let (label, modifiers) = match lex_value(modifier.value) {
            Ok(lexed) => lexed,
            Err(source) => {
                self.lex_error(&field, modifier.value, source);
                return;
            }
        };
        let mut columns = Vec::new();
        for sub in &modifiers {
            match sub.name {
                "cols" => columns = split_list(sub.value),
                other => self.unknown(&field, other),
            }
        }
        if !self.check_columns(table, &columns, modifier.name, modifier.value) {
            return;
        }
        let constraint = if modifier.name == "primarykey" {
            let name = match label {
                "" | "." => format!("{}_pkey", table.name),
                name => name.to_string(),
            };
            TableConstraint::primary_key(name, columns)
        } else {
            let name = match label {
                "" | "." => format!("{}_{}_key", table.name, columns.join("_")),
                name => name.to_string(),
            };
            TableConstraint::unique(name, columns)
        };
        table.constraints.push(constraint);
    }

    /// `check={NAME expr={..}}`.
    fn table_check(&mut self, table: &mut Table, value: &str) {
        let field = table.name.clone();
        let (label, modifiers) = match lex_value(value) {
            Ok(lexed) => lexed,
            Err(source) => {
                self.lex_error(&field, value, source);
                return;
            }
        };
        let mut expr = None;
        for modifier in &modifiers {
            match modifier.name {
                "expr" => expr = Some(modifier.value),
                other => self.unknown(&field, other),
            }
        }
        let Some(expr) = expr.filter(|e| !e.is_empty()) else {
            self.errors.push(SchemaError::InvalidValue {
                field,
                modifier: "check".into(),
                value: value.to_string(),
                reason: "missing expr".into(),
            });
            return;
        };
        let name = match label {
            "" | "." => format!("{}_check", table.name),
            name => name.to_string(),
        };
        table.constraints.push(TableConstraint::check(name, expr));
    }

    /// Keeps the fts5 options as a comma separated argument list.
    fn fts5(&mut self, table: &mut Table, value: &str) {
        match lex_modifiers(value) {
            Ok(options) => {
                let options: Vec<String> = options
                    .iter()
                    .map(|m| {
                        if m.is_flag() {
                            m.name.to_string()
                        } else {
                            format!("{}={}", m.name, m.value)
                        }
                    })
                    .collect();
                table.fts5 = Some(options.join(", "));
            }
            Err(source) => self.lex_error(&table.name, value, source),
        }
    }

    fn check_columns(&mut self, table: &Table, columns: &[String], modifier: &str, value: &str) -> bool {
        if columns.is_empty() {
            self.errors.push(SchemaError::InvalidValue {
                field: table.name.clone(),
                modifier: modifier.to_string(),
                value: value.to_string(),
                reason: "missing cols".into(),
            });
            return false;
        }
        let mut ok = true;
        for column in columns {
            if table.column(column).is_none() {
                self.errors.push(SchemaError::UnknownColumn {
                    table: table.name.clone(),
                    column: column.clone(),
                });
                ok = false;
            }
        }
        ok
    }

    /// Fills schemas and columns of foreign key targets once every table
    /// is known.
    fn resolve_references(&mut self, tables: &mut [Table]) {
        let mut resolved = Vec::new();
        for (ti, table) in tables.iter().enumerate() {
            for (ci, column) in table.columns.iter().enumerate() {
                let Some(fk) = &column.references else {
                    continue;
                };
                let target = find_target(tables, table, &fk.table);
                let mut fk = fk.clone();
                if let Some(target) = target {
                    if fk.table.schema.is_empty() {
                        fk.table.schema.clone_from(&target.schema);
                    }
                }
                if fk.column.is_empty() {
                    let field = format!("{}.{}", table.name, column.name);
                    match target.map(Table::single_primary_key) {
                        Some(Some(pk)) => fk.column = pk.to_string(),
                        Some(None) => {
                            self.errors.push(SchemaError::UnresolvedReference {
                                field,
                                target: fk.table.to_string(),
                                reason: "table has no single-column primary key".into(),
                            });
                            continue;
                        }
                        None => {
                            self.errors.push(SchemaError::UnresolvedReference {
                                field,
                                target: fk.table.to_string(),
                                reason: "table is not declared".into(),
                            });
                            continue;
                        }
                    }
                }
                resolved.push((ti, ci, fk));
            }
        }
        for (ti, ci, fk) in resolved {
            tables[ti].columns[ci].references = Some(fk);
        }
    }

    fn lex_list<'a>(&mut self, field: &str, directive: &'a str) -> Option<Vec<Modifier<'a>>> {
        match lex_modifiers(directive) {
            Ok(modifiers) => Some(modifiers),
            Err(source) => {
                self.lex_error(field, directive, source);
                None
            }
        }
    }

    fn lex_error(&mut self, field: &str, directive: &str, source: LexError) {
        self.errors.push(SchemaError::Lex {
            field: field.to_string(),
            directive: directive.to_string(),
            source,
        });
    }

    fn parse<T>(&mut self, field: &str, modifier: &Modifier<'_>) -> Option<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match modifier.value.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                self.errors.push(SchemaError::InvalidValue {
                    field: field.to_string(),
                    modifier: modifier.name.to_string(),
                    value: modifier.value.to_string(),
                    reason: e.to_string(),
                });
                None
            }
        }
    }

    fn unknown(&mut self, field: &str, modifier: &str) {
        let field = field.to_string();
        let modifier = modifier.to_string();
        match self.options.unknown_modifiers {
            ModifierPolicy::Warn => self
                .warnings
                .push(Warning::UnknownModifier { field, modifier }),
            ModifierPolicy::Deny => self
                .errors
                .push(SchemaError::UnknownModifier { field, modifier }),
        }
    }
}

fn apply_override(column: &mut Column, o: &ColumnOverride) {
    if let Some(column_type) = &o.column_type {
        column.column_type.clone_from(column_type);
    }
    if let Some(default) = &o.default {
        column.default = Some(default.clone());
    }
    if let Some(mode) = o.autoincrement {
        column.autoincrement = mode;
    }
    if let Some(generated) = &o.generated {
        column.generated = Some(generated.clone());
    }
    if let Some(not_null) = o.not_null {
        column.not_null = not_null;
    }
    if o.on_update_current_timestamp {
        column.on_update_current_timestamp = true;
    }
}

fn assemble_index(table: &str, mut group: IndexGroup) -> Index {
    group
        .members
        .sort_by_key(|m| m.order.unwrap_or(usize::MAX));
    let name = format!(
        "{table}_{}_idx",
        group
            .members
            .iter()
            .map(|m| m.column.as_str())
            .collect::<Vec<_>>()
            .join("_")
    );
    let mut index = Index::new(name).index_type(group.index_type);
    index.unique = group.unique;
    if let Some(predicate) = group.where_expr {
        index = index.where_clause(predicate);
    }
    for member in group.members {
        index = match member.expr {
            Some(expr) => index.expr(expr),
            None => index.column(member.column),
        };
    }
    index
}

fn find_target<'a>(tables: &'a [Table], from: &Table, target: &QualifiedName) -> Option<&'a Table> {
    let mut candidates = tables.iter().filter(|t| t.name == target.name);
    if target.schema.is_empty() {
        let candidates: Vec<&Table> = candidates.collect();
        candidates
            .iter()
            .find(|t| t.schema == from.schema)
            .or_else(|| candidates.first())
            .copied()
    } else {
        candidates.find(|t| t.schema == target.schema)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
