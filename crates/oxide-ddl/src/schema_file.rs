//! JSON schema definition files.
//!
//! A schema file holds [`TableDef`] entries, either as a bare array or
//! under a `tables` key:
//!
//! ```json
//! { "tables": [
//!     { "name": "language",
//!       "columns": [
//!         { "field": "language_id", "kind": "number", "directive": "type=INTEGER primarykey" },
//!         { "field": "name", "kind": "string", "directive": "notnull" }
//!       ] }
//! ] }
//! ```

use std::path::Path;

use oxide_ddl_core::declare::TableDef;
use serde::Deserialize;
use tracing::debug;

use crate::error::{EnsureError, Result};

#[derive(Deserialize)]
#[serde(untagged)]
enum SchemaFile {
    Tables(Vec<TableDef>),
    Document { tables: Vec<TableDef> },
}

/// Parses schema definitions from JSON text.
///
/// # Errors
///
/// Returns [`EnsureError::Serialization`] if the text is not a valid
/// schema document.
pub fn parse_schema(json: &str) -> Result<Vec<TableDef>> {
    let file: SchemaFile = serde_json::from_str(json)?;
    Ok(match file {
        SchemaFile::Tables(tables) | SchemaFile::Document { tables } => tables,
    })
}

/// Loads schema definitions from a JSON file.
///
/// # Errors
///
/// Returns [`EnsureError::Io`] if the file cannot be read and
/// [`EnsureError::ParseError`] if its content is invalid.
pub async fn load_schema_file(path: impl AsRef<Path>) -> Result<Vec<TableDef>> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await?;
    let tables = parse_schema(&content).map_err(|e| EnsureError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    debug!(path = %path.display(), tables = tables.len(), "Loaded schema file");
    Ok(tables)
}
