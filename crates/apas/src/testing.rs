// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! In-process stand-in for a SQL engine.
//!
//! [`ScriptedEngine`] understands exactly the statements the executor issues
//! (`CREATE VIEW`, `DESCRIBE`, `DROP VIEW`, `CREATE TABLE ... WITH (...)`,
//! `INSERT INTO`) and applies their side effects to a shared
//! [`MemoryCatalog`] and [`ObjectStore`], the way a real engine would
//! against its metastore and bucket.

use crate::catalog::{CatalogService, Column, MemoryCatalog};
use crate::engine::{QueryEngine, Row};
use crate::error::EngineError;
use crate::partition::TableRef;
use crate::store::{ObjectStore, StoreLocation};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Name of the object every `INSERT INTO` writes under the table location.
pub const OUTPUT_OBJECT: &str = "part-00000";

#[derive(Default)]
struct Script {
    columns: Vec<Column>,
    failing_prefixes: Vec<String>,
    views: HashMap<String, String>,
    statements: Vec<String>,
}

pub struct ScriptedEngine {
    catalog: Arc<MemoryCatalog>,
    store: Arc<dyn ObjectStore>,
    catalog_id: Option<String>,
    script: Mutex<Script>,
}

fn query_error(message: impl Into<String>) -> EngineError {
    EngineError::Query {
        name: "SCRIPTED".to_string(),
        message: message.into(),
    }
}

fn parse_table(name: &str) -> Result<TableRef, EngineError> {
    name.split_once('.')
        .map(|(db, table)| TableRef::new(db, table))
        .ok_or_else(|| query_error(format!("unqualified table {name}")))
}

/// Columns of a `"name" type, ...` list. Names are double-quoted with
/// embedded quotes doubled.
fn parse_columns(list: &str) -> Result<Vec<Column>, EngineError> {
    let malformed = || query_error(format!("malformed column list: {list}"));
    let mut columns = Vec::new();
    let mut rest = list;
    while !rest.is_empty() {
        let body = rest.strip_prefix('"').ok_or_else(malformed)?;
        let mut name = String::new();
        let mut end = None;
        let mut chars = body.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c != '"' {
                name.push(c);
            } else if chars.peek().map(|&(_, next)| next) == Some('"') {
                chars.next();
                name.push('"');
            } else {
                end = Some(i + 1);
                break;
            }
        }
        let tail = body[end.ok_or_else(malformed)?..]
            .strip_prefix(' ')
            .ok_or_else(malformed)?;
        let (data_type, next) = match tail.find(", \"") {
            Some(i) => (&tail[..i], &tail[i + 2..]),
            None => (tail, ""),
        };
        columns.push(Column::new(name, data_type));
        rest = next;
    }
    Ok(columns)
}

/// Value of a quoted `key = '...'` property.
fn quoted_property(properties: &str, key: &str) -> Option<String> {
    let start = properties.find(&format!("{key} = '"))? + key.len() + 4;
    let rest = &properties[start..];
    let mut value = String::new();
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
            } else {
                return Some(value);
            }
        }
        value.push(c);
    }
    None
}

impl ScriptedEngine {
    pub fn new(catalog: Arc<MemoryCatalog>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            catalog,
            store,
            catalog_id: None,
            script: Mutex::new(Script::default()),
        }
    }

    /// Register staging tables under a catalog id instead of the default scope.
    #[must_use]
    pub fn with_catalog_id(mut self, catalog_id: impl Into<String>) -> Self {
        self.catalog_id = Some(catalog_id.into());
        self
    }

    /// Columns reported by `DESCRIBE` for every view.
    #[must_use]
    pub fn with_columns(self, columns: Vec<Column>) -> Self {
        self.lock().columns = columns;
        self
    }

    /// Fail every later statement that starts with `prefix`.
    pub fn fail_on(&self, prefix: &str) {
        self.lock().failing_prefixes.push(prefix.to_string());
    }

    pub fn clear_failures(&self) {
        self.lock().failing_prefixes.clear();
    }

    /// Every statement received so far, failed ones included.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.clone()
    }

    /// Views created and not yet dropped.
    #[must_use]
    pub fn open_views(&self) -> Vec<String> {
        let mut views: Vec<String> = self.lock().views.keys().cloned().collect();
        views.sort();
        views
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        // A panic while holding the lock only happens inside a failing test.
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn run(&self, statement: &str) -> Result<Vec<Row>, EngineError> {
        let mut script = self.lock();
        script.statements.push(statement.to_string());
        if script
            .failing_prefixes
            .iter()
            .any(|p| statement.starts_with(p.as_str()))
        {
            return Err(query_error(format!("injected failure: {statement}")));
        }

        if let Some(rest) = statement.strip_prefix("CREATE VIEW ") {
            let (name, sql) = rest
                .split_once(" AS ")
                .ok_or_else(|| query_error("CREATE VIEW without AS"))?;
            if script.views.contains_key(name) {
                return Err(query_error(format!("view {name} already exists")));
            }
            script.views.insert(name.to_string(), sql.to_string());
            Ok(Vec::new())
        } else if let Some(name) = statement.strip_prefix("DESCRIBE ") {
            if !script.views.contains_key(name) {
                return Err(query_error(format!("view {name} does not exist")));
            }
            Ok(script
                .columns
                .iter()
                .map(|c| vec![json!(c.name), json!(c.data_type), json!(""), json!("")])
                .collect())
        } else if let Some(name) = statement.strip_prefix("DROP VIEW ") {
            script
                .views
                .remove(name)
                .map(|_| Vec::new())
                .ok_or_else(|| query_error(format!("view {name} does not exist")))
        } else if let Some(rest) = statement.strip_prefix("CREATE TABLE ") {
            drop(script);
            self.create_table(rest)?;
            Ok(Vec::new())
        } else if let Some(rest) = statement.strip_prefix("INSERT INTO ") {
            drop(script);
            let name = rest.split_whitespace().next().unwrap_or_default();
            self.insert_into(&parse_table(name)?)?;
            Ok(vec![vec![Value::from(1)]])
        } else {
            Err(query_error(format!("unsupported statement: {statement}")))
        }
    }

    fn create_table(&self, rest: &str) -> Result<(), EngineError> {
        let (name, body) = rest
            .split_once(" ( ")
            .ok_or_else(|| query_error("CREATE TABLE without columns"))?;
        let (columns, properties) = body
            .split_once(" ) WITH ( ")
            .ok_or_else(|| query_error("CREATE TABLE without properties"))?;
        let location = quoted_property(properties, "external_location")
            .ok_or_else(|| query_error("CREATE TABLE without external_location"))?;
        StoreLocation::parse(&location).map_err(|e| query_error(e.to_string()))?;

        let table = parse_table(name)?;
        let mut record =
            MemoryCatalog::partitioned_table(table.database(), table.table(), &location, &[]);
        record.storage_descriptor.columns = parse_columns(columns)?;

        self.catalog
            .create_table(self.catalog_id.as_deref(), record)
            .map_err(|e| query_error(e.to_string()))
    }

    fn insert_into(&self, table: &TableRef) -> Result<(), EngineError> {
        let record = self
            .catalog
            .get_table(self.catalog_id.as_deref(), table.database(), table.table())
            .map_err(|e| query_error(e.to_string()))?;
        let location = record
            .storage_descriptor
            .location
            .ok_or_else(|| query_error(format!("table {table} has no location")))?;
        let location = StoreLocation::parse(&location).map_err(|e| query_error(e.to_string()))?;
        self.store
            .put_object(location.bucket(), &location.key(OUTPUT_OBJECT), b"rows")
            .map_err(|e| EngineError::Transport(e.to_string()))
    }
}

impl QueryEngine for ScriptedEngine {
    fn execute(&self, statement: &str) -> Result<Option<Row>, EngineError> {
        Ok(self.run(statement)?.into_iter().next())
    }

    fn query(&self, statement: &str) -> Result<Vec<Row>, EngineError> {
        self.run(statement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ObjectStoreBridge;

    fn engine() -> (Arc<MemoryCatalog>, Arc<ObjectStoreBridge>, ScriptedEngine) {
        let catalog = Arc::new(MemoryCatalog::new());
        catalog.create_database(None, "sales").expect("database");
        let store = Arc::new(ObjectStoreBridge::new().expect("runtime"));
        store.register_in_memory("bucket").expect("register");
        let engine = ScriptedEngine::new(catalog.clone(), store.clone())
            .with_columns(vec![Column::new("id", "bigint")]);
        (catalog, store, engine)
    }

    #[test]
    fn test_view_lifecycle() {
        let (_, _, engine) = engine();
        engine.execute("CREATE VIEW sales.v AS SELECT 1 AS id").expect("create");
        let rows = engine.query("DESCRIBE sales.v").expect("describe");
        assert_eq!(rows[0][0], json!("id"));
        engine.execute("DROP VIEW sales.v").expect("drop");
        assert!(engine.open_views().is_empty());
        assert!(engine.query("DESCRIBE sales.v").is_err());
    }

    #[test]
    fn test_table_and_insert() {
        let (catalog, store, engine) = engine();
        engine
            .execute(
                "CREATE TABLE sales.t ( \"id\" bigint, \"amount\" decimal(10,2) ) WITH ( \
                 external_location = 's3://bucket/t/day=1/', format = 'parquet' )",
            )
            .expect("create");
        let table = catalog.get_table(None, "sales", "t").expect("table");
        assert_eq!(table.storage_descriptor.columns.len(), 2);
        assert_eq!(
            table.storage_descriptor.location.as_deref(),
            Some("s3://bucket/t/day=1/")
        );

        engine.execute("INSERT INTO sales.t SELECT 1").expect("insert");
        assert_eq!(
            store.list_keys("bucket", "t/day=1/").expect("list"),
            vec!["t/day=1/part-00000"]
        );
    }

    #[test]
    fn test_injected_failure_is_recorded() {
        let (_, _, engine) = engine();
        engine.fail_on("INSERT");
        assert!(engine.execute("INSERT INTO sales.t SELECT 1").is_err());
        assert_eq!(engine.statements(), vec!["INSERT INTO sales.t SELECT 1"]);
    }

    #[test]
    fn test_quoted_column_names() {
        assert_eq!(
            parse_columns(r#""id" bigint, "say ""hi""" varchar, "a, b" map(varchar, bigint)"#)
                .expect("columns"),
            vec![
                Column::new("id", "bigint"),
                Column::new("say \"hi\"", "varchar"),
                Column::new("a, b", "map(varchar, bigint)"),
            ]
        );
        assert!(parse_columns("id bigint").is_err());
        assert!(parse_columns(r#""id bigint"#).is_err());
    }

    #[test]
    fn test_quoted_property() {
        assert_eq!(
            quoted_property("a = 1, external_location = 's3://b/o''k/'", "external_location")
                .as_deref(),
            Some("s3://b/o'k/")
        );
        assert_eq!(quoted_property("format = 'orc", "format"), None);
    }
}
