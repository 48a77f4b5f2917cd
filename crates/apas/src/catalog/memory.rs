// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use super::{
    CatalogService, Column, Database, Partition, PartitionInput, SerdeInfo, StorageDescriptor,
    Table,
};
use crate::error::{CatalogError, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

const DEFAULT_CATALOG: &str = "";

/// Mutating operations that can be told to fail, for exercising error paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CatalogOp {
    CreatePartition,
    UpdatePartition,
    DeletePartition,
    DeleteTable,
}

/// In-memory catalog service for testing and local runs.
///
/// Entities are scoped per catalog id; calls without one share a default
/// scope. Mirrors the managed service's behavior: creates fail with
/// `AlreadyExists`, updates and deletes of absent entities fail with
/// `NotFound`.
#[derive(Default)]
pub struct MemoryCatalog(Mutex<State>);

#[derive(Default)]
struct State {
    catalogs: HashMap<String, BTreeMap<String, DatabaseEntry>>,
    failing: BTreeSet<CatalogOp>,
}

struct DatabaseEntry {
    database: Database,
    tables: BTreeMap<String, TableEntry>,
}

struct TableEntry {
    table: Table,
    partitions: BTreeMap<Vec<String>, Partition>,
}

fn scope(catalog_id: Option<&str>) -> String {
    catalog_id.unwrap_or(DEFAULT_CATALOG).to_string()
}

impl State {
    fn databases(&self, catalog_id: Option<&str>) -> Option<&BTreeMap<String, DatabaseEntry>> {
        self.catalogs.get(&scope(catalog_id))
    }

    fn database(&self, catalog_id: Option<&str>, db: &str) -> Result<&DatabaseEntry, CatalogError> {
        self.databases(catalog_id)
            .and_then(|dbs| dbs.get(db))
            .ok_or_else(|| CatalogError::not_found(format!("Database[{db}]")))
    }

    fn database_mut(
        &mut self,
        catalog_id: Option<&str>,
        db: &str,
    ) -> Result<&mut DatabaseEntry, CatalogError> {
        self.catalogs
            .get_mut(&scope(catalog_id))
            .and_then(|dbs| dbs.get_mut(db))
            .ok_or_else(|| CatalogError::not_found(format!("Database[{db}]")))
    }

    fn table(&self, catalog_id: Option<&str>, db: &str, name: &str) -> Result<&TableEntry, CatalogError> {
        self.database(catalog_id, db)?
            .tables
            .get(name)
            .ok_or_else(|| CatalogError::not_found(format!("Table[{db}.{name}]")))
    }

    fn table_mut(
        &mut self,
        catalog_id: Option<&str>,
        db: &str,
        name: &str,
    ) -> Result<&mut TableEntry, CatalogError> {
        self.database_mut(catalog_id, db)?
            .tables
            .get_mut(name)
            .ok_or_else(|| CatalogError::not_found(format!("Table[{db}.{name}]")))
    }

    fn check(&self, op: CatalogOp) -> Result<(), CatalogError> {
        if self.failing.contains(&op) {
            return Err(CatalogError::Service(format!("injected failure for {op:?}")));
        }
        Ok(())
    }
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, CatalogError> {
        self.0
            .lock()
            .map_err(|e| CatalogError::Service(format!("catalog state poisoned: {e}")))
    }

    /// A hive-style parquet table with string partition keys.
    #[must_use]
    pub fn partitioned_table(db: &str, name: &str, location: &str, keys: &[&str]) -> Table {
        Table {
            name: name.to_string(),
            database_name: db.to_string(),
            partition_keys: keys.iter().map(|k| Column::new(*k, "string")).collect(),
            storage_descriptor: StorageDescriptor {
                location: Some(location.to_string()),
                columns: Vec::new(),
                input_format: Some(
                    "org.apache.hadoop.hive.ql.io.parquet.MapredParquetInputFormat".to_string(),
                ),
                output_format: Some(
                    "org.apache.hadoop.hive.ql.io.parquet.MapredParquetOutputFormat".to_string(),
                ),
                compressed: false,
                serde_info: SerdeInfo {
                    serialization_library: Some(
                        "org.apache.hadoop.hive.ql.io.parquet.serde.ParquetHiveSerDe".to_string(),
                    ),
                    parameters: BTreeMap::new(),
                },
            },
            parameters: BTreeMap::new(),
        }
    }

    pub fn create_database(&self, catalog_id: Option<&str>, name: &str) -> Result<(), CatalogError> {
        let mut state = self.state()?;
        let dbs = state.catalogs.entry(scope(catalog_id)).or_default();
        if dbs.contains_key(name) {
            return Err(CatalogError::already_exists(format!("Database[{name}]")));
        }
        dbs.insert(
            name.to_string(),
            DatabaseEntry {
                database: Database {
                    name: name.to_string(),
                    location_uri: None,
                },
                tables: BTreeMap::new(),
            },
        );
        Ok(())
    }

    pub fn create_table(&self, catalog_id: Option<&str>, table: Table) -> Result<(), CatalogError> {
        let mut state = self.state()?;
        let db = state.database_mut(catalog_id, &table.database_name)?;
        if db.tables.contains_key(&table.name) {
            return Err(CatalogError::already_exists(format!(
                "Table[{}.{}]",
                table.database_name, table.name
            )));
        }
        db.tables.insert(
            table.name.clone(),
            TableEntry {
                table,
                partitions: BTreeMap::new(),
            },
        );
        Ok(())
    }

    /// Table names of a database, sorted.
    pub fn table_names(&self, catalog_id: Option<&str>, db: &str) -> Result<Vec<String>, CatalogError> {
        let state = self.state()?;
        Ok(state.database(catalog_id, db)?.tables.keys().cloned().collect())
    }

    /// Partitions of a table, sorted by value list.
    pub fn partitions(
        &self,
        catalog_id: Option<&str>,
        db: &str,
        table: &str,
    ) -> Result<Vec<Partition>, CatalogError> {
        let state = self.state()?;
        Ok(state
            .table(catalog_id, db, table)?
            .partitions
            .values()
            .cloned()
            .collect())
    }

    /// Make every subsequent `op` fail with a service error.
    pub fn fail_on(&self, op: CatalogOp) -> Result<(), CatalogError> {
        self.state()?.failing.insert(op);
        Ok(())
    }

    pub fn clear_failures(&self) -> Result<(), CatalogError> {
        self.state()?.failing.clear();
        Ok(())
    }
}

impl CatalogService for MemoryCatalog {
    fn get_database(&self, catalog_id: Option<&str>, name: &str) -> Result<Database, CatalogError> {
        Ok(self.state()?.database(catalog_id, name)?.database.clone())
    }

    fn get_table(&self, catalog_id: Option<&str>, db: &str, name: &str) -> Result<Table, CatalogError> {
        Ok(self.state()?.table(catalog_id, db, name)?.table.clone())
    }

    fn get_partition(
        &self,
        catalog_id: Option<&str>,
        db: &str,
        table: &str,
        values: &[String],
    ) -> Result<Partition, CatalogError> {
        let state = self.state()?;
        state
            .table(catalog_id, db, table)?
            .partitions
            .get(values)
            .cloned()
            .ok_or_else(|| CatalogError::not_found(format!("Partition{values:?} of {db}.{table}")))
    }

    fn create_partition(
        &self,
        catalog_id: Option<&str>,
        db: &str,
        table: &str,
        input: PartitionInput,
    ) -> Result<(), CatalogError> {
        let mut state = self.state()?;
        state.check(CatalogOp::CreatePartition)?;
        let entry = state.table_mut(catalog_id, db, table)?;
        if input.values.len() != entry.table.partition_keys.len() {
            return Err(CatalogError::InvalidInput(format!(
                "{} partition values given for {} partition keys of {db}.{table}",
                input.values.len(),
                entry.table.partition_keys.len()
            )));
        }
        if entry.partitions.contains_key(&input.values) {
            return Err(CatalogError::already_exists(format!(
                "Partition{:?} of {db}.{table}",
                input.values
            )));
        }
        entry.partitions.insert(
            input.values.clone(),
            Partition {
                database_name: db.to_string(),
                table_name: table.to_string(),
                values: input.values,
                storage_descriptor: input.storage_descriptor,
            },
        );
        Ok(())
    }

    fn update_partition(
        &self,
        catalog_id: Option<&str>,
        db: &str,
        table: &str,
        values: &[String],
        input: PartitionInput,
    ) -> Result<(), CatalogError> {
        let mut state = self.state()?;
        state.check(CatalogOp::UpdatePartition)?;
        let entry = state.table_mut(catalog_id, db, table)?;
        let partition = entry
            .partitions
            .get_mut(values)
            .ok_or_else(|| CatalogError::not_found(format!("Partition{values:?} of {db}.{table}")))?;
        partition.storage_descriptor = input.storage_descriptor;
        if input.values != values {
            let moved = entry.partitions.remove(values);
            if let Some(mut moved) = moved {
                moved.values = input.values.clone();
                entry.partitions.insert(input.values, moved);
            }
        }
        Ok(())
    }

    fn delete_partition(
        &self,
        catalog_id: Option<&str>,
        db: &str,
        table: &str,
        values: &[String],
    ) -> Result<(), CatalogError> {
        let mut state = self.state()?;
        state.check(CatalogOp::DeletePartition)?;
        state
            .table_mut(catalog_id, db, table)?
            .partitions
            .remove(values)
            .map(|_| ())
            .ok_or_else(|| CatalogError::not_found(format!("Partition{values:?} of {db}.{table}")))
    }

    fn delete_table(&self, catalog_id: Option<&str>, db: &str, name: &str) -> Result<(), CatalogError> {
        let mut state = self.state()?;
        state.check(CatalogOp::DeleteTable)?;
        state
            .database_mut(catalog_id, db)?
            .tables
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| CatalogError::not_found(format!("Table[{db}.{name}]")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> MemoryCatalog {
        let catalog = MemoryCatalog::new();
        catalog.create_database(None, "sales").expect("database");
        catalog
            .create_table(
                None,
                MemoryCatalog::partitioned_table("sales", "orders", "s3://b/orders/", &["day"]),
            )
            .expect("table");
        catalog
    }

    fn input(day: &str, location: &str) -> PartitionInput {
        PartitionInput {
            values: vec![day.to_string()],
            storage_descriptor: StorageDescriptor {
                location: Some(location.to_string()),
                ..StorageDescriptor::default()
            },
        }
    }

    #[test]
    fn test_lookups_report_not_found() {
        let catalog = catalog();
        assert!(catalog.get_database(None, "hr").unwrap_err().is_not_found());
        assert!(catalog.get_table(None, "hr", "x").unwrap_err().is_not_found());
        assert!(catalog.get_table(None, "sales", "x").unwrap_err().is_not_found());
        assert!(
            catalog
                .get_partition(None, "sales", "orders", &["d".to_string()])
                .unwrap_err()
                .is_not_found()
        );
    }

    #[test]
    fn test_create_twice_fails() {
        let catalog = catalog();
        catalog
            .create_partition(None, "sales", "orders", input("d1", "s3://b/orders/day=d1/"))
            .expect("first create");
        let err = catalog
            .create_partition(None, "sales", "orders", input("d1", "s3://b/orders/day=d1/"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::AlreadyExists(_)));
    }

    #[test]
    fn test_value_count_must_match_keys() {
        let catalog = catalog();
        let mut bad = input("d1", "s3://b/x/");
        bad.values.push("extra".to_string());
        let err = catalog.create_partition(None, "sales", "orders", bad).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidInput(_)));
    }

    #[test]
    fn test_update_and_delete_absent_partition() {
        let catalog = catalog();
        let values = vec!["d1".to_string()];
        assert!(
            catalog
                .update_partition(None, "sales", "orders", &values, input("d1", "s3://b/x/"))
                .unwrap_err()
                .is_not_found()
        );
        assert!(
            catalog
                .delete_partition(None, "sales", "orders", &values)
                .unwrap_err()
                .is_not_found()
        );
    }

    #[test]
    fn test_injected_failure() {
        let catalog = catalog();
        catalog.fail_on(CatalogOp::DeleteTable).expect("inject");
        let err = catalog.delete_table(None, "sales", "orders").unwrap_err();
        assert!(matches!(err, CatalogError::Service(_)));

        catalog.clear_failures().expect("clear");
        catalog.delete_table(None, "sales", "orders").expect("delete");
        assert!(catalog.table_names(None, "sales").expect("names").is_empty());
    }

    #[test]
    fn test_scopes_are_isolated() {
        let catalog = catalog();
        catalog.create_database(Some("other"), "sales").expect("database");
        assert!(catalog.get_table(Some("other"), "sales", "orders").is_err());
        assert!(catalog.get_table(None, "sales", "orders").is_ok());
    }
}
