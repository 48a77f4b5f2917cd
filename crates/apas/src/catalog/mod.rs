// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Metadata catalog access.
//!
//! # Architecture
//!
//! - **CatalogService**: the raw collaborator API (get/create/update/delete of
//!   databases, tables and partitions). Implementations translate their
//!   service's error model into [`CatalogError`], keeping "not found" distinct.
//! - **Catalog**: the semantics the APAS protocol relies on, layered over any
//!   `CatalogService`: existence checks, partition key and location lookup,
//!   partition descriptors derived from the parent table, and the
//!   table-to-partition commit primitive.
//!
//! Records mirror the managed catalog's JSON shape (PascalCase fields).

mod memory;

pub use memory::{CatalogOp, MemoryCatalog};

use crate::config::CatalogOptions;
use crate::error::{ApasError, CatalogError, Result};
use crate::partition::TableRef;
use diagnostics::{log_debug, log_error, log_info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Database {
    pub name: String,
    #[serde(default)]
    pub location_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Column {
    pub name: String,
    #[serde(rename = "Type")]
    pub data_type: String,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SerdeInfo {
    #[serde(default)]
    pub serialization_library: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

/// Physical format of a table or partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StorageDescriptor {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub input_format: Option<String>,
    #[serde(default)]
    pub output_format: Option<String>,
    #[serde(default)]
    pub compressed: bool,
    #[serde(default)]
    pub serde_info: SerdeInfo,
}

impl StorageDescriptor {
    /// Same format, different location.
    #[must_use]
    pub fn relocated(&self, location: &str) -> Self {
        Self {
            location: Some(location.to_string()),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Table {
    pub name: String,
    pub database_name: String,
    #[serde(default)]
    pub partition_keys: Vec<Column>,
    pub storage_descriptor: StorageDescriptor,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Partition {
    pub database_name: String,
    pub table_name: String,
    pub values: Vec<String>,
    pub storage_descriptor: StorageDescriptor,
}

/// Payload of partition create/update calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PartitionInput {
    pub values: Vec<String>,
    pub storage_descriptor: StorageDescriptor,
}

/// Raw catalog collaborator.
///
/// `catalog_id` scopes every call when configured. Lookups of absent
/// entities must fail with [`CatalogError::NotFound`].
pub trait CatalogService: Send + Sync {
    fn get_database(&self, catalog_id: Option<&str>, name: &str)
    -> Result<Database, CatalogError>;

    fn get_table(&self, catalog_id: Option<&str>, db: &str, name: &str)
    -> Result<Table, CatalogError>;

    fn get_partition(
        &self,
        catalog_id: Option<&str>,
        db: &str,
        table: &str,
        values: &[String],
    ) -> Result<Partition, CatalogError>;

    fn create_partition(
        &self,
        catalog_id: Option<&str>,
        db: &str,
        table: &str,
        input: PartitionInput,
    ) -> Result<(), CatalogError>;

    fn update_partition(
        &self,
        catalog_id: Option<&str>,
        db: &str,
        table: &str,
        values: &[String],
        input: PartitionInput,
    ) -> Result<(), CatalogError>;

    fn delete_partition(
        &self,
        catalog_id: Option<&str>,
        db: &str,
        table: &str,
        values: &[String],
    ) -> Result<(), CatalogError>;

    fn delete_table(&self, catalog_id: Option<&str>, db: &str, name: &str)
    -> Result<(), CatalogError>;
}

/// Catalog semantics used by the APAS protocol.
#[derive(Clone)]
pub struct Catalog {
    service: Arc<dyn CatalogService>,
    catalog_id: Option<String>,
}

/// Absorb a not-found failure into `false`; anything else propagates.
fn found<T>(lookup: Result<T, CatalogError>) -> Result<bool> {
    match lookup {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e.into()),
    }
}

impl Catalog {
    pub fn new(service: Arc<dyn CatalogService>, catalog_id: Option<String>) -> Self {
        Self {
            service,
            catalog_id,
        }
    }

    pub fn with_options(service: Arc<dyn CatalogService>, options: &CatalogOptions) -> Self {
        Self::new(service, options.catalog_id.clone())
    }

    #[must_use]
    pub fn catalog_id(&self) -> Option<&str> {
        self.catalog_id.as_deref()
    }

    pub fn get_table(&self, db: &str, name: &str) -> Result<Table> {
        Ok(self.service.get_table(self.catalog_id(), db, name)?)
    }

    pub fn get_partition(&self, table: &TableRef, values: &[String]) -> Result<Partition> {
        Ok(self
            .service
            .get_partition(self.catalog_id(), table.database(), table.table(), values)?)
    }

    pub fn database_exists(&self, name: &str) -> Result<bool> {
        found(self.service.get_database(self.catalog_id(), name))
    }

    pub fn table_exists(&self, db: &str, name: &str) -> Result<bool> {
        found(self.service.get_table(self.catalog_id(), db, name))
    }

    pub fn partition_exists(&self, table: &TableRef, values: &[String]) -> Result<bool> {
        found(self.service.get_partition(
            self.catalog_id(),
            table.database(),
            table.table(),
            values,
        ))
    }

    /// Declared partition key names in catalog order. Empty for unpartitioned tables.
    pub fn partition_keys(&self, table: &TableRef) -> Result<Vec<String>> {
        let table = self.get_table(table.database(), table.table())?;
        Ok(table.partition_keys.into_iter().map(|c| c.name).collect())
    }

    /// Base location of the table's storage descriptor.
    pub fn table_location(&self, table: &TableRef) -> Result<String> {
        self.get_table(table.database(), table.table())?
            .storage_descriptor
            .location
            .filter(|l| !l.is_empty())
            .ok_or_else(|| ApasError::config(format!("Table[{table}] does not have Location")))
    }

    fn partition_input_from_table(
        &self,
        table: &TableRef,
        values: &[String],
        location: &str,
    ) -> Result<PartitionInput> {
        let parent = self.get_table(table.database(), table.table())?;
        Ok(PartitionInput {
            values: values.to_vec(),
            storage_descriptor: parent.storage_descriptor.relocated(location),
        })
    }

    /// Register a partition whose format is copied from the parent table.
    ///
    /// Not idempotent: fails if the partition already exists.
    pub fn create_partition(&self, table: &TableRef, values: &[String], location: &str) -> Result<()> {
        let input = self.partition_input_from_table(table, values, location)?;
        log_debug!("Creating partition {values} of {table} at {location}",
                   values: format!("{values:?}"), table: table.to_string(), location: location);
        self.service
            .create_partition(self.catalog_id(), table.database(), table.table(), input)?;
        Ok(())
    }

    /// Repoint an existing partition, re-deriving its format from the parent table.
    pub fn update_partition(&self, table: &TableRef, values: &[String], location: &str) -> Result<()> {
        let input = self.partition_input_from_table(table, values, location)?;
        log_debug!("Updating partition {values} of {table} to {location}",
                   values: format!("{values:?}"), table: table.to_string(), location: location);
        self.service.update_partition(
            self.catalog_id(),
            table.database(),
            table.table(),
            values,
            input,
        )?;
        Ok(())
    }

    pub fn delete_partition(&self, table: &TableRef, values: &[String]) -> Result<()> {
        log_debug!("Deleting partition {values} of {table}",
                   values: format!("{values:?}"), table: table.to_string());
        self.service
            .delete_partition(self.catalog_id(), table.database(), table.table(), values)?;
        Ok(())
    }

    pub fn delete_table(&self, db: &str, name: &str) -> Result<()> {
        log_debug!("Deleting table {db}.{name}", db: db, name: name);
        self.service.delete_table(self.catalog_id(), db, name)?;
        Ok(())
    }

    /// Turn a whole table into a partition of another table.
    ///
    /// The new partition takes the source table's storage descriptor
    /// verbatim, then the source table is deleted. If the delete fails the
    /// partition stays committed and the source table is left orphaned; the
    /// error is returned without retrying.
    pub fn convert_table_to_partition(
        &self,
        src: &TableRef,
        dst: &TableRef,
        values: &[String],
    ) -> Result<()> {
        let source = self.get_table(src.database(), src.table())?;
        let input = PartitionInput {
            values: values.to_vec(),
            storage_descriptor: source.storage_descriptor,
        };
        self.service
            .create_partition(self.catalog_id(), dst.database(), dst.table(), input)?;
        log_info!("Converted table {src} into partition {values} of {dst}",
                  src: src.to_string(), values: format!("{values:?}"), dst: dst.to_string());

        self.delete_table(src.database(), src.table()).inspect_err(|e| {
            log_error!("Partition committed but source table {src} was not deleted: {error}",
                       src: src.to_string(), error: e.to_string());
        })
    }
}
