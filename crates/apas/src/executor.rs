// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Append/Add Partition As Select.
//!
//! Materializes a query result as a partition of a catalog table:
//!
//! 1. Pre-flight against the catalog ([`PartitionTarget::resolve`]).
//! 2. Conflict check on the target location, per [`SaveMode`].
//! 3. Schema discovery through a transient view.
//! 4. Placeholder upload, staging table creation, `INSERT INTO ... SELECT`.
//! 5. Commit: drop any existing partition, convert the staging table into it.
//! 6. Cleanup: staging table (inner scope), then placeholder (outer scope).
//!
//! Resources are released in reverse acquisition order on every exit path.
//! A failure after an `overwrite` clear leaves the location emptied; the
//! catalog partition itself is only touched in step 5.

use crate::catalog::{Catalog, Column};
use crate::config::ApasJob;
use crate::engine::{QueryEngine, columns_from_describe};
use crate::error::{ApasError, Result};
use crate::mode::{ConflictAction, SaveMode};
use crate::partition::TableRef;
use crate::staging::{StagingNamer, release_after};
use crate::store::ObjectStore;
use crate::target::PartitionTarget;
use diagnostics::{log_debug, log_info};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Zero-byte object that makes the target location look like a directory
/// to engines that refuse external locations without one.
pub const PLACEHOLDER_OBJECT: &str = "_PLACEHOLDER";

/// The three collaborators a run talks to.
#[derive(Clone)]
pub struct Backends {
    pub catalog: Catalog,
    pub engine: Arc<dyn QueryEngine>,
    pub store: Arc<dyn ObjectStore>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApasOutcome {
    /// Data already existed and the save mode said to leave it alone.
    Skipped { location: String },
    /// The partition now points at freshly written data.
    Materialized {
        location: String,
        values: Vec<String>,
        /// Name of the staging table that was converted into the partition.
        staging: String,
        columns: Vec<Column>,
    },
}

/// Quote a string as a SQL literal.
fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Quote a column name as a SQL identifier.
fn sql_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn qualified(table: &TableRef) -> String {
    format!("{}.{}", table.database(), table.table())
}

/// `CREATE TABLE` for the staging table.
///
/// Caller properties come first, verbatim, followed by the location and
/// format the executor controls.
pub fn staging_table_ddl(
    staging: &TableRef,
    columns: &[Column],
    properties: &BTreeMap<String, String>,
    location: &str,
    format: &str,
) -> String {
    let columns: Vec<String> = columns
        .iter()
        .map(|c| format!("{} {}", sql_identifier(&c.name), c.data_type))
        .collect();
    let mut props: Vec<String> = properties
        .iter()
        .map(|(k, v)| format!("{k} = {v}"))
        .collect();
    props.push(format!("external_location = {}", sql_literal(location)));
    props.push(format!("format = {}", sql_literal(format)));

    format!(
        "CREATE TABLE {} ( {} ) WITH ( {} )",
        qualified(staging),
        columns.join(", "),
        props.join(", ")
    )
}

pub struct ApasExecutor {
    job: ApasJob,
    backends: Backends,
    namer: StagingNamer,
}

impl ApasExecutor {
    /// Validate the job and bind it to its collaborators. No I/O.
    pub fn new(job: ApasJob, backends: Backends) -> Result<Self> {
        job.validate()?;
        Ok(Self {
            job,
            backends,
            namer: StagingNamer::system(),
        })
    }

    #[must_use]
    pub fn with_namer(mut self, namer: StagingNamer) -> Self {
        self.namer = namer;
        self
    }

    #[must_use]
    pub fn job(&self) -> &ApasJob {
        &self.job
    }

    /// Pre-flight: catalog checks and location resolution only.
    pub fn prepare(&self) -> Result<PartitionTarget> {
        PartitionTarget::resolve(
            &self.backends.catalog,
            &self.job.table_ref(),
            &self.job.partition_kv,
            self.job.location.as_deref(),
        )
    }

    pub fn run(&mut self) -> Result<ApasOutcome> {
        let target = self.prepare()?;
        self.execute(&target)
    }

    /// Steps 2 to 6 against an already resolved target.
    pub fn execute(&mut self, target: &PartitionTarget) -> Result<ApasOutcome> {
        if !self.clear_for_write(target)? {
            return Ok(ApasOutcome::Skipped {
                location: target.location.clone(),
            });
        }

        let columns = self.describe_columns(target.table.database())?;
        log_info!("Detected columns {columns}", columns: format!("{columns:?}"));

        let staging = TableRef::new(target.table.database(), self.namer.next_name());
        let bucket = target.store_location.bucket();
        let placeholder = target.store_location.key(PLACEHOLDER_OBJECT);

        log_info!("Uploading placeholder {bucket}/{key}", bucket: bucket, key: placeholder.clone());
        self.backends.store.put_object(bucket, &placeholder, &[])?;

        let committed = self.materialize(target, &staging, &columns);
        release_after(committed, "placeholder object", || {
            log_debug!("Deleting placeholder {bucket}/{key}", bucket: bucket, key: placeholder.clone());
            self.backends
                .store
                .delete_objects(bucket, std::slice::from_ref(&placeholder))?;
            Ok(())
        })?;

        Ok(ApasOutcome::Materialized {
            location: target.location.clone(),
            values: target.values(),
            staging: staging.table().to_string(),
            columns,
        })
    }

    /// Apply the save mode. `false` means the run should stop here.
    fn clear_for_write(&self, target: &PartitionTarget) -> Result<bool> {
        let location = &target.location;
        let bucket = target.store_location.bucket();
        let prefix = target.store_location.prefix();
        let mode: SaveMode = self.job.save_mode;

        let exists = self.backends.store.exists_under_prefix(bucket, prefix)?;
        match mode.decide(exists) {
            ConflictAction::Proceed => {
                if exists {
                    log_info!("Continuing although location {location} exists, save mode {mode}",
                              location: location.clone(), mode: mode.as_str());
                }
                Ok(true)
            }
            ConflictAction::Skip => {
                log_info!("Skipping because location {location} exists, save mode {mode}",
                          location: location.clone(), mode: mode.as_str());
                Ok(false)
            }
            ConflictAction::Fail => Err(ApasError::config(format!(
                "Location[{location}] exists and save mode[{mode}] forbids writing to it."
            ))),
            ConflictAction::ClearThenProceed => {
                let keys = self.backends.store.list_keys(bucket, prefix)?;
                log_info!("Deleting {count} objects in location {location}, save mode {mode}",
                          count: keys.len(), location: location.clone(), mode: mode.as_str());
                if !keys.is_empty() {
                    self.backends.store.delete_objects(bucket, &keys)?;
                }
                Ok(true)
            }
        }
    }

    fn run_statement(&self, statement: &str) -> Result<()> {
        log_debug!("SQL: {statement}", statement: statement);
        self.backends.engine.execute(statement)?;
        Ok(())
    }

    /// Column names and types of the job's query, via a transient view.
    fn describe_columns(&mut self, database: &str) -> Result<Vec<Column>> {
        let view = TableRef::new(database, self.namer.next_name());
        let view_name = qualified(&view);

        self.run_statement(&format!("CREATE VIEW {view_name} AS {}", self.job.sql))?;

        let describe = format!("DESCRIBE {view_name}");
        log_debug!("SQL: {statement}", statement: describe.clone());
        let described = self
            .backends
            .engine
            .query(&describe)
            .map_err(ApasError::from)
            .and_then(|rows| Ok(columns_from_describe(&rows)?))
            .and_then(|columns| {
                if columns.is_empty() {
                    Err(ApasError::config("Query produces no columns."))
                } else {
                    Ok(columns)
                }
            });

        release_after(described, "transient view", || {
            self.run_statement(&format!("DROP VIEW {view_name}"))
        })
    }

    /// Create, populate and commit the staging table; always drop it afterwards.
    fn materialize(
        &self,
        target: &PartitionTarget,
        staging: &TableRef,
        columns: &[Column],
    ) -> Result<()> {
        let populated = self.populate_and_commit(target, staging, columns);
        release_after(populated, "staging table", || self.drop_staging_table(staging))
    }

    fn populate_and_commit(
        &self,
        target: &PartitionTarget,
        staging: &TableRef,
        columns: &[Column],
    ) -> Result<()> {
        log_info!("Creating staging table {staging}", staging: staging.to_string());
        self.run_statement(&staging_table_ddl(
            staging,
            columns,
            &self.job.additional_properties,
            &target.location,
            &self.job.format,
        ))?;
        self.run_statement(&format!("INSERT INTO {} {}", qualified(staging), self.job.sql))?;

        let values = target.values();
        let catalog = &self.backends.catalog;
        if catalog.partition_exists(&target.table, &values)? {
            log_info!("Deleting existing partition {partition}",
                      partition: target.partition.to_string());
            catalog.delete_partition(&target.table, &values)?;
        }
        catalog.convert_table_to_partition(staging, &target.table, &values)
    }

    fn drop_staging_table(&self, staging: &TableRef) -> Result<()> {
        let catalog = &self.backends.catalog;
        if catalog.table_exists(staging.database(), staging.table())? {
            log_info!("Dropping staging table {staging}", staging: staging.to_string());
            catalog.delete_table(staging.database(), staging.table())?;
        }
        Ok(())
    }
}
