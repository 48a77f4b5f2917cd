// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Append/Add Partition As Select
//!
//! Materializes the result of a SQL query as a partition of a
//! catalog-registered, externally stored, partitioned table, and registers
//! or repoints partitions whose data is already in place.
//!
//! # Architecture
//!
//! - **Catalog**: existence checks, partition keys and locations, and the
//!   table-to-partition commit, over any [`CatalogService`]
//! - **QueryEngine** / **ObjectStore**: blocking collaborator interfaces
//! - **PartitionTarget**: pre-flight validation and location resolution
//! - **ApasExecutor**: query materialization with guaranteed cleanup of the
//!   transient view, staging table and placeholder object
//! - **PartitionUpserter**: catalog-only create/update/skip of a partition
//!
//! # Usage
//!
//! ```no_run
//! # fn example(backends: apas::Backends) -> apas::Result<()> {
//! use apas::{ApasExecutor, ApasJob};
//!
//! let job = ApasJob::from_yaml(
//!     r#"
//! database: sales
//! table: orders
//! sql: SELECT id, amount FROM raw.orders WHERE day = '2024-01-01'
//! partition_kv: {region: us, day: "2024-01-01"}
//! save_mode: overwrite
//! "#,
//! )?;
//!
//! let mut executor = ApasExecutor::new(job, backends)?;
//! let target = executor.prepare()?;
//! let outcome = executor.execute(&target)?;
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
mod config;
mod engine;
mod error;
mod executor;
mod mode;
mod partition;
mod staging;
pub mod store;
mod target;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
mod upserter;

pub use catalog::{Catalog, CatalogService, Column, MemoryCatalog};
pub use config::{AddPartitionJob, ApasJob, CatalogOptions, RESERVED_PROPERTIES};
pub use engine::{QueryEngine, Row, columns_from_describe};
pub use error::{ApasError, CatalogError, EngineError, LocationError, Result, StoreError};
pub use executor::{ApasExecutor, ApasOutcome, Backends, PLACEHOLDER_OBJECT, staging_table_ddl};
pub use mode::{ConflictAction, PartitionAction, PartitionMode, SaveMode};
pub use partition::{OrderedPartition, PartitionKv, TableRef, normalize_location, partition_location};
pub use staging::{STAGING_PREFIX, StagingNamer, release_after, staging_name};
pub use store::{ObjectStore, ObjectStoreBridge, S3Options, StoreLocation};
pub use target::PartitionTarget;
pub use upserter::{PartitionUpserter, UpsertOutcome};
