// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Job definitions, as handed over by a scheduler or read from YAML.

use crate::error::{ApasError, Result};
use crate::mode::{PartitionMode, SaveMode};
use crate::partition::{PartitionKv, TableRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Staging table properties the executor sets itself.
pub const RESERVED_PROPERTIES: [&str; 2] = ["external_location", "format"];

fn default_format() -> String {
    "parquet".to_string()
}

/// Materialize a query as a table partition.
///
/// ```yaml
/// database: sales
/// table: orders
/// sql: SELECT id, amount FROM raw.orders WHERE day = '2024-01-01'
/// partition_kv:
///   region: us
///   day: "2024-01-01"
/// format: parquet
/// additional_properties:
///   parquet_compression: "'SNAPPY'"
/// save_mode: overwrite
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApasJob {
    pub database: String,
    pub table: String,
    pub sql: String,
    pub partition_kv: PartitionKv,
    #[serde(default = "default_format")]
    pub format: String,
    /// Extra staging table properties, rendered verbatim as `key = value`;
    /// values must already be SQL literals.
    #[serde(default)]
    pub additional_properties: BTreeMap<String, String>,
    /// Explicit partition location; derived from the table location when absent.
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub save_mode: SaveMode,
}

impl ApasJob {
    pub fn new(
        database: impl Into<String>,
        table: impl Into<String>,
        sql: impl Into<String>,
        partition_kv: PartitionKv,
    ) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            sql: sql.into(),
            partition_kv,
            format: default_format(),
            additional_properties: BTreeMap::new(),
            location: None,
            save_mode: SaveMode::default(),
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let job: Self = serde_yaml_ng::from_str(text)?;
        job.validate()?;
        Ok(job)
    }

    #[must_use]
    pub fn table_ref(&self) -> TableRef {
        TableRef::new(&self.database, &self.table)
    }

    /// Checks that need no collaborator.
    pub fn validate(&self) -> Result<()> {
        for key in RESERVED_PROPERTIES {
            if self.additional_properties.contains_key(key) {
                return Err(ApasError::config(format!(
                    "Additional properties must not include '{key}'; it is set by the executor."
                )));
            }
        }
        if self.sql.trim().is_empty() {
            return Err(ApasError::config("sql must not be empty"));
        }
        if self.format.trim().is_empty() {
            return Err(ApasError::config("format must not be empty"));
        }
        Ok(())
    }
}

/// Register or repoint a partition at data that is already in place.
///
/// ```yaml
/// database: sales
/// table: orders
/// partition_kv:
///   region: us
///   day: "2024-01-01"
/// follow_location: true
/// mode: overwrite
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPartitionJob {
    pub database: String,
    pub table: String,
    pub partition_kv: PartitionKv,
    #[serde(default)]
    pub location: Option<String>,
    /// Drop the catalog partition when its location holds no objects.
    #[serde(default)]
    pub follow_location: bool,
    #[serde(default)]
    pub mode: PartitionMode,
}

impl AddPartitionJob {
    pub fn new(database: impl Into<String>, table: impl Into<String>, partition_kv: PartitionKv) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            partition_kv,
            location: None,
            follow_location: false,
            mode: PartitionMode::default(),
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(text)?)
    }

    #[must_use]
    pub fn table_ref(&self) -> TableRef {
        TableRef::new(&self.database, &self.table)
    }
}

/// Catalog scoping shared by every call of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogOptions {
    #[serde(default)]
    pub catalog_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apas_job_defaults() {
        let job = ApasJob::from_yaml(
            r#"
database: sales
table: orders
sql: SELECT 1 AS x
partition_kv:
  day: "2024-01-01"
  region: us
"#,
        )
        .expect("valid job");
        assert_eq!(job.format, "parquet");
        assert_eq!(job.save_mode, SaveMode::Overwrite);
        assert!(job.location.is_none());
        assert_eq!(job.table_ref().to_string(), "sales.orders");
    }

    #[test]
    fn test_unknown_save_mode_rejected() {
        let err = ApasJob::from_yaml(
            r#"
database: sales
table: orders
sql: SELECT 1
partition_kv: {day: d}
save_mode: append
"#,
        )
        .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_reserved_properties_rejected() {
        for key in RESERVED_PROPERTIES {
            let mut job = ApasJob::new("sales", "orders", "SELECT 1", PartitionKv::new());
            job.additional_properties
                .insert(key.to_string(), "'x'".to_string());
            let err = job.validate().unwrap_err();
            assert!(err.is_config());
            assert!(err.to_string().contains(key));
        }
    }

    #[test]
    fn test_add_partition_job() {
        let job = AddPartitionJob::from_yaml(
            r#"
database: sales
table: orders
partition_kv: {day: d}
location: s3://bucket/elsewhere
mode: skip_if_exists
"#,
        )
        .expect("valid job");
        assert_eq!(job.mode, PartitionMode::SkipIfExists);
        assert!(!job.follow_location);
        assert_eq!(job.location.as_deref(), Some("s3://bucket/elsewhere"));
    }
}
