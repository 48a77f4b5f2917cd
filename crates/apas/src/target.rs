// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Pre-flight validation shared by the executor and the upserter.

use crate::catalog::Catalog;
use crate::error::{ApasError, Result};
use crate::partition::{
    OrderedPartition, PartitionKv, TableRef, normalize_location, order_partition,
    partition_location,
};
use crate::store::StoreLocation;
use diagnostics::log_info;

/// A validated (table, partition, location) triple.
///
/// Produced only after the catalog confirmed the database, the table and its
/// partition keys, so everything here is consistent with catalog state at
/// resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionTarget {
    pub table: TableRef,
    pub partition: OrderedPartition,
    /// Normalized, ends with the path separator.
    pub location: String,
    pub store_location: StoreLocation,
}

impl PartitionTarget {
    /// Run every catalog check, then derive or normalize the location.
    ///
    /// Performs catalog reads only.
    pub fn resolve(
        catalog: &Catalog,
        table: &TableRef,
        partition_kv: &PartitionKv,
        location: Option<&str>,
    ) -> Result<Self> {
        if !catalog.database_exists(table.database())? {
            return Err(ApasError::config(format!(
                "DB[{}] is not found.",
                table.database()
            )));
        }
        if !catalog.table_exists(table.database(), table.table())? {
            return Err(ApasError::config(format!("Table[{table}] is not found.")));
        }

        let declared = catalog.partition_keys(table)?;
        if declared.is_empty() {
            return Err(ApasError::config(format!(
                "Table[{table}] does not have partition keys."
            )));
        }
        let partition = order_partition(&declared, partition_kv)?;

        let location = match location {
            Some(explicit) => normalize_location(explicit),
            None => partition_location(&catalog.table_location(table)?, &partition),
        };
        let store_location = StoreLocation::parse(&location)?;

        log_info!("Resolved partition {partition} of {table} at {location}",
                  partition: partition.to_string(), table: table.to_string(), location: location.clone());

        Ok(Self {
            table: table.clone(),
            partition,
            location,
            store_location,
        })
    }

    #[must_use]
    pub fn values(&self) -> Vec<String> {
        self.partition.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use std::sync::Arc;

    fn catalog() -> Catalog {
        let memory = MemoryCatalog::new();
        memory.create_database(None, "sales").expect("database");
        memory
            .create_table(
                None,
                MemoryCatalog::partitioned_table(
                    "sales",
                    "orders",
                    "s3://bucket/sales/orders",
                    &["region", "day"],
                ),
            )
            .expect("table");
        memory
            .create_table(
                None,
                MemoryCatalog::partitioned_table("sales", "flat", "s3://bucket/flat/", &[]),
            )
            .expect("table");
        Catalog::new(Arc::new(memory), None)
    }

    fn kv() -> PartitionKv {
        PartitionKv::from([
            ("day".to_string(), "2024-01-01".to_string()),
            ("region".to_string(), "us".to_string()),
        ])
    }

    #[test]
    fn test_derived_location() {
        let target =
            PartitionTarget::resolve(&catalog(), &TableRef::new("sales", "orders"), &kv(), None)
                .expect("resolved");
        assert_eq!(
            target.location,
            "s3://bucket/sales/orders/region=us/day=2024-01-01/"
        );
        assert_eq!(target.values(), vec!["us", "2024-01-01"]);
        assert_eq!(target.store_location.prefix(), "sales/orders/region=us/day=2024-01-01/");
    }

    #[test]
    fn test_explicit_location_is_normalized() {
        let target = PartitionTarget::resolve(
            &catalog(),
            &TableRef::new("sales", "orders"),
            &kv(),
            Some("s3://other/custom"),
        )
        .expect("resolved");
        assert_eq!(target.location, "s3://other/custom/");
        assert_eq!(target.store_location.bucket(), "other");
    }

    #[test]
    fn test_preflight_failures_are_config_errors() {
        let catalog = catalog();
        let cases = [
            TableRef::new("hr", "orders"),
            TableRef::new("sales", "missing"),
            TableRef::new("sales", "flat"),
        ];
        for table in cases {
            let err = PartitionTarget::resolve(&catalog, &table, &kv(), None).unwrap_err();
            assert!(err.is_config(), "{table}: {err}");
        }
    }

    #[test]
    fn test_malformed_explicit_location() {
        let err = PartitionTarget::resolve(
            &catalog(),
            &TableRef::new("sales", "orders"),
            &kv(),
            Some("bucket/custom"),
        )
        .unwrap_err();
        assert!(matches!(err, ApasError::Location(_)));
    }
}
