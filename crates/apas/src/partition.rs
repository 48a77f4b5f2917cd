// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Table identity, partition key/value ordering and partition path derivation.
//!
//! Catalog partition operations are positional: a partition is addressed by
//! its value list in the table's declared key order. Callers hand us an
//! unordered key/value map, so everything downstream of pre-flight works on
//! an [`OrderedPartition`] built by [`order_partition`].

use crate::error::{ApasError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Separator between path segments in object store locations.
pub const PATH_SEPARATOR: char = '/';

/// Caller-supplied partition key/value pairs. Order carries no meaning.
pub type PartitionKv = BTreeMap<String, String>;

/// Identifies a catalog table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    database: String,
    table: String,
}

impl TableRef {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
        }
    }

    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}

/// Partition key/value pairs in the catalog's declared key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedPartition {
    pairs: Vec<(String, String)>,
}

impl OrderedPartition {
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Positional value list, as catalog partition operations expect it.
    #[must_use]
    pub fn values(&self) -> Vec<String> {
        self.pairs.iter().map(|(_, v)| v.clone()).collect()
    }

    /// `key1=value1/key2=value2`, without a trailing separator.
    #[must_use]
    pub fn path_segments(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl fmt::Display for OrderedPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        write!(f, "[{}]", rendered.join(", "))
    }
}

/// Re-sort `supplied` into the declared key order.
///
/// The supplied key set must equal the declared one exactly. Missing and
/// unknown keys are both reported in the error.
pub fn order_partition(declared: &[String], supplied: &PartitionKv) -> Result<OrderedPartition> {
    let declared_set: BTreeSet<&str> = declared.iter().map(String::as_str).collect();
    let supplied_set: BTreeSet<&str> = supplied.keys().map(String::as_str).collect();

    if declared_set != supplied_set || declared_set.len() != declared.len() {
        let missing: Vec<&str> = declared_set.difference(&supplied_set).copied().collect();
        let unknown: Vec<&str> = supplied_set.difference(&declared_set).copied().collect();
        return Err(ApasError::config(format!(
            "partition_kv keys {supplied_set:?} do not match declared partition keys {declared:?} \
             (missing {missing:?}, unknown {unknown:?})"
        )));
    }

    let mut pairs = Vec::with_capacity(declared.len());
    for key in declared {
        let value = supplied
            .get(key)
            .ok_or_else(|| ApasError::config(format!("partition key[{key}] has no value")))?;
        pairs.push((key.clone(), value.clone()));
    }
    Ok(OrderedPartition { pairs })
}

/// Append a trailing separator when the location lacks one.
#[must_use]
pub fn normalize_location(location: &str) -> String {
    if location.ends_with(PATH_SEPARATOR) {
        location.to_string()
    } else {
        format!("{location}{PATH_SEPARATOR}")
    }
}

/// Canonical partition location: `<table base>/<k1>=<v1>/.../`.
#[must_use]
pub fn partition_location(table_base: &str, partition: &OrderedPartition) -> String {
    normalize_location(&format!(
        "{}{}",
        normalize_location(table_base),
        partition.path_segments()
    ))
}
