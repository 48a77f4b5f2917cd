// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Register or repoint a partition at data that is already in place.

use crate::catalog::Catalog;
use crate::config::AddPartitionJob;
use crate::error::{ApasError, Result};
use crate::mode::PartitionAction;
use crate::store::ObjectStore;
use crate::target::PartitionTarget;
use diagnostics::log_info;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created { location: String },
    Updated { location: String },
    /// The partition existed and the mode said to keep it.
    Skipped,
    /// The location was empty, so the catalog partition pointing at it was removed.
    DroppedStale,
    /// The location was empty and no partition existed.
    NothingToDo,
}

pub struct PartitionUpserter {
    job: AddPartitionJob,
    catalog: Catalog,
    store: Arc<dyn ObjectStore>,
}

impl PartitionUpserter {
    pub fn new(job: AddPartitionJob, catalog: Catalog, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            job,
            catalog,
            store,
        }
    }

    #[must_use]
    pub fn job(&self) -> &AddPartitionJob {
        &self.job
    }

    pub fn prepare(&self) -> Result<PartitionTarget> {
        PartitionTarget::resolve(
            &self.catalog,
            &self.job.table_ref(),
            &self.job.partition_kv,
            self.job.location.as_deref(),
        )
    }

    pub fn run(&self) -> Result<UpsertOutcome> {
        let target = self.prepare()?;
        self.execute(&target)
    }

    pub fn execute(&self, target: &PartitionTarget) -> Result<UpsertOutcome> {
        let values = target.values();
        let partition = target.partition.to_string();
        let exists = self.catalog.partition_exists(&target.table, &values)?;

        if self.job.follow_location {
            let bucket = target.store_location.bucket();
            let has_data = self
                .store
                .exists_under_prefix(bucket, target.store_location.prefix())?;
            if !has_data {
                if exists {
                    log_info!("Location {location} is empty, dropping stale partition {partition}",
                              location: target.location.clone(), partition: partition);
                    self.catalog.delete_partition(&target.table, &values)?;
                    return Ok(UpsertOutcome::DroppedStale);
                }
                log_info!("Location {location} is empty, nothing to register",
                          location: target.location.clone());
                return Ok(UpsertOutcome::NothingToDo);
            }
        }

        let mode = self.job.mode;
        match mode.decide(exists) {
            PartitionAction::Create => {
                self.catalog
                    .create_partition(&target.table, &values, &target.location)?;
                log_info!("Partition {partition} is created", partition: partition);
                Ok(UpsertOutcome::Created {
                    location: target.location.clone(),
                })
            }
            PartitionAction::Update => {
                self.catalog
                    .update_partition(&target.table, &values, &target.location)?;
                log_info!("Partition {partition} is updated", partition: partition);
                Ok(UpsertOutcome::Updated {
                    location: target.location.clone(),
                })
            }
            PartitionAction::Skip => {
                log_info!("Partition {partition} already exists, mode {mode}",
                          partition: partition, mode: mode.as_str());
                Ok(UpsertOutcome::Skipped)
            }
            PartitionAction::Fail => Err(ApasError::config(format!(
                "Partition{partition} already exists."
            ))),
        }
    }
}
