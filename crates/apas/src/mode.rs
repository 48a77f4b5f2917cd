// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Conflict policies: what to do when the target already holds data.

use crate::error::ApasError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Behavior of an APAS run when objects already exist at the target location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveMode {
    /// Return without side effects.
    SkipIfExists,
    /// Fail with a configuration error.
    ErrorIfExists,
    /// Materialize on top of whatever is there.
    Ignore,
    /// Delete every object under the location, then materialize.
    #[default]
    Overwrite,
}

/// Decision produced by [`SaveMode::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictAction {
    Proceed,
    Skip,
    Fail,
    ClearThenProceed,
}

impl SaveMode {
    pub const ALL: [SaveMode; 4] = [
        SaveMode::SkipIfExists,
        SaveMode::ErrorIfExists,
        SaveMode::Ignore,
        SaveMode::Overwrite,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SaveMode::SkipIfExists => "skip_if_exists",
            SaveMode::ErrorIfExists => "error_if_exists",
            SaveMode::Ignore => "ignore",
            SaveMode::Overwrite => "overwrite",
        }
    }

    /// Absent data always proceeds; existing data branches on the mode.
    #[must_use]
    pub fn decide(self, data_exists: bool) -> ConflictAction {
        if !data_exists {
            return ConflictAction::Proceed;
        }
        match self {
            SaveMode::SkipIfExists => ConflictAction::Skip,
            SaveMode::ErrorIfExists => ConflictAction::Fail,
            SaveMode::Ignore => ConflictAction::Proceed,
            SaveMode::Overwrite => ConflictAction::ClearThenProceed,
        }
    }
}

impl fmt::Display for SaveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SaveMode {
    type Err = ApasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SaveMode::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                let supported: Vec<&str> = SaveMode::ALL.iter().map(|m| m.as_str()).collect();
                ApasError::config(format!(
                    "Save mode[{s}] is unsupported. Supported save modes are {supported:?}."
                ))
            })
    }
}

/// Behavior of a partition upsert when the catalog partition already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionMode {
    /// Repoint the existing partition at the resolved location.
    #[default]
    Overwrite,
    ErrorIfExists,
    SkipIfExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionAction {
    Create,
    Update,
    Skip,
    Fail,
}

impl PartitionMode {
    pub const ALL: [PartitionMode; 3] = [
        PartitionMode::Overwrite,
        PartitionMode::ErrorIfExists,
        PartitionMode::SkipIfExists,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PartitionMode::Overwrite => "overwrite",
            PartitionMode::ErrorIfExists => "error_if_exists",
            PartitionMode::SkipIfExists => "skip_if_exists",
        }
    }

    #[must_use]
    pub fn decide(self, partition_exists: bool) -> PartitionAction {
        if !partition_exists {
            return PartitionAction::Create;
        }
        match self {
            PartitionMode::Overwrite => PartitionAction::Update,
            PartitionMode::ErrorIfExists => PartitionAction::Fail,
            PartitionMode::SkipIfExists => PartitionAction::Skip,
        }
    }
}

impl fmt::Display for PartitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartitionMode {
    type Err = ApasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PartitionMode::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                let supported: Vec<&str> =
                    PartitionMode::ALL.iter().map(|m| m.as_str()).collect();
                ApasError::config(format!(
                    "Partition mode[{s}] is unsupported. Supported modes are {supported:?}."
                ))
            })
    }
}
