// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for the APAS workflow

use thiserror::Error;

/// Failures reported by a catalog service.
///
/// `NotFound` is kept distinct so existence checks can absorb it; every
/// other variant propagates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Entity already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid catalog input: {0}")]
    InvalidInput(String),

    #[error("Catalog service error: {0}")]
    Service(String),
}

impl CatalogError {
    pub fn not_found(entity: impl Into<String>) -> Self {
        CatalogError::NotFound(entity.into())
    }

    pub fn already_exists(entity: impl Into<String>) -> Self {
        CatalogError::AlreadyExists(entity.into())
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound(_))
    }
}

/// Failures reported by a query engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Query failed ({name}): {message}")]
    Query { name: String, message: String },

    #[error("Engine transport error: {0}")]
    Transport(String),

    #[error("Engine protocol error: {0}")]
    Protocol(String),
}

/// Failures reported by an object store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Object store error: {0}")]
    Backend(#[from] object_store::Error),

    #[error("Object store path error: {0}")]
    Path(#[from] object_store::path::Error),

    #[error("Bucket not registered: {0}")]
    UnknownBucket(String),

    #[error("Object store registry poisoned")]
    Poisoned,

    #[error("Object store runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

/// A location string that cannot address the object store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    #[error("Location[{0}] has no scheme")]
    MissingScheme(String),

    #[error("Location[{0}] has no bucket")]
    MissingBucket(String),

    #[error("Location[{0}] has no key prefix")]
    MissingKey(String),

    #[error("Location[{uri}] must not carry a {part}")]
    Unsupported { uri: String, part: &'static str },

    #[error("Location[{uri}] has an invalid key prefix: {message}")]
    InvalidKey { uri: String, message: String },
}

#[derive(Error, Debug)]
pub enum ApasError {
    /// Caller configuration is invalid or disagrees with catalog state.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApasError {
    pub fn config(message: impl Into<String>) -> Self {
        ApasError::Config(message.into())
    }

    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, ApasError::Config(_))
    }
}

impl From<serde_yaml_ng::Error> for ApasError {
    fn from(e: serde_yaml_ng::Error) -> Self {
        ApasError::Config(e.to_string())
    }
}

pub type Result<T, E = ApasError> = std::result::Result<T, E>;
