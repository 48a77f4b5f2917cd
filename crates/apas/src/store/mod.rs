// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Bucket/prefix oriented object storage.
//!
//! Locations are `scheme://bucket/key...` strings. [`StoreLocation::parse`]
//! rejects malformed ones before any store call is made.

mod bridge;

pub use bridge::{ObjectStoreBridge, S3Options};

use crate::error::{LocationError, Result, StoreError};
use crate::partition::normalize_location;
use object_store::path::Path;
use std::fmt;
use url::Url;

/// A blocking object store.
pub trait ObjectStore: Send + Sync {
    /// Whether at least one object has a key starting with `prefix`.
    fn exists_under_prefix(&self, bucket: &str, prefix: &str) -> Result<bool, StoreError>;

    /// Every key starting with `prefix`, at any depth.
    fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StoreError>;

    fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), StoreError>;

    fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), StoreError>;
}

/// A parsed `scheme://bucket/prefix/` location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLocation {
    scheme: String,
    bucket: String,
    /// Key prefix, always ending with the path separator.
    prefix: String,
}

impl StoreLocation {
    pub fn parse(uri: &str) -> Result<Self, LocationError> {
        let url = Url::parse(uri).map_err(|_| LocationError::MissingScheme(uri.to_string()))?;

        let unsupported = |part| LocationError::Unsupported {
            uri: uri.to_string(),
            part,
        };
        if url.fragment().is_some() {
            return Err(unsupported("fragment"));
        }
        if url.query().is_some() {
            return Err(unsupported("query"));
        }
        if url.port().is_some() {
            return Err(unsupported("port"));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(unsupported("user"));
        }

        let bucket = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| LocationError::MissingBucket(uri.to_string()))?;

        // Object keys are stored decoded; the URL path is percent-encoded.
        let key = Path::from_url_path(url.path()).map_err(|e| LocationError::InvalidKey {
            uri: uri.to_string(),
            message: e.to_string(),
        })?;
        if key.as_ref().is_empty() {
            return Err(LocationError::MissingKey(uri.to_string()));
        }

        Ok(Self {
            scheme: url.scheme().to_string(),
            bucket: bucket.to_string(),
            prefix: normalize_location(key.as_ref()),
        })
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Key of an object directly under this location.
    #[must_use]
    pub fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.bucket, self.prefix)
    }
}
