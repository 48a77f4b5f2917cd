// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Blocking [`ObjectStore`] over the `object_store` crate.
//!
//! Each bucket name is registered against its own `object_store` backend
//! (in-memory, local filesystem or S3). Async calls run to completion on a
//! current-thread runtime owned by the bridge.

use super::ObjectStore;
use crate::error::{Result, StoreError};
use bytes::Bytes;
use diagnostics::log_debug;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectMeta, ObjectStore as _, PutPayload};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::runtime::Runtime;

type Backend = Arc<dyn object_store::ObjectStore>;

/// Connection settings for an S3 (or S3-compatible) bucket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct S3Options {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub allow_http: bool,
}

pub struct ObjectStoreBridge {
    runtime: Runtime,
    buckets: RwLock<HashMap<String, Backend>>,
}

impl ObjectStoreBridge {
    pub fn new() -> Result<Self, StoreError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            runtime,
            buckets: RwLock::new(HashMap::new()),
        })
    }

    /// Route `bucket` to `backend`, replacing any earlier registration.
    pub fn register(&self, bucket: &str, backend: Backend) -> Result<(), StoreError> {
        self.buckets
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .insert(bucket.to_string(), backend);
        Ok(())
    }

    pub fn register_in_memory(&self, bucket: &str) -> Result<(), StoreError> {
        self.register(bucket, Arc::new(InMemory::new()))
    }

    /// Serve `bucket` from a directory on the local filesystem.
    pub fn register_local(&self, bucket: &str, root: &std::path::Path) -> Result<(), StoreError> {
        let backend = LocalFileSystem::new_with_prefix(root)?;
        self.register(bucket, Arc::new(backend))
    }

    pub fn register_s3(&self, bucket: &str, options: &S3Options) -> Result<(), StoreError> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .with_allow_http(options.allow_http);

        if !options.region.is_empty() {
            builder = builder.with_region(&options.region);
        }
        if let Some(endpoint) = &options.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if let Some(key) = &options.access_key_id {
            builder = builder.with_access_key_id(key);
        }
        if let Some(secret) = &options.secret_access_key {
            builder = builder.with_secret_access_key(secret);
        }

        self.register(bucket, Arc::new(builder.build()?))
    }

    fn backend(&self, bucket: &str) -> Result<Backend, StoreError> {
        self.buckets
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .get(bucket)
            .cloned()
            .ok_or_else(|| StoreError::UnknownBucket(bucket.to_string()))
    }

    fn list_meta(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError> {
        let backend = self.backend(bucket)?;
        let prefix = Path::parse(prefix)?;
        let listed: Vec<ObjectMeta> = self
            .runtime
            .block_on(async move { backend.list(Some(&prefix)).try_collect().await })?;
        Ok(listed)
    }
}

impl ObjectStore for ObjectStoreBridge {
    fn exists_under_prefix(&self, bucket: &str, prefix: &str) -> Result<bool, StoreError> {
        let backend = self.backend(bucket)?;
        let prefix = Path::parse(prefix)?;
        let first = self.runtime.block_on(async move {
            let mut listing = backend.list(Some(&prefix));
            listing.try_next().await
        })?;
        Ok(first.is_some())
    }

    fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .list_meta(bucket, prefix)?
            .into_iter()
            .map(|meta| meta.location.to_string())
            .collect())
    }

    fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<(), StoreError> {
        let backend = self.backend(bucket)?;
        let paths = keys
            .iter()
            .map(|k| Path::parse(k))
            .collect::<Result<Vec<Path>, _>>()?;
        self.runtime.block_on(async move {
            for path in &paths {
                log_debug!("Deleting object {key}", key: path.to_string());
                backend.delete(path).await?;
            }
            Ok::<(), object_store::Error>(())
        })?;
        Ok(())
    }

    fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), StoreError> {
        let backend = self.backend(bucket)?;
        let path = Path::parse(key)?;
        let payload = PutPayload::from(Bytes::copy_from_slice(body));
        self.runtime
            .block_on(async move { backend.put(&path, payload).await })?;
        Ok(())
    }
}
