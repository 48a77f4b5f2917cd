// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

/// Which header dialect the coordinator speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flavor {
    #[default]
    Presto,
    Trino,
}

impl Flavor {
    #[must_use]
    pub fn header_prefix(self) -> &'static str {
        match self {
            Flavor::Presto => "X-Presto-",
            Flavor::Trino => "X-Trino-",
        }
    }
}

fn default_source() -> String {
    "apas".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> usize {
    5
}

fn default_retry_delay_ms() -> u64 {
    100
}

/// Coordinator connection settings.
///
/// ```yaml
/// endpoint: http://presto.internal:8080
/// user: etl
/// catalog: hive
/// schema: sales
/// flavor: trino
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrestoConfig {
    pub endpoint: String,
    pub user: String,
    pub catalog: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub flavor: Flavor,
    /// Per HTTP request, not per statement.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries of a page answered with 503 Service Unavailable.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// First backoff delay; later delays grow exponentially.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl PrestoConfig {
    pub fn new(endpoint: impl Into<String>, user: impl Into<String>, catalog: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            user: user.into(),
            catalog: catalog.into(),
            schema: None,
            source: default_source(),
            flavor: Flavor::default(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }

    /// Session headers sent with every statement submission.
    #[must_use]
    pub fn session_headers(&self) -> Vec<(String, String)> {
        let prefix = self.flavor.header_prefix();
        let mut headers = vec![
            (format!("{prefix}User"), self.user.clone()),
            (format!("{prefix}Source"), self.source.clone()),
            (format!("{prefix}Catalog"), self.catalog.clone()),
        ];
        if let Some(schema) = &self.schema {
            headers.push((format!("{prefix}Schema"), schema.clone()));
        }
        headers
    }

    #[must_use]
    pub fn statement_url(&self) -> String {
        format!("{}/v1/statement", self.endpoint.trim_end_matches('/'))
    }
}
