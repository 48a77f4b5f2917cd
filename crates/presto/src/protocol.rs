// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Wire shapes of the coordinator's statement protocol.

use apas::{EngineError, Row};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryError {
    pub message: String,
    #[serde(default)]
    pub error_name: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementStats {
    pub state: String,
}

/// One page of a statement's results.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResults {
    pub id: String,
    #[serde(default)]
    pub next_uri: Option<String>,
    #[serde(default)]
    pub columns: Option<Vec<QueryColumn>>,
    #[serde(default)]
    pub data: Option<Vec<Row>>,
    #[serde(default)]
    pub error: Option<QueryError>,
    #[serde(default)]
    pub stats: Option<StatementStats>,
}

impl QueryResults {
    /// Move this page's rows into `rows` and return the next page to fetch.
    pub fn drain_into(self, rows: &mut Vec<Row>) -> Result<Option<String>, EngineError> {
        if let Some(error) = self.error {
            return Err(EngineError::Query {
                name: error.error_name.unwrap_or_else(|| self.id.clone()),
                message: error.message,
            });
        }
        rows.extend(self.data.unwrap_or_default());
        Ok(self.next_uri)
    }
}
