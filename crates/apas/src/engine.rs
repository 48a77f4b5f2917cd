// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! SQL engine access.

use crate::catalog::Column;
use crate::error::{EngineError, Result};
use serde_json::Value;

/// One result row, cells in column order.
pub type Row = Vec<Value>;

/// A connection to a distributed SQL engine.
///
/// Statements are complete SQL text; no parameter binding. Identifiers the
/// core interpolates are generated from alphanumerics and underscores only.
pub trait QueryEngine: Send + Sync {
    /// Run a statement and return its first row, if any.
    fn execute(&self, statement: &str) -> Result<Option<Row>, EngineError>;

    /// Run a statement and return every row.
    fn query(&self, statement: &str) -> Result<Vec<Row>, EngineError>;
}

fn cell_text(row: &Row, index: usize) -> Result<String, EngineError> {
    match row.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(EngineError::Protocol(format!(
            "expected text in column {index}, got {other}"
        ))),
        None => Err(EngineError::Protocol(format!(
            "row has {} columns, expected at least {}",
            row.len(),
            index + 1
        ))),
    }
}

/// Interpret `DESCRIBE` output: column name first, column type second.
pub fn columns_from_describe(rows: &[Row]) -> Result<Vec<Column>, EngineError> {
    rows.iter()
        .map(|row| Ok(Column::new(cell_text(row, 0)?, cell_text(row, 1)?)))
        .collect()
}
