// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Blocking Presto/Trino client implementing [`apas::QueryEngine`].
//!
//! A statement is submitted with `POST /v1/statement`; the coordinator
//! answers with a page of results and a `nextUri` to poll until the
//! statement finishes. Rows from every page are collected in order.
//! A page answered with `503 Service Unavailable` is requested again with
//! exponential backoff, up to [`PrestoConfig::max_retries`] times.

mod config;
mod protocol;

pub use config::{Flavor, PrestoConfig};
pub use protocol::{QueryColumn, QueryError, QueryResults, StatementStats};

use apas::{EngineError, QueryEngine, Row};
use backon::{BlockingRetryable, ExponentialBuilder};
use diagnostics::{log_debug, log_warn};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use std::time::Duration;

fn transport(e: reqwest::Error) -> EngineError {
    EngineError::Transport(e.to_string())
}

#[derive(Debug, thiserror::Error)]
enum PageError {
    #[error("HTTP 503 Service Unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl PageError {
    fn is_retryable(&self) -> bool {
        matches!(self, PageError::Unavailable(_))
    }
}

impl From<PageError> for EngineError {
    fn from(e: PageError) -> Self {
        match e {
            PageError::Unavailable(_) => EngineError::Transport(e.to_string()),
            PageError::Engine(inner) => inner,
        }
    }
}

pub struct PrestoEngine {
    config: PrestoConfig,
    http_client: Client,
}

impl PrestoEngine {
    pub fn new(config: PrestoConfig) -> Result<Self, EngineError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(transport)?;
        Ok(Self {
            config,
            http_client,
        })
    }

    #[must_use]
    pub fn config(&self) -> &PrestoConfig {
        &self.config
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(self.config.retry_delay_ms))
            .with_max_times(self.config.max_retries)
    }

    fn send_page(request: RequestBuilder) -> Result<QueryResults, PageError> {
        let response = request.send().map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            if status == StatusCode::SERVICE_UNAVAILABLE {
                return Err(PageError::Unavailable(body));
            }
            return Err(EngineError::Transport(format!("HTTP {status}: {body}")).into());
        }
        response
            .json::<QueryResults>()
            .map_err(|e| EngineError::Protocol(e.to_string()).into())
    }

    /// A request builder is consumed by `send`, so each attempt builds a
    /// fresh one.
    fn fetch_page<F>(&self, build: F) -> Result<QueryResults, EngineError>
    where
        F: Fn() -> RequestBuilder,
    {
        let attempt = || Self::send_page(build());
        attempt
            .retry(self.backoff())
            .sleep(std::thread::sleep)
            .when(PageError::is_retryable)
            .notify(|e: &PageError, delay: Duration| {
                log_warn!(
                    "Coordinator unavailable, retrying in {delay}: {error}",
                    delay: format!("{delay:?}"),
                    error: e.to_string()
                );
            })
            .call()
            .map_err(EngineError::from)
    }

    fn submit(&self, statement: &str) -> RequestBuilder {
        let mut request = self
            .http_client
            .post(self.config.statement_url())
            .body(statement.to_string());
        for (name, value) in self.config.session_headers() {
            request = request.header(name, value);
        }
        request
    }

    fn run(&self, statement: &str) -> Result<Vec<Row>, EngineError> {
        let mut rows = Vec::new();
        let mut page = self.fetch_page(|| self.submit(statement))?;
        log_debug!("Submitted statement {id}", id: page.id.clone());

        while let Some(next_uri) = page.drain_into(&mut rows)? {
            page = self.fetch_page(|| self.http_client.get(next_uri.as_str()))?;
        }
        log_debug!("Statement returned {count} rows", count: rows.len());
        Ok(rows)
    }
}

impl QueryEngine for PrestoEngine {
    fn execute(&self, statement: &str) -> Result<Option<Row>, EngineError> {
        Ok(self.run(statement)?.into_iter().next())
    }

    fn query(&self, statement: &str) -> Result<Vec<Row>, EngineError> {
        self.run(statement)
    }
}
