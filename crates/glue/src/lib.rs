// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! AWS Glue Data Catalog implementing [`apas::CatalogService`].
//!
//! SDK calls are async; each one runs to completion on a current-thread
//! runtime owned by [`GlueCatalog`]. Glue's `EntityNotFoundException` and
//! `AlreadyExistsException` become [`CatalogError::NotFound`] and
//! [`CatalogError::AlreadyExists`].

mod convert;

pub use convert::classify;

use apas::catalog::{Database, Partition, PartitionInput, Table};
use apas::{CatalogError, CatalogService};
use aws_sdk_glue::Client;
use aws_sdk_glue::config::Region;
use aws_sdk_glue::error::{DisplayErrorContext, ProvideErrorMetadata};
use diagnostics::log_debug;
use serde::{Deserialize, Serialize};
use tokio::runtime::Runtime;

/// Where to reach the catalog. Credentials come from the default AWS
/// provider chain.
///
/// ```yaml
/// region: us-west-2
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlueOptions {
    #[serde(default)]
    pub region: Option<String>,
    /// Override of the service endpoint, for Glue-compatible stand-ins.
    #[serde(default)]
    pub endpoint: Option<String>,
}

fn translate<E>(entity: &str, e: E) -> CatalogError
where
    E: ProvideErrorMetadata + std::error::Error,
{
    let message = DisplayErrorContext(&e).to_string();
    classify(e.code(), entity, message)
}

fn missing(entity: &str) -> CatalogError {
    CatalogError::Service(format!("{entity} missing from Glue response"))
}

fn table_entity(db: &str, table: &str) -> String {
    format!("Table {db}.{table}")
}

fn partition_entity(db: &str, table: &str, values: &[String]) -> String {
    format!("Partition {values:?} of {db}.{table}")
}

pub struct GlueCatalog {
    runtime: Runtime,
    client: Client,
}

impl GlueCatalog {
    /// Load the shared AWS configuration and build a client from it.
    pub fn new(options: &GlueOptions) -> Result<Self, CatalogError> {
        let runtime = runtime()?;
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &options.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &options.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let config = runtime.block_on(loader.load());
        Ok(Self {
            runtime,
            client: Client::new(&config),
        })
    }

    /// Use an already configured client.
    pub fn with_client(client: Client) -> Result<Self, CatalogError> {
        Ok(Self {
            runtime: runtime()?,
            client,
        })
    }
}

fn runtime() -> Result<Runtime, CatalogError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CatalogError::Service(format!("Glue runtime: {e}")))
}

fn scope(catalog_id: Option<&str>) -> Option<String> {
    catalog_id.map(str::to_string)
}

impl CatalogService for GlueCatalog {
    fn get_database(
        &self,
        catalog_id: Option<&str>,
        name: &str,
    ) -> Result<Database, CatalogError> {
        let entity = format!("Database {name}");
        let output = self
            .runtime
            .block_on(
                self.client
                    .get_database()
                    .set_catalog_id(scope(catalog_id))
                    .name(name)
                    .send(),
            )
            .map_err(|e| translate(&entity, e))?;
        output
            .database()
            .map(convert::database)
            .ok_or_else(|| missing(&entity))
    }

    fn get_table(
        &self,
        catalog_id: Option<&str>,
        db: &str,
        name: &str,
    ) -> Result<Table, CatalogError> {
        let entity = table_entity(db, name);
        let output = self
            .runtime
            .block_on(
                self.client
                    .get_table()
                    .set_catalog_id(scope(catalog_id))
                    .database_name(db)
                    .name(name)
                    .send(),
            )
            .map_err(|e| translate(&entity, e))?;
        output
            .table()
            .map(|t| convert::table(t, db))
            .ok_or_else(|| missing(&entity))
    }

    fn get_partition(
        &self,
        catalog_id: Option<&str>,
        db: &str,
        table: &str,
        values: &[String],
    ) -> Result<Partition, CatalogError> {
        let entity = partition_entity(db, table, values);
        let output = self
            .runtime
            .block_on(
                self.client
                    .get_partition()
                    .set_catalog_id(scope(catalog_id))
                    .database_name(db)
                    .table_name(table)
                    .set_partition_values(Some(values.to_vec()))
                    .send(),
            )
            .map_err(|e| translate(&entity, e))?;
        output
            .partition()
            .map(|p| convert::partition(p, db, table))
            .ok_or_else(|| missing(&entity))
    }

    fn create_partition(
        &self,
        catalog_id: Option<&str>,
        db: &str,
        table: &str,
        input: PartitionInput,
    ) -> Result<(), CatalogError> {
        let entity = partition_entity(db, table, &input.values);
        log_debug!("Glue CreatePartition {entity}", entity: entity.clone());
        self.runtime
            .block_on(
                self.client
                    .create_partition()
                    .set_catalog_id(scope(catalog_id))
                    .database_name(db)
                    .table_name(table)
                    .partition_input(convert::partition_input(&input)?)
                    .send(),
            )
            .map_err(|e| translate(&entity, e))?;
        Ok(())
    }

    fn update_partition(
        &self,
        catalog_id: Option<&str>,
        db: &str,
        table: &str,
        values: &[String],
        input: PartitionInput,
    ) -> Result<(), CatalogError> {
        let entity = partition_entity(db, table, values);
        log_debug!("Glue UpdatePartition {entity}", entity: entity.clone());
        self.runtime
            .block_on(
                self.client
                    .update_partition()
                    .set_catalog_id(scope(catalog_id))
                    .database_name(db)
                    .table_name(table)
                    .set_partition_value_list(Some(values.to_vec()))
                    .partition_input(convert::partition_input(&input)?)
                    .send(),
            )
            .map_err(|e| translate(&entity, e))?;
        Ok(())
    }

    fn delete_partition(
        &self,
        catalog_id: Option<&str>,
        db: &str,
        table: &str,
        values: &[String],
    ) -> Result<(), CatalogError> {
        let entity = partition_entity(db, table, values);
        log_debug!("Glue DeletePartition {entity}", entity: entity.clone());
        self.runtime
            .block_on(
                self.client
                    .delete_partition()
                    .set_catalog_id(scope(catalog_id))
                    .database_name(db)
                    .table_name(table)
                    .set_partition_values(Some(values.to_vec()))
                    .send(),
            )
            .map_err(|e| translate(&entity, e))?;
        Ok(())
    }

    fn delete_table(
        &self,
        catalog_id: Option<&str>,
        db: &str,
        name: &str,
    ) -> Result<(), CatalogError> {
        let entity = table_entity(db, name);
        log_debug!("Glue DeleteTable {entity}", entity: entity.clone());
        self.runtime
            .block_on(
                self.client
                    .delete_table()
                    .set_catalog_id(scope(catalog_id))
                    .database_name(db)
                    .name(name)
                    .send(),
            )
            .map_err(|e| translate(&entity, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_glue::config::retry::RetryConfig;
    use aws_sdk_glue::config::{BehaviorVersion, Credentials};
    use serde_json::json;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::{self, JoinHandle};

    /// A Glue endpoint that answers one request per scripted response and
    /// returns the `X-Amz-Target` and body of each request.
    struct FakeGlue {
        endpoint: String,
        handle: JoinHandle<Vec<(String, serde_json::Value)>>,
    }

    impl FakeGlue {
        fn serve(script: Vec<(u16, serde_json::Value)>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
            let endpoint = format!("http://{}", listener.local_addr().expect("addr"));
            let handle = thread::spawn(move || {
                let mut seen = Vec::new();
                for (status, body) in script {
                    let (mut stream, _) = listener.accept().expect("accept");
                    seen.push(read_request(&stream));
                    let body = body.to_string();
                    let error_type = if status == 200 {
                        String::new()
                    } else {
                        format!("x-amzn-ErrorType: {}\r\n", body_type(&body))
                    };
                    let response = format!(
                        "HTTP/1.1 {status} Glue\r\nContent-Type: application/x-amz-json-1.1\r\n{error_type}Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    stream.write_all(response.as_bytes()).expect("write");
                }
                seen
            });
            Self { endpoint, handle }
        }

        fn catalog(&self) -> GlueCatalog {
            let config = aws_sdk_glue::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .region(Region::new("us-east-1"))
                .endpoint_url(&self.endpoint)
                .credentials_provider(Credentials::new("AKID", "SECRET", None, None, "test"))
                .retry_config(RetryConfig::disabled())
                .build();
            GlueCatalog::with_client(Client::from_conf(config)).expect("runtime")
        }

        fn requests(self) -> Vec<(String, serde_json::Value)> {
            self.handle.join().expect("glue thread")
        }
    }

    fn body_type(body: &str) -> String {
        serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v["__type"].as_str().map(str::to_string))
            .unwrap_or_default()
    }

    fn read_request(stream: &TcpStream) -> (String, serde_json::Value) {
        let mut reader = BufReader::new(stream.try_clone().expect("clone"));
        let mut line = String::new();
        reader.read_line(&mut line).expect("request line");
        let mut target = String::new();
        let mut content_length = 0;
        loop {
            let mut header = String::new();
            reader.read_line(&mut header).expect("header");
            if header.trim().is_empty() {
                break;
            }
            if let Some((name, value)) = header.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().expect("length");
                } else if name.eq_ignore_ascii_case("x-amz-target") {
                    target = value.trim().to_string();
                }
            }
        }
        let mut body = vec![0; content_length];
        reader.read_exact(&mut body).expect("body");
        (target, serde_json::from_slice(&body).expect("json body"))
    }

    #[test]
    fn test_options_yaml() {
        let options: GlueOptions =
            serde_yaml_ng::from_str("region: eu-west-1\n").expect("valid options");
        assert_eq!(options.region.as_deref(), Some("eu-west-1"));
        assert!(options.endpoint.is_none());
    }

    #[test]
    fn test_get_table_scoped_by_catalog_id() {
        let glue = FakeGlue::serve(vec![(
            200,
            json!({"Table": {
                "Name": "orders",
                "DatabaseName": "sales",
                "PartitionKeys": [{"Name": "region", "Type": "string"}],
                "StorageDescriptor": {
                    "Location": "s3://bucket/sales/orders",
                    "Columns": [{"Name": "id", "Type": "bigint"}]
                }
            }}),
        )]);
        let table = glue
            .catalog()
            .get_table(Some("123456789012"), "sales", "orders")
            .expect("table");
        assert_eq!(table.partition_keys[0].name, "region");
        assert_eq!(
            table.storage_descriptor.location.as_deref(),
            Some("s3://bucket/sales/orders")
        );

        let requests = glue.requests();
        assert_eq!(requests[0].0, "AWSGlue.GetTable");
        assert_eq!(requests[0].1["CatalogId"], json!("123456789012"));
        assert_eq!(requests[0].1["DatabaseName"], json!("sales"));
    }

    #[test]
    fn test_entity_not_found_is_not_found() {
        let glue = FakeGlue::serve(vec![(
            400,
            json!({"__type": "EntityNotFoundException", "message": "Table orders not found."}),
        )]);
        let err = glue.catalog().get_table(None, "sales", "orders").unwrap_err();
        assert!(err.is_not_found(), "{err}");
        assert!(err.to_string().contains("sales.orders"));

        let requests = glue.requests();
        assert!(requests[0].1.get("CatalogId").is_none());
    }

    #[test]
    fn test_already_exists_on_create_partition() {
        let glue = FakeGlue::serve(vec![(
            400,
            json!({"__type": "AlreadyExistsException", "message": "Partition already exists."}),
        )]);
        let input = PartitionInput {
            values: vec!["us".to_string()],
            storage_descriptor: Default::default(),
        };
        let err = glue
            .catalog()
            .create_partition(None, "sales", "orders", input)
            .unwrap_err();
        assert!(matches!(err, CatalogError::AlreadyExists(_)), "{err}");

        let requests = glue.requests();
        assert_eq!(requests[0].0, "AWSGlue.CreatePartition");
        assert_eq!(requests[0].1["PartitionInput"]["Values"], json!(["us"]));
    }

    #[test]
    fn test_other_failures_are_service_errors() {
        let glue = FakeGlue::serve(vec![(
            400,
            json!({"__type": "AccessDeniedException", "message": "not allowed"}),
        )]);
        let err = glue
            .catalog()
            .delete_table(None, "sales", "__apas_staging_x")
            .unwrap_err();
        assert!(matches!(err, CatalogError::Service(_)), "{err}");
        glue.requests();
    }
}
