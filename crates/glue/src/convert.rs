// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Translation between Glue SDK shapes and catalog records.

use apas::CatalogError;
use apas::catalog::{
    Column, Database, Partition, PartitionInput, SerdeInfo, StorageDescriptor, Table,
};
use aws_sdk_glue::types;
use std::collections::{BTreeMap, HashMap};

/// Map a Glue error code onto the catalog error model.
///
/// `entity` names what was being looked up, for the not-found and
/// already-exists cases; `message` is the service's full error text.
#[must_use]
pub fn classify(code: Option<&str>, entity: &str, message: String) -> CatalogError {
    match code {
        Some("EntityNotFoundException") => CatalogError::not_found(entity),
        Some("AlreadyExistsException") => CatalogError::already_exists(entity),
        Some("InvalidInputException") => CatalogError::InvalidInput(message),
        _ => CatalogError::Service(message),
    }
}

fn parameters(map: Option<&HashMap<String, String>>) -> BTreeMap<String, String> {
    map.map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

fn column(c: &types::Column) -> Column {
    Column::new(c.name(), c.r#type().unwrap_or_default())
}

fn serde_info(info: &types::SerDeInfo) -> SerdeInfo {
    SerdeInfo {
        serialization_library: info.serialization_library().map(str::to_string),
        parameters: parameters(info.parameters()),
    }
}

pub(crate) fn storage_descriptor(sd: Option<&types::StorageDescriptor>) -> StorageDescriptor {
    let Some(sd) = sd else {
        return StorageDescriptor::default();
    };
    StorageDescriptor {
        location: sd.location().map(str::to_string),
        columns: sd.columns().iter().map(column).collect(),
        input_format: sd.input_format().map(str::to_string),
        output_format: sd.output_format().map(str::to_string),
        compressed: sd.compressed(),
        serde_info: sd.serde_info().map(serde_info).unwrap_or_default(),
    }
}

pub(crate) fn database(db: &types::Database) -> Database {
    Database {
        name: db.name().to_string(),
        location_uri: db.location_uri().map(str::to_string),
    }
}

pub(crate) fn table(t: &types::Table, db: &str) -> Table {
    Table {
        name: t.name().to_string(),
        database_name: t.database_name().unwrap_or(db).to_string(),
        partition_keys: t.partition_keys().iter().map(column).collect(),
        storage_descriptor: storage_descriptor(t.storage_descriptor()),
        parameters: parameters(t.parameters()),
    }
}

pub(crate) fn partition(p: &types::Partition, db: &str, table: &str) -> Partition {
    Partition {
        database_name: p.database_name().unwrap_or(db).to_string(),
        table_name: p.table_name().unwrap_or(table).to_string(),
        values: p.values().to_vec(),
        storage_descriptor: storage_descriptor(p.storage_descriptor()),
    }
}

fn column_input(c: &Column) -> Result<types::Column, CatalogError> {
    types::Column::builder()
        .name(&c.name)
        .r#type(&c.data_type)
        .build()
        .map_err(|e| CatalogError::InvalidInput(e.to_string()))
}

fn storage_descriptor_input(
    sd: &StorageDescriptor,
) -> Result<types::StorageDescriptor, CatalogError> {
    let columns = sd
        .columns
        .iter()
        .map(column_input)
        .collect::<Result<Vec<_>, _>>()?;
    let serde_info = types::SerDeInfo::builder()
        .set_serialization_library(sd.serde_info.serialization_library.clone())
        .set_parameters(Some(sd.serde_info.parameters.clone().into_iter().collect()))
        .build();
    Ok(types::StorageDescriptor::builder()
        .set_location(sd.location.clone())
        .set_columns(Some(columns))
        .set_input_format(sd.input_format.clone())
        .set_output_format(sd.output_format.clone())
        .compressed(sd.compressed)
        .serde_info(serde_info)
        .build())
}

pub(crate) fn partition_input(input: &PartitionInput) -> Result<types::PartitionInput, CatalogError> {
    Ok(types::PartitionInput::builder()
        .set_values(Some(input.values.clone()))
        .storage_descriptor(storage_descriptor_input(&input.storage_descriptor)?)
        .build())
}
