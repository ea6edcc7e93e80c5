//! Store-level command handlers.

use std::path::PathBuf;

use luxdb_core::Metric;
use luxdb_engine::Store;

use crate::convert::convert_result;
use crate::{Output, Result};

pub async fn create_index(
    store: &Store,
    name: String,
    metric: Metric,
    dimension: usize,
) -> Result<Output> {
    convert_result(store.create_index(&name, metric, dimension).await)?;
    Ok(Output::Unit)
}

pub async fn delete_index(store: &Store, name: String) -> Result<Output> {
    convert_result(store.delete_index(&name).await)?;
    Ok(Output::Unit)
}

pub async fn list_indexes(store: &Store) -> Result<Output> {
    let indexes = convert_result(store.list_indexes().await)?;
    Ok(Output::Indexes(indexes))
}

pub async fn import_index(
    store: &Store,
    name: String,
    source_path: PathBuf,
    metric: Metric,
    dimension: usize,
) -> Result<Output> {
    convert_result(store.import_index(&name, source_path, metric, dimension).await)?;
    Ok(Output::Unit)
}

pub fn index_exists(store: &Store, name: String) -> Result<Output> {
    Ok(Output::Bool(convert_result(store.index_exists(&name))?))
}

pub async fn flush(store: &Store) -> Result<Output> {
    convert_result(store.flush().await)?;
    Ok(Output::Unit)
}
