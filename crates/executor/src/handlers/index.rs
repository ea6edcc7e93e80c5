//! Per-index command handlers.

use luxdb_core::Label;
use luxdb_engine::Store;

use crate::convert::convert_result;
use crate::{IndexInfo, Output, Result};

pub async fn init_index(store: &Store, name: String, capacity: usize) -> Result<Output> {
    convert_result(store.init_index(&name, capacity).await)?;
    Ok(Output::Unit)
}

pub async fn resize_index(store: &Store, name: String, capacity: usize) -> Result<Output> {
    convert_result(store.resize_index(&name, capacity).await)?;
    Ok(Output::Unit)
}

pub async fn add_items(
    store: &Store,
    name: String,
    vectors: Vec<Vec<f32>>,
    labels: Vec<Label>,
) -> Result<Output> {
    convert_result(store.add_items(&name, vectors, labels).await)?;
    Ok(Output::Unit)
}

pub async fn delete_item(store: &Store, name: String, label: Label) -> Result<Output> {
    convert_result(store.delete_item(&name, label).await)?;
    Ok(Output::Unit)
}

pub async fn get_ids(store: &Store, name: String) -> Result<Output> {
    Ok(Output::Labels(convert_result(store.get_ids(&name).await)?))
}

pub async fn get_elements(store: &Store, name: String, labels: Vec<Label>) -> Result<Output> {
    Ok(Output::Vectors(convert_result(
        store.get_elements(&name, labels).await,
    )?))
}

pub async fn count(store: &Store, name: String) -> Result<Output> {
    Ok(Output::Count(convert_result(store.count(&name).await)?))
}

pub async fn info(store: &Store, name: String) -> Result<Output> {
    let (meta, count) = convert_result(store.info(&name).await)?;
    Ok(Output::Info(IndexInfo { meta, count }))
}

pub async fn query_index(
    store: &Store,
    name: String,
    vectors: Vec<Vec<f32>>,
    k: usize,
) -> Result<Output> {
    let (labels, distances) = convert_result(store.query_index(&name, vectors, k).await)?;
    Ok(Output::Neighbors { labels, distances })
}
