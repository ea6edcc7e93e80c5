//! The Executor - single entry point to the store.
//!
//! The Executor is a stateless dispatcher that routes commands to the
//! appropriate store operations and converts results to outputs.

use std::sync::Arc;
use std::time::Instant;

use luxdb_engine::Store;
use tracing::debug;

use crate::handlers::{index, store};
use crate::{Command, Output, Response};

/// The command executor.
///
/// The Executor is **stateless**: it holds a reference to the store but
/// maintains no state of its own, so one instance is shared by every
/// session.
///
/// # Example
///
/// ```text
/// let executor = Executor::new(store);
/// let reply = executor
///     .execute(Command::CreateIndex { name: "v".into(), metric: Metric::L2, dimension: 4 })
///     .await;
/// assert_eq!(reply, Ok(Output::Unit));
/// ```
#[derive(Debug, Clone)]
pub struct Executor {
    store: Arc<Store>,
}

impl Executor {
    /// Create a new executor wrapping a store.
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// The store commands run against.
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Execute a single command.
    ///
    /// Every error is returned as a structured [`Error`](crate::Error); this
    /// never panics on bad input.
    pub async fn execute(&self, cmd: Command) -> Response {
        let op = cmd.name();
        let started = Instant::now();
        let db = self.store.as_ref();

        let response = match cmd {
            Command::Ping { nonce } => Ok(Output::Pong { nonce }),

            // Store commands
            Command::CreateIndex {
                name,
                metric,
                dimension,
            } => store::create_index(db, name, metric, dimension).await,
            Command::DeleteIndex { name } => store::delete_index(db, name).await,
            Command::ListIndexes => store::list_indexes(db).await,
            Command::ImportIndex {
                name,
                source_path,
                metric,
                dimension,
            } => store::import_index(db, name, source_path, metric, dimension).await,
            Command::IndexExists { name } => store::index_exists(db, name),
            Command::Flush => store::flush(db).await,

            // Index lifecycle
            Command::InitIndex { name, capacity } => index::init_index(db, name, capacity).await,
            Command::ResizeIndex { name, capacity } => {
                index::resize_index(db, name, capacity).await
            }

            // Items
            Command::AddItems {
                name,
                vectors,
                labels,
            } => index::add_items(db, name, vectors, labels).await,
            Command::DeleteItem { name, label } => index::delete_item(db, name, label).await,
            Command::GetIds { name } => index::get_ids(db, name).await,
            Command::GetElements { name, labels } => {
                index::get_elements(db, name, labels).await
            }
            Command::Count { name } => index::count(db, name).await,
            Command::Info { name } => index::info(db, name).await,

            // Search
            Command::QueryIndex { name, vectors, k } => {
                index::query_index(db, name, vectors, k).await
            }
        };

        debug!(
            target: "luxdb::executor",
            op,
            ok = response.is_ok(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "Command executed"
        );
        response
    }
}
