//! Blocking client.
//!
//! [`BlockingClient`] owns a current-thread runtime and drives an async
//! [`Client`] on it, one call at a time. It must not be used from inside an
//! async runtime: `block_on` would panic there.
//!
//! ```text
//! let envelope = Arc::new(Envelope::derive(b"secret", &EnvelopeConfig::default()));
//! let mut client = BlockingClient::connect("127.0.0.1:8484", envelope)?;
//! client.create_index("v", Metric::L2, 4)?;
//! client.close()?;
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use luxdb_core::{IndexMeta, Label, Metric};
use luxdb_security::Envelope;
use luxdb_wire::{Command, IndexInfo, Output};
use tokio::net::ToSocketAddrs;
use tokio::runtime::{Builder, Runtime};

use crate::client::{Client, ClientError};

/// Synchronous connection to a LuxDB server.
pub struct BlockingClient {
    runtime: Runtime,
    inner: Client,
}

impl BlockingClient {
    /// Connect and run the handshake.
    pub fn connect<A: ToSocketAddrs>(
        addr: A,
        envelope: Arc<Envelope>,
    ) -> Result<BlockingClient, ClientError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ClientError::Connect)?;
        let inner = runtime.block_on(Client::connect(addr, envelope))?;
        Ok(BlockingClient { runtime, inner })
    }

    /// See [`Client::set_max_frame_len`].
    pub fn set_max_frame_len(&mut self, max_len: u64) {
        self.inner.set_max_frame_len(max_len);
    }

    /// Send one command and wait for its reply.
    pub fn call(&mut self, command: &Command) -> Result<Output, ClientError> {
        self.runtime.block_on(self.inner.call(command))
    }

    /// Round-trip a random nonce.
    pub fn ping(&mut self) -> Result<(), ClientError> {
        self.runtime.block_on(self.inner.ping())
    }

    /// Send the close marker and shut the stream down.
    pub fn close(self) -> Result<(), ClientError> {
        let BlockingClient { runtime, inner } = self;
        runtime.block_on(inner.close())
    }

    /// Blocking form of [`Client::create_index`].
    pub fn create_index(
        &mut self,
        name: &str,
        metric: Metric,
        dimension: usize,
    ) -> Result<(), ClientError> {
        self.runtime
            .block_on(self.inner.create_index(name, metric, dimension))
    }

    /// Blocking form of [`Client::delete_index`].
    pub fn delete_index(&mut self, name: &str) -> Result<(), ClientError> {
        self.runtime.block_on(self.inner.delete_index(name))
    }

    /// Blocking form of [`Client::list_indexes`].
    pub fn list_indexes(&mut self) -> Result<BTreeMap<String, IndexMeta>, ClientError> {
        self.runtime.block_on(self.inner.list_indexes())
    }

    /// Blocking form of [`Client::import_index`].
    pub fn import_index(
        &mut self,
        name: &str,
        source_path: impl Into<PathBuf>,
        metric: Metric,
        dimension: usize,
    ) -> Result<(), ClientError> {
        self.runtime
            .block_on(self.inner.import_index(name, source_path, metric, dimension))
    }

    /// Blocking form of [`Client::index_exists`].
    pub fn index_exists(&mut self, name: &str) -> Result<bool, ClientError> {
        self.runtime.block_on(self.inner.index_exists(name))
    }

    /// Blocking form of [`Client::flush`].
    pub fn flush(&mut self) -> Result<(), ClientError> {
        self.runtime.block_on(self.inner.flush())
    }

    /// Blocking form of [`Client::init_index`].
    pub fn init_index(&mut self, name: &str, capacity: usize) -> Result<(), ClientError> {
        self.runtime.block_on(self.inner.init_index(name, capacity))
    }

    /// Blocking form of [`Client::resize_index`].
    pub fn resize_index(&mut self, name: &str, capacity: usize) -> Result<(), ClientError> {
        self.runtime.block_on(self.inner.resize_index(name, capacity))
    }

    /// Blocking form of [`Client::add_items`].
    pub fn add_items(
        &mut self,
        name: &str,
        vectors: Vec<Vec<f32>>,
        labels: Vec<Label>,
    ) -> Result<(), ClientError> {
        self.runtime
            .block_on(self.inner.add_items(name, vectors, labels))
    }

    /// Blocking form of [`Client::delete_item`].
    pub fn delete_item(&mut self, name: &str, label: Label) -> Result<(), ClientError> {
        self.runtime.block_on(self.inner.delete_item(name, label))
    }

    /// Blocking form of [`Client::get_ids`].
    pub fn get_ids(&mut self, name: &str) -> Result<Vec<Label>, ClientError> {
        self.runtime.block_on(self.inner.get_ids(name))
    }

    /// Blocking form of [`Client::get_elements`].
    pub fn get_elements(
        &mut self,
        name: &str,
        labels: Vec<Label>,
    ) -> Result<Vec<Vec<f32>>, ClientError> {
        self.runtime.block_on(self.inner.get_elements(name, labels))
    }

    /// Blocking form of [`Client::count`].
    pub fn count(&mut self, name: &str) -> Result<usize, ClientError> {
        self.runtime.block_on(self.inner.count(name))
    }

    /// Blocking form of [`Client::info`].
    pub fn info(&mut self, name: &str) -> Result<IndexInfo, ClientError> {
        self.runtime.block_on(self.inner.info(name))
    }

    /// k nearest neighbours of each query vector: `(labels, distances)`.
    pub fn query_index(
        &mut self,
        name: &str,
        vectors: Vec<Vec<f32>>,
        k: usize,
    ) -> Result<(Vec<Vec<Label>>, Vec<Vec<f32>>), ClientError> {
        self.runtime.block_on(self.inner.query_index(name, vectors, k))
    }
}
