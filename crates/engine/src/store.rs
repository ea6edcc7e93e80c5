//! The store: name → index mapping and its lifecycle
//!
//! `Store` is the main entry point of the engine crate. It owns:
//! - the catalog (committed metadata, durable on commit)
//! - the per-name index handles behind the lock coordinator
//! - the worker pool that runs every CPU- or disk-bound step
//!
//! # Locking
//!
//! `create`, `delete` and `import` take the store-level write lock and
//! `list` the read lock. Everything else goes straight to the per-name lock:
//! reads (`query`, `ids`, `get`, `count`, `info`, flush) share it, writes
//! (`init`, `add`, `resize`, `delete_item`) hold it exclusively. Guards are
//! moved into the pool task, so a caller that goes away never releases a lock
//! while its write is still running.
//!
//! # Durability
//!
//! A metadata change is durable when its catalog commit returns. Bulk data
//! trails it: in `Always` mode the data file is rewritten before a write
//! returns, in `Standard` mode a background flusher writes dirty indexes
//! every interval and `close` writes the rest.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use luxdb_concurrency::{
    IndexReadGuard, IndexWriteGuard, LockCoordinator, PoolError, TaskPriority, WorkerPool,
};
use luxdb_core::{
    validate_dimension, validate_index_name, Error, IndexId, IndexMeta, IndexState, Label,
    Metric, Result,
};
use luxdb_durability::atomic::{remove_if_exists, TEMP_SUFFIX};
use luxdb_durability::{
    read_index_file, read_index_header, CatalogRecord, CatalogStore, DataFileError,
    DurabilityMode, StoreLock, StorePaths,
};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::StoreConfig;
use crate::handle::{IndexHandle, QueryResult};
use crate::vector::{EngineFactory, FlatEngineFactory, VectorEngine};

/// State reachable from pool tasks.
///
/// Kept apart from the pool itself so a task never holds the last reference
/// to the thread it runs on.
struct Shared {
    catalog: Mutex<CatalogStore>,
    paths: Option<StorePaths>,
    indexes: LockCoordinator<IndexHandle>,
    factory: Arc<dyn EngineFactory>,
    mode: DurabilityMode,
}

impl Shared {
    fn data_file(&self, id: IndexId) -> Option<PathBuf> {
        self.paths.as_ref().map(|p| p.data_file(id))
    }

    /// Write a mutated index before replying when the mode asks for it
    fn flush_if_always(&self, handle: &IndexHandle) -> Result<()> {
        if !self.mode.requires_immediate_flush() {
            return Ok(());
        }
        match self.data_file(handle.meta().id) {
            Some(path) => handle.flush_to(&path, false).map(|_| ()),
            None => Ok(()),
        }
    }

    fn flush_handle(&self, handle: &IndexHandle) -> Result<bool> {
        match self.data_file(handle.meta().id) {
            Some(path) => handle.flush_to(&path, false),
            None => Ok(false),
        }
    }

    fn remove_data_file(&self, name: &str, id: IndexId) {
        let Some(path) = self.data_file(id) else {
            return;
        };
        if let Err(e) = remove_if_exists(&path) {
            // Swept as an orphan on the next open.
            warn!(
                target: "luxdb::store",
                index = name,
                path = %path.display(),
                error = %e,
                "Failed to remove data file"
            );
        }
    }
}

/// Networked vector index store.
///
/// # Example
///
/// ```text
/// use luxdb_engine::{Store, StoreConfig};
/// use luxdb_core::Metric;
///
/// let store = Store::open(StoreConfig::at("/var/lib/luxdb"))?;
/// store.create_index("v", Metric::L2, 4).await?;
/// store.init_index("v", 100).await?;
/// store.add_items("v", vec![vec![1.0, 2.0, 3.0, 4.0]], vec![7]).await?;
/// let (labels, distances) = store.query_index("v", vec![vec![1.0, 2.0, 3.0, 4.0]], 1).await?;
/// store.close().await?;
/// ```
pub struct Store {
    shared: Arc<Shared>,
    pool: Arc<WorkerPool>,
    closed: AtomicBool,
    _lock: Option<StoreLock>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("root", &self.shared.paths.as_ref().map(|p| p.root().to_path_buf()))
            .field("mode", &self.shared.mode)
            .field("indexes", &self.shared.indexes.len())
            .finish()
    }
}

fn pool_error(e: PoolError) -> Error {
    match e {
        PoolError::ShutDown => Error::Internal("store is closed".into()),
        PoolError::Panicked(msg) => Error::Internal(format!("operation panicked: {}", msg)),
    }
}

impl Store {
    /// Open a store with the default flat engine.
    ///
    /// With `config.path == None` the store lives in memory only.
    pub fn open(config: StoreConfig) -> Result<Arc<Store>> {
        Self::open_with_factory(config, Arc::new(FlatEngineFactory))
    }

    /// Open a store with a custom engine factory.
    ///
    /// # Errors
    ///
    /// Fails if the directory is locked by another process, the catalog is
    /// unreadable, or any referenced data file is corrupt.
    pub fn open_with_factory(
        config: StoreConfig,
        factory: Arc<dyn EngineFactory>,
    ) -> Result<Arc<Store>> {
        let mode = config.durability_mode()?;

        let (catalog, paths, lock, handles) = match &config.path {
            None => (CatalogStore::in_memory(), None, None, Vec::new()),
            Some(root) => {
                let paths = StorePaths::from_root(root);
                paths.create_directories()?;
                let lock = paths.lock()?;
                let mut catalog = CatalogStore::open(&paths)?;
                let handles = load_indexes(&paths, &mut catalog, factory.as_ref())?;
                sweep_stale_files(&paths, &catalog)?;
                (catalog, Some(paths), Some(lock), handles)
            }
        };

        let pool = WorkerPool::new(config.resolved_worker_threads(), config.max_queue_depth)?;

        info!(
            target: "luxdb::store",
            path = ?config.path,
            indexes = handles.len(),
            durability = mode.description(),
            workers = config.resolved_worker_threads(),
            "Store opened"
        );

        Ok(Arc::new(Store {
            shared: Arc::new(Shared {
                catalog: Mutex::new(catalog),
                paths,
                indexes: LockCoordinator::from_entries(handles),
                factory,
                mode,
            }),
            pool: Arc::new(pool),
            closed: AtomicBool::new(false),
            _lock: lock,
        }))
    }

    /// Durability mode in effect
    pub fn durability_mode(&self) -> DurabilityMode {
        self.shared.mode
    }

    /// Whether the store writes to disk
    pub fn is_persistent(&self) -> bool {
        self.shared.paths.is_some()
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Internal("store is closed".into()));
        }
        Ok(())
    }

    async fn dispatch<R, F>(&self, priority: TaskPriority, work: F) -> Result<R>
    where
        F: FnOnce(&Shared) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        self.pool
            .run(priority, move || work(&shared))
            .await
            .map_err(pool_error)?
    }

    async fn run<R, F>(&self, work: F) -> Result<R>
    where
        F: FnOnce(&Shared) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        self.check_open()?;
        self.dispatch(TaskPriority::Normal, work).await
    }

    // ========================================================================
    // Structural operations
    // ========================================================================

    /// Create an index in state `Created`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a bad name or dimension, `DuplicateIndex` if the
    /// name is taken.
    pub async fn create_index(&self, name: &str, metric: Metric, dimension: usize) -> Result<()> {
        validate_index_name(name)?;
        validate_dimension(dimension)?;
        self.check_open()?;

        let structure = self.shared.indexes.structure_write().await;
        let name = name.to_string();
        self.run(move |shared| {
            if shared.indexes.contains(&name) {
                return Err(Error::DuplicateIndex(name));
            }
            let mut catalog = shared.catalog.lock();
            let id = catalog.catalog().next_id();
            catalog.commit(CatalogRecord::Created {
                name: name.clone(),
                id,
                metric,
                dimension,
            })?;
            drop(catalog);

            let meta = IndexMeta::created(name.clone(), id, metric, dimension);
            shared
                .indexes
                .insert(&structure, name.clone(), IndexHandle::created(meta));
            info!(target: "luxdb::store", index = %name, %id, %metric, dimension, "Index created");
            Ok(())
        })
        .await
    }

    /// Remove an index, its metadata and its data file.
    pub async fn delete_index(&self, name: &str) -> Result<()> {
        self.check_open()?;
        let structure = self.shared.indexes.structure_write().await;
        let handle = self
            .shared
            .indexes
            .write(name)
            .await
            .ok_or_else(|| Error::UnknownIndex(name.to_string()))?;

        let name = name.to_string();
        self.run(move |shared| {
            let mut handle = handle;
            let id = handle.meta().id;
            shared
                .catalog
                .lock()
                .commit(CatalogRecord::Deleted { name: name.clone() })?;
            handle.mark_deleted();
            shared.indexes.remove(&structure, &name);
            shared.remove_data_file(&name, id);
            info!(target: "luxdb::store", index = %name, %id, "Index deleted");
            Ok(())
        })
        .await
    }

    /// Names and metadata of every index
    pub async fn list_indexes(&self) -> Result<BTreeMap<String, IndexMeta>> {
        self.check_open()?;
        let _structure = self.shared.indexes.structure_read().await;
        self.run(|shared| Ok(shared.catalog.lock().catalog().entries().clone()))
            .await
    }

    /// Register an index from an existing data file, already `Initialized`.
    ///
    /// The file's embedded metric and dimension must match the declared
    /// ones. Its contents are copied into the store; the source is left
    /// untouched.
    ///
    /// # Errors
    ///
    /// `SchemaMismatch` if metric or dimension differ, `InvalidInput` if the
    /// file cannot be read or is not a valid index file, `DuplicateIndex` if
    /// the name is taken.
    pub async fn import_index(
        &self,
        name: &str,
        source_path: PathBuf,
        metric: Metric,
        dimension: usize,
    ) -> Result<()> {
        validate_index_name(name)?;
        validate_dimension(dimension)?;
        self.check_open()?;

        let structure = self.shared.indexes.structure_write().await;
        let name = name.to_string();
        self.run(move |shared| {
            if shared.indexes.contains(&name) {
                return Err(Error::DuplicateIndex(name));
            }

            let invalid = |e: DataFileError| {
                Error::InvalidInput(format!(
                    "cannot import '{}': {}",
                    source_path.display(),
                    e
                ))
            };
            let header = read_index_header(&source_path).map_err(invalid)?;
            if header.metric != metric || header.dimension != dimension {
                return Err(Error::SchemaMismatch(format!(
                    "file holds metric {} dimension {}, declared metric {} dimension {}",
                    header.metric, header.dimension, metric, dimension
                )));
            }
            let (header, payload) = read_index_file(&source_path).map_err(invalid)?;
            let engine = shared.factory.deserialize(&payload).map_err(|e| {
                Error::InvalidInput(format!(
                    "cannot import '{}': {}",
                    source_path.display(),
                    e
                ))
            })?;
            check_engine_matches(engine.as_ref(), metric, dimension, header.count)
                .map_err(Error::InvalidInput)?;

            let mut catalog = shared.catalog.lock();
            let id = catalog.catalog().next_id();
            let capacity = engine.capacity();
            let meta = IndexMeta {
                name: name.clone(),
                id,
                metric,
                dimension,
                capacity,
                state: IndexState::Initialized,
            };
            let count = engine.len();
            let handle = IndexHandle::loaded(meta, engine);

            if let Some(path) = shared.data_file(id) {
                handle.flush_to(&path, true)?;
            }
            if let Err(e) = catalog.commit(CatalogRecord::Imported {
                name: name.clone(),
                id,
                metric,
                dimension,
                capacity,
            }) {
                shared.remove_data_file(&name, id);
                return Err(e);
            }
            drop(catalog);

            shared.indexes.insert(&structure, name.clone(), handle);
            info!(
                target: "luxdb::store",
                index = %name,
                %id,
                source = %source_path.display(),
                count,
                capacity,
                "Index imported"
            );
            Ok(())
        })
        .await
    }

    /// Whether `name` is present
    pub fn index_exists(&self, name: &str) -> Result<bool> {
        self.check_open()?;
        Ok(self.shared.indexes.contains(name))
    }

    // ========================================================================
    // Per-index writes
    // ========================================================================

    /// Allocate the engine of a `Created` index.
    ///
    /// The empty data file is written before the metadata commit, so a
    /// committed `Initialized` entry always has a file to load.
    pub async fn init_index(&self, name: &str, capacity: usize) -> Result<()> {
        self.check_open()?;
        let handle = self.write_guard(name).await?;
        self.run(move |shared| {
            let mut handle = handle;
            handle.check_initialize()?;
            let meta = handle.meta().clone();
            let engine = shared.factory.init(meta.metric, meta.dimension, capacity)?;
            handle.install(engine)?;

            if let Some(path) = shared.data_file(meta.id) {
                if let Err(e) = handle.flush_to(&path, true) {
                    handle.uninstall();
                    return Err(e);
                }
            }
            if let Err(e) = shared.catalog.lock().commit(CatalogRecord::Initialized {
                name: meta.name.clone(),
                capacity,
            }) {
                handle.uninstall();
                shared.remove_data_file(&meta.name, meta.id);
                return Err(e);
            }
            info!(target: "luxdb::store", index = %meta.name, capacity, "Index initialized");
            Ok(())
        })
        .await
    }

    /// Add a batch of vectors; all or nothing.
    pub async fn add_items(
        &self,
        name: &str,
        vectors: Vec<Vec<f32>>,
        labels: Vec<Label>,
    ) -> Result<()> {
        self.check_open()?;
        let handle = self.write_guard(name).await?;
        self.run(move |shared| {
            let mut handle = handle;
            handle.add(&vectors, &labels)?;
            debug!(target: "luxdb::store", index = handle.name(), added = labels.len(), "Items added");
            shared.flush_if_always(&handle)
        })
        .await
    }

    /// Change capacity; never below the element count.
    pub async fn resize_index(&self, name: &str, capacity: usize) -> Result<()> {
        self.check_open()?;
        let handle = self.write_guard(name).await?;
        self.run(move |shared| {
            let mut handle = handle;
            let name = handle.name().to_string();
            handle.resize(capacity, || {
                shared.catalog.lock().commit(CatalogRecord::Resized {
                    name: name.clone(),
                    capacity,
                })
            })?;
            info!(target: "luxdb::store", index = %name, capacity, "Index resized");
            shared.flush_if_always(&handle)
        })
        .await
    }

    /// Remove one vector
    pub async fn delete_item(&self, name: &str, label: Label) -> Result<()> {
        self.check_open()?;
        let handle = self.write_guard(name).await?;
        self.run(move |shared| {
            let mut handle = handle;
            handle.delete_item(label)?;
            debug!(target: "luxdb::store", index = handle.name(), label, "Item deleted");
            shared.flush_if_always(&handle)
        })
        .await
    }

    // ========================================================================
    // Per-index reads
    // ========================================================================

    /// `k` nearest neighbors of each query vector, closest first
    pub async fn query_index(
        &self,
        name: &str,
        vectors: Vec<Vec<f32>>,
        k: usize,
    ) -> Result<QueryResult> {
        self.check_open()?;
        let handle = self.read_guard(name).await?;
        self.run(move |_| handle.query(&vectors, k)).await
    }

    /// Stored labels, ascending
    pub async fn get_ids(&self, name: &str) -> Result<Vec<Label>> {
        self.check_open()?;
        let handle = self.read_guard(name).await?;
        self.run(move |_| handle.ids()).await
    }

    /// Vectors of `labels`, in request order
    pub async fn get_elements(&self, name: &str, labels: Vec<Label>) -> Result<Vec<Vec<f32>>> {
        self.check_open()?;
        let handle = self.read_guard(name).await?;
        self.run(move |_| handle.get(&labels)).await
    }

    /// Element count of an initialized index
    pub async fn count(&self, name: &str) -> Result<usize> {
        self.check_open()?;
        self.read_guard(name).await?.count()
    }

    /// Metadata snapshot and element count
    pub async fn info(&self, name: &str) -> Result<(IndexMeta, usize)> {
        self.check_open()?;
        self.read_guard(name).await?.info()
    }

    async fn read_guard(&self, name: &str) -> Result<IndexReadGuard<IndexHandle>> {
        self.shared
            .indexes
            .read(name)
            .await
            .ok_or_else(|| Error::UnknownIndex(name.to_string()))
    }

    async fn write_guard(&self, name: &str) -> Result<IndexWriteGuard<IndexHandle>> {
        self.shared
            .indexes
            .write(name)
            .await
            .ok_or_else(|| Error::UnknownIndex(name.to_string()))
    }

    // ========================================================================
    // Flushing and lifecycle
    // ========================================================================

    /// Write every dirty index to its data file now.
    ///
    /// Returns the number of files written.
    pub async fn flush(&self) -> Result<usize> {
        self.check_open()?;
        self.flush_dirty(TaskPriority::Normal).await
    }

    /// Flush each dirty index under its read lock.
    ///
    /// Keeps going after a failure so one bad index does not hold back the
    /// others; the first error is returned.
    async fn flush_dirty(&self, priority: TaskPriority) -> Result<usize> {
        if self.shared.paths.is_none() {
            return Ok(0);
        }

        let mut flushed = 0;
        let mut first_error = None;
        for name in self.shared.indexes.names() {
            let Some(handle) = self.shared.indexes.read(&name).await else {
                continue;
            };
            if !handle.is_dirty() {
                continue;
            }
            match self
                .dispatch(priority, move |shared| shared.flush_handle(&handle))
                .await
            {
                Ok(true) => flushed += 1,
                Ok(false) => {}
                Err(e) => {
                    error!(target: "luxdb::store", index = %name, error = %e, "Flush failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(flushed),
        }
    }

    /// Queue a low-priority flush for each dirty index without waiting.
    ///
    /// Stops at the first full-queue rejection; the remaining indexes stay
    /// dirty and are picked up on the next tick. Returns how many flushes
    /// were queued.
    async fn queue_background_flushes(&self) -> usize {
        let mut queued = 0;
        for name in self.shared.indexes.names() {
            let Some(handle) = self.shared.indexes.read(&name).await else {
                continue;
            };
            if !handle.is_dirty() {
                continue;
            }
            let shared = Arc::clone(&self.shared);
            let index = name.clone();
            let submitted = self.pool.submit(TaskPriority::Low, move || {
                if let Err(e) = shared.flush_handle(&handle) {
                    warn!(
                        target: "luxdb::store",
                        index = %index,
                        error = %e,
                        "Background flush failed; retrying next interval"
                    );
                }
            });
            if let Err(e) = submitted {
                debug!(target: "luxdb::store", index = %name, error = %e, "Background flush deferred");
                break;
            }
            queued += 1;
        }
        queued
    }

    /// Start the periodic flusher for `Standard` mode.
    ///
    /// Returns `None` when there is nothing to flush periodically
    /// (memory-only store or `Always` mode). The task stops when `shutdown`
    /// is cancelled.
    pub fn spawn_flusher(self: &Arc<Self>, shutdown: CancellationToken) -> Option<JoinHandle<()>> {
        let interval = self.shared.mode.flush_interval()?;
        if !self.is_persistent() {
            return None;
        }

        let store = Arc::clone(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        if store.closed.load(Ordering::Acquire) {
                            break;
                        }
                        let queued = store.queue_background_flushes().await;
                        if queued > 0 {
                            debug!(target: "luxdb::store", queued, "Background flushes queued");
                        }
                    }
                }
            }
            debug!(target: "luxdb::store", "Flusher stopped");
        }))
    }

    /// Flush everything, checkpoint the catalog and stop the worker pool.
    ///
    /// New operations are rejected from the moment `close` starts; operations
    /// already holding an index lock finish first. Calling `close` twice is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns the first flush or checkpoint failure. The pool is shut down
    /// either way.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let flushed = self.flush_dirty(TaskPriority::High).await;
        let checkpoint = self
            .dispatch(TaskPriority::High, |shared| shared.catalog.lock().checkpoint())
            .await;

        let pool = Arc::clone(&self.pool);
        if let Err(e) = tokio::task::spawn_blocking(move || pool.shutdown()).await {
            warn!(target: "luxdb::store", error = %e, "Worker pool shutdown did not complete");
        }
        let stats = self.pool.stats();

        let flushed = flushed?;
        checkpoint?;
        info!(
            target: "luxdb::store",
            flushed,
            tasks_completed = stats.tasks_completed,
            "Store closed"
        );
        Ok(())
    }
}

fn check_engine_matches(
    engine: &dyn VectorEngine,
    metric: Metric,
    dimension: usize,
    count: usize,
) -> std::result::Result<(), String> {
    if engine.metric() != metric || engine.dimension() != dimension {
        return Err(format!(
            "engine payload holds metric {} dimension {}, header says metric {} dimension {}",
            engine.metric(),
            engine.dimension(),
            metric,
            dimension
        ));
    }
    if engine.len() != count {
        return Err(format!(
            "engine payload holds {} elements, header says {}",
            engine.len(),
            count
        ));
    }
    Ok(())
}

/// Build one handle per catalog entry, loading data files of initialized
/// indexes.
fn load_indexes(
    paths: &StorePaths,
    catalog: &mut CatalogStore,
    factory: &dyn EngineFactory,
) -> Result<Vec<(String, IndexHandle)>> {
    let metas: Vec<IndexMeta> = catalog.catalog().entries().values().cloned().collect();
    let mut handles = Vec::with_capacity(metas.len());

    for mut meta in metas {
        if meta.state != IndexState::Initialized {
            handles.push((meta.name.clone(), IndexHandle::created(meta)));
            continue;
        }

        let path = paths.data_file(meta.id);
        let mut rewrite = false;
        let mut engine = if path.exists() {
            let (header, payload) = read_index_file(&path)?;
            let engine = factory.deserialize(&payload)?;
            check_engine_matches(engine.as_ref(), header.metric, header.dimension, header.count)
                .and_then(|()| {
                    check_engine_matches(engine.as_ref(), meta.metric, meta.dimension, header.count)
                })
                .map_err(|reason| {
                    Error::Corruption(format!("data file '{}': {}", path.display(), reason))
                })?;
            engine
        } else {
            warn!(
                target: "luxdb::store",
                index = %meta.name,
                path = %path.display(),
                "Data file missing; recreating empty index"
            );
            rewrite = true;
            factory.init(meta.metric, meta.dimension, meta.capacity)?
        };

        // The catalog is authoritative for capacity; the data file may
        // predate the last resize.
        if engine.len() > meta.capacity {
            warn!(
                target: "luxdb::store",
                index = %meta.name,
                count = engine.len(),
                capacity = meta.capacity,
                "Data file holds more elements than the committed capacity; raising capacity"
            );
            catalog.commit(CatalogRecord::Resized {
                name: meta.name.clone(),
                capacity: engine.len(),
            })?;
            meta.capacity = engine.len();
        }
        if engine.capacity() != meta.capacity {
            engine.resize(meta.capacity)?;
            rewrite = true;
        }

        let handle = IndexHandle::loaded(meta, engine);
        if rewrite {
            handle.flush_to(&path, true)?;
        }
        debug!(
            target: "luxdb::store",
            index = handle.name(),
            count = handle.count()?,
            capacity = handle.meta().capacity,
            "Index loaded"
        );
        handles.push((handle.name().to_string(), handle));
    }
    Ok(handles)
}

/// Remove leftover temporary files and data files no committed index owns.
fn sweep_stale_files(paths: &StorePaths, catalog: &CatalogStore) -> Result<()> {
    let live: Vec<IndexId> = catalog
        .catalog()
        .entries()
        .values()
        .filter(|m| m.is_initialized())
        .map(|m| m.id)
        .collect();

    let catalog_temp = paths.catalog().with_extension(TEMP_SUFFIX);
    if remove_if_exists(&catalog_temp)? {
        debug!(target: "luxdb::store", path = %catalog_temp.display(), "Removed stale temp file");
    }

    for entry in std::fs::read_dir(paths.data_dir())? {
        let path = entry?.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let stale = if path.extension().and_then(|e| e.to_str()) == Some(TEMP_SUFFIX) {
            true
        } else {
            match IndexId::from_data_file_name(file_name) {
                Some(id) => !live.contains(&id),
                None => false,
            }
        };
        if stale {
            remove_if_exists(&path)?;
            info!(target: "luxdb::store", path = %path.display(), "Removed stale data file");
        }
    }
    Ok(())
}
