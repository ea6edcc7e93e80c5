//! Startup and graceful shutdown.
//!
//! [`Lifecycle::start`] validates the config, derives the session key, opens
//! the store, starts the background flusher and binds the listener.
//! [`Lifecycle::run`] serves until the shutdown token fires, then stops
//! accepting, lets sessions finish their current command, stops the flusher
//! and closes the store. A failure to flush on close is returned as
//! [`ServerError::Close`] so the binary can exit non-zero.

use std::net::SocketAddr;
use std::sync::Arc;

use luxdb_engine::Store;
use luxdb_executor::Executor;
use luxdb_security::Envelope;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{ConfigError, ServerConfig};
use crate::server::Server;

/// Failures that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration is unusable
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Store could not be opened
    #[error("failed to open store: {0}")]
    Open(#[source] luxdb_core::Error),

    /// Listener could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Flush or checkpoint failed while closing the store
    #[error("failed to close store: {0}")]
    Close(#[source] luxdb_core::Error),

    /// A blocking startup task panicked or was cancelled
    #[error("startup task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A started server: store open, listener bound, flusher running.
pub struct Lifecycle {
    store: Arc<Store>,
    server: Server,
    local_addr: SocketAddr,
    flusher: Option<JoinHandle<()>>,
    flusher_stop: CancellationToken,
}

impl Lifecycle {
    /// Bring up every component described by `config`.
    pub async fn start(config: ServerConfig) -> Result<Lifecycle, ServerError> {
        config.validate()?;

        // Key derivation is slow; keep it off the event loop.
        let secret = config.secret.clone();
        let envelope_config = config.envelope_config();
        let envelope = tokio::task::spawn_blocking(move || {
            Envelope::derive(secret.as_bytes(), &envelope_config)
        })
        .await?;
        info!(
            target: "luxdb::server",
            kdf_iterations = config.kdf_iterations,
            ttl_secs = config.envelope_ttl_secs,
            "Session key derived"
        );

        let store_config = config.store.clone();
        let store = tokio::task::spawn_blocking(move || Store::open(store_config))
            .await?
            .map_err(ServerError::Open)?;

        let addr = config.addr();
        let bound = Server::bind(
            addr.as_str(),
            Executor::new(Arc::clone(&store)),
            Arc::new(envelope),
            config.session_config(),
        )
        .await;
        let server = match bound {
            Ok(server) => server,
            Err(source) => {
                // Release the directory lock before reporting.
                if let Err(e) = store.close().await {
                    warn!(target: "luxdb::server", error = %e, "Store close after bind failure");
                }
                return Err(ServerError::Bind { addr, source });
            }
        };
        let local_addr = server.local_addr().map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

        let flusher_stop = CancellationToken::new();
        let flusher = store.spawn_flusher(flusher_stop.clone());

        info!(target: "luxdb::server", addr = %local_addr, "Serving");
        Ok(Lifecycle {
            store,
            server,
            local_addr,
            flusher,
            flusher_stop,
        })
    }

    /// Address clients should connect to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The open store.
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Serve until `shutdown` is cancelled, then close everything.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), ServerError> {
        let Lifecycle {
            store,
            server,
            flusher,
            flusher_stop,
            ..
        } = self;

        server.serve(shutdown).await;

        flusher_stop.cancel();
        if let Some(flusher) = flusher {
            if let Err(e) = flusher.await {
                warn!(target: "luxdb::server", error = %e, "Flusher task failed");
            }
        }

        store.close().await.map_err(ServerError::Close)?;
        info!(target: "luxdb::server", "Shutdown complete");
        Ok(())
    }
}

/// Start the server and run it until SIGTERM or SIGINT.
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let lifecycle = Lifecycle::start(config).await?;
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_token.cancel();
    });
    lifecycle.run(shutdown).await
}

/// Resolves on the first SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(target: "luxdb::server", error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(target: "luxdb::server", error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!(target: "luxdb::server", "SIGINT received; shutting down"),
        _ = terminate => info!(target: "luxdb::server", "SIGTERM received; shutting down"),
    }
}
