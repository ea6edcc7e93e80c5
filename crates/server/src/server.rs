//! TCP accept loop.
//!
//! Every accepted connection gets its own [`Session`] task. On shutdown the
//! listener is dropped first, then the loop waits for every session to
//! finish the command it is executing.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use luxdb_executor::{Executor, Session, SessionConfig};
use luxdb_security::Envelope;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Pause after a failed accept (e.g. out of file descriptors).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// A bound listener plus everything a session needs.
pub struct Server {
    listener: TcpListener,
    executor: Executor,
    envelope: Arc<Envelope>,
    session: SessionConfig,
}

impl Server {
    /// Bind the listen socket.
    pub async fn bind<A: ToSocketAddrs>(
        addr: A,
        executor: Executor,
        envelope: Arc<Envelope>,
        session: SessionConfig,
    ) -> io::Result<Server> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Server {
            listener,
            executor,
            envelope,
            session,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` is cancelled, then drain sessions.
    pub async fn serve(self, shutdown: CancellationToken) {
        let Server {
            listener,
            executor,
            envelope,
            session: session_config,
        } = self;
        let mut sessions = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = joined {
                        warn!(target: "luxdb::server", error = %e, "Session task failed");
                    }
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            debug!(target: "luxdb::server", %peer, error = %e, "TCP_NODELAY not set");
                        }
                        debug!(target: "luxdb::server", %peer, "Connection accepted");
                        let session = Session::new(
                            stream,
                            peer.to_string(),
                            executor.clone(),
                            Arc::clone(&envelope),
                            session_config,
                        );
                        sessions.spawn(session.run(shutdown.child_token()));
                    }
                    Err(e) => {
                        warn!(target: "luxdb::server", error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }

        drop(listener);
        info!(
            target: "luxdb::server",
            open_sessions = sessions.len(),
            "Stopped accepting; waiting for sessions"
        );
        while let Some(joined) = sessions.join_next().await {
            if let Err(e) = joined {
                warn!(target: "luxdb::server", error = %e, "Session task failed");
            }
        }
    }
}
