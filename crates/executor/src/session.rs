//! Per-connection session.
//!
//! A [`Session`] owns one client stream and walks it through
//! `Connecting → Authenticated → Serving → Closing → Closed`.
//!
//! For every inbound frame:
//! 1. open the envelope (bad, stale or replayed tokens get a sealed
//!    `Rejected` reply; too many in a row close the connection)
//! 2. decode the command (`MalformedCommand` on failure)
//! 3. execute it
//! 4. encode, seal and send the response
//!
//! Commands on one connection are handled in order. A shutdown signal stops
//! reading new frames but never interrupts a command that is already
//! executing.

use std::sync::Arc;

use luxdb_security::{Envelope, EnvelopeError, ReplayWindow};
use luxdb_wire::{
    decode_command, encode_response, read_frame, write_close, write_frame, CodecError,
    FrameError, DEFAULT_MAX_FRAME_LEN,
};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{Error, Executor, Response};

/// Consecutive authentication failures tolerated before closing
pub const DEFAULT_MAX_AUTH_FAILURES: u32 = 3;

/// Connection lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, no frame authenticated yet
    Connecting,
    /// At least one frame authenticated
    Authenticated,
    /// Executing commands
    Serving,
    /// Sending the close marker
    Closing,
    /// Stream shut down
    Closed,
}

/// Session limits.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Largest accepted frame payload
    pub max_frame_len: u64,
    /// Consecutive envelope failures before the connection is closed
    pub max_auth_failures: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            max_auth_failures: DEFAULT_MAX_AUTH_FAILURES,
        }
    }
}

/// Failures that end a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Framing or stream failure
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Reply could not be sealed
    #[error("envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    /// Reply could not be encoded
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// One client connection.
pub struct Session<S> {
    stream: S,
    peer: String,
    executor: Executor,
    envelope: Arc<Envelope>,
    replay: ReplayWindow,
    config: SessionConfig,
    state: SessionState,
    auth_failures: u32,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a session for an accepted stream.
    pub fn new(
        stream: S,
        peer: impl Into<String>,
        executor: Executor,
        envelope: Arc<Envelope>,
        config: SessionConfig,
    ) -> Self {
        let replay = ReplayWindow::new(envelope.ttl().as_secs());
        Session {
            stream,
            peer: peer.into(),
            executor,
            envelope,
            replay,
            config,
            state: SessionState::Connecting,
            auth_failures: 0,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!(
                target: "luxdb::session",
                peer = %self.peer,
                from = ?self.state,
                to = ?next,
                "Session state change"
            );
            self.state = next;
        }
    }

    /// Serve the connection until the peer closes, a fatal error occurs, or
    /// `shutdown` is cancelled.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), SessionError> {
        let result = self.serve(&shutdown).await;

        self.transition(SessionState::Closing);
        if let Err(e) = write_close(&mut self.stream).await {
            debug!(target: "luxdb::session", peer = %self.peer, error = %e, "Close marker not sent");
        }
        let _ = self.stream.shutdown().await;
        self.transition(SessionState::Closed);

        match &result {
            Ok(()) => debug!(target: "luxdb::session", peer = %self.peer, "Session closed"),
            Err(e) => warn!(target: "luxdb::session", peer = %self.peer, error = %e, "Session ended with error"),
        }
        result
    }

    async fn serve(&mut self, shutdown: &CancellationToken) -> Result<(), SessionError> {
        loop {
            // Only the read is raced against shutdown; command execution
            // below always runs to completion.
            let frame = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Ok(()),
                frame = read_frame(&mut self.stream, self.config.max_frame_len) => frame,
            };

            let token = match frame {
                Ok(Some(token)) => token,
                Ok(None) => return Ok(()),
                Err(FrameError::TooLarge { len, max }) => {
                    warn!(
                        target: "luxdb::session",
                        peer = %self.peer,
                        len,
                        max,
                        "Oversized frame; closing connection"
                    );
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            if !self.handle_frame(&token).await? {
                return Ok(());
            }
        }
    }

    /// Handle one frame; returns `false` when the connection must close.
    async fn handle_frame(&mut self, token: &[u8]) -> Result<bool, SessionError> {
        let plaintext = match self.envelope.open_fresh(token, &mut self.replay) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                self.auth_failures += 1;
                warn!(
                    target: "luxdb::session",
                    peer = %self.peer,
                    error = %e,
                    failures = self.auth_failures,
                    "Envelope rejected"
                );
                self.reply(&Err(Error::Rejected)).await?;
                if self.auth_failures >= self.config.max_auth_failures {
                    warn!(
                        target: "luxdb::session",
                        peer = %self.peer,
                        "Too many rejected frames; closing connection"
                    );
                    return Ok(false);
                }
                return Ok(true);
            }
        };

        self.auth_failures = 0;
        if self.state == SessionState::Connecting {
            self.transition(SessionState::Authenticated);
            info!(target: "luxdb::session", peer = %self.peer, "Client authenticated");
        }

        let response = match decode_command(&plaintext) {
            Ok(command) => {
                self.transition(SessionState::Serving);
                debug!(
                    target: "luxdb::session",
                    peer = %self.peer,
                    op = command.name(),
                    index = command.index_name(),
                    "Command received"
                );
                self.executor.execute(command).await
            }
            Err(e) => {
                warn!(target: "luxdb::session", peer = %self.peer, error = %e, "Malformed command");
                Err(e)
            }
        };

        self.reply(&response).await?;
        Ok(true)
    }

    async fn reply(&mut self, response: &Response) -> Result<(), SessionError> {
        let payload = encode_response(response)?;
        let token = self.envelope.seal(&payload)?;
        write_frame(&mut self.stream, &token).await?;
        Ok(())
    }
}
