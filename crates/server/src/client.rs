//! Async client.
//!
//! ```text
//! let envelope = Arc::new(Envelope::derive(b"secret", &EnvelopeConfig::default()));
//! let mut client = Client::connect("127.0.0.1:8484", envelope).await?;
//! client.create_index("v", Metric::L2, 4).await?;
//! client.init_index("v", 100).await?;
//! client.add_items("v", vec![vec![1.0, 2.0, 3.0, 4.0]], vec![7]).await?;
//! let (labels, distances) = client.query_index("v", vec![vec![1.0, 2.0, 3.0, 4.0]], 1).await?;
//! client.close().await?;
//! ```
//!
//! `connect` performs a `Ping` handshake so a wrong secret is reported
//! immediately rather than on the first real command.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use luxdb_core::{IndexMeta, Label, Metric};
use luxdb_security::{Envelope, EnvelopeError, ReplayWindow};
use luxdb_wire::{
    decode_response, encode_command, read_frame, write_close, write_frame, CodecError, Command,
    Error, FrameError, IndexInfo, Output, DEFAULT_MAX_FRAME_LEN,
};
use subtle::ConstantTimeEq;
use thiserror::Error as ThisError;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

/// Client-side failures.
#[derive(Debug, ThisError)]
pub enum ClientError {
    /// Connection could not be established
    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),

    /// Framing or stream failure
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Reply failed authentication; usually a wrong secret or salt
    #[error("reply rejected: {0}")]
    Envelope(#[from] EnvelopeError),

    /// Message could not be encoded or decoded
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Server closed the connection
    #[error("connection closed by server")]
    Closed,

    /// Handshake echo did not match; make sure the secret is correct
    #[error("handshake failed; make sure the secret is correct")]
    Handshake,

    /// Server returned a structured error
    #[error(transparent)]
    Server(#[from] Error),

    /// Server answered with an output of the wrong kind
    #[error("unexpected reply to {command}: {output:?}")]
    UnexpectedOutput {
        command: &'static str,
        output: Box<Output>,
    },
}

/// Connection to a LuxDB server.
pub struct Client {
    stream: TcpStream,
    envelope: Arc<Envelope>,
    replay: ReplayWindow,
    max_frame_len: u64,
}

impl Client {
    /// Connect and run the handshake.
    pub async fn connect<A: ToSocketAddrs>(
        addr: A,
        envelope: Arc<Envelope>,
    ) -> Result<Client, ClientError> {
        let stream = TcpStream::connect(addr).await.map_err(ClientError::Connect)?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!(target: "luxdb::client", error = %e, "TCP_NODELAY not set");
        }
        let replay = ReplayWindow::new(envelope.ttl().as_secs());
        let mut client = Client {
            stream,
            envelope,
            replay,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        };
        client.ping().await?;
        Ok(client)
    }

    /// Send one command and wait for its reply.
    pub async fn call(&mut self, command: &Command) -> Result<Output, ClientError> {
        let payload = encode_command(command)?;
        let token = self.envelope.seal(&payload)?;
        write_frame(&mut self.stream, &token).await?;

        let token = read_frame(&mut self.stream, self.max_frame_len)
            .await?
            .ok_or(ClientError::Closed)?;
        let plaintext = self.envelope.open_fresh(&token, &mut self.replay)?;
        Ok(decode_response(&plaintext)??)
    }

    /// Largest reply frame accepted; longer replies fail with
    /// [`FrameError::TooLarge`] and leave the connection unusable.
    ///
    /// Defaults to [`DEFAULT_MAX_FRAME_LEN`]. Raise it to match a server
    /// configured with a larger `max_frame_bytes`.
    pub fn set_max_frame_len(&mut self, max_len: u64) {
        self.max_frame_len = max_len;
    }

    /// Round-trip a random nonce.
    pub async fn ping(&mut self) -> Result<(), ClientError> {
        let nonce: u64 = rand::random();
        match self.call(&Command::Ping { nonce }).await {
            Ok(Output::Pong { nonce: echoed }) if nonces_match(nonce, echoed) => Ok(()),
            Ok(_) | Err(ClientError::Envelope(_)) | Err(ClientError::Server(Error::Rejected)) => {
                Err(ClientError::Handshake)
            }
            Err(e) => Err(e),
        }
    }

    /// Send the close marker and shut the stream down.
    pub async fn close(mut self) -> Result<(), ClientError> {
        write_close(&mut self.stream).await?;
        self.stream.shutdown().await.map_err(FrameError::from)?;
        Ok(())
    }

    /// Create an index; it must be initialized before it takes vectors.
    pub async fn create_index(
        &mut self,
        name: &str,
        metric: Metric,
        dimension: usize,
    ) -> Result<(), ClientError> {
        let command = Command::CreateIndex {
            name: name.to_string(),
            metric,
            dimension,
        };
        self.unit(command).await
    }

    /// Delete an index and its data.
    pub async fn delete_index(&mut self, name: &str) -> Result<(), ClientError> {
        self.unit(Command::DeleteIndex {
            name: name.to_string(),
        })
        .await
    }

    /// Every index with its metadata, keyed by name.
    pub async fn list_indexes(&mut self) -> Result<BTreeMap<String, IndexMeta>, ClientError> {
        match self.call(&Command::ListIndexes).await? {
            Output::Indexes(indexes) => Ok(indexes),
            other => Err(unexpected("ListIndexes", other)),
        }
    }

    /// Register a data file written by another store under `name`.
    ///
    /// `source_path` is resolved on the server. The file's metric and
    /// dimension must match the declared ones.
    pub async fn import_index(
        &mut self,
        name: &str,
        source_path: impl Into<PathBuf>,
        metric: Metric,
        dimension: usize,
    ) -> Result<(), ClientError> {
        let command = Command::ImportIndex {
            name: name.to_string(),
            source_path: source_path.into(),
            metric,
            dimension,
        };
        self.unit(command).await
    }

    /// Whether an index named `name` exists.
    pub async fn index_exists(&mut self, name: &str) -> Result<bool, ClientError> {
        let command = Command::IndexExists {
            name: name.to_string(),
        };
        match self.call(&command).await? {
            Output::Bool(exists) => Ok(exists),
            other => Err(unexpected("IndexExists", other)),
        }
    }

    /// Write every index with unflushed changes to disk.
    pub async fn flush(&mut self) -> Result<(), ClientError> {
        self.unit(Command::Flush).await
    }

    /// Allocate a created index for up to `capacity` vectors.
    pub async fn init_index(&mut self, name: &str, capacity: usize) -> Result<(), ClientError> {
        self.unit(Command::InitIndex {
            name: name.to_string(),
            capacity,
        })
        .await
    }

    /// Change capacity; never below the current element count.
    pub async fn resize_index(&mut self, name: &str, capacity: usize) -> Result<(), ClientError> {
        self.unit(Command::ResizeIndex {
            name: name.to_string(),
            capacity,
        })
        .await
    }

    /// Add `vectors[i]` under `labels[i]`.
    ///
    /// The batch is applied completely or not at all.
    pub async fn add_items(
        &mut self,
        name: &str,
        vectors: Vec<Vec<f32>>,
        labels: Vec<Label>,
    ) -> Result<(), ClientError> {
        self.unit(Command::AddItems {
            name: name.to_string(),
            vectors,
            labels,
        })
        .await
    }

    /// Remove one vector.
    pub async fn delete_item(&mut self, name: &str, label: Label) -> Result<(), ClientError> {
        self.unit(Command::DeleteItem {
            name: name.to_string(),
            label,
        })
        .await
    }

    /// All labels, ascending.
    pub async fn get_ids(&mut self, name: &str) -> Result<Vec<Label>, ClientError> {
        let command = Command::GetIds {
            name: name.to_string(),
        };
        match self.call(&command).await? {
            Output::Labels(labels) => Ok(labels),
            other => Err(unexpected("GetIds", other)),
        }
    }

    /// Vectors stored under `labels`, in request order.
    pub async fn get_elements(
        &mut self,
        name: &str,
        labels: Vec<Label>,
    ) -> Result<Vec<Vec<f32>>, ClientError> {
        let command = Command::GetElements {
            name: name.to_string(),
            labels,
        };
        match self.call(&command).await? {
            Output::Vectors(vectors) => Ok(vectors),
            other => Err(unexpected("GetElements", other)),
        }
    }

    /// Number of vectors in an initialized index.
    pub async fn count(&mut self, name: &str) -> Result<usize, ClientError> {
        let command = Command::Count {
            name: name.to_string(),
        };
        match self.call(&command).await? {
            Output::Count(count) => Ok(count),
            other => Err(unexpected("Count", other)),
        }
    }

    /// Metadata plus element count.
    pub async fn info(&mut self, name: &str) -> Result<IndexInfo, ClientError> {
        let command = Command::Info {
            name: name.to_string(),
        };
        match self.call(&command).await? {
            Output::Info(info) => Ok(info),
            other => Err(unexpected("Info", other)),
        }
    }

    /// k nearest neighbours of each query vector: `(labels, distances)`.
    pub async fn query_index(
        &mut self,
        name: &str,
        vectors: Vec<Vec<f32>>,
        k: usize,
    ) -> Result<(Vec<Vec<Label>>, Vec<Vec<f32>>), ClientError> {
        let command = Command::QueryIndex {
            name: name.to_string(),
            vectors,
            k,
        };
        match self.call(&command).await? {
            Output::Neighbors { labels, distances } => Ok((labels, distances)),
            other => Err(unexpected("QueryIndex", other)),
        }
    }

    async fn unit(&mut self, command: Command) -> Result<(), ClientError> {
        let name = command.name();
        match self.call(&command).await? {
            Output::Unit => Ok(()),
            other => Err(unexpected(name, other)),
        }
    }
}

fn unexpected(command: &'static str, output: Output) -> ClientError {
    ClientError::UnexpectedOutput {
        command,
        output: Box::new(output),
    }
}

fn nonces_match(sent: u64, echoed: u64) -> bool {
    sent.ct_eq(&echoed).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_comparison() {
        assert!(nonces_match(42, 42));
        assert!(!nonces_match(42, 43));
        assert!(!nonces_match(0, u64::MAX));
    }
}
