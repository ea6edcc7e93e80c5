//! LuxDB - networked vector index store
//!
//! A LuxDB server holds named vector indexes (l2, inner product or cosine)
//! and answers k-nearest-neighbour queries over TCP. Every frame is sealed
//! with a key derived from a shared secret.
//!
//! # Quick Start
//!
//! ```ignore
//! use luxdb::{Client, Envelope, EnvelopeConfig, Metric};
//!
//! let envelope = Arc::new(Envelope::derive(b"secret", &EnvelopeConfig::default()));
//! let mut client = Client::connect("127.0.0.1:8484", envelope).await?;
//! client.create_index("v", Metric::L2, 4).await?;
//! client.init_index("v", 100).await?;
//! client.add_items("v", vec![vec![1.0, 2.0, 3.0, 4.0]], vec![7]).await?;
//! let (labels, distances) = client.query_index("v", vec![vec![1.0, 2.0, 3.0, 4.0]], 1).await?;
//! ```
//!
//! # Architecture
//!
//! Clients talk to a [`Session`] per connection; sessions hand decoded
//! [`Command`]s to the [`Executor`], which drives the [`Store`]. The store
//! itself can also be embedded directly without the network layer.

pub use luxdb_core::{IndexId, IndexMeta, IndexState, Label, Metric};
pub use luxdb_engine::{Store, StoreConfig};
pub use luxdb_executor::{Command, Error, Executor, IndexInfo, Output, Response, Session, SessionConfig};
pub use luxdb_security::{derive_key, Envelope, EnvelopeConfig, SessionKey};
pub use luxdb_server::{BlockingClient, Client, ClientError, Lifecycle, ServerConfig, ServerError};
