//! Client ↔ server over real TCP.

use std::sync::Arc;
use std::time::Duration;

use luxdb_core::{IndexState, Metric};
use luxdb_engine::StoreConfig;
use luxdb_security::{Envelope, EnvelopeConfig};
use luxdb_server::{Client, ClientError, Lifecycle, ServerConfig};
use luxdb_wire::{Error, FrameError};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const SECRET: &str = "correct horse battery staple";

fn config(store: StoreConfig) -> ServerConfig {
    ServerConfig {
        secret: SECRET.into(),
        kdf_iterations: 1,
        store,
        ..ServerConfig::default()
    }
}

fn client_envelope(secret: &str) -> Arc<Envelope> {
    let envelope_config = EnvelopeConfig {
        kdf_iterations: 1,
        ..EnvelopeConfig::default()
    };
    Arc::new(Envelope::derive(secret.as_bytes(), &envelope_config))
}

struct Running {
    addr: std::net::SocketAddr,
    shutdown: CancellationToken,
    task: JoinHandle<Result<(), luxdb_server::ServerError>>,
}

impl Running {
    async fn start(config: ServerConfig) -> Running {
        let lifecycle = Lifecycle::start(config).await.unwrap();
        let addr = lifecycle.local_addr();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(lifecycle.run(shutdown.clone()));
        Running {
            addr,
            shutdown,
            task,
        }
    }

    async fn connect(&self) -> Client {
        Client::connect(self.addr, client_envelope(SECRET)).await.unwrap()
    }

    async fn stop(self) {
        self.shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(10), self.task)
            .await
            .expect("server stopped in time")
            .unwrap()
            .unwrap();
    }
}

#[tokio::test]
async fn full_lifecycle_over_tcp() {
    let server = Running::start(config(StoreConfig::memory())).await;
    let mut client = server.connect().await;

    client.create_index("v", Metric::L2, 4).await.unwrap();
    assert!(matches!(
        client.add_items("v", vec![vec![1.0, 2.0, 3.0, 4.0]], vec![7]).await,
        Err(ClientError::Server(Error::NotInitialized { .. }))
    ));

    client.init_index("v", 100).await.unwrap();
    client
        .add_items("v", vec![vec![1.0, 2.0, 3.0, 4.0], vec![0.0; 4]], vec![7, 8])
        .await
        .unwrap();

    assert_eq!(client.get_ids("v").await.unwrap(), vec![7, 8]);
    assert_eq!(
        client.get_elements("v", vec![7]).await.unwrap(),
        vec![vec![1.0, 2.0, 3.0, 4.0]]
    );
    assert_eq!(client.count("v").await.unwrap(), 2);

    let (labels, distances) = client
        .query_index("v", vec![vec![1.0, 2.0, 3.0, 4.0]], 10)
        .await
        .unwrap();
    assert_eq!(labels, vec![vec![7, 8]]);
    assert_eq!(distances, vec![vec![0.0, 30.0]]);

    let info = client.info("v").await.unwrap();
    assert_eq!(info.meta.state, IndexState::Initialized);
    assert_eq!(info.meta.capacity, 100);

    client.delete_item("v", 8).await.unwrap();
    client.resize_index("v", 1).await.unwrap();
    assert!(client.index_exists("v").await.unwrap());
    assert_eq!(client.list_indexes().await.unwrap().len(), 1);

    client.delete_index("v").await.unwrap();
    assert!(!client.index_exists("v").await.unwrap());

    client.close().await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn wrong_secret_fails_handshake() {
    let server = Running::start(config(StoreConfig::memory())).await;

    let result = Client::connect(server.addr, client_envelope("wrong secret")).await;
    assert!(matches!(result, Err(ClientError::Handshake)));

    // The server keeps serving other clients.
    let mut client = server.connect().await;
    client.flush().await.unwrap();
    server.stop().await;
}

#[tokio::test]
async fn many_clients_share_one_store() {
    let server = Running::start(config(StoreConfig::memory())).await;
    let mut setup = server.connect().await;
    setup.create_index("shared", Metric::Ip, 2).await.unwrap();
    setup.init_index("shared", 64).await.unwrap();

    let mut tasks = Vec::new();
    for worker in 0..8u64 {
        let mut client = server.connect().await;
        tasks.push(tokio::spawn(async move {
            let labels: Vec<u64> = (0..8).map(|i| worker * 8 + i).collect();
            let vectors = labels.iter().map(|&l| vec![l as f32, 1.0]).collect();
            client.add_items("shared", vectors, labels).await.unwrap();
            client.close().await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(setup.count("shared").await.unwrap(), 64);
    server.stop().await;
}

#[tokio::test]
async fn client_frame_limit_applies_to_replies() {
    let server = Running::start(config(StoreConfig::memory())).await;
    let mut client = server.connect().await;
    client.create_index("wide", Metric::L2, 256).await.unwrap();
    client.init_index("wide", 1).await.unwrap();
    client.add_items("wide", vec![vec![0.5; 256]], vec![1]).await.unwrap();

    client.set_max_frame_len(64);
    assert!(matches!(
        client.get_elements("wide", vec![1]).await,
        Err(ClientError::Frame(FrameError::TooLarge { max: 64, .. }))
    ));

    // A fresh connection with the default limit reads it fine.
    let mut client = server.connect().await;
    assert_eq!(
        client.get_elements("wide", vec![1]).await.unwrap(),
        vec![vec![0.5; 256]]
    );
    server.stop().await;
}

#[tokio::test]
async fn data_survives_restart() {
    let dir = TempDir::new().unwrap();
    let store = StoreConfig::at(dir.path());

    let server = Running::start(config(store.clone())).await;
    let mut client = server.connect().await;
    client.create_index("v", Metric::Cosine, 3).await.unwrap();
    client.init_index("v", 10).await.unwrap();
    client
        .add_items("v", vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]], vec![1, 2])
        .await
        .unwrap();
    client.close().await.unwrap();
    server.stop().await;

    let server = Running::start(config(store)).await;
    let mut client = server.connect().await;
    assert_eq!(client.get_ids("v").await.unwrap(), vec![1, 2]);
    let (labels, _) = client
        .query_index("v", vec![vec![0.0, 1.0, 0.0]], 1)
        .await
        .unwrap();
    assert_eq!(labels, vec![vec![2]]);
    server.stop().await;
}

#[tokio::test]
async fn second_server_on_same_directory_fails() {
    let dir = TempDir::new().unwrap();
    let server = Running::start(config(StoreConfig::at(dir.path()))).await;

    let second = Lifecycle::start(config(StoreConfig::at(dir.path()))).await;
    assert!(matches!(second, Err(luxdb_server::ServerError::Open(_))));

    server.stop().await;
}

#[tokio::test]
async fn missing_secret_is_a_config_error() {
    let result = Lifecycle::start(ServerConfig::default()).await;
    assert!(matches!(result, Err(luxdb_server::ServerError::Config(_))));
}

#[tokio::test]
async fn shutdown_closes_idle_connections() {
    let server = Running::start(config(StoreConfig::memory())).await;
    let mut client = server.connect().await;
    server.stop().await;

    assert!(client.count("v").await.is_err());
}
