//! The root crate re-exports enough to embed a store or run a client.

use std::sync::Arc;

use luxdb::{
    Client, Command, Envelope, EnvelopeConfig, Executor, IndexState, Lifecycle, Metric, Output,
    ServerConfig, Store, StoreConfig,
};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn embedded_executor() {
    let executor = Executor::new(Store::open(StoreConfig::memory()).unwrap());
    executor
        .execute(Command::CreateIndex {
            name: "docs".into(),
            metric: Metric::Cosine,
            dimension: 2,
        })
        .await
        .unwrap();

    match executor.execute(Command::ListIndexes).await {
        Ok(Output::Indexes(indexes)) => assert_eq!(indexes["docs"].state, IndexState::Created),
        other => panic!("expected Indexes, got {:?}", other),
    }
}

#[tokio::test]
async fn client_against_started_server() {
    let config = ServerConfig {
        secret: "s3cret".into(),
        kdf_iterations: 1,
        ..ServerConfig::default()
    };
    let lifecycle = Lifecycle::start(config).await.unwrap();
    let addr = lifecycle.local_addr();
    let shutdown = CancellationToken::new();
    let server = tokio::spawn(lifecycle.run(shutdown.clone()));

    let envelope = Arc::new(Envelope::derive(
        b"s3cret",
        &EnvelopeConfig {
            kdf_iterations: 1,
            ..EnvelopeConfig::default()
        },
    ));
    let mut client = Client::connect(addr, envelope).await.unwrap();
    assert!(!client.index_exists("docs").await.unwrap());
    client.close().await.unwrap();

    shutdown.cancel();
    server.await.unwrap().unwrap();
}
