//! Dispatch tests: every command reaches the store and comes back as the
//! documented output or a structured error.

use luxdb_core::{IndexState, Metric};
use luxdb_engine::{Store, StoreConfig};

use crate::{Command, Error, Executor, Output};

fn create_test_executor() -> Executor {
    Executor::new(Store::open(StoreConfig::memory().with_worker_threads(2)).unwrap())
}

fn create(name: &str, metric: Metric, dimension: usize) -> Command {
    Command::CreateIndex {
        name: name.into(),
        metric,
        dimension,
    }
}

#[tokio::test]
async fn test_ping_echoes_nonce() {
    let executor = create_test_executor();
    assert_eq!(
        executor.execute(Command::Ping { nonce: 99 }).await,
        Ok(Output::Pong { nonce: 99 })
    );
}

#[tokio::test]
async fn test_lifecycle_through_commands() {
    let executor = create_test_executor();

    assert_eq!(executor.execute(create("v", Metric::L2, 4)).await, Ok(Output::Unit));
    assert_eq!(
        executor
            .execute(Command::AddItems {
                name: "v".into(),
                vectors: vec![vec![1.0, 2.0, 3.0, 4.0]],
                labels: vec![7],
            })
            .await,
        Err(Error::NotInitialized { name: "v".into() })
    );

    executor
        .execute(Command::InitIndex {
            name: "v".into(),
            capacity: 100,
        })
        .await
        .unwrap();
    executor
        .execute(Command::AddItems {
            name: "v".into(),
            vectors: vec![vec![1.0, 2.0, 3.0, 4.0]],
            labels: vec![7],
        })
        .await
        .unwrap();

    assert_eq!(
        executor.execute(Command::GetIds { name: "v".into() }).await,
        Ok(Output::Labels(vec![7]))
    );
    assert_eq!(
        executor
            .execute(Command::GetElements {
                name: "v".into(),
                labels: vec![7],
            })
            .await,
        Ok(Output::Vectors(vec![vec![1.0, 2.0, 3.0, 4.0]]))
    );
    assert_eq!(
        executor.execute(Command::Count { name: "v".into() }).await,
        Ok(Output::Count(1))
    );
    assert_eq!(
        executor
            .execute(Command::QueryIndex {
                name: "v".into(),
                vectors: vec![vec![1.0, 2.0, 3.0, 5.0]],
                k: 3,
            })
            .await,
        Ok(Output::Neighbors {
            labels: vec![vec![7]],
            distances: vec![vec![1.0]],
        })
    );

    match executor.execute(Command::Info { name: "v".into() }).await {
        Ok(Output::Info(info)) => {
            assert_eq!(info.count, 1);
            assert_eq!(info.meta.capacity, 100);
            assert_eq!(info.meta.state, IndexState::Initialized);
        }
        other => panic!("expected Info, got {:?}", other),
    }

    assert_eq!(
        executor
            .execute(Command::DeleteItem {
                name: "v".into(),
                label: 7,
            })
            .await,
        Ok(Output::Unit)
    );
    assert_eq!(
        executor
            .execute(Command::DeleteIndex { name: "v".into() })
            .await,
        Ok(Output::Unit)
    );
    assert_eq!(
        executor
            .execute(Command::IndexExists { name: "v".into() })
            .await,
        Ok(Output::Bool(false))
    );
}

#[tokio::test]
async fn test_capacity_and_resize_errors() {
    let executor = create_test_executor();
    executor.execute(create("v", Metric::Ip, 1)).await.unwrap();
    executor
        .execute(Command::InitIndex {
            name: "v".into(),
            capacity: 2,
        })
        .await
        .unwrap();
    executor
        .execute(Command::AddItems {
            name: "v".into(),
            vectors: vec![vec![1.0], vec![2.0]],
            labels: vec![1, 2],
        })
        .await
        .unwrap();

    let third = Command::AddItems {
        name: "v".into(),
        vectors: vec![vec![3.0]],
        labels: vec![3],
    };
    assert_eq!(
        executor.execute(third.clone()).await,
        Err(Error::CapacityExceeded {
            capacity: 2,
            required: 3
        })
    );
    assert_eq!(
        executor
            .execute(Command::ResizeIndex {
                name: "v".into(),
                capacity: 1,
            })
            .await,
        Err(Error::InvalidCapacity {
            requested: 1,
            count: 2
        })
    );
    executor
        .execute(Command::ResizeIndex {
            name: "v".into(),
            capacity: 3,
        })
        .await
        .unwrap();
    assert_eq!(executor.execute(third).await, Ok(Output::Unit));
}

#[tokio::test]
async fn test_unknown_index_errors() {
    let executor = create_test_executor();
    for cmd in [
        Command::DeleteIndex { name: "x".into() },
        Command::GetIds { name: "x".into() },
        Command::Count { name: "x".into() },
        Command::Info { name: "x".into() },
        Command::InitIndex {
            name: "x".into(),
            capacity: 1,
        },
    ] {
        assert_eq!(
            executor.execute(cmd).await,
            Err(Error::UnknownIndex { name: "x".into() })
        );
    }
}

#[tokio::test]
async fn test_list_and_flush() {
    let executor = create_test_executor();
    executor.execute(create("b", Metric::Cosine, 2)).await.unwrap();
    executor.execute(create("a", Metric::L2, 3)).await.unwrap();

    match executor.execute(Command::ListIndexes).await {
        Ok(Output::Indexes(indexes)) => {
            assert_eq!(indexes.keys().cloned().collect::<Vec<_>>(), vec!["a", "b"]);
            assert_eq!(indexes["b"].metric, Metric::Cosine);
        }
        other => panic!("expected Indexes, got {:?}", other),
    }
    assert_eq!(executor.execute(Command::Flush).await, Ok(Output::Unit));
}

#[tokio::test]
async fn test_invalid_input_is_structured() {
    let executor = create_test_executor();
    assert!(matches!(
        executor.execute(create("", Metric::L2, 3)).await,
        Err(Error::InvalidInput { .. })
    ));
    assert!(matches!(
        executor.execute(create("v", Metric::L2, 0)).await,
        Err(Error::InvalidInput { .. })
    ));
}

#[tokio::test]
async fn test_import_from_another_store() {
    let source_dir = tempfile::tempdir().unwrap();
    let source = Executor::new(Store::open(StoreConfig::at(source_dir.path())).unwrap());
    source.execute(create("v", Metric::L2, 2)).await.unwrap();
    source
        .execute(Command::InitIndex {
            name: "v".into(),
            capacity: 4,
        })
        .await
        .unwrap();
    source
        .execute(Command::AddItems {
            name: "v".into(),
            vectors: vec![vec![0.0, 1.0], vec![1.0, 0.0]],
            labels: vec![10, 20],
        })
        .await
        .unwrap();
    source.execute(Command::Flush).await.unwrap();
    let file = source_dir
        .path()
        .join("data")
        .join(luxdb_core::IndexId(0).data_file_name());

    let target = create_test_executor();
    assert!(matches!(
        target
            .execute(Command::ImportIndex {
                name: "copy".into(),
                source_path: file.clone(),
                metric: Metric::Ip,
                dimension: 2,
            })
            .await,
        Err(Error::SchemaMismatch { .. })
    ));
    assert!(matches!(
        target
            .execute(Command::ImportIndex {
                name: "copy".into(),
                source_path: source_dir.path().join("missing.lux"),
                metric: Metric::L2,
                dimension: 2,
            })
            .await,
        Err(Error::InvalidInput { .. })
    ));

    target
        .execute(Command::ImportIndex {
            name: "copy".into(),
            source_path: file,
            metric: Metric::L2,
            dimension: 2,
        })
        .await
        .unwrap();
    assert_eq!(
        target.execute(Command::GetIds { name: "copy".into() }).await,
        Ok(Output::Labels(vec![10, 20]))
    );
}
