//! Store lifecycle tests
//!
//! Exercise the public `Store` API end to end on memory-only and on-disk
//! stores: state transitions, validation errors, capacity rules and queries.

use luxdb_core::{Error, IndexState, Metric};
use luxdb_engine::{Store, StoreConfig};
use std::sync::Arc;
use tempfile::TempDir;

fn memory_store() -> Arc<Store> {
    Store::open(StoreConfig::memory().with_worker_threads(2)).unwrap()
}

#[tokio::test]
async fn test_add_before_init_is_not_initialized() {
    let store = memory_store();
    store.create_index("v", Metric::L2, 4).await.unwrap();

    let err = store
        .add_items("v", vec![vec![1.0, 2.0, 3.0, 4.0]], vec![7])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotInitialized(ref n) if n == "v"));
}

#[tokio::test]
async fn test_basic_lifecycle() {
    let store = memory_store();
    store.create_index("v", Metric::L2, 4).await.unwrap();
    store.init_index("v", 100).await.unwrap();
    store
        .add_items("v", vec![vec![1.0, 2.0, 3.0, 4.0]], vec![7])
        .await
        .unwrap();

    assert_eq!(store.get_ids("v").await.unwrap(), vec![7]);
    assert_eq!(
        store.get_elements("v", vec![7]).await.unwrap(),
        vec![vec![1.0, 2.0, 3.0, 4.0]]
    );
    assert_eq!(store.count("v").await.unwrap(), 1);

    let (meta, count) = store.info("v").await.unwrap();
    assert_eq!(meta.state, IndexState::Initialized);
    assert_eq!(meta.capacity, 100);
    assert_eq!(count, 1);

    store.delete_index("v").await.unwrap();
    assert!(!store.index_exists("v").unwrap());
    assert!(matches!(
        store.get_ids("v").await,
        Err(Error::UnknownIndex(_))
    ));
}

#[tokio::test]
async fn test_create_validates_name_and_dimension() {
    let store = memory_store();
    store.create_index("v", Metric::Ip, 3).await.unwrap();

    assert!(matches!(
        store.create_index("v", Metric::L2, 3).await,
        Err(Error::DuplicateIndex(_))
    ));
    assert!(matches!(
        store.create_index("", Metric::L2, 3).await,
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        store.create_index("bad\0name", Metric::L2, 3).await,
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        store.create_index("w", Metric::L2, 0).await,
        Err(Error::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_init_twice_and_unknown_index() {
    let store = memory_store();
    store.create_index("v", Metric::L2, 2).await.unwrap();
    store.init_index("v", 4).await.unwrap();

    assert!(matches!(
        store.init_index("v", 4).await,
        Err(Error::AlreadyInitialized(_))
    ));
    assert!(matches!(
        store.init_index("nope", 4).await,
        Err(Error::UnknownIndex(_))
    ));
    assert!(matches!(
        store.delete_index("nope").await,
        Err(Error::UnknownIndex(_))
    ));
}

#[tokio::test]
async fn test_capacity_then_resize() {
    let store = memory_store();
    store.create_index("v", Metric::L2, 1).await.unwrap();
    store.init_index("v", 2).await.unwrap();
    store
        .add_items("v", vec![vec![1.0], vec![2.0]], vec![1, 2])
        .await
        .unwrap();

    let err = store
        .add_items("v", vec![vec![3.0]], vec![3])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::CapacityExceeded {
            capacity: 2,
            required: 3
        }
    ));

    store.resize_index("v", 3).await.unwrap();
    store.add_items("v", vec![vec![3.0]], vec![3]).await.unwrap();
    assert_eq!(store.get_ids("v").await.unwrap(), vec![1, 2, 3]);

    assert!(matches!(
        store.resize_index("v", 2).await,
        Err(Error::InvalidCapacity {
            requested: 2,
            count: 3
        })
    ));
}

#[tokio::test]
async fn test_query_k_larger_than_count() {
    let store = memory_store();
    store.create_index("v", Metric::L2, 2).await.unwrap();
    store.init_index("v", 10).await.unwrap();
    store
        .add_items(
            "v",
            vec![vec![0.0, 0.0], vec![3.0, 4.0], vec![1.0, 0.0]],
            vec![10, 30, 20],
        )
        .await
        .unwrap();

    let (labels, distances) = store
        .query_index("v", vec![vec![0.0, 0.0], vec![3.0, 4.0]], 10)
        .await
        .unwrap();
    assert_eq!(labels, vec![vec![10, 20, 30], vec![30, 20, 10]]);
    assert_eq!(distances[0], vec![0.0, 1.0, 25.0]);
    assert_eq!(distances[1], vec![0.0, 20.0, 25.0]);

    assert!(matches!(
        store.query_index("v", vec![vec![0.0, 0.0]], 0).await,
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        store.query_index("v", vec![vec![0.0]], 1).await,
        Err(Error::DimensionMismatch {
            expected: 2,
            actual: 1
        })
    ));
}

#[tokio::test]
async fn test_duplicate_and_unknown_labels() {
    let store = memory_store();
    store.create_index("v", Metric::Cosine, 2).await.unwrap();
    store.init_index("v", 10).await.unwrap();
    store
        .add_items("v", vec![vec![1.0, 0.0]], vec![1])
        .await
        .unwrap();

    assert!(matches!(
        store.add_items("v", vec![vec![0.0, 1.0]], vec![1]).await,
        Err(Error::DuplicateLabel(ref l)) if l == &vec![1]
    ));
    assert!(matches!(
        store.get_elements("v", vec![1, 4, 5]).await,
        Err(Error::UnknownLabel(ref l)) if l == &vec![4, 5]
    ));

    store.delete_item("v", 1).await.unwrap();
    assert!(matches!(
        store.delete_item("v", 1).await,
        Err(Error::UnknownLabel(_))
    ));
    assert_eq!(store.count("v").await.unwrap(), 0);
}

#[tokio::test]
async fn test_list_indexes() {
    let store = memory_store();
    store.create_index("b", Metric::L2, 2).await.unwrap();
    store.create_index("a", Metric::Ip, 8).await.unwrap();
    store.init_index("a", 5).await.unwrap();

    let list = store.list_indexes().await.unwrap();
    assert_eq!(list.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(list["a"].state, IndexState::Initialized);
    assert_eq!(list["a"].capacity, 5);
    assert_eq!(list["b"].state, IndexState::Created);
    assert_eq!(list["b"].dimension, 2);
}

#[tokio::test]
async fn test_import_index() {
    let dir = TempDir::new().unwrap();
    let export_path = {
        let source = Store::open(StoreConfig::at(dir.path().join("source"))).unwrap();
        source.create_index("v", Metric::L2, 3).await.unwrap();
        source.init_index("v", 8).await.unwrap();
        source
            .add_items("v", vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]], vec![1, 2])
            .await
            .unwrap();
        source.close().await.unwrap();
        let list = std::fs::read_dir(dir.path().join("source").join("data"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect::<Vec<_>>();
        assert_eq!(list.len(), 1);
        list[0].clone()
    };

    let store = Store::open(StoreConfig::at(dir.path().join("target"))).unwrap();

    let err = store
        .import_index("w", export_path.clone(), Metric::Cosine, 3)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch(_)));
    let err = store
        .import_index("w", export_path.clone(), Metric::L2, 4)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch(_)));
    let err = store
        .import_index("w", dir.path().join("missing.lux"), Metric::L2, 3)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    // A header whose payload length overflows the file size arithmetic.
    let forged = dir.path().join("forged.lux");
    let mut bytes = std::fs::read(&export_path).unwrap();
    bytes[29..37].copy_from_slice(&u64::MAX.to_le_bytes());
    std::fs::write(&forged, bytes).unwrap();
    let err = store
        .import_index("w", forged, Metric::L2, 3)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(!store.index_exists("w").unwrap());

    store
        .import_index("w", export_path.clone(), Metric::L2, 3)
        .await
        .unwrap();
    let (meta, count) = store.info("w").await.unwrap();
    assert_eq!(meta.state, IndexState::Initialized);
    assert_eq!(meta.capacity, 8);
    assert_eq!(count, 2);
    assert_eq!(
        store.get_elements("w", vec![2]).await.unwrap(),
        vec![vec![4.0, 5.0, 6.0]]
    );

    assert!(export_path.exists());
    assert!(matches!(
        store.import_index("w", export_path, Metric::L2, 3).await,
        Err(Error::DuplicateIndex(_))
    ));
    store.close().await.unwrap();
}

#[tokio::test]
async fn test_closed_store_rejects_operations() {
    let store = memory_store();
    store.create_index("v", Metric::L2, 2).await.unwrap();
    store.close().await.unwrap();
    store.close().await.unwrap();

    assert!(matches!(store.count("v").await, Err(Error::Internal(_))));
    assert!(matches!(
        store.create_index("w", Metric::L2, 2).await,
        Err(Error::Internal(_))
    ));
}
