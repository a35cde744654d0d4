use async_trait::async_trait;
use recordlayer::{
    bson::{Document, doc},
    memory::{InMemoryConnector, InMemoryStore},
    prelude::*,
};

const DB: &str = "chess";
const COLL: &str = "datasets";


fn manager() -> ConnectionManager<InMemoryConnector> {
    ConnectionManager::new("memory://test", InMemoryConnector::new())
}

fn record(document: Document) -> Record {
    Record::from(document)
}

fn datasets(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.get_string_value("dataset"))
        .collect()
}

/// A session whose every round trip fails.
#[derive(Debug, Clone)]
struct FailingSession;

#[async_trait]
impl StoreSession for FailingSession {
    async fn find(&self, _: &str, _: &str, _: &Document, _: &FindOptions) -> RecordStoreResult<Vec<Document>> {
        Err(RecordStoreError::Backend("no reachable servers".into()))
    }

    async fn insert(&self, _: &str, _: &str, _: Document) -> RecordStoreResult<()> {
        Err(RecordStoreError::Backend("no reachable servers".into()))
    }

    async fn update(&self, _: &str, _: &str, _: &Document, _: Document) -> RecordStoreResult<()> {
        Err(RecordStoreError::Backend("no reachable servers".into()))
    }

    async fn upsert(&self, _: &str, _: &str, _: &Document, _: Document) -> RecordStoreResult<()> {
        Err(RecordStoreError::Backend("no reachable servers".into()))
    }

    async fn count(&self, _: &str, _: &str, _: &Document) -> RecordStoreResult<u64> {
        Err(RecordStoreError::Backend("no reachable servers".into()))
    }

    async fn remove(&self, _: &str, _: &str, _: &Document) -> RecordStoreResult<u64> {
        Err(RecordStoreError::Backend("no reachable servers".into()))
    }
}

#[derive(Debug)]
struct FailingConnector;

#[async_trait]
impl StoreConnector for FailingConnector {
    type Session = FailingSession;

    async fn dial(&self, _: &str) -> RecordStoreResult<Self::Session> {
        Ok(FailingSession)
    }
}

#[tokio::test]
async fn insert_skips_rejected_records() {
    let store = InMemoryStore::new();
    store.add_unique_index(DB, COLL, "name").await.unwrap();
    let manager = ConnectionManager::new("memory://", InMemoryConnector::with_store(store));
    let coll = manager.collection(DB, COLL);

    coll.insert(vec![
        record(doc! { "dataset": "/a", "name": "x" }),
        record(doc! { "dataset": "/b", "name": "x" }),
        record(doc! { "dataset": "/c", "name": "z" }),
    ])
    .await;

    let mut found = datasets(&coll.get(&doc! {}, 0, 0).await);
    found.sort();
    assert_eq!(found, vec!["/a", "/c"]);
    assert_eq!(datasets(&coll.get(&doc! { "name": "x" }, 0, 0).await), vec!["/a"]);
}

#[tokio::test]
async fn dotted_filters_match_any_element_of_a_sequence() {
    let manager = manager();
    let coll = manager.collection(DB, COLL);

    coll.insert(vec![record(doc! {
        "dataset": "/a",
        "sites": [ { "name": "T1_US" }, { "name": "T2_CH" } ],
    })])
    .await;

    assert_eq!(coll.count(&doc! { "sites.name": "T1_US" }).await, 1);
    assert_eq!(coll.count(&doc! { "sites.name": "T2_CH" }).await, 1);
    assert_eq!(coll.count(&doc! { "sites.name": "T3_IT" }).await, 0);

    let found = coll.get(&doc! { "sites.name": "T2_CH" }, 0, 0).await;
    assert_eq!(found[0].get_string_value("sites.name"), "T1_US");
}

#[tokio::test]
async fn upsert_replaces_by_dataset() {
    let manager = manager();
    let coll = manager.collection(DB, COLL);

    coll.upsert(vec![record(doc! { "dataset": "/a/b/c", "size": 1 })]).await.unwrap();
    coll.upsert(vec![record(doc! { "dataset": "/a/b/c", "size": 2 })]).await.unwrap();

    let found = coll.get(&doc! { "dataset": "/a/b/c" }, 0, 0).await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get_int_value("size").unwrap(), 2);
}

#[tokio::test]
async fn upsert_skips_records_without_dataset() {
    let manager = manager();
    let coll = manager.collection(DB, COLL);

    let result = coll
        .upsert(vec![
            record(doc! { "size": 1 }),
            record(doc! { "dataset": "", "size": 2 }),
            record(doc! { "dataset": 7, "size": 3 }),
            record(doc! { "dataset": "/x", "size": 4 }),
        ])
        .await;

    assert!(result.is_ok());
    assert_eq!(coll.count(&doc! {}).await, 1);
}

#[tokio::test]
async fn upsert_stops_at_first_error() {
    let store = InMemoryStore::new();
    store.add_unique_index(DB, COLL, "name").await.unwrap();
    let manager = ConnectionManager::new("memory://", InMemoryConnector::with_store(store));
    let coll = manager.collection(DB, COLL);

    let result = coll
        .upsert(vec![
            record(doc! { "dataset": "/a", "name": "x" }),
            record(doc! { "dataset": "/b", "name": "x" }),
            record(doc! { "dataset": "/c", "name": "z" }),
        ])
        .await;

    assert!(matches!(result, Err(RecordStoreError::DuplicateKey(_, _))));
    assert_eq!(coll.count(&doc! { "dataset": "/a" }).await, 1);
    assert_eq!(coll.count(&doc! { "dataset": "/c" }).await, 0);
}

#[tokio::test]
async fn get_applies_offset_and_limit() {
    let manager = manager();
    let coll = manager.collection(DB, COLL);

    coll.insert((0..5).map(|i| record(doc! { "dataset": format!("/d{}", i) })).collect()).await;

    assert_eq!(coll.get(&doc! {}, 0, 0).await.len(), 5);
    assert_eq!(datasets(&coll.get(&doc! {}, 1, 2).await), vec!["/d1", "/d2"]);
    assert_eq!(datasets(&coll.get(&doc! {}, 3, 0).await), vec!["/d3", "/d4"]);
    assert!(coll.get(&doc! {}, 10, 0).await.is_empty());
}

#[tokio::test]
async fn get_sorted_orders_by_keys() {
    let manager = manager();
    let coll = manager.collection(DB, COLL);

    coll.insert(vec![
        record(doc! { "dataset": "/b", "size": 1 }),
        record(doc! { "dataset": "/a", "size": 1 }),
        record(doc! { "dataset": "/c", "size": 9 }),
    ])
    .await;

    let found = coll.get_sorted(&doc! {}, &["-size", "dataset"]).await;

    assert_eq!(datasets(&found), vec!["/c", "/a", "/b"]);
}

#[tokio::test]
async fn get_sorted_falls_back_to_unsorted_fetch() {
    let manager = manager();
    let coll = manager.collection(DB, COLL);

    coll.insert(vec![
        record(doc! { "dataset": "/b", "size": 1 }),
        record(doc! { "dataset": "/a", "size": 2 }),
    ])
    .await;

    let expected = datasets(&coll.get(&doc! {}, 0, 0).await);

    for key in ["", "-", "$bad"] {
        let mut found = datasets(&coll.get_sorted(&doc! {}, &[key]).await);
        let mut wanted = expected.clone();
        found.sort();
        wanted.sort();
        assert_eq!(found, wanted, "sort key {:?}", key);
    }
}

#[tokio::test]
async fn get_sorted_reports_an_error_record_when_the_store_fails() {
    let manager = ConnectionManager::new("failing://", FailingConnector);
    let coll = manager.collection(DB, COLL);

    let found = coll.get_sorted(&doc! {}, &["size"]).await;

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get_int_value("code").unwrap(), 2);
    assert_eq!(found[0].get_string_value("type"), "MongoDB error");
    assert!(!found[0].get_string_value("error").is_empty());
}

#[tokio::test]
async fn failing_store_degrades_quietly() {
    let manager = ConnectionManager::new("failing://", FailingConnector);
    let coll = manager.collection(DB, COLL);

    coll.insert(vec![record(doc! { "dataset": "/a" })]).await;
    coll.update(&doc! { "dataset": "/a" }, doc! { "$set": { "size": 1 } }).await;
    coll.remove(&doc! {}).await;

    assert!(coll.get(&doc! {}, 0, 0).await.is_empty());
    assert_eq!(coll.count(&doc! {}).await, 0);
    assert!(matches!(
        coll.upsert(vec![record(doc! { "dataset": "/a" })]).await,
        Err(RecordStoreError::Backend(_))
    ));
}

#[tokio::test]
async fn update_applies_operators_and_replacements() {
    let manager = manager();
    let coll = manager.collection(DB, COLL);

    coll.insert(vec![record(doc! { "dataset": "/a", "size": 1, "tier": "T1" })]).await;

    coll.update(&doc! { "dataset": "/a" }, doc! { "$set": { "size": 2 } }).await;
    let found = coll.get(&doc! { "dataset": "/a" }, 0, 0).await;
    assert_eq!(found[0].get_int_value("size").unwrap(), 2);
    assert_eq!(found[0].get_string_value("tier"), "T1");

    coll.update(&doc! { "dataset": "/a" }, doc! { "dataset": "/a", "size": 3 }).await;
    let found = coll.get(&doc! { "dataset": "/a" }, 0, 0).await;
    assert_eq!(found[0].get_int_value("size").unwrap(), 3);
    assert_eq!(found[0].get_string_value("tier"), "");

    // No match is logged only
    coll.update(&doc! { "dataset": "/missing" }, doc! { "$set": { "size": 4 } }).await;
    assert_eq!(coll.count(&doc! {}).await, 1);
}

#[tokio::test]
async fn remove_deletes_matches_and_ignores_misses() {
    let manager = manager();
    let coll = manager.collection(DB, COLL);

    coll.insert(vec![
        record(doc! { "dataset": "/a", "tier": "T1" }),
        record(doc! { "dataset": "/b", "tier": "T2" }),
    ])
    .await;

    coll.remove(&doc! { "tier": "T3" }).await;
    assert_eq!(coll.count(&doc! {}).await, 2);

    coll.remove(&doc! { "tier": "T1" }).await;
    assert_eq!(datasets(&coll.get(&doc! {}, 0, 0).await), vec!["/b"]);
}

#[tokio::test]
async fn records_round_trip_through_the_store() {
    let manager = manager();
    let coll = manager.collection(DB, COLL);

    let body = r#"{"dataset": "/a/b/c", "run": {"number": 7, "lumis": [{"id": 5000000000}]}}"#;
    coll.upsert(vec![Record::from_json(body).unwrap()]).await.unwrap();

    let found = coll.get(&doc! { "run.number": 7 }, 0, 1).await;
    assert_eq!(found.len(), 1);

    let stored = &found[0];
    assert_eq!(stored.get_int_value("run.number").unwrap(), 7);
    assert_eq!(stored.get_int64_value("run.lumis.id").unwrap(), 5_000_000_000);
    assert!(matches!(
        stored.get_int_value("run.lumis.id"),
        Err(RecordStoreError::TypeMismatch { .. })
    ));
    assert_eq!(stored.get_string_value("run.missing"), "");
    assert!(stored.to_json().unwrap().contains("\"_id\""));
    assert!(!stored.to_string().contains("_id"));
}
