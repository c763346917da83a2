use holdings_sync::{HoldingRecord, LocalCache, SqliteHoldingCache};

fn record(symbol: &str, quantity: i64) -> HoldingRecord {
    HoldingRecord::new(symbol, quantity, 100.0, 110.0, 105.0)
}

#[tokio::test]
async fn put_replaces_the_whole_set() {
    let cache = SqliteHoldingCache::open_in_memory().expect("Failed to open cache");

    cache
        .put(&[record("A", 1), record("B", 2)])
        .await
        .expect("Failed to write holdings");
    cache.put(&[record("A", 3)]).await.expect("Failed to write holdings");

    let cached = cache.observe().await.expect("Failed to read holdings");
    assert_eq!(cached, vec![record("A", 3)]);
}

#[tokio::test]
async fn snapshot_keeps_insertion_order() {
    let cache = SqliteHoldingCache::open_in_memory().expect("Failed to open cache");
    let holdings = vec![record("ZOMATO", 1), record("ASIANPAINT", 2), record("MRF", 3)];

    cache.put(&holdings).await.expect("Failed to write holdings");

    assert_eq!(cache.observe().await.unwrap(), holdings);
}

#[tokio::test]
async fn clear_empties_the_cache() {
    let cache = SqliteHoldingCache::open_in_memory().expect("Failed to open cache");
    cache.put(&[record("A", 1)]).await.unwrap();

    cache.clear().await.expect("Failed to clear holdings");

    assert!(cache.observe().await.unwrap().is_empty());
}

#[tokio::test]
async fn contents_survive_reopen() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("holdings.sqlite");

    {
        let cache = SqliteHoldingCache::open(&path).expect("Failed to open cache");
        cache.put(&[record("TCS", 10)]).await.unwrap();
    }

    let reopened = SqliteHoldingCache::open(&path).expect("Failed to reopen cache");
    assert_eq!(reopened.observe().await.unwrap(), vec![record("TCS", 10)]);
    assert_eq!(*reopened.subscribe().borrow(), vec![record("TCS", 10)]);
}

#[tokio::test]
async fn subscribers_see_every_write() {
    let cache = SqliteHoldingCache::open_in_memory().unwrap();
    let mut live = cache.subscribe();
    assert!(live.borrow_and_update().is_empty());

    cache.put(&[record("A", 1)]).await.unwrap();
    live.changed().await.unwrap();
    assert_eq!(*live.borrow_and_update(), vec![record("A", 1)]);

    cache.clear().await.unwrap();
    live.changed().await.unwrap();
    assert!(live.borrow_and_update().is_empty());
}
