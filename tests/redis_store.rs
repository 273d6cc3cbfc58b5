// These tests need a Redis server reachable through REDIS_URL.
// Run them with `cargo test -- --ignored`.

use std::time::Duration;

use dotenv::dotenv;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use taskfolio::auth::{RedisSessionStore, SessionError, SessionStore};
use uuid::Uuid;

const TTL: Duration = Duration::from_secs(60);

fn redis_url() -> String {
    dotenv().ok();
    std::env::var("REDIS_URL").expect("REDIS_URL must be set for tests")
}

async fn setup_store(max_sessions: usize) -> (RedisSessionStore, ConnectionManager) {
    let url = redis_url();
    let store = RedisSessionStore::connect(&url, max_sessions)
        .await
        .expect("Failed to connect to test Redis");
    let client = redis::Client::open(url).expect("Invalid REDIS_URL");
    let conn = ConnectionManager::new(client)
        .await
        .expect("Failed to connect to test Redis");
    (store, conn)
}

// Subjects and token ids are unique per run so tests never share keys.
fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

async fn index_size(conn: &mut ConnectionManager, subject: &str) -> u64 {
    conn.scard(format!("refresh_sessions:{}", subject))
        .await
        .expect("SCARD failed")
}

#[ignore]
#[actix_rt::test]
async fn test_sixth_put_evicts_exactly_one() {
    let (store, mut conn) = setup_store(5).await;
    let subject = unique("capped");
    let bystander = unique("bystander");

    let bystander_id = unique("b");
    store
        .put(&bystander, &bystander_id, "tok-b", TTL)
        .await
        .unwrap();

    let ids: Vec<String> = (0..6).map(|i| unique(&format!("t{}", i))).collect();
    for id in &ids {
        store.put(&subject, id, "tok", TTL).await.unwrap();
    }

    assert_eq!(index_size(&mut conn, &subject).await, 5);
    let mut live = 0;
    for id in &ids {
        match store.get(id).await {
            Ok(token) => {
                assert_eq!(token, "tok");
                live += 1;
            }
            Err(e) => assert_eq!(e, SessionError::NotFound),
        }
    }
    assert_eq!(live, 5);
    assert!(store.get(ids.last().unwrap()).await.is_ok());

    assert_eq!(index_size(&mut conn, &bystander).await, 1);
    assert_eq!(store.get(&bystander_id).await.unwrap(), "tok-b");
}

#[ignore]
#[actix_rt::test]
async fn test_delete_reports_count_and_unindexes() {
    let (store, mut conn) = setup_store(5).await;
    let subject = unique("leaver");
    let id = unique("t");
    store.put(&subject, &id, "tok", TTL).await.unwrap();

    assert_eq!(store.delete(&id).await.unwrap(), 1);
    assert_eq!(store.delete(&id).await.unwrap(), 0);
    assert_eq!(store.get(&id).await, Err(SessionError::NotFound));
    assert_eq!(index_size(&mut conn, &subject).await, 0);
}

#[ignore]
#[actix_rt::test]
async fn test_expired_members_are_pruned_before_counting() {
    let (store, mut conn) = setup_store(2).await;
    let subject = unique("pruned");
    let (x, y, z) = (unique("x"), unique("y"), unique("z"));

    store
        .put(&subject, &x, "tok-x", Duration::from_secs(1))
        .await
        .unwrap();
    store.put(&subject, &y, "tok-y", TTL).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    // "x" has expired but is still in the index; it must not cost "y" its slot.
    store.put(&subject, &z, "tok-z", TTL).await.unwrap();

    assert_eq!(store.get(&y).await.unwrap(), "tok-y");
    assert_eq!(store.get(&z).await.unwrap(), "tok-z");
    assert_eq!(store.get(&x).await, Err(SessionError::NotFound));
    assert_eq!(index_size(&mut conn, &subject).await, 2);
}

#[ignore]
#[actix_rt::test]
async fn test_delete_subject_removes_every_session() {
    let (store, mut conn) = setup_store(5).await;
    let subject = unique("departing");
    let other = unique("staying");
    let ids = [unique("a"), unique("b")];
    for id in &ids {
        store.put(&subject, id, "tok", TTL).await.unwrap();
    }
    let kept = unique("k");
    store.put(&other, &kept, "tok", TTL).await.unwrap();

    assert_eq!(store.delete_subject(&subject).await.unwrap(), 2);
    assert_eq!(store.delete_subject(&subject).await.unwrap(), 0);
    for id in &ids {
        assert_eq!(store.get(id).await, Err(SessionError::NotFound));
    }
    assert_eq!(index_size(&mut conn, &subject).await, 0);
    assert!(store.get(&kept).await.is_ok());
}
