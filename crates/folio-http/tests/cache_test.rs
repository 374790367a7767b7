//! The index is served from the page cache until the entry expires or is flushed

mod common;

use common::setup;
use folio_http::testing::TestClient;
use folio_http::{AppConfig, AppState};
use std::time::Duration;

#[tokio::test]
async fn test_deleted_post_stays_visible_until_cache_is_flushed() {
    let fixture = setup().await;
    let survivor = fixture.publish(&fixture.author, "Surviving post").await;
    let doomed = fixture.publish(&fixture.author, "Post about to vanish").await;

    let first = fixture.client.get("/").send().await.unwrap();
    assert_eq!(first.header("x-cache"), Some("MISS"));
    assert!(first.text().contains("Post about to vanish"));

    assert!(fixture.store().delete_post(doomed.id()).await.unwrap());

    let cached = fixture
        .client
        .get("/")
        .send()
        .await
        .unwrap()
        .assert_header("x-cache", "HIT");
    assert_eq!(cached.body(), first.body());

    fixture.client.state().page_cache.flush().await.unwrap();

    let fresh = fixture.client.get("/").send().await.unwrap();
    assert_eq!(fresh.header("x-cache"), Some("MISS"));
    assert_ne!(fresh.body(), first.body());
    assert!(!fresh.text().contains("Post about to vanish"));
    let first_item = &fresh.context()["page_obj"]["items"][0];
    assert_eq!(first_item["id"], survivor.id().get());
}

#[tokio::test]
async fn test_each_page_is_cached_separately() {
    let fixture = setup().await;
    let page_one = fixture.client.get("/").send().await.unwrap();
    let page_two = fixture.client.get("/?page=2").send().await.unwrap();
    assert_eq!(page_one.header("x-cache"), Some("MISS"));
    assert_eq!(page_two.header("x-cache"), Some("MISS"));

    fixture
        .client
        .get("/?page=2")
        .send()
        .await
        .unwrap()
        .assert_header("x-cache", "HIT");
}

#[tokio::test]
async fn test_other_pages_are_never_cached() {
    let fixture = setup().await;
    for _ in 0..2 {
        let response = fixture.client.get("/group/test_slug/").send().await.unwrap();
        assert_eq!(response.header("x-cache"), None);
    }
}

#[tokio::test]
async fn test_cached_page_expires() {
    let config = AppConfig {
        page_cache_ttl_secs: 1,
        ..AppConfig::default()
    };
    let client = TestClient::new(AppState::in_memory(config).unwrap());
    let store = client.state().store.clone();
    let author = store.create_user("auth").await.unwrap();

    let empty = client.get("/").send().await.unwrap();
    assert_eq!(empty.context()["page_obj"]["count"], 0);

    store
        .create_post(folio_store::NewPost {
            text: "Arrived late".to_string(),
            author_id: author.id,
            group_id: None,
            image: None,
        })
        .await
        .unwrap();
    client
        .get("/")
        .send()
        .await
        .unwrap()
        .assert_header("x-cache", "HIT");

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let fresh = client.get("/").send().await.unwrap();
    assert_eq!(fresh.header("x-cache"), Some("MISS"));
    assert_eq!(fresh.context()["page_obj"]["count"], 1);
}

#[tokio::test]
async fn test_signed_in_viewers_share_the_cached_index() {
    let fixture = setup().await;
    let anonymous = fixture.client.get("/").send().await.unwrap();
    let signed_in = fixture
        .author_client()
        .await
        .get("/")
        .send()
        .await
        .unwrap()
        .assert_header("x-cache", "HIT");
    assert_eq!(signed_in.body(), anonymous.body());

    let html = signed_in.text();
    assert!(!html.contains("Log in"));
    assert!(html.contains("href=\"/create/\""));
}

#[tokio::test]
async fn test_health_reports_page_cache_usage() {
    let fixture = setup().await;
    fixture.client.get("/").send().await.unwrap();
    fixture
        .client
        .get("/")
        .send()
        .await
        .unwrap()
        .assert_header("x-cache", "HIT");

    let health = fixture.client.get("/health").send().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(health.body()).unwrap();
    assert_eq!(body["cache"]["keys"], 1);
    assert_eq!(body["cache"]["hits"], 1);
    assert_eq!(body["cache"]["misses"], 1);
    assert_eq!(body["cache"]["hit_ratio"], 0.5);
}
