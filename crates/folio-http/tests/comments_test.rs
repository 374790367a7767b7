//! Leaving comments on posts

mod common;

use axum::http::StatusCode;
use common::setup;
use folio_store::Store;

#[tokio::test]
async fn test_comment_appears_on_detail() {
    let fixture = setup().await;
    let (commenter, client) = fixture.user_client("commenter").await;
    let post_id = fixture.post.id();

    client
        .post(format!("/posts/{}/comment/", post_id))
        .form(&[("text", "Great post!")])
        .send()
        .await
        .unwrap()
        .assert_redirects(&format!("/posts/{}/", post_id));

    assert_eq!(fixture.store().count_comments(post_id).await.unwrap(), 1);

    let detail = client
        .get(format!("/posts/{}/", post_id))
        .send()
        .await
        .unwrap()
        .assert_body_contains("Great post!");
    let comment = &detail.context()["comments"][0];
    assert_eq!(comment["text"], "Great post!");
    assert_eq!(comment["author"]["username"], commenter.username.as_str());
    assert_eq!(comment["post_id"], post_id.get());
}

#[tokio::test]
async fn test_invalid_comment_is_silently_dropped() {
    let fixture = setup().await;
    let (_, client) = fixture.user_client("commenter").await;
    let post_id = fixture.post.id();

    client
        .post(format!("/posts/{}/comment/", post_id))
        .form(&[("text", "   ")])
        .send()
        .await
        .unwrap()
        .assert_redirects(&format!("/posts/{}/", post_id));

    assert_eq!(fixture.store().count_comments(post_id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_anonymous_comment_is_not_saved() {
    let fixture = setup().await;
    let post_id = fixture.post.id();

    fixture
        .client
        .post(format!("/posts/{}/comment/", post_id))
        .form(&[("text", "Drive-by")])
        .send()
        .await
        .unwrap()
        .assert_status(StatusCode::FOUND);

    assert_eq!(fixture.store().count_comments(post_id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_comment_on_unknown_post_is_404() {
    let fixture = setup().await;
    let (_, client) = fixture.user_client("commenter").await;

    client
        .post("/posts/999999/comment/")
        .form(&[("text", "Hello?")])
        .send()
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_author_sees_edit_link() {
    let fixture = setup().await;
    let client = fixture.author_client().await;
    let detail = client
        .get(format!("/posts/{}/", fixture.post.id()))
        .send()
        .await
        .unwrap()
        .assert_body_contains(&format!("/posts/{}/edit/", fixture.post.id()));
    assert_eq!(detail.context()["can_edit"], true);
    assert_eq!(detail.context()["viewer"]["username"], "auth");
}
