//! Which template each address renders and who gets redirected where

mod common;

use axum::http::StatusCode;
use common::setup;

#[tokio::test]
async fn test_public_pages_render_their_templates() {
    let fixture = setup().await;
    let pages = [
        ("/".to_string(), "posts/index.html"),
        (format!("/group/{}/", fixture.group.slug), "posts/group_list.html"),
        (format!("/profile/{}/", fixture.author.username), "posts/profile.html"),
        (format!("/posts/{}/", fixture.post.id()), "posts/post_detail.html"),
        ("/about/author/".to_string(), "about/author.html"),
        ("/about/tech/".to_string(), "about/tech.html"),
    ];

    for (path, template) in pages {
        fixture
            .client
            .get(path.as_str())
            .send()
            .await
            .unwrap()
            .assert_status(StatusCode::OK)
            .assert_template(template);
    }
}

#[tokio::test]
async fn test_private_pages_render_for_signed_in_users() {
    let fixture = setup().await;
    let client = fixture.author_client().await;

    client
        .get("/create/")
        .send()
        .await
        .unwrap()
        .assert_status(StatusCode::OK)
        .assert_template("posts/create_post.html");
    client
        .get(format!("/posts/{}/edit/", fixture.post.id()))
        .send()
        .await
        .unwrap()
        .assert_status(StatusCode::OK)
        .assert_template("posts/create_post.html");
    client
        .get("/follow/")
        .send()
        .await
        .unwrap()
        .assert_status(StatusCode::OK)
        .assert_template("posts/follow.html");
}

#[tokio::test]
async fn test_unknown_page_is_404_with_custom_template() {
    let fixture = setup().await;
    let response = fixture
        .client
        .get("/unexisting_page/")
        .send()
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND)
        .assert_template("core/404.html")
        .assert_body_contains("/unexisting_page/");
    assert_eq!(
        response.header("content-type"),
        Some("text/html; charset=utf-8")
    );
}

#[tokio::test]
async fn test_unknown_objects_are_404() {
    let fixture = setup().await;
    for path in [
        "/group/no_such_group/",
        "/profile/nobody/",
        "/posts/999999/",
        "/posts/not-a-number/",
        "/posts/999999/edit/",
    ] {
        fixture
            .client
            .get(path)
            .send()
            .await
            .unwrap()
            .assert_status(StatusCode::NOT_FOUND)
            .assert_template("core/404.html");
    }
}

#[tokio::test]
async fn test_anonymous_is_sent_to_login() {
    let fixture = setup().await;
    let post_id = fixture.post.id();

    fixture
        .client
        .get("/create/")
        .send()
        .await
        .unwrap()
        .assert_redirects("/auth/login/?next=/create/");
    fixture
        .client
        .get("/follow/")
        .send()
        .await
        .unwrap()
        .assert_redirects("/auth/login/?next=/follow/");
    fixture
        .client
        .get("/profile/auth/follow/")
        .send()
        .await
        .unwrap()
        .assert_redirects("/auth/login/?next=/profile/auth/follow/");
    fixture
        .client
        .get("/profile/auth/unfollow/")
        .send()
        .await
        .unwrap()
        .assert_redirects("/auth/login/?next=/profile/auth/unfollow/");
    fixture
        .client
        .post(format!("/posts/{}/comment/", post_id))
        .form(&[("text", "hello")])
        .send()
        .await
        .unwrap()
        .assert_redirects(&format!("/auth/login/?next=/posts/{}/comment/", post_id));
}

#[tokio::test]
async fn test_edit_by_anyone_but_the_author_goes_to_detail() {
    let fixture = setup().await;
    let detail = format!("/posts/{}/", fixture.post.id());
    let edit = format!("/posts/{}/edit/", fixture.post.id());

    fixture
        .client
        .get(edit.as_str())
        .send()
        .await
        .unwrap()
        .assert_redirects(&detail);

    let (_, stranger) = fixture.user_client("stranger").await;
    stranger
        .get(edit.as_str())
        .send()
        .await
        .unwrap()
        .assert_redirects(&detail);
}

#[tokio::test]
async fn test_invalid_session_is_anonymous() {
    let fixture = setup().await;
    fixture
        .client
        .clone()
        .with_session("forged-token")
        .get("/create/")
        .send()
        .await
        .unwrap()
        .assert_redirects("/auth/login/?next=/create/");
}

#[tokio::test]
async fn test_health() {
    let fixture = setup().await;
    let response = fixture
        .client
        .get("/health")
        .send()
        .await
        .unwrap()
        .assert_status(StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "ok");
}
