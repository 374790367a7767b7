//! Shared fixtures for the HTTP integration tests
#![allow(dead_code)]

use folio_http::testing::TestClient;
use folio_http::{AppConfig, AppState};
use folio_store::{Group, NewGroup, NewPost, PostView, Store, User};

pub const POST_TEXT: &str = "Test post text that is longer than fifteen characters";

/// One author with one grouped post, plus an anonymous client
pub struct Fixture {
    pub client: TestClient,
    pub author: User,
    pub group: Group,
    pub post: PostView,
}

impl Fixture {
    pub fn store(&self) -> &dyn Store {
        self.client.state().store.as_ref()
    }

    pub async fn author_client(&self) -> TestClient {
        self.client.force_login(&self.author).await.unwrap()
    }

    pub async fn user_client(&self, username: &str) -> (User, TestClient) {
        let user = self.store().create_user(username).await.unwrap();
        let client = self.client.force_login(&user).await.unwrap();
        (user, client)
    }

    pub async fn publish(&self, author: &User, text: &str) -> PostView {
        self.store()
            .create_post(NewPost {
                text: text.to_string(),
                author_id: author.id,
                group_id: Some(self.group.id),
                image: None,
            })
            .await
            .unwrap()
    }
}

pub fn client() -> TestClient {
    TestClient::new(AppState::in_memory(AppConfig::default()).unwrap())
}

pub async fn setup() -> Fixture {
    let client = client();
    let store = client.state().store.clone();
    let author = store.create_user("auth").await.unwrap();
    let group = store
        .create_group(NewGroup::new("Test group", "test_slug", "Test description"))
        .await
        .unwrap();
    let post = store
        .create_post(NewPost {
            text: POST_TEXT.to_string(),
            author_id: author.id,
            group_id: Some(group.id),
            image: None,
        })
        .await
        .unwrap();
    Fixture {
        client,
        author,
        group,
        post,
    }
}
