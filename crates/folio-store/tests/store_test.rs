//! Cascade and ordering behaviour of the in-memory backend

use folio_store::{
    GroupId, MemoryStore, NewComment, NewGroup, NewPost, PostChanges, PostId, PostScope,
    PostView, Store, User,
};

async fn post_as(store: &MemoryStore, author: &User, text: &str, group: Option<GroupId>) -> PostView {
    store
        .create_post(NewPost {
            text: text.to_string(),
            author_id: author.id,
            group_id: group,
            image: None,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn deleting_a_user_removes_everything_they_own() {
    let store = MemoryStore::new();
    let leo = store.create_user("leo").await.unwrap();
    let auth = store.create_user("auth").await.unwrap();

    let own = post_as(&store, &leo, "leo's post", None).await;
    let other = post_as(&store, &auth, "auth's post", None).await;
    store
        .create_comment(NewComment {
            post_id: other.id(),
            author_id: leo.id,
            text: "nice".to_string(),
        })
        .await
        .unwrap();
    store
        .create_comment(NewComment {
            post_id: own.id(),
            author_id: auth.id,
            text: "mine".to_string(),
        })
        .await
        .unwrap();
    store.insert_follow(leo.id, auth.id).await.unwrap();
    store.insert_follow(auth.id, leo.id).await.unwrap();

    assert!(store.delete_user(leo.id).await.unwrap());

    assert!(store.post(own.id()).await.unwrap().is_none());
    assert_eq!(store.count_comments(other.id()).await.unwrap(), 0);
    assert_eq!(store.count_follows().await.unwrap(), 0);
    assert_eq!(store.count_posts(PostScope::All).await.unwrap(), 1);
    assert!(!store.delete_user(leo.id).await.unwrap());
}

#[tokio::test]
async fn deleting_a_post_removes_its_comments() {
    let store = MemoryStore::new();
    let auth = store.create_user("auth").await.unwrap();
    let post = post_as(&store, &auth, "text", None).await;
    store
        .create_comment(NewComment {
            post_id: post.id(),
            author_id: auth.id,
            text: "first".to_string(),
        })
        .await
        .unwrap();

    assert!(store.delete_post(post.id()).await.unwrap());
    assert!(store.comments_for(post.id()).await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_a_group_detaches_its_posts() {
    let store = MemoryStore::new();
    let auth = store.create_user("auth").await.unwrap();
    let group = store
        .create_group(NewGroup::new("Cats", "cats", "About cats"))
        .await
        .unwrap();
    let post = post_as(&store, &auth, "meow", Some(group.id)).await;
    assert_eq!(post.group.as_ref().map(|g| g.id), Some(group.id));

    assert!(store.delete_group(group.id).await.unwrap());

    let post = store.post(post.id()).await.unwrap().unwrap();
    assert_eq!(post.post.group_id, None);
    assert!(post.group.is_none());
    assert_eq!(
        store.count_posts(PostScope::Group(group.id)).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn scopes_select_the_right_posts() {
    let store = MemoryStore::new();
    let auth = store.create_user("auth").await.unwrap();
    let other = store.create_user("other").await.unwrap();
    let reader = store.create_user("reader").await.unwrap();
    let group = store
        .create_group(NewGroup::new("Group", "group", "Description"))
        .await
        .unwrap();

    post_as(&store, &auth, "in group", Some(group.id)).await;
    post_as(&store, &auth, "no group", None).await;
    post_as(&store, &other, "by other", None).await;
    store.insert_follow(reader.id, other.id).await.unwrap();

    assert_eq!(store.count_posts(PostScope::All).await.unwrap(), 3);
    assert_eq!(store.count_posts(PostScope::Group(group.id)).await.unwrap(), 1);
    assert_eq!(store.count_posts(PostScope::Author(auth.id)).await.unwrap(), 2);

    let feed = store
        .posts(PostScope::FollowedBy(reader.id), 0, 10)
        .await
        .unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].author.username, "other");
}

#[tokio::test]
async fn comments_keep_insertion_order_and_authors() {
    let store = MemoryStore::new();
    let auth = store.create_user("auth").await.unwrap();
    let guest = store.create_user("guest").await.unwrap();
    let post = post_as(&store, &auth, "text", None).await;

    for (author, text) in [(&auth, "one"), (&guest, "two")] {
        store
            .create_comment(NewComment {
                post_id: post.id(),
                author_id: author.id,
                text: text.to_string(),
            })
            .await
            .unwrap();
    }

    let comments = store.comments_for(post.id()).await.unwrap();
    let rendered: Vec<(&str, &str)> = comments
        .iter()
        .map(|c| (c.author.username.as_str(), c.comment.text.as_str()))
        .collect();
    assert_eq!(rendered, vec![("auth", "one"), ("guest", "two")]);
}

#[tokio::test]
async fn updating_a_missing_post_is_not_found() {
    let store = MemoryStore::new();
    let err = store
        .update_post(
            PostId(77),
            PostChanges {
                text: "x".to_string(),
                group_id: None,
                image: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "RECORD_NOT_FOUND");
}
