//! In-memory store backend
//!
//! Keeps every table in ordered maps behind a single lock and reproduces the
//! relational cascade rules explicitly. Used by the test-suites and for local
//! development when no database is configured.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::models::{
    Comment, CommentId, CommentView, Follow, FollowId, Group, GroupId, NewComment, NewGroup,
    NewPost, Post, PostChanges, PostId, PostView, User, UserId,
};
use crate::store::{PostScope, Store};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    sessions: HashMap<String, UserId>,
    groups: BTreeMap<GroupId, Group>,
    posts: BTreeMap<PostId, Post>,
    comments: BTreeMap<CommentId, Comment>,
    follows: BTreeMap<FollowId, Follow>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn view(&self, post: &Post) -> StoreResult<PostView> {
        let author = self
            .users
            .get(&post.author_id)
            .cloned()
            .ok_or_else(|| StoreError::invalid_reference(format!("user {}", post.author_id)))?;
        let group = post.group_id.and_then(|id| self.groups.get(&id).cloned());
        Ok(PostView {
            post: post.clone(),
            author,
            group,
        })
    }

    fn in_scope(&self, post: &Post, scope: PostScope) -> bool {
        match scope {
            PostScope::All => true,
            PostScope::Group(group_id) => post.group_id == Some(group_id),
            PostScope::Author(author_id) => post.author_id == author_id,
            PostScope::FollowedBy(user_id) => self
                .follows
                .values()
                .any(|f| f.user_id == user_id && f.author_id == post.author_id),
        }
    }

    /// Posts in scope, newest first
    fn scoped(&self, scope: PostScope) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self
            .posts
            .values()
            .filter(|post| self.in_scope(post, scope))
            .collect();
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        posts
    }

    fn remove_post(&mut self, id: PostId) -> bool {
        let removed = self.posts.remove(&id).is_some();
        if removed {
            self.comments.retain(|_, c| c.post_id != id);
        }
        removed
    }
}

/// Store backend holding all data in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, username: &str) -> StoreResult<User> {
        let mut tables = self.tables.write();
        if tables.users.values().any(|u| u.username == username) {
            return Err(StoreError::conflict(format!("username '{}'", username)));
        }
        let user = User {
            id: UserId(tables.next_id()),
            username: username.to_string(),
        };
        tables.users.insert(user.id, user.clone());
        debug!("memory store created user {}", user.id);
        Ok(user)
    }

    async fn user_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables
            .read()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        let owned: Vec<PostId> = tables
            .posts
            .values()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        for post_id in owned {
            tables.remove_post(post_id);
        }
        tables.comments.retain(|_, c| c.author_id != id);
        tables
            .follows
            .retain(|_, f| f.user_id != id && f.author_id != id);
        tables.sessions.retain(|_, user_id| *user_id != id);
        debug!("memory store deleted user {} with cascade", id);
        Ok(true)
    }

    async fn create_session(&self, user_id: UserId) -> StoreResult<String> {
        let mut tables = self.tables.write();
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::invalid_reference(format!("user {}", user_id)));
        }
        let token = uuid::Uuid::new_v4().simple().to_string();
        tables.sessions.insert(token.clone(), user_id);
        Ok(token)
    }

    async fn session_user(&self, token: &str) -> StoreResult<Option<UserId>> {
        Ok(self.tables.read().sessions.get(token).copied())
    }

    async fn create_group(&self, group: NewGroup) -> StoreResult<Group> {
        let mut tables = self.tables.write();
        if tables.groups.values().any(|g| g.slug == group.slug) {
            return Err(StoreError::conflict(format!("group slug '{}'", group.slug)));
        }
        let group = Group {
            id: GroupId(tables.next_id()),
            title: group.title,
            slug: group.slug,
            description: group.description,
        };
        tables.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn group_by_slug(&self, slug: &str) -> StoreResult<Option<Group>> {
        Ok(self
            .tables
            .read()
            .groups
            .values()
            .find(|g| g.slug == slug)
            .cloned())
    }

    async fn group_by_id(&self, id: GroupId) -> StoreResult<Option<Group>> {
        Ok(self.tables.read().groups.get(&id).cloned())
    }

    async fn groups(&self) -> StoreResult<Vec<Group>> {
        let mut groups: Vec<Group> = self.tables.read().groups.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn delete_group(&self, id: GroupId) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        if tables.groups.remove(&id).is_none() {
            return Ok(false);
        }
        for post in tables.posts.values_mut() {
            if post.group_id == Some(id) {
                post.group_id = None;
            }
        }
        Ok(true)
    }

    async fn create_post(&self, post: NewPost) -> StoreResult<PostView> {
        let mut tables = self.tables.write();
        if !tables.users.contains_key(&post.author_id) {
            return Err(StoreError::invalid_reference(format!("user {}", post.author_id)));
        }
        if let Some(group_id) = post.group_id {
            if !tables.groups.contains_key(&group_id) {
                return Err(StoreError::invalid_reference(format!("group {}", group_id)));
            }
        }
        let post = Post {
            id: PostId(tables.next_id()),
            text: post.text,
            pub_date: Utc::now(),
            author_id: post.author_id,
            group_id: post.group_id,
            image: post.image,
        };
        tables.posts.insert(post.id, post.clone());
        tables.view(&post)
    }

    async fn post(&self, id: PostId) -> StoreResult<Option<PostView>> {
        let tables = self.tables.read();
        tables.posts.get(&id).map(|p| tables.view(p)).transpose()
    }

    async fn update_post(&self, id: PostId, changes: PostChanges) -> StoreResult<PostView> {
        let mut tables = self.tables.write();
        if let Some(group_id) = changes.group_id {
            if !tables.groups.contains_key(&group_id) {
                return Err(StoreError::invalid_reference(format!("group {}", group_id)));
            }
        }
        let post = tables
            .posts
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(format!("post {}", id)))?;
        post.text = changes.text;
        post.group_id = changes.group_id;
        if changes.image.is_some() {
            post.image = changes.image;
        }
        let post = post.clone();
        tables.view(&post)
    }

    async fn delete_post(&self, id: PostId) -> StoreResult<bool> {
        Ok(self.tables.write().remove_post(id))
    }

    async fn count_posts(&self, scope: PostScope) -> StoreResult<usize> {
        let tables = self.tables.read();
        Ok(tables
            .posts
            .values()
            .filter(|post| tables.in_scope(post, scope))
            .count())
    }

    async fn posts(
        &self,
        scope: PostScope,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<PostView>> {
        let tables = self.tables.read();
        tables
            .scoped(scope)
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|post| tables.view(post))
            .collect()
    }

    async fn create_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let mut tables = self.tables.write();
        if !tables.posts.contains_key(&comment.post_id) {
            return Err(StoreError::invalid_reference(format!("post {}", comment.post_id)));
        }
        if !tables.users.contains_key(&comment.author_id) {
            return Err(StoreError::invalid_reference(format!("user {}", comment.author_id)));
        }
        let comment = Comment {
            id: CommentId(tables.next_id()),
            post_id: comment.post_id,
            author_id: comment.author_id,
            text: comment.text,
            created: Utc::now(),
        };
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn comments_for(&self, post_id: PostId) -> StoreResult<Vec<CommentView>> {
        let tables = self.tables.read();
        tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .map(|c| {
                let author = tables.users.get(&c.author_id).cloned().ok_or_else(|| {
                    StoreError::invalid_reference(format!("user {}", c.author_id))
                })?;
                Ok(CommentView {
                    comment: c.clone(),
                    author,
                })
            })
            .collect()
    }

    async fn count_comments(&self, post_id: PostId) -> StoreResult<usize> {
        Ok(self
            .tables
            .read()
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .count())
    }

    async fn follow_exists(&self, user_id: UserId, author_id: UserId) -> StoreResult<bool> {
        Ok(self
            .tables
            .read()
            .follows
            .values()
            .any(|f| f.user_id == user_id && f.author_id == author_id))
    }

    async fn insert_follow(&self, user_id: UserId, author_id: UserId) -> StoreResult<bool> {
        if user_id == author_id {
            return Err(StoreError::invalid_reference("a user cannot follow themselves"));
        }
        let mut tables = self.tables.write();
        for id in [user_id, author_id] {
            if !tables.users.contains_key(&id) {
                return Err(StoreError::invalid_reference(format!("user {}", id)));
            }
        }
        if tables
            .follows
            .values()
            .any(|f| f.user_id == user_id && f.author_id == author_id)
        {
            return Ok(false);
        }
        let follow = Follow {
            id: FollowId(tables.next_id()),
            user_id,
            author_id,
        };
        tables.follows.insert(follow.id, follow);
        Ok(true)
    }

    async fn delete_follows(&self, user_id: UserId, author_id: UserId) -> StoreResult<usize> {
        let mut tables = self.tables.write();
        let before = tables.follows.len();
        tables
            .follows
            .retain(|_, f| !(f.user_id == user_id && f.author_id == author_id));
        Ok(before - tables.follows.len())
    }

    async fn count_follows(&self) -> StoreResult<usize> {
        Ok(self.tables.read().follows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryStore, User, Group) {
        let store = MemoryStore::new();
        let user = store.create_user("auth").await.unwrap();
        let group = store
            .create_group(NewGroup::new("Test group", "test_slug", "Test description"))
            .await
            .unwrap();
        (store, user, group)
    }

    #[tokio::test]
    async fn test_usernames_and_slugs_are_unique() {
        let (store, _, _) = seeded().await;
        assert!(matches!(
            store.create_user("auth").await,
            Err(StoreError::Conflict(_))
        ));
        assert!(matches!(
            store
                .create_group(NewGroup::new("Other", "test_slug", "Other"))
                .await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_posts_are_listed_newest_first() {
        let (store, user, _) = seeded().await;
        for i in 1..=3 {
            store
                .create_post(NewPost {
                    text: format!("post {}", i),
                    author_id: user.id,
                    group_id: None,
                    image: None,
                })
                .await
                .unwrap();
        }
        let posts = store.posts(PostScope::All, 0, 10).await.unwrap();
        let texts: Vec<&str> = posts.iter().map(|p| p.text()).collect();
        assert_eq!(texts, vec!["post 3", "post 2", "post 1"]);

        let window = store.posts(PostScope::All, 1, 1).await.unwrap();
        assert_eq!(window[0].text(), "post 2");
    }

    #[tokio::test]
    async fn test_update_keeps_author_and_pub_date() {
        let (store, user, group) = seeded().await;
        let created = store
            .create_post(NewPost {
                text: "before".to_string(),
                author_id: user.id,
                group_id: None,
                image: Some("posts/a.gif".to_string()),
            })
            .await
            .unwrap();

        let updated = store
            .update_post(
                created.id(),
                PostChanges {
                    text: "after".to_string(),
                    group_id: Some(group.id),
                    image: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.post.text, "after");
        assert_eq!(updated.post.pub_date, created.post.pub_date);
        assert_eq!(updated.post.author_id, user.id);
        assert_eq!(updated.post.image.as_deref(), Some("posts/a.gif"));
        assert_eq!(updated.group.map(|g| g.slug), Some("test_slug".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_references_are_rejected() {
        let (store, user, _) = seeded().await;
        let err = store
            .create_post(NewPost {
                text: "text".to_string(),
                author_id: user.id,
                group_id: Some(GroupId(999)),
                image: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidReference(_)));

        let err = store
            .create_comment(NewComment {
                post_id: PostId(999),
                author_id: user.id,
                text: "hi".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidReference(_)));
    }

    #[tokio::test]
    async fn test_sessions_resolve_to_users() {
        let (store, user, _) = seeded().await;
        let token = store.create_session(user.id).await.unwrap();
        assert_eq!(store.session_user(&token).await.unwrap(), Some(user.id));
        assert_eq!(store.session_user("bogus").await.unwrap(), None);

        store.delete_user(user.id).await.unwrap();
        assert_eq!(store.session_user(&token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_follow_edges_are_unique_per_pair() {
        let store = MemoryStore::new();
        let a = store.create_user("a").await.unwrap();
        let b = store.create_user("b").await.unwrap();

        assert!(store.insert_follow(a.id, b.id).await.unwrap());
        assert!(!store.insert_follow(a.id, b.id).await.unwrap());
        assert!(store.insert_follow(a.id, a.id).await.is_err());
        assert_eq!(store.count_follows().await.unwrap(), 1);

        assert_eq!(store.delete_follows(a.id, b.id).await.unwrap(), 1);
        assert_eq!(store.delete_follows(a.id, b.id).await.unwrap(), 0);
    }
}
