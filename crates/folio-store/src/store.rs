//! The storage capability every backend implements

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::models::{
    CommentView, Group, GroupId, NewComment, NewGroup, NewPost, Comment, PostChanges, PostId,
    PostView, User, UserId,
};

/// Which posts a listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    /// Every post
    All,
    /// Posts filed under one group
    Group(GroupId),
    /// Posts written by one author
    Author(UserId),
    /// Posts written by any author the given user follows
    FollowedBy(UserId),
}

/// Relational storage for users, groups, posts, comments and follow edges.
///
/// Listings are always ordered newest-first (`pub_date` descending, then id
/// descending). Deleting a user cascades to their posts, comments, follow
/// edges and sessions; deleting a post cascades to its comments; deleting a
/// group detaches its posts.
#[async_trait]
pub trait Store: Send + Sync {
    // Users and sessions

    async fn create_user(&self, username: &str) -> StoreResult<User>;

    async fn user_by_id(&self, id: UserId) -> StoreResult<Option<User>>;

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Remove a user and everything they own; returns whether the user existed
    async fn delete_user(&self, id: UserId) -> StoreResult<bool>;

    /// Open a session for a user and return its opaque token
    async fn create_session(&self, user_id: UserId) -> StoreResult<String>;

    /// Resolve a session token; unknown tokens resolve to `None`
    async fn session_user(&self, token: &str) -> StoreResult<Option<UserId>>;

    // Groups

    async fn create_group(&self, group: NewGroup) -> StoreResult<Group>;

    async fn group_by_slug(&self, slug: &str) -> StoreResult<Option<Group>>;

    async fn group_by_id(&self, id: GroupId) -> StoreResult<Option<Group>>;

    /// All groups ordered by title
    async fn groups(&self) -> StoreResult<Vec<Group>>;

    async fn delete_group(&self, id: GroupId) -> StoreResult<bool>;

    // Posts

    async fn create_post(&self, post: NewPost) -> StoreResult<PostView>;

    async fn post(&self, id: PostId) -> StoreResult<Option<PostView>>;

    /// Apply an edit; author and publication date are never touched
    async fn update_post(&self, id: PostId, changes: PostChanges) -> StoreResult<PostView>;

    async fn delete_post(&self, id: PostId) -> StoreResult<bool>;

    async fn count_posts(&self, scope: PostScope) -> StoreResult<usize>;

    /// A newest-first window of the posts in `scope`
    async fn posts(&self, scope: PostScope, offset: usize, limit: usize)
        -> StoreResult<Vec<PostView>>;

    // Comments

    async fn create_comment(&self, comment: NewComment) -> StoreResult<Comment>;

    /// Comments on a post in insertion order
    async fn comments_for(&self, post_id: PostId) -> StoreResult<Vec<CommentView>>;

    async fn count_comments(&self, post_id: PostId) -> StoreResult<usize>;

    // Follow edges

    async fn follow_exists(&self, user_id: UserId, author_id: UserId) -> StoreResult<bool>;

    /// Insert the edge unless it already exists; returns whether a row was added
    async fn insert_follow(&self, user_id: UserId, author_id: UserId) -> StoreResult<bool>;

    /// Remove every edge for the ordered pair; returns the number removed
    async fn delete_follows(&self, user_id: UserId, author_id: UserId) -> StoreResult<usize>;

    async fn count_follows(&self) -> StoreResult<usize>;
}
