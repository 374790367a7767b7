//! Follow relationships and the personalised feed

use std::sync::Arc;
use tracing::{debug, info};

use crate::error::StoreResult;
use crate::models::{PostView, UserId};
use crate::pagination::{Page, PageRequest, Paginator};
use crate::store::{PostScope, Store};

/// Whoever is making the current request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Viewer {
    #[default]
    Anonymous,
    Authenticated(UserId),
}

impl Viewer {
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Viewer::Anonymous => None,
            Viewer::Authenticated(id) => Some(*id),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Viewer::Authenticated(_))
    }

    /// True when the viewer is signed in as `user`
    pub fn is(&self, user: UserId) -> bool {
        self.user_id() == Some(user)
    }
}

/// Query layer over the follow edges of a [`Store`]
#[derive(Clone)]
pub struct SocialGraph {
    store: Arc<dyn Store>,
}

impl SocialGraph {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Anonymous viewers follow nobody and never reach the store
    pub async fn is_following(&self, viewer: &Viewer, author: UserId) -> StoreResult<bool> {
        match viewer {
            Viewer::Anonymous => Ok(false),
            Viewer::Authenticated(user) => self.store.follow_exists(*user, author).await,
        }
    }

    /// Every post by an author `follower` follows, newest first
    pub async fn feed_for(&self, follower: UserId) -> StoreResult<Vec<PostView>> {
        let scope = PostScope::FollowedBy(follower);
        let total = self.store.count_posts(scope).await?;
        self.store.posts(scope, 0, total).await
    }

    /// One page of the feed
    pub async fn feed_page(
        &self,
        follower: UserId,
        paginator: Paginator,
        request: PageRequest,
    ) -> StoreResult<Page<PostView>> {
        let scope = PostScope::FollowedBy(follower);
        let total = self.store.count_posts(scope).await?;
        let window = paginator.window(total, request);
        let posts = self.store.posts(scope, window.offset, window.limit).await?;
        Ok(Page::from_window(posts, window))
    }

    /// Start following; returns whether a new edge was created.
    /// Following yourself, or someone already followed, changes nothing.
    pub async fn follow(&self, follower: UserId, author: UserId) -> StoreResult<bool> {
        if follower == author {
            debug!("user {} tried to follow themselves", follower);
            return Ok(false);
        }
        if self.store.follow_exists(follower, author).await? {
            return Ok(false);
        }
        let created = self.store.insert_follow(follower, author).await?;
        if created {
            info!("user {} now follows {}", follower, author);
        }
        Ok(created)
    }

    /// Stop following; a missing edge is not an error
    pub async fn unfollow(&self, follower: UserId, author: UserId) -> StoreResult<()> {
        let removed = self.store.delete_follows(follower, author).await?;
        if removed > 0 {
            info!("user {} unfollowed {}", follower, author);
        }
        Ok(())
    }
}
