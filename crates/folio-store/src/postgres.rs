//! PostgreSQL store backend
//!
//! Cascade rules live in the schema (see `migrations/`), so deletes here are
//! single statements.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres};
use std::time::Duration;

use crate::error::{StoreError, StoreResult};
use crate::models::{
    Comment, CommentId, CommentView, Group, GroupId, NewComment, NewGroup, NewPost, Post,
    PostChanges, PostId, PostView, User, UserId,
};
use crate::store::{PostScope, Store};

/// Connection pool settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PgStoreConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub idle_timeout_seconds: Option<u64>,
}

impl Default for PgStoreConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_seconds: 30,
            idle_timeout_seconds: Some(600),
        }
    }
}

const POST_SELECT: &str = "\
    SELECT p.id, p.text, p.pub_date, p.author_id, p.group_id, p.image, \
           u.username AS author_username, \
           g.title AS group_title, g.slug AS group_slug, g.description AS group_description \
    FROM posts p \
    JOIN users u ON u.id = p.author_id \
    LEFT JOIN post_groups g ON g.id = p.group_id";

#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: PostId,
    text: String,
    pub_date: DateTime<Utc>,
    author_id: UserId,
    group_id: Option<GroupId>,
    image: Option<String>,
    author_username: String,
    group_title: Option<String>,
    group_slug: Option<String>,
    group_description: Option<String>,
}

impl From<PostRow> for PostView {
    fn from(row: PostRow) -> Self {
        let group = match (row.group_id, row.group_title, row.group_slug) {
            (Some(id), Some(title), Some(slug)) => Some(Group {
                id,
                title,
                slug,
                description: row.group_description.unwrap_or_default(),
            }),
            _ => None,
        };
        PostView {
            author: User {
                id: row.author_id,
                username: row.author_username,
            },
            group,
            post: Post {
                id: row.id,
                text: row.text,
                pub_date: row.pub_date,
                author_id: row.author_id,
                group_id: row.group_id,
                image: row.image,
            },
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CommentRow {
    id: CommentId,
    post_id: PostId,
    author_id: UserId,
    text: String,
    created: DateTime<Utc>,
    author_username: String,
}

impl From<CommentRow> for CommentView {
    fn from(row: CommentRow) -> Self {
        CommentView {
            author: User {
                id: row.author_id,
                username: row.author_username,
            },
            comment: Comment {
                id: row.id,
                post_id: row.post_id,
                author_id: row.author_id,
                text: row.text,
                created: row.created,
            },
        }
    }
}

/// Filter for a scope; every variant binds `$1`, `All` binds NULL
fn scope_filter(scope: PostScope) -> (&'static str, Option<i64>) {
    match scope {
        PostScope::All => ("$1::BIGINT IS NULL", None),
        PostScope::Group(id) => ("p.group_id = $1", Some(id.get())),
        PostScope::Author(id) => ("p.author_id = $1", Some(id.get())),
        PostScope::FollowedBy(id) => (
            "p.author_id IN (SELECT f.author_id FROM follows f WHERE f.user_id = $1)",
            Some(id.get()),
        ),
    }
}

/// Store backend on a PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`
    pub async fn connect(database_url: &str, config: &PgStoreConfig) -> StoreResult<Self> {
        let mut options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds));

        if let Some(idle_timeout) = config.idle_timeout_seconds {
            options = options.idle_timeout(Duration::from_secs(idle_timeout));
        }

        let pool = options.connect(database_url).await.map_err(|e| {
            tracing::error!("Failed to create database pool: {}", e);
            StoreError::Database(format!("Failed to create database pool: {}", e))
        })?;

        tracing::info!(
            "Database pool created with {} max connections",
            config.max_connections
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    async fn fetch_post(&self, id: PostId) -> StoreResult<Option<PostView>> {
        let sql = format!("{} WHERE p.id = $1", POST_SELECT);
        let row = sqlx::query_as::<Postgres, PostRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(PostView::from))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, username: &str) -> StoreResult<User> {
        let user = sqlx::query_as::<Postgres, User>(
            "INSERT INTO users (username) VALUES ($1) RETURNING id, username",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn user_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<Postgres, User>("SELECT id, username FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let user =
            sqlx::query_as::<Postgres, User>("SELECT id, username FROM users WHERE username = $1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_session(&self, user_id: UserId) -> StoreResult<String> {
        let token = uuid::Uuid::new_v4().simple().to_string();
        sqlx::query("INSERT INTO sessions (token, user_id) VALUES ($1, $2)")
            .bind(&token)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(token)
    }

    async fn session_user(&self, token: &str) -> StoreResult<Option<UserId>> {
        let user_id =
            sqlx::query_scalar::<Postgres, UserId>("SELECT user_id FROM sessions WHERE token = $1")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user_id)
    }

    async fn create_group(&self, group: NewGroup) -> StoreResult<Group> {
        let group = sqlx::query_as::<Postgres, Group>(
            "INSERT INTO post_groups (title, slug, description) VALUES ($1, $2, $3) \
             RETURNING id, title, slug, description",
        )
        .bind(&group.title)
        .bind(&group.slug)
        .bind(&group.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(group)
    }

    async fn group_by_slug(&self, slug: &str) -> StoreResult<Option<Group>> {
        let group = sqlx::query_as::<Postgres, Group>(
            "SELECT id, title, slug, description FROM post_groups WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(group)
    }

    async fn group_by_id(&self, id: GroupId) -> StoreResult<Option<Group>> {
        let group = sqlx::query_as::<Postgres, Group>(
            "SELECT id, title, slug, description FROM post_groups WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(group)
    }

    async fn groups(&self) -> StoreResult<Vec<Group>> {
        let groups = sqlx::query_as::<Postgres, Group>(
            "SELECT id, title, slug, description FROM post_groups ORDER BY title, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    async fn delete_group(&self, id: GroupId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM post_groups WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_post(&self, post: NewPost) -> StoreResult<PostView> {
        let id = sqlx::query_scalar::<Postgres, PostId>(
            "INSERT INTO posts (text, author_id, group_id, image) VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(&post.text)
        .bind(post.author_id)
        .bind(post.group_id)
        .bind(&post.image)
        .fetch_one(&self.pool)
        .await?;
        tracing::debug!("inserted post {}", id);
        self.fetch_post(id)
            .await?
            .ok_or_else(|| StoreError::not_found(format!("post {}", id)))
    }

    async fn post(&self, id: PostId) -> StoreResult<Option<PostView>> {
        self.fetch_post(id).await
    }

    async fn update_post(&self, id: PostId, changes: PostChanges) -> StoreResult<PostView> {
        let result = sqlx::query(
            "UPDATE posts SET text = $2, group_id = $3, image = COALESCE($4, image) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&changes.text)
        .bind(changes.group_id)
        .bind(&changes.image)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!("post {}", id)));
        }
        self.fetch_post(id)
            .await?
            .ok_or_else(|| StoreError::not_found(format!("post {}", id)))
    }

    async fn delete_post(&self, id: PostId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_posts(&self, scope: PostScope) -> StoreResult<usize> {
        let (filter, param) = scope_filter(scope);
        let sql = format!("SELECT COUNT(*) FROM posts p WHERE {}", filter);
        let count = sqlx::query_scalar::<Postgres, i64>(&sql)
            .bind(param)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as usize)
    }

    async fn posts(
        &self,
        scope: PostScope,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<PostView>> {
        let (filter, param) = scope_filter(scope);
        let sql = format!(
            "{} WHERE {} ORDER BY p.pub_date DESC, p.id DESC LIMIT $2 OFFSET $3",
            POST_SELECT, filter
        );
        let rows = sqlx::query_as::<Postgres, PostRow>(&sql)
            .bind(param)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(PostView::from).collect())
    }

    async fn create_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let row = sqlx::query_as::<Postgres, (CommentId, DateTime<Utc>)>(
            "INSERT INTO comments (post_id, author_id, text) VALUES ($1, $2, $3) \
             RETURNING id, created",
        )
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(&comment.text)
        .fetch_one(&self.pool)
        .await?;
        Ok(Comment {
            id: row.0,
            post_id: comment.post_id,
            author_id: comment.author_id,
            text: comment.text,
            created: row.1,
        })
    }

    async fn comments_for(&self, post_id: PostId) -> StoreResult<Vec<CommentView>> {
        let rows = sqlx::query_as::<Postgres, CommentRow>(
            "SELECT c.id, c.post_id, c.author_id, c.text, c.created, \
                    u.username AS author_username \
             FROM comments c JOIN users u ON u.id = c.author_id \
             WHERE c.post_id = $1 ORDER BY c.id",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CommentView::from).collect())
    }

    async fn count_comments(&self, post_id: PostId) -> StoreResult<usize> {
        let count =
            sqlx::query_scalar::<Postgres, i64>("SELECT COUNT(*) FROM comments WHERE post_id = $1")
                .bind(post_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.max(0) as usize)
    }

    async fn follow_exists(&self, user_id: UserId, author_id: UserId) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<Postgres, bool>(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2)",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert_follow(&self, user_id: UserId, author_id: UserId) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO follows (user_id, author_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, author_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(author_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_follows(&self, user_id: UserId, author_id: UserId) -> StoreResult<usize> {
        let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
            .bind(user_id)
            .bind(author_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn count_follows(&self) -> StoreResult<usize> {
        let count = sqlx::query_scalar::<Postgres, i64>("SELECT COUNT(*) FROM follows")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as usize)
    }
}
