//! # folio-store
//!
//! Data model and persistence for folio: users, groups, posts, comments and
//! follow edges, the [`Store`] capability with in-memory and PostgreSQL
//! backends, the follow/feed query layer and the pagination rules shared by
//! every listing.

pub mod error;
pub mod memory;
pub mod models;
pub mod pagination;
pub mod postgres;
pub mod social;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use models::{
    excerpt, Comment, CommentId, CommentView, FieldMeta, Follow, FollowId, Group, GroupId,
    NewComment, NewGroup, NewPost, Post, PostChanges, PostId, PostView, User, UserId,
    GROUP_TITLE_MAX_LEN, POST_DISPLAY_LEN,
};
pub use pagination::{Page, PageQuery, PageRequest, PageWindow, Paginator, DEFAULT_PER_PAGE};
pub use postgres::{PgStore, PgStoreConfig};
pub use social::{SocialGraph, Viewer};
pub use store::{PostScope, Store};
