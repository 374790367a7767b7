//! Entities of the blog and the joined read models built from them
//!
//! Every entity is keyed by a newtype over `i64` so that a `PostId` can never
//! be passed where a `UserId` is expected. Read models (`PostView`,
//! `CommentView`) carry the referenced author and group alongside the row so
//! handlers never have to issue follow-up lookups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
            sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

entity_id!(
    /// Primary key of a [`User`]
    UserId
);
entity_id!(
    /// Primary key of a [`Group`]
    GroupId
);
entity_id!(
    /// Primary key of a [`Post`]
    PostId
);
entity_id!(
    /// Primary key of a [`Comment`]
    CommentId
);
entity_id!(
    /// Primary key of a [`Follow`] edge
    FollowId
);

/// Maximum length of a group title
pub const GROUP_TITLE_MAX_LEN: usize = 200;

/// Number of characters of a post used when it is displayed as a one-liner
pub const POST_DISPLAY_LEN: usize = 15;

/// Human-facing description of a model field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldMeta {
    pub name: &'static str,
    pub label: &'static str,
    pub help_text: &'static str,
}

/// A reference to an account managed by the authentication subsystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}

/// A themed collection posts can be filed under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: GroupId,
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl Group {
    pub const TITLE: FieldMeta = FieldMeta {
        name: "title",
        label: "Title",
        help_text: "Short name of the group",
    };
    pub const SLUG: FieldMeta = FieldMeta {
        name: "slug",
        label: "Group slug",
        help_text: "Group identifier used in the address bar",
    };
    pub const DESCRIPTION: FieldMeta = FieldMeta {
        name: "description",
        label: "Description",
        help_text: "Full description of the group",
    };
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Input for [`crate::Store::create_group`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewGroup {
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl NewGroup {
    pub fn new(
        title: impl Into<String>,
        slug: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            slug: slug.into(),
            description: description.into(),
        }
    }
}

/// A published entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author_id: UserId,
    pub group_id: Option<GroupId>,
    /// Storage path of the attached image, e.g. `posts/cat.gif`
    pub image: Option<String>,
}

impl Post {
    pub const TEXT: FieldMeta = FieldMeta {
        name: "text",
        label: "Post text",
        help_text: "Share your thoughts",
    };
    pub const PUB_DATE: FieldMeta = FieldMeta {
        name: "pub_date",
        label: "Publication date",
        help_text: "Filled in automatically",
    };
    pub const AUTHOR: FieldMeta = FieldMeta {
        name: "author",
        label: "Post author",
        help_text: "Filled in automatically",
    };
    pub const GROUP: FieldMeta = FieldMeta {
        name: "group",
        label: "Post group",
        help_text: "Choose a group that fits the post",
    };
    pub const IMAGE: FieldMeta = FieldMeta {
        name: "image",
        label: "Post image",
        help_text: "Upload a picture",
    };
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&excerpt(&self.text, POST_DISPLAY_LEN))
    }
}

/// Input for [`crate::Store::create_post`]; the publication date is assigned
/// by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub text: String,
    pub author_id: UserId,
    pub group_id: Option<GroupId>,
    pub image: Option<String>,
}

/// The editable subset of a post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostChanges {
    pub text: String,
    pub group_id: Option<GroupId>,
    /// `None` keeps the current image
    pub image: Option<String>,
}

/// A post together with its author and (optional) group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub author: User,
    pub group: Option<Group>,
}

impl PostView {
    pub fn id(&self) -> PostId {
        self.post.id
    }

    pub fn text(&self) -> &str {
        &self.post.text
    }
}

/// A remark left on a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: UserId,
    pub text: String,
    pub created: DateTime<Utc>,
}

impl Comment {
    pub const TEXT: FieldMeta = FieldMeta {
        name: "text",
        label: "Comment text",
        help_text: "Write your comment here",
    };
}

/// Input for [`crate::Store::create_comment`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub post_id: PostId,
    pub author_id: UserId,
    pub text: String,
}

/// A comment together with its author
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: User,
}

/// Directed edge: `user_id` receives `author_id`'s posts in their feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Follow {
    pub id: FollowId,
    pub user_id: UserId,
    pub author_id: UserId,
}

/// First `limit` characters of `text` (not bytes)
pub fn excerpt(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_displays_first_fifteen_characters() {
        let post = Post {
            id: PostId(1),
            text: "Тестовый пост Тестовый пост".to_string(),
            pub_date: Utc::now(),
            author_id: UserId(1),
            group_id: None,
            image: None,
        };
        assert_eq!(post.to_string(), "Тестовый пост Т");
        assert_eq!(post.to_string().chars().count(), POST_DISPLAY_LEN);
    }

    #[test]
    fn group_displays_title() {
        let group = Group {
            id: GroupId(3),
            title: "Rustaceans".to_string(),
            slug: "rust".to_string(),
            description: "All things Rust".to_string(),
        };
        assert_eq!(group.to_string(), "Rustaceans");
    }

    #[test]
    fn excerpt_keeps_short_text_intact() {
        assert_eq!(excerpt("short", 15), "short");
        assert_eq!(excerpt("", 15), "");
    }

    #[test]
    fn field_metadata_is_exposed() {
        assert_eq!(Post::TEXT.label, "Post text");
        assert_eq!(Post::GROUP.help_text, "Choose a group that fits the post");
        assert_eq!(Group::SLUG.name, "slug");
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&PostId(42)).unwrap();
        assert_eq!(json, "42");
    }
}
