#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Blog entity records and bulk-load fixture types.
//!
//! Row types are the blog entities as read from the database. Fixture
//! types are the shapes of the seed JSON files (`users.json`,
//! `posts.json`, `comments.json`) consumed by the bulk loaders, which
//! reference related records by natural keys (username, post title)
//! rather than ids.

use serde::{Deserialize, Serialize};

/// A user row. The password column is write-only and never read back
/// into this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRow {
    /// Primary key.
    pub id: i64,
    /// Unique username.
    pub username: String,
    /// Email address.
    pub email: String,
}

/// A blog post row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRow {
    /// Primary key.
    pub id: i64,
    /// Post title.
    pub title: String,
    /// Post body.
    pub content: String,
    /// When the post was created (RFC 3339).
    pub date_posted: String,
    /// Author user id.
    pub author_id: i64,
    /// Incident this post discusses, if any.
    pub incident_id: Option<i64>,
}

/// A comment row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRow {
    /// Primary key.
    pub id: i64,
    /// Post this comment belongs to.
    pub post_id: i64,
    /// Author user id.
    pub author_id: i64,
    /// Comment body.
    pub content: String,
    /// When the comment was created (RFC 3339).
    pub date_posted: String,
}

/// A post together with its comments and like count, for the post view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDetail {
    /// The post itself.
    pub post: PostRow,
    /// Comments in posting order.
    pub comments: Vec<CommentRow>,
    /// Number of likes on the post.
    pub likes_count: i64,
}

/// Outcome of a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeToggle {
    /// Whether the user now likes the post.
    pub liked: bool,
    /// The post's like count after the toggle.
    pub likes_count: i64,
}

/// One entry of `users.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserFixture {
    /// Unique username.
    pub username: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Opaque password value; hashing belongs to the auth layer.
    #[serde(default)]
    pub password: String,
}

/// One entry of `posts.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostFixture {
    /// Post title.
    pub title: String,
    /// Post body.
    pub content: String,
    /// Author referenced by username.
    pub author_username: String,
    /// Incident referenced by id; dangling ids are dropped with a
    /// warning at load time.
    #[serde(default)]
    pub incident_id: Option<i64>,
}

/// One entry of `comments.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommentFixture {
    /// Comment body.
    pub content: String,
    /// Author referenced by username.
    pub author_username: String,
    /// Post referenced by title.
    pub post_title: String,
}
