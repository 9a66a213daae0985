//! Bulk loaders for the blog seed fixtures.
//!
//! Each loader is idempotent against its natural key: users by
//! username, posts by (title, author), comments by (content, author,
//! post). Records referencing an unknown user or post are skipped with
//! a warning; a post referencing an unknown incident id is created
//! without the link. Isolated failures never abort the batch, and a
//! missing fixture file loads zero records.

use std::path::Path;

use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};
use water_watch_blog_models::{CommentFixture, PostFixture, UserFixture};

use crate::{BlogError, queries};

fn read_fixtures<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<Vec<T>>, BlogError> {
    if !path.exists() {
        log::warn!("File not found: {}", path.display());
        return Ok(None);
    }

    let raw = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&raw)?))
}

/// Loads users from `users.json`, skipping usernames that already
/// exist. Returns the number of new users.
///
/// # Errors
///
/// Returns [`BlogError`] if the file is unreadable, not JSON, or an
/// insert fails. A missing file loads zero records.
pub async fn load_users(db: &dyn Database, path: &Path) -> Result<u64, BlogError> {
    let Some(fixtures) = read_fixtures::<UserFixture>(path)? else {
        return Ok(0);
    };

    let mut count = 0u64;
    for user in &fixtures {
        if queries::find_user_by_username(db, &user.username)
            .await?
            .is_some()
        {
            continue;
        }

        db.exec_raw_params(
            "INSERT INTO users (username, email, password) VALUES ($1, $2, $3)",
            &[
                DatabaseValue::String(user.username.clone()),
                DatabaseValue::String(user.email.clone()),
                DatabaseValue::String(user.password.clone()),
            ],
        )
        .await?;
        count += 1;
    }

    log::info!("Loaded {count} new users from {}", path.display());
    Ok(count)
}

/// Loads posts from `posts.json`, skipping (title, author) pairs that
/// already exist. Returns the number of new posts.
///
/// # Errors
///
/// Returns [`BlogError`] if the file is unreadable, not JSON, or an
/// insert fails. A missing file loads zero records.
pub async fn load_posts(db: &dyn Database, path: &Path) -> Result<u64, BlogError> {
    let Some(fixtures) = read_fixtures::<PostFixture>(path)? else {
        return Ok(0);
    };

    let mut count = 0u64;
    for post in &fixtures {
        let Some(author_id) = queries::find_user_by_username(db, &post.author_username).await?
        else {
            log::warn!(
                "User '{}' not found for post '{}'. Skipping.",
                post.author_username,
                post.title
            );
            continue;
        };

        // A dangling incident reference drops the link, not the post
        let mut incident_id = post.incident_id;
        if let Some(id) = incident_id {
            let rows = db
                .query_raw_params(
                    "SELECT id FROM incidents WHERE id = $1",
                    &[DatabaseValue::Int64(id)],
                )
                .await?;
            if rows.is_empty() {
                log::warn!(
                    "Incident with ID '{id}' not found for post '{}'. \
                     Post will be created without an incident link.",
                    post.title
                );
                incident_id = None;
            }
        }

        let existing = db
            .query_raw_params(
                "SELECT id FROM posts WHERE title = $1 AND author_id = $2 LIMIT 1",
                &[
                    DatabaseValue::String(post.title.clone()),
                    DatabaseValue::Int64(author_id),
                ],
            )
            .await?;
        if !existing.is_empty() {
            continue;
        }

        db.exec_raw_params(
            "INSERT INTO posts (title, content, date_posted, author_id, incident_id)
             VALUES ($1, $2, $3, $4, $5)",
            &[
                DatabaseValue::String(post.title.clone()),
                DatabaseValue::String(post.content.clone()),
                DatabaseValue::String(chrono::Utc::now().to_rfc3339()),
                DatabaseValue::Int64(author_id),
                incident_id.map_or(DatabaseValue::Null, DatabaseValue::Int64),
            ],
        )
        .await?;
        count += 1;
    }

    log::info!("Loaded {count} new posts from {}", path.display());
    Ok(count)
}

/// Loads comments from `comments.json`, skipping (content, author,
/// post) triples that already exist. Returns the number of new
/// comments.
///
/// # Errors
///
/// Returns [`BlogError`] if the file is unreadable, not JSON, or an
/// insert fails. A missing file loads zero records.
pub async fn load_comments(db: &dyn Database, path: &Path) -> Result<u64, BlogError> {
    let Some(fixtures) = read_fixtures::<CommentFixture>(path)? else {
        return Ok(0);
    };

    let mut count = 0u64;
    for comment in &fixtures {
        let Some(author_id) = queries::find_user_by_username(db, &comment.author_username).await?
        else {
            log::warn!(
                "User '{}' not found for a comment. Skipping.",
                comment.author_username
            );
            continue;
        };

        let rows = db
            .query_raw_params(
                "SELECT id FROM posts WHERE title = $1 LIMIT 1",
                &[DatabaseValue::String(comment.post_title.clone())],
            )
            .await?;
        let Some(post_id) = rows.first().map(|r| r.to_value("id").unwrap_or(0)) else {
            log::warn!(
                "Post with title '{}' not found for a comment. Skipping.",
                comment.post_title
            );
            continue;
        };

        let existing = db
            .query_raw_params(
                "SELECT id FROM comments
                 WHERE content = $1 AND author_id = $2 AND post_id = $3
                 LIMIT 1",
                &[
                    DatabaseValue::String(comment.content.clone()),
                    DatabaseValue::Int64(author_id),
                    DatabaseValue::Int64(post_id),
                ],
            )
            .await?;
        if !existing.is_empty() {
            continue;
        }

        db.exec_raw_params(
            "INSERT INTO comments (post_id, author_id, content, date_posted)
             VALUES ($1, $2, $3, $4)",
            &[
                DatabaseValue::Int64(post_id),
                DatabaseValue::Int64(author_id),
                DatabaseValue::String(comment.content.clone()),
                DatabaseValue::String(chrono::Utc::now().to_rfc3339()),
            ],
        )
        .await?;
        count += 1;
    }

    log::info!("Loaded {count} new comments from {}", path.display());
    Ok(count)
}
