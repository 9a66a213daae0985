//! Database queries for posts, comments, and likes.

use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};
use water_watch_blog_models::{CommentRow, LikeToggle, PostDetail, PostRow, UserRow};

use crate::BlogError;

fn parse_post(row: &switchy_database::Row) -> PostRow {
    PostRow {
        id: row.to_value("id").unwrap_or(0),
        title: row.to_value("title").unwrap_or_default(),
        content: row.to_value("content").unwrap_or_default(),
        date_posted: row.to_value("date_posted").unwrap_or_default(),
        author_id: row.to_value("author_id").unwrap_or(0),
        incident_id: row.to_value("incident_id").unwrap_or(None),
    }
}

fn parse_comment(row: &switchy_database::Row) -> CommentRow {
    CommentRow {
        id: row.to_value("id").unwrap_or(0),
        post_id: row.to_value("post_id").unwrap_or(0),
        author_id: row.to_value("author_id").unwrap_or(0),
        content: row.to_value("content").unwrap_or_default(),
        date_posted: row.to_value("date_posted").unwrap_or_default(),
    }
}

/// Fetches a user by id.
///
/// # Errors
///
/// Returns [`BlogError::NotFound`] for an unknown id, or a database
/// error.
pub async fn get_user(db: &dyn Database, user_id: i64) -> Result<UserRow, BlogError> {
    let rows = db
        .query_raw_params(
            "SELECT id, username, email FROM users WHERE id = $1",
            &[DatabaseValue::Int64(user_id)],
        )
        .await?;

    rows.first()
        .map(|row| UserRow {
            id: row.to_value("id").unwrap_or(0),
            username: row.to_value("username").unwrap_or_default(),
            email: row.to_value("email").unwrap_or_default(),
        })
        .ok_or(BlogError::NotFound("User"))
}

/// Looks up a user id by username.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn find_user_by_username(
    db: &dyn Database,
    username: &str,
) -> Result<Option<i64>, BlogError> {
    let rows = db
        .query_raw_params(
            "SELECT id FROM users WHERE username = $1",
            &[DatabaseValue::String(username.to_string())],
        )
        .await?;
    Ok(rows.first().map(|r| r.to_value("id").unwrap_or(0)))
}

/// Lists all posts, most recent first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_posts(db: &dyn Database) -> Result<Vec<PostRow>, BlogError> {
    let rows = db
        .query_raw_params(
            "SELECT id, title, content, date_posted, author_id, incident_id
             FROM posts ORDER BY date_posted DESC, id DESC",
            &[],
        )
        .await?;
    Ok(rows.iter().map(parse_post).collect())
}

/// Lists a user's posts, most recent first.
///
/// # Errors
///
/// Returns [`BlogError::NotFound`] for an unknown user, or a database
/// error.
pub async fn posts_by_author(db: &dyn Database, user_id: i64) -> Result<Vec<PostRow>, BlogError> {
    // Surface unknown users as not-found rather than an empty list
    get_user(db, user_id).await?;

    let rows = db
        .query_raw_params(
            "SELECT id, title, content, date_posted, author_id, incident_id
             FROM posts WHERE author_id = $1 ORDER BY date_posted DESC, id DESC",
            &[DatabaseValue::Int64(user_id)],
        )
        .await?;
    Ok(rows.iter().map(parse_post).collect())
}

/// Fetches a post by id.
///
/// # Errors
///
/// Returns [`BlogError::NotFound`] for an unknown id, or a database
/// error.
pub async fn get_post(db: &dyn Database, post_id: i64) -> Result<PostRow, BlogError> {
    let rows = db
        .query_raw_params(
            "SELECT id, title, content, date_posted, author_id, incident_id
             FROM posts WHERE id = $1",
            &[DatabaseValue::Int64(post_id)],
        )
        .await?;

    rows.first()
        .map(parse_post)
        .ok_or(BlogError::NotFound("Post"))
}

/// Fetches a post with its comments and like count.
///
/// # Errors
///
/// Returns [`BlogError::NotFound`] for an unknown id, or a database
/// error.
pub async fn get_post_detail(db: &dyn Database, post_id: i64) -> Result<PostDetail, BlogError> {
    let post = get_post(db, post_id).await?;

    let rows = db
        .query_raw_params(
            "SELECT id, post_id, author_id, content, date_posted
             FROM comments WHERE post_id = $1 ORDER BY date_posted, id",
            &[DatabaseValue::Int64(post_id)],
        )
        .await?;
    let comments = rows.iter().map(parse_comment).collect();

    let likes_count = count_likes(db, post_id).await?;

    Ok(PostDetail {
        post,
        comments,
        likes_count,
    })
}

/// Creates a post and returns its id.
///
/// # Errors
///
/// Returns [`BlogError::NotFound`] for an unknown author, or a database
/// error.
pub async fn create_post(
    db: &dyn Database,
    author_id: i64,
    title: &str,
    content: &str,
    incident_id: Option<i64>,
) -> Result<i64, BlogError> {
    get_user(db, author_id).await?;

    let rows = db
        .query_raw_params(
            "INSERT INTO posts (title, content, date_posted, author_id, incident_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
            &[
                DatabaseValue::String(title.to_string()),
                DatabaseValue::String(content.to_string()),
                DatabaseValue::String(chrono::Utc::now().to_rfc3339()),
                DatabaseValue::Int64(author_id),
                incident_id.map_or(DatabaseValue::Null, DatabaseValue::Int64),
            ],
        )
        .await?;

    Ok(rows.first().map_or(0, |r| r.to_value("id").unwrap_or(0)))
}

/// Creates a comment on a post and returns its id.
///
/// # Errors
///
/// Returns [`BlogError::NotFound`] for an unknown post or author, or a
/// database error.
pub async fn create_comment(
    db: &dyn Database,
    post_id: i64,
    author_id: i64,
    content: &str,
) -> Result<i64, BlogError> {
    get_post(db, post_id).await?;
    get_user(db, author_id).await?;

    let rows = db
        .query_raw_params(
            "INSERT INTO comments (post_id, author_id, content, date_posted)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
            &[
                DatabaseValue::Int64(post_id),
                DatabaseValue::Int64(author_id),
                DatabaseValue::String(content.to_string()),
                DatabaseValue::String(chrono::Utc::now().to_rfc3339()),
            ],
        )
        .await?;

    Ok(rows.first().map_or(0, |r| r.to_value("id").unwrap_or(0)))
}

/// Deletes a post. Only the author may delete it.
///
/// # Errors
///
/// Returns [`BlogError::NotFound`] for an unknown post,
/// [`BlogError::Forbidden`] when `requesting_user` is not the author,
/// or a database error.
pub async fn delete_post(
    db: &dyn Database,
    post_id: i64,
    requesting_user: i64,
) -> Result<(), BlogError> {
    let post = get_post(db, post_id).await?;
    if post.author_id != requesting_user {
        return Err(BlogError::Forbidden);
    }

    db.exec_raw_params(
        "DELETE FROM posts WHERE id = $1",
        &[DatabaseValue::Int64(post_id)],
    )
    .await?;

    Ok(())
}

/// Deletes a comment. Only the author may delete it.
///
/// # Errors
///
/// Returns [`BlogError::NotFound`] for an unknown comment,
/// [`BlogError::Forbidden`] when `requesting_user` is not the author,
/// or a database error.
pub async fn delete_comment(
    db: &dyn Database,
    comment_id: i64,
    requesting_user: i64,
) -> Result<(), BlogError> {
    let rows = db
        .query_raw_params(
            "SELECT author_id FROM comments WHERE id = $1",
            &[DatabaseValue::Int64(comment_id)],
        )
        .await?;
    let author_id: i64 = rows
        .first()
        .map(|r| r.to_value("author_id").unwrap_or(0))
        .ok_or(BlogError::NotFound("Comment"))?;

    if author_id != requesting_user {
        return Err(BlogError::Forbidden);
    }

    db.exec_raw_params(
        "DELETE FROM comments WHERE id = $1",
        &[DatabaseValue::Int64(comment_id)],
    )
    .await?;

    Ok(())
}

/// Counts likes on a post.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn count_likes(db: &dyn Database, post_id: i64) -> Result<i64, BlogError> {
    let rows = db
        .query_raw_params(
            "SELECT COUNT(*) as cnt FROM likes WHERE post_id = $1",
            &[DatabaseValue::Int64(post_id)],
        )
        .await?;
    Ok(rows.first().map_or(0, |r| r.to_value("cnt").unwrap_or(0)))
}

/// Toggles a user's like on a post: removes it if present, creates it
/// otherwise. Returns the new liked state and the post's like count.
///
/// This is a get-or-create followed by a conditional delete, the same
/// read-then-write race class as the incident duplicate check; the
/// storage uniqueness constraint on (user, post) bounds the damage to
/// a failed insert under concurrency.
///
/// # Errors
///
/// Returns [`BlogError::NotFound`] for an unknown post or user, or a
/// database error.
pub async fn toggle_like(
    db: &dyn Database,
    user_id: i64,
    post_id: i64,
) -> Result<LikeToggle, BlogError> {
    get_post(db, post_id).await?;
    get_user(db, user_id).await?;

    let existing = db
        .query_raw_params(
            "SELECT id FROM likes WHERE user_id = $1 AND post_id = $2",
            &[
                DatabaseValue::Int64(user_id),
                DatabaseValue::Int64(post_id),
            ],
        )
        .await?;

    let liked = if existing.is_empty() {
        db.exec_raw_params(
            "INSERT INTO likes (user_id, post_id, created_at) VALUES ($1, $2, $3)",
            &[
                DatabaseValue::Int64(user_id),
                DatabaseValue::Int64(post_id),
                DatabaseValue::String(chrono::Utc::now().to_rfc3339()),
            ],
        )
        .await?;
        true
    } else {
        db.exec_raw_params(
            "DELETE FROM likes WHERE user_id = $1 AND post_id = $2",
            &[
                DatabaseValue::Int64(user_id),
                DatabaseValue::Int64(post_id),
            ],
        )
        .await?;
        false
    };

    let likes_count = count_likes(db, post_id).await?;

    Ok(LikeToggle { liked, likes_count })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn db_with_user(username: &str) -> (Box<dyn Database>, i64) {
        let db = water_watch_database::open_db(None).await.unwrap();
        db.exec_raw_params(
            "INSERT INTO users (username) VALUES ($1)",
            &[DatabaseValue::String(username.to_string())],
        )
        .await
        .unwrap();
        let id = find_user_by_username(db.as_ref(), username)
            .await
            .unwrap()
            .unwrap();
        (db, id)
    }

    #[tokio::test]
    async fn like_toggles_on_then_off() {
        let (db, user) = db_with_user("flood_fan").await;
        let post = create_post(db.as_ref(), user, "High water", "...", None)
            .await
            .unwrap();

        let first = toggle_like(db.as_ref(), user, post).await.unwrap();
        assert!(first.liked);
        assert_eq!(first.likes_count, 1);

        let second = toggle_like(db.as_ref(), user, post).await.unwrap();
        assert!(!second.liked);
        assert_eq!(second.likes_count, 0);
    }

    #[tokio::test]
    async fn liking_an_unknown_post_is_not_found() {
        let (db, user) = db_with_user("flood_fan").await;
        let result = toggle_like(db.as_ref(), user, 999).await;
        assert!(matches!(result, Err(BlogError::NotFound("Post"))));
    }

    #[tokio::test]
    async fn only_the_author_may_delete_a_post() {
        let (db, author) = db_with_user("author").await;
        db.exec_raw("INSERT INTO users (username) VALUES ('bystander')")
            .await
            .unwrap();
        let bystander = find_user_by_username(db.as_ref(), "bystander")
            .await
            .unwrap()
            .unwrap();

        let post = create_post(db.as_ref(), author, "Mine", "...", None)
            .await
            .unwrap();

        let denied = delete_post(db.as_ref(), post, bystander).await;
        assert!(matches!(denied, Err(BlogError::Forbidden)));

        delete_post(db.as_ref(), post, author).await.unwrap();
        assert!(matches!(
            get_post(db.as_ref(), post).await,
            Err(BlogError::NotFound("Post"))
        ));
    }

    #[tokio::test]
    async fn only_the_author_may_delete_a_comment() {
        let (db, author) = db_with_user("author").await;
        let post = create_post(db.as_ref(), author, "Mine", "...", None)
            .await
            .unwrap();
        let comment = create_comment(db.as_ref(), post, author, "first")
            .await
            .unwrap();

        db.exec_raw("INSERT INTO users (username) VALUES ('bystander')")
            .await
            .unwrap();
        let bystander = find_user_by_username(db.as_ref(), "bystander")
            .await
            .unwrap()
            .unwrap();

        assert!(matches!(
            delete_comment(db.as_ref(), comment, bystander).await,
            Err(BlogError::Forbidden)
        ));
        delete_comment(db.as_ref(), comment, author).await.unwrap();
    }

    #[tokio::test]
    async fn post_detail_collects_comments_and_likes() {
        let (db, user) = db_with_user("author").await;
        let post = create_post(db.as_ref(), user, "High water", "...", None)
            .await
            .unwrap();
        create_comment(db.as_ref(), post, user, "first").await.unwrap();
        create_comment(db.as_ref(), post, user, "second").await.unwrap();
        toggle_like(db.as_ref(), user, post).await.unwrap();

        let detail = get_post_detail(db.as_ref(), post).await.unwrap();
        assert_eq!(detail.post.title, "High water");
        assert_eq!(detail.comments.len(), 2);
        assert_eq!(detail.comments[0].content, "first");
        assert_eq!(detail.likes_count, 1);
    }

    #[tokio::test]
    async fn unknown_profile_is_not_found() {
        let db = water_watch_database::open_db(None).await.unwrap();
        assert!(matches!(
            posts_by_author(db.as_ref(), 42).await,
            Err(BlogError::NotFound("User"))
        ));
    }
}
