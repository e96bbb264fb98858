use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use super::SocialDatabase;
use crate::error::{AppError, AppResult};
use crate::models::{Comment, Post, PostId, PostView, UserId};

// ?1 is always the viewer.
const POST_VIEW_SELECT: &str = "
    SELECT p.id, p.author_id, u.username AS author_username, p.image, p.caption, p.created_at,
        (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS total_likes,
        (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS total_comments,
        EXISTS (SELECT 1 FROM post_likes l WHERE l.post_id = p.id AND l.user_id = ?1) AS liked_by_viewer
    FROM posts p
    JOIN users u ON u.id = p.author_id";

fn post_from_row(row: &SqliteRow) -> AppResult<Post> {
    Ok(Post {
        id: row.try_get("id")?,
        author_id: row.try_get("author_id")?,
        author_username: row.try_get("author_username")?,
        image: row.try_get("image")?,
        caption: row.try_get("caption")?,
        created_at: row.try_get("created_at")?,
    })
}

fn post_view_from_row(row: &SqliteRow) -> AppResult<PostView> {
    Ok(PostView {
        post: post_from_row(row)?,
        total_likes: row.try_get("total_likes")?,
        total_comments: row.try_get("total_comments")?,
        liked_by_viewer: row.try_get("liked_by_viewer")?,
    })
}

fn comment_from_row(row: &SqliteRow) -> AppResult<Comment> {
    Ok(Comment {
        id: row.try_get("id")?,
        post_id: row.try_get("post_id")?,
        author_id: row.try_get("author_id")?,
        author_username: row.try_get("author_username")?,
        text: row.try_get("text")?,
        created_at: row.try_get("created_at")?,
    })
}

impl SocialDatabase {
    pub async fn create_post(&self, author_id: UserId, image: &str, caption: &str) -> AppResult<Post> {
        let id = sqlx::query("INSERT INTO posts (author_id, image, caption, created_at) VALUES (?, ?, ?, ?)")
            .bind(author_id)
            .bind(image)
            .bind(caption)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        self.get_post(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Post {} vanished after insert", id)))
    }

    pub async fn get_post(&self, id: PostId) -> AppResult<Option<Post>> {
        let row = sqlx::query(
            "SELECT p.id, p.author_id, u.username AS author_username, p.image, p.caption, p.created_at
             FROM posts p JOIN users u ON u.id = p.author_id
             WHERE p.id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(post_from_row).transpose()
    }

    pub async fn get_post_view(&self, id: PostId, viewer: UserId) -> AppResult<Option<PostView>> {
        let row = sqlx::query(&format!("{} WHERE p.id = ?2", POST_VIEW_SELECT))
            .bind(viewer)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(post_view_from_row).transpose()
    }

    /// Posts by the viewer or by anyone the viewer follows, newest first.
    pub async fn feed_for(&self, viewer: UserId) -> AppResult<Vec<PostView>> {
        let rows = sqlx::query(&format!(
            "{} WHERE p.author_id = ?1
                OR p.author_id IN (SELECT following_id FROM follows WHERE follower_id = ?1)
             ORDER BY p.created_at DESC, p.id DESC",
            POST_VIEW_SELECT
        ))
        .bind(viewer)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(post_view_from_row).collect()
    }

    pub async fn posts_by_author(&self, author_id: UserId, viewer: UserId) -> AppResult<Vec<PostView>> {
        let rows = sqlx::query(&format!(
            "{} WHERE p.author_id = ?2 ORDER BY p.created_at DESC, p.id DESC",
            POST_VIEW_SELECT
        ))
        .bind(viewer)
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(post_view_from_row).collect()
    }

    pub async fn has_liked(&self, post_id: PostId, user_id: UserId) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 FROM post_likes WHERE post_id = ? AND user_id = ?")
            .bind(post_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Returns whether a like was added (false if it already existed).
    pub async fn add_like(&self, post_id: PostId, user_id: UserId) -> AppResult<bool> {
        let result = sqlx::query("INSERT OR IGNORE INTO post_likes (post_id, user_id, created_at) VALUES (?, ?, ?)")
            .bind(post_id)
            .bind(user_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn remove_like(&self, post_id: PostId, user_id: UserId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM post_likes WHERE post_id = ? AND user_id = ?")
            .bind(post_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_likes(&self, post_id: PostId) -> AppResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM post_likes WHERE post_id = ?")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("total")?)
    }

    pub async fn create_comment(&self, post_id: PostId, author_id: UserId, text: &str) -> AppResult<Comment> {
        let id = sqlx::query("INSERT INTO comments (post_id, author_id, text, created_at) VALUES (?, ?, ?, ?)")
            .bind(post_id)
            .bind(author_id)
            .bind(text)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        let row = sqlx::query(
            "SELECT c.id, c.post_id, c.author_id, u.username AS author_username, c.text, c.created_at
             FROM comments c JOIN users u ON u.id = c.author_id
             WHERE c.id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        comment_from_row(&row)
    }

    /// Comments on a post, oldest first.
    pub async fn comments_for(&self, post_id: PostId) -> AppResult<Vec<Comment>> {
        let rows = sqlx::query(
            "SELECT c.id, c.post_id, c.author_id, u.username AS author_username, c.text, c.created_at
             FROM comments c JOIN users u ON u.id = c.author_id
             WHERE c.post_id = ?
             ORDER BY c.created_at ASC, c.id ASC",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(comment_from_row).collect()
    }
}
