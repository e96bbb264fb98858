use chrono::Utc;

use super::SocialDatabase;
use crate::error::AppResult;
use crate::models::UserId;

impl SocialDatabase {
    /// Adds the `follower -> following` edge. Returns true only when the edge is new.
    /// Self-edges are accepted here; callers decide whether to allow them.
    pub async fn create_follow(&self, follower: UserId, following: UserId) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO follows (follower_id, following_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(follower)
        .bind(following)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn delete_follow(&self, follower: UserId, following: UserId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND following_id = ?")
            .bind(follower)
            .bind(following)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn is_following(&self, follower: UserId, following: UserId) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 FROM follows WHERE follower_id = ? AND following_id = ?")
            .bind(follower)
            .bind(following)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}
