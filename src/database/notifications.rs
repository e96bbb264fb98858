use chrono::Utc;
use sqlx::{sqlite::{Sqlite, SqliteRow}, QueryBuilder, Row};

use super::SocialDatabase;
use crate::error::{AppError, AppResult};
use crate::models::{Notification, NotificationId, NotificationType, PostId, UserId};

const NOTIFICATION_SELECT: &str = "
    SELECT n.id, n.user_id, n.from_user_id, u.username AS from_username,
           n.notification_type, n.post_id, n.is_read, n.created_at
    FROM notifications n
    JOIN users u ON u.id = n.from_user_id";

fn notification_from_row(row: &SqliteRow) -> AppResult<Notification> {
    let kind: String = row.try_get("notification_type")?;
    Ok(Notification {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        from_user_id: row.try_get("from_user_id")?,
        from_username: row.try_get("from_username")?,
        notification_type: kind.parse().map_err(AppError::DatabaseError)?,
        post_id: row.try_get("post_id")?,
        is_read: row.try_get("is_read")?,
        created_at: row.try_get("created_at")?,
    })
}

impl SocialDatabase {
    pub async fn create_notification(
        &self,
        recipient: UserId,
        from_user: UserId,
        kind: NotificationType,
        post_id: Option<PostId>,
    ) -> AppResult<Notification> {
        let id = sqlx::query(
            "INSERT INTO notifications (user_id, from_user_id, notification_type, post_id, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(recipient)
        .bind(from_user)
        .bind(kind.as_str())
        .bind(post_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        let row = sqlx::query(&format!("{} WHERE n.id = ?", NOTIFICATION_SELECT))
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        notification_from_row(&row)
    }

    /// Newest-first notifications for `recipient`, at most `limit`.
    pub async fn recent_notifications(&self, recipient: UserId, limit: i64) -> AppResult<Vec<Notification>> {
        let rows = sqlx::query(&format!(
            "{} WHERE n.user_id = ? ORDER BY n.created_at DESC, n.id DESC LIMIT ?",
            NOTIFICATION_SELECT
        ))
        .bind(recipient)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(notification_from_row).collect()
    }

    /// Flags exactly the given notifications as read. Returns how many changed.
    pub async fn mark_notifications_read(&self, ids: &[NotificationId]) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE notifications SET is_read = 1 WHERE is_read = 0 AND id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        qb.push(")");

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn count_unread_notifications(&self, recipient: UserId) -> AppResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS unread FROM notifications WHERE user_id = ? AND is_read = 0")
            .bind(recipient)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("unread")?)
    }
}
