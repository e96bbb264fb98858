use chrono::Utc;
use sqlx::{sqlite::{Sqlite, SqliteRow}, QueryBuilder, Row};

use super::{users::user_from_row, SocialDatabase};
use crate::error::{AppError, AppResult};
use crate::models::{Chat, ChatId, ChatSummary, Message, UserId, User};

fn chat_from_row(row: &SqliteRow) -> AppResult<Chat> {
    Ok(Chat {
        id: row.try_get("id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn message_from_row(row: &SqliteRow) -> AppResult<Message> {
    Ok(Message {
        id: row.try_get("id")?,
        chat_id: row.try_get("chat_id")?,
        sender_id: row.try_get("sender_id")?,
        sender_username: row.try_get("sender_username")?,
        text: row.try_get("text")?,
        image: row.try_get("image")?,
        created_at: row.try_get("created_at")?,
        is_read: row.try_get("is_read")?,
    })
}

/// Sorted, deduplicated participant set.
fn participant_set(participants: &[UserId]) -> Vec<UserId> {
    let mut set = participants.to_vec();
    set.sort_unstable();
    set.dedup();
    set
}

impl SocialDatabase {
    /// Finds a chat whose participant set is exactly `participants`.
    pub async fn find_chat_with_participants(&self, participants: &[UserId]) -> AppResult<Option<ChatId>> {
        let set = participant_set(participants);
        if set.is_empty() {
            return Ok(None);
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT chat_id FROM chat_participants GROUP BY chat_id HAVING COUNT(*) = ",
        );
        qb.push_bind(set.len() as i64);
        qb.push(" AND SUM(CASE WHEN user_id IN (");
        let mut separated = qb.separated(", ");
        for id in &set {
            separated.push_bind(*id);
        }
        qb.push(") THEN 1 ELSE 0 END) = ");
        qb.push_bind(set.len() as i64);
        qb.push(" ORDER BY chat_id LIMIT 1");

        let row = qb.build().fetch_optional(&self.pool).await?;
        match row {
            Some(row) => Ok(Some(row.try_get("chat_id")?)),
            None => Ok(None),
        }
    }

    pub async fn create_chat(&self, participants: &[UserId]) -> AppResult<Chat> {
        let set = participant_set(participants);
        if set.is_empty() {
            return Err(AppError::BadRequest("A chat needs at least one participant".to_string()));
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let chat_id = sqlx::query("INSERT INTO chats (created_at, updated_at) VALUES (?, ?)")
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        for user_id in &set {
            sqlx::query("INSERT INTO chat_participants (chat_id, user_id) VALUES (?, ?)")
                .bind(chat_id)
                .bind(*user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(Chat {
            id: chat_id,
            created_at: now,
            updated_at: now,
        })
    }

    /// The chat, only if `user_id` participates in it.
    pub async fn get_chat_for_participant(&self, chat_id: ChatId, user_id: UserId) -> AppResult<Option<Chat>> {
        let row = sqlx::query(
            "SELECT c.id, c.created_at, c.updated_at
             FROM chats c JOIN chat_participants p ON p.chat_id = c.id
             WHERE c.id = ? AND p.user_id = ?",
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(chat_from_row).transpose()
    }

    pub async fn chat_participants(&self, chat_id: ChatId) -> AppResult<Vec<User>> {
        let rows = sqlx::query(
            "SELECT u.id, u.username, u.email, u.first_name, u.last_name, u.date_joined
             FROM chat_participants p JOIN users u ON u.id = p.user_id
             WHERE p.chat_id = ?
             ORDER BY u.id",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(user_from_row).collect()
    }

    /// Chats `user_id` takes part in, most recently active first.
    pub async fn chats_for(&self, user_id: UserId) -> AppResult<Vec<ChatSummary>> {
        let rows = sqlx::query(
            "SELECT c.id, c.created_at, c.updated_at,
                (SELECT u.username FROM chat_participants o JOIN users u ON u.id = o.user_id
                 WHERE o.chat_id = c.id AND o.user_id != ?1
                 ORDER BY u.id LIMIT 1) AS other_username,
                (SELECT m.text FROM messages m WHERE m.chat_id = c.id
                 ORDER BY m.created_at DESC, m.id DESC LIMIT 1) AS last_message
             FROM chats c JOIN chat_participants p ON p.chat_id = c.id
             WHERE p.user_id = ?1
             ORDER BY c.updated_at DESC, c.id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> AppResult<ChatSummary> {
                Ok(ChatSummary {
                    chat: chat_from_row(row)?,
                    other_username: row.try_get("other_username")?,
                    last_message: row.try_get("last_message")?,
                })
            })
            .collect()
    }

    /// Appends a message and bumps the chat's `updated_at` in one transaction.
    pub async fn insert_message(
        &self,
        chat_id: ChatId,
        sender_id: UserId,
        text: &str,
        image: Option<&str>,
    ) -> AppResult<Message> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            "INSERT INTO messages (chat_id, sender_id, text, image, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(chat_id)
        .bind(sender_id)
        .bind(text)
        .bind(image)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query("UPDATE chats SET updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(chat_id)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query(
            "SELECT m.id, m.chat_id, m.sender_id, u.username AS sender_username, m.text, m.image, m.created_at, m.is_read
             FROM messages m JOIN users u ON u.id = m.sender_id
             WHERE m.id = ?",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        let message = message_from_row(&row)?;

        tx.commit().await?;
        Ok(message)
    }

    /// Messages in a chat, oldest first.
    pub async fn messages_for(&self, chat_id: ChatId) -> AppResult<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT m.id, m.chat_id, m.sender_id, u.username AS sender_username, m.text, m.image, m.created_at, m.is_read
             FROM messages m JOIN users u ON u.id = m.sender_id
             WHERE m.chat_id = ?
             ORDER BY m.created_at ASC, m.id ASC",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(message_from_row).collect()
    }
}
