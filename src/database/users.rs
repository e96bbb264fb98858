use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use super::{unique_violation, SocialDatabase};
use crate::error::AppResult;
use crate::models::{Credentials, FollowCounts, Profile, User, UserId};

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, date_joined";

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

pub(super) fn user_from_row(row: &SqliteRow) -> AppResult<User> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        date_joined: row.try_get("date_joined")?,
    })
}

/// Escapes LIKE wildcards so user input matches literally under `ESCAPE '\'`.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl SocialDatabase {
    /// Inserts the user and its empty profile in one transaction.
    pub async fn create_user(&self, new_user: &NewUser) -> AppResult<User> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let user_id: i64 = sqlx::query(
            "INSERT INTO users (username, email, first_name, last_name, password_hash, date_joined)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.password_hash)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, "A user with that username already exists."))?
        .last_insert_rowid();

        sqlx::query("INSERT INTO profiles (user_id, bio) VALUES (?, '')")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(User {
            id: user_id,
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            first_name: new_user.first_name.clone(),
            last_name: new_user.last_name.clone(),
            date_joined: now,
        })
    }

    pub async fn get_user(&self, id: UserId) -> AppResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    pub async fn get_credentials(&self, username: &str) -> AppResult<Option<Credentials>> {
        let row = sqlx::query("SELECT id, username, password_hash FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Credentials {
                user_id: row.try_get("id")?,
                username: row.try_get("username")?,
                password_hash: row.try_get("password_hash")?,
            })),
            None => Ok(None),
        }
    }

    /// Substring match on username and names, excluding `exclude`.
    pub async fn search_users(&self, query: &str, exclude: UserId, limit: i64) -> AppResult<Vec<User>> {
        let pattern = like_pattern(query);
        let rows = sqlx::query(&format!(
            "SELECT {} FROM users
             WHERE id != ?1
               AND (username LIKE ?2 ESCAPE '\\' OR first_name LIKE ?2 ESCAPE '\\' OR last_name LIKE ?2 ESCAPE '\\')
             ORDER BY username
             LIMIT ?3",
            USER_COLUMNS
        ))
        .bind(exclude)
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(user_from_row).collect()
    }

    pub async fn list_users_except(&self, exclude: UserId) -> AppResult<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM users WHERE id != ? ORDER BY username",
            USER_COLUMNS
        ))
        .bind(exclude)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(user_from_row).collect()
    }

    pub async fn get_profile(&self, user_id: UserId) -> AppResult<Option<Profile>> {
        let row = sqlx::query("SELECT user_id, bio, picture FROM profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Profile {
                user_id: row.try_get("user_id")?,
                bio: row.try_get("bio")?,
                picture: row.try_get("picture")?,
            })),
            None => Ok(None),
        }
    }

    /// Sets the bio; the picture is only replaced when `picture` is `Some`.
    pub async fn update_profile(&self, user_id: UserId, bio: &str, picture: Option<&str>) -> AppResult<()> {
        sqlx::query("UPDATE profiles SET bio = ?, picture = COALESCE(?, picture) WHERE user_id = ?")
            .bind(bio)
            .bind(picture)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn follow_counts(&self, user_id: UserId) -> AppResult<FollowCounts> {
        let row = sqlx::query(
            "SELECT
                (SELECT COUNT(*) FROM follows WHERE following_id = ?1) AS followers,
                (SELECT COUNT(*) FROM follows WHERE follower_id = ?1) AS following",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(FollowCounts {
            followers: row.try_get("followers")?,
            following: row.try_get("following")?,
        })
    }
}
