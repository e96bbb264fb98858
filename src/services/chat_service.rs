use std::sync::Arc;
use tracing::{info, instrument};

use crate::{
    database::SocialDatabase,
    error::{AppError, AppResult},
    forms::MessageForm,
    media::{MediaFolder, MediaStore},
    models::{Chat, ChatId, ChatSummary, Message, PostId, User, UserId},
    services::account_service::Submission,
};

/// A chat as shown to one of its participants.
#[derive(Debug, Clone)]
pub struct ChatDetail {
    pub chat: Chat,
    pub participants: Vec<User>,
    pub other_user: Option<User>,
    pub messages: Vec<Message>,
}

pub fn share_text(author: &str, caption: &str) -> String {
    format!("Check out this post from {}: {}", author, caption)
}

/// Direct conversations between users.
#[derive(Clone)]
pub struct ChatService {
    db: SocialDatabase,
    media: Arc<dyn MediaStore>,
}

impl ChatService {
    pub fn new(db: SocialDatabase, media: Arc<dyn MediaStore>) -> Self {
        Self { db, media }
    }

    /// The chat whose participants are exactly `a` and `b`, created if absent.
    #[instrument(skip(self))]
    pub async fn find_or_create_chat(&self, a: UserId, b: UserId) -> AppResult<ChatId> {
        if let Some(chat_id) = self.db.find_chat_with_participants(&[a, b]).await? {
            return Ok(chat_id);
        }
        let chat = self.db.create_chat(&[a, b]).await?;
        info!(chat_id = chat.id, "chat created");
        Ok(chat.id)
    }

    /// Opens a chat with the user called `username`.
    pub async fn start_chat(&self, viewer: UserId, username: &str) -> AppResult<ChatId> {
        let other = self
            .db
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {}", username)))?;
        self.find_or_create_chat(viewer, other.id).await
    }

    pub async fn chat_list(&self, viewer: UserId) -> AppResult<Vec<ChatSummary>> {
        self.db.chats_for(viewer).await
    }

    pub async fn chat_detail(&self, chat_id: ChatId, viewer: UserId) -> AppResult<ChatDetail> {
        let chat = self
            .db
            .get_chat_for_participant(chat_id, viewer)
            .await?
            .ok_or_else(|| AppError::not_found(format!("chat {}", chat_id)))?;
        let participants = self.db.chat_participants(chat_id).await?;
        let other_user = participants.iter().find(|u| u.id != viewer).cloned();
        let messages = self.db.messages_for(chat_id).await?;

        Ok(ChatDetail { chat, participants, other_user, messages })
    }

    #[instrument(skip(self, form))]
    pub async fn send_message(
        &self,
        chat_id: ChatId,
        viewer: UserId,
        form: &MessageForm,
    ) -> AppResult<Submission<Message>> {
        self.db
            .get_chat_for_participant(chat_id, viewer)
            .await?
            .ok_or_else(|| AppError::not_found(format!("chat {}", chat_id)))?;

        if let Err(errors) = form.validate() {
            return Ok(Err(errors));
        }

        let image = match &form.image {
            Some(upload) => Some(self.media.save(MediaFolder::ChatImages, upload).await?),
            None => None,
        };

        let message = self
            .db
            .insert_message(chat_id, viewer, &form.text, image.as_deref())
            .await?;
        info!(message_id = message.id, "message sent");
        Ok(Ok(message))
    }

    /// Sends `post_id` to `recipient` as a message carrying the post's image.
    #[instrument(skip(self))]
    pub async fn share_post(&self, viewer: UserId, post_id: PostId, recipient: UserId) -> AppResult<ChatId> {
        let post = self
            .db
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("post {}", post_id)))?;
        self.db
            .get_user(recipient)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {}", recipient)))?;

        let chat_id = self.find_or_create_chat(viewer, recipient).await?;
        let text = share_text(&post.author_username, &post.caption);
        self.db
            .insert_message(chat_id, viewer, &text, Some(&post.image))
            .await?;
        info!(chat_id, "post shared");
        Ok(chat_id)
    }

    /// Everyone the viewer could share a post with.
    pub async fn share_candidates(&self, viewer: UserId) -> AppResult<Vec<User>> {
        self.db.list_users_except(viewer).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_text() {
        assert_eq!(share_text("bob", "hello"), "Check out this post from bob: hello");
    }
}
