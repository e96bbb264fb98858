use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::{
    database::SocialDatabase,
    error::{AppError, AppResult},
    forms::PostForm,
    media::{MediaFolder, MediaStore},
    models::{
        Comment, FollowCounts, Notification, NotificationType, Post, PostId, PostView, Profile,
        User, UserId,
    },
    services::account_service::Submission,
};

pub const NOTIFICATION_DISPLAY_LIMIT: i64 = 50;
pub const SEARCH_RESULT_LIMIT: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeOutcome {
    pub liked: bool,
    pub total_likes: i64,
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostView,
    pub comments: Vec<Comment>,
}

/// Another user's profile as seen by the viewer.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user: User,
    pub profile: Profile,
    pub posts: Vec<PostView>,
    pub counts: FollowCounts,
    pub is_following: bool,
}

/// Feed, follow graph, likes, comments, search and notifications.
#[derive(Clone)]
pub struct SocialService {
    db: SocialDatabase,
    media: Arc<dyn MediaStore>,
}

impl SocialService {
    pub fn new(db: SocialDatabase, media: Arc<dyn MediaStore>) -> Self {
        Self { db, media }
    }

    pub async fn feed(&self, viewer: UserId) -> AppResult<Vec<PostView>> {
        self.db.feed_for(viewer).await
    }

    #[instrument(skip(self, form))]
    pub async fn create_post(&self, author: UserId, form: &PostForm) -> AppResult<Submission<Post>> {
        if let Err(errors) = form.validate() {
            return Ok(Err(errors));
        }
        let Some(upload) = &form.image else {
            return Err(AppError::Internal("validated post form without image".to_string()));
        };

        let image = self.media.save(MediaFolder::Posts, upload).await?;
        let post = self.db.create_post(author, &image, &form.caption).await?;
        info!(post_id = post.id, "post created");
        Ok(Ok(post))
    }

    pub async fn post(&self, post_id: PostId) -> AppResult<Post> {
        self.db
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("post {}", post_id)))
    }

    pub async fn post_detail(&self, post_id: PostId, viewer: UserId) -> AppResult<PostDetail> {
        let post = self
            .db
            .get_post_view(post_id, viewer)
            .await?
            .ok_or_else(|| AppError::not_found(format!("post {}", post_id)))?;
        let comments = self.db.comments_for(post_id).await?;
        Ok(PostDetail { post, comments })
    }

    pub async fn user_by_username(&self, username: &str) -> AppResult<User> {
        self.db
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {}", username)))
    }

    pub async fn user_profile(&self, username: &str, viewer: UserId) -> AppResult<UserProfile> {
        let user = self.user_by_username(username).await?;
        let profile = self
            .db
            .get_profile(user.id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("profile of {}", username)))?;
        let posts = self.db.posts_by_author(user.id, viewer).await?;
        let counts = self.db.follow_counts(user.id).await?;
        let is_following = self.db.is_following(viewer, user.id).await?;

        Ok(UserProfile { user, profile, posts, counts, is_following })
    }

    pub async fn posts_by(&self, author: UserId, viewer: UserId) -> AppResult<Vec<PostView>> {
        self.db.posts_by_author(author, viewer).await
    }

    pub async fn search(&self, viewer: UserId, query: &str) -> AppResult<Vec<User>> {
        self.db.search_users(query.trim(), viewer, SEARCH_RESULT_LIMIT).await
    }

    /// Creates the follow edge. Returns true only when the edge is new; a notification
    /// is emitted in that case. Following yourself is a no-op.
    #[instrument(skip(self))]
    pub async fn follow(&self, follower: UserId, following: UserId) -> AppResult<bool> {
        if follower == following {
            debug!("ignoring self-follow");
            return Ok(false);
        }

        let created = self.db.create_follow(follower, following).await?;
        if created {
            self.db
                .create_notification(following, follower, NotificationType::Follow, None)
                .await?;
            info!("follow edge created");
        }
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn unfollow(&self, follower: UserId, following: UserId) -> AppResult<bool> {
        let removed = self.db.delete_follow(follower, following).await?;
        if removed {
            info!("follow edge removed");
        }
        Ok(removed)
    }

    pub async fn is_following(&self, follower: UserId, following: UserId) -> AppResult<bool> {
        self.db.is_following(follower, following).await
    }

    /// Likes the post, or removes the like if the viewer already likes it.
    #[instrument(skip(self))]
    pub async fn toggle_like(&self, viewer: UserId, post_id: PostId) -> AppResult<LikeOutcome> {
        let post = self
            .db
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("post {}", post_id)))?;

        let liked = if self.db.has_liked(post_id, viewer).await? {
            self.db.remove_like(post_id, viewer).await?;
            false
        } else {
            let added = self.db.add_like(post_id, viewer).await?;
            if added && post.author_id != viewer {
                self.db
                    .create_notification(post.author_id, viewer, NotificationType::Like, Some(post_id))
                    .await?;
            }
            true
        };

        let total_likes = self.db.count_likes(post_id).await?;
        debug!(liked, total_likes, "like toggled");
        Ok(LikeOutcome { liked, total_likes })
    }

    /// Appends a comment and notifies the post author unless they wrote it.
    /// The text is stored as submitted; only blank text is refused.
    #[instrument(skip(self, text))]
    pub async fn add_comment(&self, viewer: UserId, post_id: PostId, text: &str) -> AppResult<Comment> {
        let post = self
            .db
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("post {}", post_id)))?;

        if text.trim().is_empty() {
            return Err(AppError::Validation("Comment text is required".to_string()));
        }

        let comment = self.db.create_comment(post_id, viewer, text).await?;
        if post.author_id != viewer {
            self.db
                .create_notification(post.author_id, viewer, NotificationType::Comment, Some(post_id))
                .await?;
        }
        info!(comment_id = comment.id, "comment added");
        Ok(comment)
    }

    /// The newest notifications, as they were before this call flagged them read.
    #[instrument(skip(self))]
    pub async fn notifications(&self, viewer: UserId) -> AppResult<Vec<Notification>> {
        let notifications = self
            .db
            .recent_notifications(viewer, NOTIFICATION_DISPLAY_LIMIT)
            .await?;

        let unread: Vec<_> = notifications
            .iter()
            .filter(|n| !n.is_read)
            .map(|n| n.id)
            .collect();
        let marked = self.db.mark_notifications_read(&unread).await?;
        debug!(marked, "notifications marked read");

        Ok(notifications)
    }

    pub async fn unread_notifications(&self, viewer: UserId) -> AppResult<i64> {
        self.db.count_unread_notifications(viewer).await
    }
}
