use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::{
    database::{NewUser, SocialDatabase},
    error::{AppError, AppResult},
    forms::{FormErrors, LoginForm, ProfileForm, RegisterForm},
    media::{MediaFolder, MediaStore},
    models::{FollowCounts, Profile, User, UserId},
};

/// Result of a form submission: either the created/updated value or the form errors.
pub type Submission<T> = Result<T, FormErrors>;

/// Everything the own-profile page shows.
#[derive(Debug, Clone)]
pub struct AccountOverview {
    pub user: User,
    pub profile: Profile,
    pub counts: FollowCounts,
}

/// Registration, login and profile editing.
#[derive(Clone)]
pub struct AccountService {
    db: SocialDatabase,
    media: Arc<dyn MediaStore>,
}

impl AccountService {
    pub fn new(db: SocialDatabase, media: Arc<dyn MediaStore>) -> Self {
        Self { db, media }
    }

    #[instrument(skip(self, form), fields(username = %form.username))]
    pub async fn register(&self, form: &RegisterForm) -> AppResult<Submission<User>> {
        if let Err(errors) = form.validate() {
            warn!("rejected registration");
            return Ok(Err(errors));
        }

        let new_user = NewUser {
            username: form.username.trim().to_string(),
            email: form.email.trim().to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: hash_password(&form.password1)?,
        };

        match self.db.create_user(&new_user).await {
            Ok(user) => {
                info!(user_id = user.id, "User {} registered successfully", user.username);
                Ok(Ok(user))
            }
            Err(AppError::Validation(message)) => {
                let mut errors = FormErrors::default();
                errors.add("username", message);
                Ok(Err(errors))
            }
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self, form), fields(username = %form.username))]
    pub async fn authenticate(&self, form: &LoginForm) -> AppResult<Submission<User>> {
        if let Err(errors) = form.validate() {
            return Ok(Err(errors));
        }

        let credentials = self.db.get_credentials(form.username.trim()).await?;
        let verified = match &credentials {
            Some(creds) => verify_password(&form.password, &creds.password_hash)?,
            None => false,
        };

        let Some(creds) = credentials.filter(|_| verified) else {
            warn!("failed login");
            let mut errors = FormErrors::default();
            errors.add_non_field("Please enter a correct username and password.");
            return Ok(Err(errors));
        };

        let user = self
            .db
            .get_user(creds.user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {}", creds.user_id)))?;
        Ok(Ok(user))
    }

    pub async fn overview(&self, user_id: UserId) -> AppResult<AccountOverview> {
        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {}", user_id)))?;
        let profile = self
            .db
            .get_profile(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("profile of user {}", user_id)))?;
        let counts = self.db.follow_counts(user_id).await?;

        Ok(AccountOverview { user, profile, counts })
    }

    #[instrument(skip(self, form))]
    pub async fn update_profile(&self, user_id: UserId, form: &ProfileForm) -> AppResult<Submission<Profile>> {
        if let Err(errors) = form.validate() {
            return Ok(Err(errors));
        }

        let picture = match &form.profile_pic {
            Some(upload) => Some(self.media.save(MediaFolder::Profiles, upload).await?),
            None => None,
        };

        self.db.update_profile(user_id, &form.bio, picture.as_deref()).await?;
        info!("profile updated");

        let profile = self
            .db
            .get_profile(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("profile of user {}", user_id)))?;
        Ok(Ok(profile))
    }
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(password_hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed_hash).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
    }
}
