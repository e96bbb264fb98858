// The acting user of a request. Handlers receive it as an extractor and pass the
// id explicitly into every service operation.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::error::AppResult;
use crate::models::{User, UserId};

pub const SESSION_VIEWER: &str = "viewer";

const NEXT_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Login page that returns to `target` (path plus query) afterwards.
pub fn login_redirect(target: &str) -> String {
    format!("/login?next={}", utf8_percent_encode(target, NEXT_VALUE))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub user_id: UserId,
    pub username: String,
}

impl From<&User> for Viewer {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
        }
    }
}

impl Viewer {
    /// Binds `user` to the session under a fresh session id.
    pub async fn log_in(session: &Session, user: &User) -> AppResult<Viewer> {
        let viewer = Viewer::from(user);
        session.cycle_id().await?;
        session.insert(SESSION_VIEWER, &viewer).await?;
        tracing::info!(user_id = viewer.user_id, "logged in {}", viewer.username);
        Ok(viewer)
    }

    pub async fn log_out(session: &Session) -> AppResult<()> {
        session.flush().await?;
        Ok(())
    }

    pub async fn current(session: &Session) -> AppResult<Option<Viewer>> {
        Ok(session.get::<Viewer>(SESSION_VIEWER).await?)
    }
}

/// Anonymous requests are sent to the login page with a way back.
impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        match Viewer::current(&session).await {
            Ok(Some(viewer)) => Ok(viewer),
            Ok(None) => {
                let target = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());
                Err(Redirect::to(&login_redirect(target)).into_response())
            }
            Err(err) => Err(err.into_response()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_redirect_keeps_query() {
        assert_eq!(login_redirect("/chats"), "/login?next=/chats");
        assert_eq!(login_redirect("/search?q=al&x=1"), "/login?next=/search%3Fq%3Dal%26x%3D1");
        assert_eq!(login_redirect("/user/jos\u{e9}"), "/login?next=/user/jos%C3%A9");
    }
}
