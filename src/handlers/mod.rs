// HTTP surface: page handlers, asynchronous JSON actions and the router that binds them.

pub mod auth;
pub mod chats;
pub mod feed;
pub mod notifications;
pub mod profiles;

use axum::{
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

use crate::{
    app_state::AppState,
    error::AppResult,
    media::MEDIA_URL_PREFIX,
    pages::Chrome,
    viewer::Viewer,
};

// Characters a username may contain that are safe unescaped in a path segment.
const USERNAME_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'@')
    .remove(b'+');

pub(crate) fn user_location(username: &str) -> String {
    format!("/user/{}", utf8_percent_encode(username, USERNAME_SEGMENT))
}

pub(crate) async fn chrome(state: &AppState, viewer: &Viewer) -> AppResult<Chrome> {
    Ok(Chrome {
        viewer: viewer.clone(),
        unread_notifications: state.social.unread_notifications(viewer.user_id).await?,
    })
}

pub(crate) fn is_ajax(headers: &HeaderMap) -> bool {
    headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
}

/// A form re-rendered with its errors.
pub(crate) fn invalid_form(html: String) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response()
}

pub fn router(state: AppState) -> Router {
    let session_config = &state.config.session;
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(session_config.secure_cookie)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            session_config.inactivity_minutes,
        )));
    let media = ServeDir::new(&state.config.media.root);

    Router::new()
        // Accounts
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))

        // Feed and posts
        .route("/", get(feed::feed))
        .route("/home", get(feed::home))
        .route("/create-post", get(feed::create_post_page).post(feed::create_post))
        .route("/post/{id}", get(feed::post_detail).post(feed::post_comment))
        .route("/like-post/{id}", post(feed::like_post))
        .route("/comment/{id}", post(feed::add_comment))

        // Profiles and the follow graph
        .route("/profile", get(profiles::own_profile).post(profiles::update_profile))
        .route("/user/{username}", get(profiles::user_profile))
        .route("/search", get(profiles::search))
        .route("/follow/{username}", post(profiles::follow))
        .route("/unfollow/{username}", post(profiles::unfollow))

        // Messaging
        .route("/chats", get(chats::chat_list))
        .route("/chat/{id}", get(chats::chat_detail).post(chats::send_message))
        .route("/chat/start/{username}", get(chats::start_chat))
        .route("/share/{id}", get(chats::share_page).post(chats::share_post))

        .route("/notifications", get(notifications::notifications))

        .nest_service(MEDIA_URL_PREFIX, media)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_is_ajax() {
        let mut headers = HeaderMap::new();
        assert!(!is_ajax(&headers));
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        assert!(is_ajax(&headers));
    }

    #[test]
    fn test_user_location_encodes_non_ascii() {
        assert_eq!(user_location("alice"), "/user/alice");
        assert_eq!(user_location("a.b@c+d-e_f"), "/user/a.b@c+d-e_f");
        assert_eq!(user_location("jos\u{e9}"), "/user/jos%C3%A9");
    }
}
