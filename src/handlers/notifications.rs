use axum::{extract::State, response::Html};

use super::chrome;
use crate::{app_state::AppState, error::AppResult, pages, viewer::Viewer};

/// Lists the newest notifications. Viewing marks the listed ones read.
pub async fn notifications(State(state): State<AppState>, viewer: Viewer) -> AppResult<Html<String>> {
    let notifications = state.social.notifications(viewer.user_id).await?;
    let chrome = chrome(&state, &viewer).await?;
    Ok(Html(pages::notifications_page(&chrome, &notifications)))
}
