use axum::{
    extract::{Multipart, Path, Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;

use super::{chrome, invalid_form, is_ajax, user_location};
use crate::{
    app_state::AppState,
    error::AppResult,
    forms::{FormErrors, MultipartFields, ProfileForm, SearchQuery},
    pages,
    viewer::Viewer,
};

pub async fn own_profile(State(state): State<AppState>, viewer: Viewer) -> AppResult<Html<String>> {
    let account = state.accounts.overview(viewer.user_id).await?;
    let posts = state.social.posts_by(viewer.user_id, viewer.user_id).await?;
    let chrome = chrome(&state, &viewer).await?;
    Ok(Html(pages::own_profile_page(&chrome, &account, &posts, &FormErrors::default())))
}

pub async fn update_profile(
    State(state): State<AppState>,
    viewer: Viewer,
    multipart: Multipart,
) -> AppResult<Response> {
    let form = ProfileForm::from_fields(MultipartFields::read(multipart).await?);
    match state.accounts.update_profile(viewer.user_id, &form).await? {
        Ok(_) => Ok(Redirect::to("/profile").into_response()),
        Err(errors) => {
            let mut account = state.accounts.overview(viewer.user_id).await?;
            account.profile.bio = form.bio.clone();
            let posts = state.social.posts_by(viewer.user_id, viewer.user_id).await?;
            let chrome = chrome(&state, &viewer).await?;
            Ok(invalid_form(pages::own_profile_page(&chrome, &account, &posts, &errors)))
        }
    }
}

pub async fn user_profile(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(username): Path<String>,
) -> AppResult<Html<String>> {
    let profile = state.social.user_profile(&username, viewer.user_id).await?;
    let chrome = chrome(&state, &viewer).await?;
    Ok(Html(pages::user_profile_page(&chrome, &profile)))
}

pub async fn search(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<SearchQuery>,
) -> AppResult<Html<String>> {
    let users = state.social.search(viewer.user_id, &query.q).await?;
    let chrome = chrome(&state, &viewer).await?;
    Ok(Html(pages::search_page(&chrome, &query.q, &users)))
}

fn follow_response(headers: &HeaderMap, username: &str, following: bool) -> Response {
    if is_ajax(headers) {
        Json(json!({ "status": "success", "following": following })).into_response()
    } else {
        Redirect::to(&user_location(username)).into_response()
    }
}

pub async fn follow(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(username): Path<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let target = state.social.user_by_username(&username).await?;
    state.social.follow(viewer.user_id, target.id).await?;
    Ok(follow_response(&headers, &target.username, true))
}

pub async fn unfollow(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(username): Path<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let target = state.social.user_by_username(&username).await?;
    state.social.unfollow(viewer.user_id, target.id).await?;
    Ok(follow_response(&headers, &target.username, false))
}
