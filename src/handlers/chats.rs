use axum::{
    extract::{Multipart, Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};

use super::{chrome, invalid_form};
use crate::{
    app_state::AppState,
    error::AppResult,
    forms::{FormErrors, MessageForm, MultipartFields, ShareForm},
    models::{ChatId, PostId},
    pages,
    viewer::Viewer,
};

fn chat_location(chat_id: ChatId) -> String {
    format!("/chat/{}", chat_id)
}

pub async fn chat_list(State(state): State<AppState>, viewer: Viewer) -> AppResult<Html<String>> {
    let chats = state.chats.chat_list(viewer.user_id).await?;
    let chrome = chrome(&state, &viewer).await?;
    Ok(Html(pages::chat_list_page(&chrome, &chats)))
}

pub async fn chat_detail(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(chat_id): Path<ChatId>,
) -> AppResult<Html<String>> {
    let detail = state.chats.chat_detail(chat_id, viewer.user_id).await?;
    let chrome = chrome(&state, &viewer).await?;
    Ok(Html(pages::chat_page(&chrome, &detail, &FormErrors::default())))
}

pub async fn send_message(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(chat_id): Path<ChatId>,
    multipart: Multipart,
) -> AppResult<Response> {
    let form = MessageForm::from_fields(MultipartFields::read(multipart).await?);
    match state.chats.send_message(chat_id, viewer.user_id, &form).await? {
        Ok(_) => Ok(Redirect::to(&chat_location(chat_id)).into_response()),
        Err(errors) => {
            let detail = state.chats.chat_detail(chat_id, viewer.user_id).await?;
            let chrome = chrome(&state, &viewer).await?;
            Ok(invalid_form(pages::chat_page(&chrome, &detail, &errors)))
        }
    }
}

pub async fn start_chat(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(username): Path<String>,
) -> AppResult<Redirect> {
    let chat_id = state.chats.start_chat(viewer.user_id, &username).await?;
    Ok(Redirect::to(&chat_location(chat_id)))
}

pub async fn share_page(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(post_id): Path<PostId>,
) -> AppResult<Html<String>> {
    let post = state.social.post(post_id).await?;
    let candidates = state.chats.share_candidates(viewer.user_id).await?;
    let chrome = chrome(&state, &viewer).await?;
    Ok(Html(pages::share_page(&chrome, &post, &candidates)))
}

/// Without a recipient the picker is shown again.
pub async fn share_post(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(post_id): Path<PostId>,
    Form(form): Form<ShareForm>,
) -> AppResult<Response> {
    let Some(recipient) = form.recipient() else {
        let page = share_page(State(state), viewer, Path(post_id)).await?;
        return Ok(page.into_response());
    };

    let chat_id = state.chats.share_post(viewer.user_id, post_id, recipient).await?;
    Ok(Redirect::to(&chat_location(chat_id)).into_response())
}
