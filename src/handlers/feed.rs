use axum::{
    extract::{Multipart, Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use serde_json::{json, Value};

use super::{chrome, invalid_form};
use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    forms::{CommentForm, CommentTextForm, FormErrors, MultipartFields, PostForm},
    models::PostId,
    pages,
    services::LikeOutcome,
    viewer::Viewer,
};

pub async fn feed(State(state): State<AppState>, viewer: Viewer) -> AppResult<Html<String>> {
    let posts = state.social.feed(viewer.user_id).await?;
    let chrome = chrome(&state, &viewer).await?;
    Ok(Html(pages::feed_page(&chrome, &posts)))
}

pub async fn home() -> Redirect {
    Redirect::to("/")
}

pub async fn create_post_page(State(state): State<AppState>, viewer: Viewer) -> AppResult<Html<String>> {
    let chrome = chrome(&state, &viewer).await?;
    Ok(Html(pages::create_post_page(&chrome, "", &FormErrors::default())))
}

pub async fn create_post(
    State(state): State<AppState>,
    viewer: Viewer,
    multipart: Multipart,
) -> AppResult<Response> {
    let form = PostForm::from_fields(MultipartFields::read(multipart).await?);
    match state.social.create_post(viewer.user_id, &form).await? {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(errors) => {
            let chrome = chrome(&state, &viewer).await?;
            Ok(invalid_form(pages::create_post_page(&chrome, &form.caption, &errors)))
        }
    }
}

pub async fn post_detail(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(post_id): Path<PostId>,
) -> AppResult<Html<String>> {
    let detail = state.social.post_detail(post_id, viewer.user_id).await?;
    let chrome = chrome(&state, &viewer).await?;
    Ok(Html(pages::post_detail_page(&chrome, &detail)))
}

/// Comment form on the detail page. Blank comments are dropped.
pub async fn post_comment(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(post_id): Path<PostId>,
    Form(form): Form<CommentForm>,
) -> AppResult<Redirect> {
    let text = form.comment.unwrap_or_default();
    match state.social.add_comment(viewer.user_id, post_id, &text).await {
        Ok(_) | Err(AppError::Validation(_)) => Ok(Redirect::to(&format!("/post/{}", post_id))),
        Err(err) => Err(err),
    }
}

pub async fn like_post(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(post_id): Path<PostId>,
) -> AppResult<Json<LikeOutcome>> {
    let outcome = state.social.toggle_like(viewer.user_id, post_id).await?;
    Ok(Json(outcome))
}

pub async fn add_comment(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(post_id): Path<PostId>,
    Form(form): Form<CommentTextForm>,
) -> AppResult<Json<Value>> {
    let text = form.text.unwrap_or_default();
    match state.social.add_comment(viewer.user_id, post_id, &text).await {
        Ok(comment) => Ok(Json(json!({
            "success": true,
            "author": comment.author_username,
            "text": comment.text,
            "created_at": pages::display_date(&comment.created_at),
        }))),
        Err(AppError::Validation(_)) => Ok(Json(json!({ "success": false }))),
        Err(err) => Err(err),
    }
}
