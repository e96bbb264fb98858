use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use tower_sessions::Session;

use super::invalid_form;
use crate::{
    app_state::AppState,
    error::AppResult,
    forms::{safe_next, FormErrors, LoginForm, NextQuery, RegisterForm},
    pages,
    viewer::Viewer,
};

pub async fn register_page() -> Html<String> {
    Html(pages::register_page("", "", &FormErrors::default()))
}

pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    match state.accounts.register(&form).await? {
        Ok(user) => {
            Viewer::log_in(&session, &user).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(errors) => Ok(invalid_form(pages::register_page(&form.username, &form.email, &errors))),
    }
}

pub async fn login_page(Query(query): Query<NextQuery>) -> Html<String> {
    Html(pages::login_page("", query.next.as_deref(), &FormErrors::default()))
}

pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    match state.accounts.authenticate(&form).await? {
        Ok(user) => {
            Viewer::log_in(&session, &user).await?;
            Ok(Redirect::to(safe_next(form.next.as_deref())).into_response())
        }
        Err(errors) => Ok(invalid_form(pages::login_page(&form.username, form.next.as_deref(), &errors))),
    }
}

pub async fn logout(session: Session) -> AppResult<Redirect> {
    Viewer::log_out(&session).await?;
    Ok(Redirect::to("/login"))
}
