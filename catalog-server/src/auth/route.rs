use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{cookie::Cookie, CookieJar};
use catalog::forms::{auth as auth_forms, BoundForm, FormErrors, RawForm};
use minijinja::context;
use serde::Deserialize;

use super::session::{session_cookie, CurrentUser, LoginRequired, SESSION_COOKIE};
use crate::errors::WebResult;
use crate::models::User;
use crate::state::AppState;
use crate::views::{render, Submission};

pub const PASSWORD_CHANGE_DONE: &str = "/auth/password_change/done/";

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    next: Option<String>,
}

/// Only follow `next` within this site.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(next) if next.starts_with('/') && !next.starts_with("//") && !next.contains('\\') => {
            next
        }
        _ => "/",
    }
}

fn render_login(
    user: Option<&User>,
    data: &RawForm,
    errors: &FormErrors,
    next: &str,
) -> WebResult<Response> {
    render(
        "auth/login.html.jinja",
        user,
        context! {
            form => BoundForm::new(auth_forms::LOGIN_FIELDS, data).with_errors(errors),
            next => next,
        },
    )
}

pub async fn login_form(
    CurrentUser(user): CurrentUser,
    Query(query): Query<NextQuery>,
) -> WebResult<Response> {
    let next = safe_next(query.next.as_deref());
    render_login(user.as_ref(), &RawForm::new(), &FormErrors::default(), next)
}

pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
    jar: CookieJar,
    submission: Submission,
) -> WebResult<Response> {
    let data = submission.form;
    let next = safe_next(data.get("next").or(query.next.as_deref())).to_string();
    let credentials = match auth_forms::clean_login(&data) {
        Ok(credentials) => credentials,
        Err(errors) => return render_login(None, &data, &errors, &next),
    };
    let Some(user) = super::authenticate(&state.db, &credentials.username, &credentials.password)?
    else {
        tracing::warn!("Failed login for {}", credentials.username);
        let errors = FormErrors::single(auth_forms::INVALID_LOGIN);
        return render_login(None, &data, &errors, &next);
    };
    // Never carry a session over from before the login
    if let Some(old) = jar.get(SESSION_COOKIE) {
        state.sessions.remove(old.value());
    }
    let session_id = state.sessions.create(user.user_id);
    tracing::info!("{} logged in", user.username);
    let jar = jar.add(session_cookie(session_id, state.secure_cookies()));
    Ok((jar, Redirect::to(&next)).into_response())
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.remove(cookie.value());
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to("/"))
}

fn render_password_change(user: &User, errors: &FormErrors) -> WebResult<Response> {
    render(
        "auth/password_change.html.jinja",
        Some(user),
        context! {
            form => BoundForm::new(auth_forms::PASSWORD_CHANGE_FIELDS, &RawForm::new())
                .with_errors(errors),
        },
    )
}

pub async fn password_change_form(LoginRequired(user): LoginRequired) -> WebResult<Response> {
    render_password_change(&user, &FormErrors::default())
}

pub async fn password_change(
    State(state): State<AppState>,
    LoginRequired(user): LoginRequired,
    jar: CookieJar,
    submission: Submission,
) -> WebResult<Response> {
    let change = match auth_forms::clean_password_change(&submission.form) {
        Ok(change) => change,
        Err(errors) => return render_password_change(&user, &errors),
    };
    if !super::verify_password(&change.old_password, &user.password_hash) {
        let mut errors = FormErrors::default();
        errors.add(auth_forms::OLD_PASSWORD.name, auth_forms::INCORRECT_OLD_PASSWORD);
        return render_password_change(&user, &errors);
    }
    super::set_password(&state.db, &user, &change.new_password)?;
    if let Some(current) = jar.get(SESSION_COOKIE) {
        state.sessions.remove_others(user.user_id, current.value());
    }
    tracing::info!("{} changed their password", user.username);
    Ok(Redirect::to(PASSWORD_CHANGE_DONE).into_response())
}

pub async fn password_change_done(LoginRequired(user): LoginRequired) -> WebResult<Response> {
    render("auth/password_change_done.html.jinja", Some(&user), context! {})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_stays_on_site() {
        assert_eq!(safe_next(Some("/recipe/1/edit/")), "/recipe/1/edit/");
        assert_eq!(safe_next(Some("//evil.example/")), "/");
        assert_eq!(safe_next(Some("https://evil.example/")), "/");
        assert_eq!(safe_next(Some("/\\evil.example")), "/");
        assert_eq!(safe_next(None), "/");
    }
}
