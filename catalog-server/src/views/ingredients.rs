use axum::{
    extract::State,
    http::Uri,
    response::{IntoResponse, Redirect, Response},
};
use catalog::forms::{ingredient, BoundForm, FormErrors, RawForm};
use minijinja::context;

use super::{render, ObjectId, Submission};
use crate::auth::session::{login_redirect, CurrentUser, LoginRequired};
use crate::errors::{WebError, WebResult};
use crate::models::{Ingredient, User};
use crate::state::AppState;

const LIST_URL: &str = "/ingredients/";

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> WebResult<Response> {
    let ingredients = Ingredient::list_all(&state.db)?;
    render(
        "ingredients.html.jinja",
        user.as_ref(),
        context! { ingredients => ingredients },
    )
}

fn render_form(
    user: &User,
    data: &RawForm,
    errors: &FormErrors,
    ingredient: Option<&Ingredient>,
) -> WebResult<Response> {
    render(
        "ingredient_form.html.jinja",
        Some(user),
        context! {
            form => BoundForm::new(ingredient::FIELDS, data).with_errors(errors),
            ingredient => ingredient,
        },
    )
}

pub async fn create_form(LoginRequired(user): LoginRequired) -> WebResult<Response> {
    render_form(&user, &RawForm::new(), &FormErrors::default(), None)
}

pub async fn create(
    State(state): State<AppState>,
    LoginRequired(user): LoginRequired,
    submission: Submission,
) -> WebResult<Response> {
    match ingredient::clean(&submission.form) {
        Ok(fields) => {
            let ingredient_id = Ingredient::push(&state.db, &fields)?;
            tracing::info!("{} created ingredient {}", user.username, ingredient_id);
            Ok(Redirect::to(LIST_URL).into_response())
        }
        Err(errors) => render_form(&user, &submission.form, &errors, None),
    }
}

pub async fn edit_form(
    State(state): State<AppState>,
    LoginRequired(user): LoginRequired,
    ObjectId(ingredient_id): ObjectId,
) -> WebResult<Response> {
    let ingredient = Ingredient::get_by_id(&state.db, ingredient_id)?.ok_or(WebError::NotFound)?;
    let initial = ingredient::initial(&ingredient.fields());
    render_form(&user, &initial, &FormErrors::default(), Some(&ingredient))
}

pub async fn edit(
    State(state): State<AppState>,
    LoginRequired(user): LoginRequired,
    ObjectId(ingredient_id): ObjectId,
    submission: Submission,
) -> WebResult<Response> {
    let ingredient = Ingredient::get_by_id(&state.db, ingredient_id)?.ok_or(WebError::NotFound)?;
    match ingredient::clean(&submission.form) {
        Ok(fields) => {
            Ingredient::update(&state.db, ingredient_id, &fields)?;
            tracing::info!("{} edited ingredient {}", user.username, ingredient_id);
            Ok(Redirect::to(LIST_URL).into_response())
        }
        Err(errors) => render_form(&user, &submission.form, &errors, Some(&ingredient)),
    }
}

/// Anonymous deletion is allowed unless the configuration closes it.
fn check_delete_allowed(state: &AppState, user: Option<&User>, uri: &Uri) -> Option<Response> {
    (state.config.auth.require_login_for_ingredient_delete && user.is_none())
        .then(|| login_redirect(uri).into_response())
}

pub async fn delete_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ObjectId(ingredient_id): ObjectId,
    uri: Uri,
) -> WebResult<Response> {
    if let Some(redirect) = check_delete_allowed(&state, user.as_ref(), &uri) {
        return Ok(redirect);
    }
    let ingredient = Ingredient::get_by_id(&state.db, ingredient_id)?.ok_or(WebError::NotFound)?;
    render(
        "confirm_delete.html.jinja",
        user.as_ref(),
        context! {
            object_name => ingredient.name,
            kind => "ingredient",
            cancel_url => LIST_URL,
        },
    )
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ObjectId(ingredient_id): ObjectId,
    uri: Uri,
) -> WebResult<Response> {
    if let Some(redirect) = check_delete_allowed(&state, user.as_ref(), &uri) {
        return Ok(redirect);
    }
    if !Ingredient::delete(&state.db, ingredient_id)? {
        return Err(WebError::NotFound);
    }
    let actor = user.as_ref().map_or("anonymous", |u| u.username.as_str());
    tracing::info!("{} deleted ingredient {}", actor, ingredient_id);
    Ok(Redirect::to(LIST_URL).into_response())
}
