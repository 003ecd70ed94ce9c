use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use catalog::forms::{recipe, BoundForm, Choice, FormErrors, RawForm};
use minijinja::context;
use serde::Deserialize;

use super::{render, ObjectId, Submission};
use crate::auth::session::{CurrentUser, LoginRequired};
use crate::errors::{WebError, WebResult};
use crate::models::{Ingredient, Recipe, User};
use crate::pagination::{Page, PAGE_SIZE};
use crate::state::AppState;

pub const CANNOT_EDIT: &str = "You can not edit this recipe";
pub const CANNOT_DELETE: &str = "You can not delete this recipe";

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    page: Option<String>,
}

/// Render one page of recipes, ten at a time, in title order
pub async fn index(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PageQuery>,
) -> WebResult<Response> {
    let count = Recipe::count(&state.db)?;
    let page = Page::resolve(query.page.as_deref(), count, PAGE_SIZE);
    let recipes = Recipe::list_page(&state.db, page.offset, page.limit)?;
    render(
        "index.html.jinja",
        user.as_ref(),
        context! {
            recipes => recipes,
            page => page,
            media_url => state.media.url(""),
        },
    )
}

pub async fn detail(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ObjectId(recipe_id): ObjectId,
) -> WebResult<Response> {
    let recipe = Recipe::get_by_id(&state.db, recipe_id)?.ok_or(WebError::NotFound)?;
    let ingredients = recipe.get_ingredients(&state.db)?;
    let is_author = user.as_ref().is_some_and(|u| recipe.is_authored_by(u));
    render(
        "recipe.html.jinja",
        user.as_ref(),
        context! {
            image_url => recipe.image.as_deref().map(|image| state.media.url(image)),
            recipe => recipe,
            ingredients => ingredients,
            is_author => is_author,
        },
    )
}

fn render_form(
    user: &User,
    data: &RawForm,
    errors: &FormErrors,
    choices: Vec<Choice>,
    recipe: Option<&Recipe>,
) -> WebResult<Response> {
    let form = BoundForm::new(recipe::FIELDS, data)
        .with_errors(errors)
        .with_choices(recipe::INGREDIENTS.name, choices);
    render(
        "recipe_form.html.jinja",
        Some(user),
        context! {
            form => form,
            recipe => recipe,
        },
    )
}

pub async fn create_form(
    State(state): State<AppState>,
    LoginRequired(user): LoginRequired,
) -> WebResult<Response> {
    let (_, choices) = Ingredient::choices(&state.db)?;
    render_form(&user, &recipe::blank(), &FormErrors::default(), choices, None)
}

/// Save a new recipe written by the signed-in user
pub async fn create(
    State(state): State<AppState>,
    LoginRequired(user): LoginRequired,
    submission: Submission,
) -> WebResult<Response> {
    let (ingredient_ids, choices) = Ingredient::choices(&state.db)?;
    let cleaned = match recipe::clean(&submission.form, &submission.files, &ingredient_ids) {
        Ok(cleaned) => cleaned,
        Err(errors) => return render_form(&user, &submission.form, &errors, choices, None),
    };
    let image = match cleaned.image {
        Some(file) => Some(state.media.save_recipe_image(file).await?),
        None => None,
    };
    let recipe_id = Recipe::push(
        &state.db,
        &cleaned.fields,
        image.as_deref(),
        Some(user.user_id),
    )?;
    tracing::info!("{} created recipe {}", user.username, recipe_id);
    Ok(Redirect::to(&format!("/recipe/{recipe_id}/")).into_response())
}

/// Load a recipe the user is about to change, refusing anyone but its author.
fn authored_recipe(
    state: &AppState,
    user: &User,
    recipe_id: i64,
    refusal: &'static str,
) -> WebResult<Recipe> {
    let recipe = Recipe::get_by_id(&state.db, recipe_id)?.ok_or(WebError::NotFound)?;
    if !recipe.is_authored_by(user) {
        tracing::warn!("{} tried to change recipe {}", user.username, recipe_id);
        return Err(WebError::Forbidden(refusal));
    }
    Ok(recipe)
}

pub async fn edit_form(
    State(state): State<AppState>,
    LoginRequired(user): LoginRequired,
    ObjectId(recipe_id): ObjectId,
) -> WebResult<Response> {
    let recipe = authored_recipe(&state, &user, recipe_id, CANNOT_EDIT)?;
    let (_, choices) = Ingredient::choices(&state.db)?;
    let initial = recipe::initial(&recipe.fields(&state.db)?);
    render_form(&user, &initial, &FormErrors::default(), choices, Some(&recipe))
}

pub async fn edit(
    State(state): State<AppState>,
    LoginRequired(user): LoginRequired,
    ObjectId(recipe_id): ObjectId,
    submission: Submission,
) -> WebResult<Response> {
    let recipe = authored_recipe(&state, &user, recipe_id, CANNOT_EDIT)?;
    let (ingredient_ids, choices) = Ingredient::choices(&state.db)?;
    let cleaned = match recipe::clean(&submission.form, &submission.files, &ingredient_ids) {
        Ok(cleaned) => cleaned,
        Err(errors) => {
            return render_form(&user, &submission.form, &errors, choices, Some(&recipe))
        }
    };
    let image = match cleaned.image {
        Some(file) => Some(state.media.save_recipe_image(file).await?),
        None => None,
    };
    Recipe::update(&state.db, recipe_id, &cleaned.fields, image.as_deref())?;
    tracing::info!("{} edited recipe {}", user.username, recipe_id);
    Ok(Redirect::to(&format!("/recipe/{recipe_id}/")).into_response())
}

/// Ask before deleting. Anyone signed in may look; only the author may confirm.
pub async fn delete_form(
    State(state): State<AppState>,
    LoginRequired(user): LoginRequired,
    ObjectId(recipe_id): ObjectId,
) -> WebResult<Response> {
    let recipe = Recipe::get_by_id(&state.db, recipe_id)?.ok_or(WebError::NotFound)?;
    render(
        "confirm_delete.html.jinja",
        Some(&user),
        context! {
            object_name => recipe.title,
            kind => "recipe",
            cancel_url => format!("/recipe/{recipe_id}/"),
        },
    )
}

pub async fn delete(
    State(state): State<AppState>,
    LoginRequired(user): LoginRequired,
    ObjectId(recipe_id): ObjectId,
) -> WebResult<Response> {
    authored_recipe(&state, &user, recipe_id, CANNOT_DELETE)?;
    Recipe::delete(&state.db, recipe_id)?;
    tracing::info!("{} deleted recipe {}", user.username, recipe_id);
    Ok(Redirect::to("/").into_response())
}
