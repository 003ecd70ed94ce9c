//! A small staff-only console over the catalog tables.
//!
//! Each registered model gets a change list showing its `LIST_DISPLAY` columns,
//! a change form and a delete confirmation. Recipes also carry an inline for
//! their ingredient links.

use anyhow::Result;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use catalog::{
    basic_models::RecipeFields,
    forms::{ingredient, recipe, BoundForm, Choice, Cleaner, FieldKind, FieldSpec, FormErrors, RawForm, Widget},
};
use minijinja::{context, Value};
use serde::Serialize;

use crate::auth::session::StaffRequired;
use crate::database::Database;
use crate::errors::{WebError, WebResult};
use crate::models::{Ingredient, Recipe, User};
use crate::state::AppState;
use crate::views::{render, Submission};

/// New ingredient rows offered under a recipe.
pub const EXTRA_INLINE_ROWS: usize = 5;

const AUTHOR: FieldSpec = FieldSpec {
    name: "author",
    label: "Author",
    help_text: "",
    required: false,
    kind: FieldKind::ModelChoice,
    widget: Widget::Select,
};

const RECIPE_FIELDS: &[FieldSpec] = &[
    recipe::TITLE,
    recipe::DESCRIPTION,
    recipe::COOKING_TIME,
    AUTHOR,
];

const DELETE_LINK: &str = "delete_link";
const ADD_INGREDIENT: &str = "add_ingredient";
const DUPLICATE_INGREDIENT: &str =
    "Please correct the duplicate data for ingredient, which must be unique.";

/// A table exposed in the console.
pub trait AdminModel: Serialize + Sized {
    const NAME: &'static str;
    const PLURAL: &'static str;
    const LIST_DISPLAY: &'static [&'static str];

    fn list(db: &Database) -> Result<Vec<Self>>;
    fn count(db: &Database) -> Result<usize>;
    fn get(db: &Database, id: i64) -> Result<Option<Self>>;
    fn delete(db: &Database, id: i64) -> Result<bool>;
    fn id(&self) -> i64;
    fn label(&self) -> String;
}

impl AdminModel for Recipe {
    const NAME: &'static str = "recipe";
    const PLURAL: &'static str = "Recipes";
    const LIST_DISPLAY: &'static [&'static str] = &["title", "description"];

    fn list(db: &Database) -> Result<Vec<Self>> {
        Recipe::list_all(db)
    }
    fn count(db: &Database) -> Result<usize> {
        Recipe::count(db)
    }
    fn get(db: &Database, id: i64) -> Result<Option<Self>> {
        Recipe::get_by_id(db, id)
    }
    fn delete(db: &Database, id: i64) -> Result<bool> {
        Recipe::delete(db, id)
    }
    fn id(&self) -> i64 {
        self.recipe_id
    }
    fn label(&self) -> String {
        self.title.clone()
    }
}

impl AdminModel for Ingredient {
    const NAME: &'static str = "ingredient";
    const PLURAL: &'static str = "Ingredients";
    const LIST_DISPLAY: &'static [&'static str] = &["name", "weight", "weight_ready", "price"];

    fn list(db: &Database) -> Result<Vec<Self>> {
        Ingredient::list_all(db)
    }
    fn count(db: &Database) -> Result<usize> {
        Ingredient::count(db)
    }
    fn get(db: &Database, id: i64) -> Result<Option<Self>> {
        Ingredient::get_by_id(db, id)
    }
    fn delete(db: &Database, id: i64) -> Result<bool> {
        Ingredient::delete(db, id)
    }
    fn id(&self) -> i64 {
        self.ingredient_id
    }
    fn label(&self) -> String {
        self.name.clone()
    }
}

/// The `<model>` segment of an admin url.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ModelName {
    Recipe,
    Ingredient,
}

impl ModelName {
    fn parse(raw: &str) -> WebResult<Self> {
        raw.parse().map_err(|_| WebError::NotFound)
    }
}

fn parse_id(raw: &str) -> WebResult<i64> {
    raw.parse().map_err(|_| WebError::NotFound)
}

#[derive(Serialize)]
struct ModelSummary {
    name: &'static str,
    plural: &'static str,
    count: usize,
}

fn summary<M: AdminModel>(db: &Database) -> Result<ModelSummary> {
    Ok(ModelSummary {
        name: M::NAME,
        plural: M::PLURAL,
        count: M::count(db)?,
    })
}

#[derive(Serialize)]
struct ChangeListRow {
    id: i64,
    cells: Vec<String>,
}

fn render_change_list<M: AdminModel>(db: &Database, user: &User) -> WebResult<Response> {
    let rows = M::list(db)?
        .iter()
        .map(|object| {
            let value = Value::from_serialize(object);
            let cells = M::LIST_DISPLAY
                .iter()
                .map(|column| {
                    value
                        .get_attr(column)
                        .map(|cell| cell.to_string())
                        .unwrap_or_default()
                })
                .collect();
            ChangeListRow {
                id: object.id(),
                cells,
            }
        })
        .collect::<Vec<_>>();
    render(
        "admin/change_list.html.jinja",
        Some(user),
        context! {
            model => M::NAME,
            plural => M::PLURAL,
            columns => M::LIST_DISPLAY,
            rows => rows,
        },
    )
}

pub async fn index(
    State(state): State<AppState>,
    StaffRequired(user): StaffRequired,
) -> WebResult<Response> {
    let models = [
        summary::<Recipe>(&state.db)?,
        summary::<Ingredient>(&state.db)?,
    ];
    render("admin/index.html.jinja", Some(&user), context! { models => models })
}

pub async fn change_list(
    State(state): State<AppState>,
    StaffRequired(user): StaffRequired,
    Path(model): Path<String>,
) -> WebResult<Response> {
    match ModelName::parse(&model)? {
        ModelName::Recipe => render_change_list::<Recipe>(&state.db, &user),
        ModelName::Ingredient => render_change_list::<Ingredient>(&state.db, &user),
    }
}

/// An existing ingredient link as the inline shows it.
#[derive(Serialize)]
struct InlineLink {
    ingredient_id: i64,
    name: String,
    delete: bool,
}

/// The recipe change form, with its ingredient inline.
struct RecipeChange<'a> {
    user: &'a User,
    recipe: &'a Recipe,
    data: &'a RawForm,
    errors: &'a FormErrors,
}

impl RecipeChange<'_> {
    fn render(&self, db: &Database) -> WebResult<Response> {
        let authors = User::list_all(db)?
            .into_iter()
            .map(|u| Choice::new(u.user_id, u.username))
            .collect();
        let (_, ingredient_choices) = Ingredient::choices(db)?;
        let removed = self.data.get_all(DELETE_LINK).collect::<Vec<_>>();
        let links = self
            .recipe
            .get_ingredients(db)?
            .into_iter()
            .map(|i| InlineLink {
                delete: removed.contains(&i.ingredient_id.to_string().as_str()),
                ingredient_id: i.ingredient_id,
                name: i.name,
            })
            .collect::<Vec<_>>();
        let mut added = self.data.get_all(ADD_INGREDIENT).map(str::to_string).collect::<Vec<_>>();
        added.resize(EXTRA_INLINE_ROWS.max(added.len()), String::new());
        render(
            "admin/change_form.html.jinja",
            Some(self.user),
            context! {
                model => Recipe::NAME,
                object_id => self.recipe.recipe_id,
                object_label => self.recipe.title.clone(),
                form => BoundForm::new(RECIPE_FIELDS, self.data)
                    .with_errors(self.errors)
                    .with_choices(AUTHOR.name, authors),
                links => links,
                added => added,
                ingredient_choices => ingredient_choices,
                inline_errors => self.errors.field(ADD_INGREDIENT),
            },
        )
    }
}

fn recipe_initial(recipe: &Recipe) -> RawForm {
    let mut data = RawForm::from_pairs([
        (recipe::TITLE.name, recipe.title.clone()),
        (recipe::DESCRIPTION.name, recipe.description.clone()),
        (recipe::COOKING_TIME.name, recipe.cooking_time.to_string()),
    ]);
    if let Some(author_id) = recipe.author_id {
        data.push(AUTHOR.name, author_id.to_string());
    }
    data
}

/// Work out the link set after removals and additions, flagging duplicates.
fn clean_inline(
    cleaner: &mut Cleaner,
    data: &RawForm,
    existing: &[i64],
    available: &[i64],
) -> Vec<i64> {
    let removed = data
        .get_all(DELETE_LINK)
        .filter_map(|id| id.parse::<i64>().ok())
        .collect::<Vec<_>>();
    let mut kept = existing
        .iter()
        .copied()
        .filter(|id| !removed.contains(id))
        .collect::<Vec<_>>();
    for value in data.get_all(ADD_INGREDIENT).map(str::trim).filter(|v| !v.is_empty()) {
        match value.parse::<i64>() {
            Ok(id) if available.contains(&id) => {
                if kept.contains(&id) {
                    cleaner.add_error(ADD_INGREDIENT, DUPLICATE_INGREDIENT);
                } else {
                    kept.push(id);
                }
            }
            _ => cleaner.add_error(
                ADD_INGREDIENT,
                "Select a valid choice. That choice is not one of the available choices.",
            ),
        }
    }
    kept
}

fn save_recipe(
    db: &Database,
    user: &User,
    recipe: &Recipe,
    data: &RawForm,
) -> WebResult<Response> {
    let user_ids = User::list_all(db)?
        .iter()
        .map(|u| u.user_id)
        .collect::<Vec<_>>();
    let (ingredient_ids, _) = Ingredient::choices(db)?;
    let existing = recipe.fields(db)?.ingredient_ids;

    let mut cleaner = Cleaner::new(data);
    let title = cleaner.char(&recipe::TITLE);
    let description = cleaner.char(&recipe::DESCRIPTION);
    let cooking_time = cleaner.duration(&recipe::COOKING_TIME);
    let author = cleaner.model_choice(&AUTHOR, &user_ids);
    let links = clean_inline(&mut cleaner, data, &existing, &ingredient_ids);
    match (title, description, cooking_time, author) {
        (Some(title), Some(description), Some(cooking_time), Some(author_id))
            if cleaner.is_valid() =>
        {
            let fields = RecipeFields {
                title,
                description,
                cooking_time,
                ingredient_ids: links,
            };
            Recipe::update_with_author(db, recipe.recipe_id, &fields, author_id)?;
            tracing::info!("{} changed recipe {} in admin", user.username, recipe.recipe_id);
            Ok(Redirect::to("/admin/recipe/").into_response())
        }
        _ => RecipeChange {
            user,
            recipe,
            data,
            errors: &cleaner.into_errors(),
        }
        .render(db),
    }
}

fn render_ingredient_change(
    user: &User,
    ingredient: &Ingredient,
    data: &RawForm,
    errors: &FormErrors,
) -> WebResult<Response> {
    render(
        "admin/change_form.html.jinja",
        Some(user),
        context! {
            model => Ingredient::NAME,
            object_id => ingredient.ingredient_id,
            object_label => ingredient.name.clone(),
            form => BoundForm::new(ingredient::FIELDS, data).with_errors(errors),
        },
    )
}

pub async fn change_form(
    State(state): State<AppState>,
    StaffRequired(user): StaffRequired,
    Path((model, id)): Path<(String, String)>,
) -> WebResult<Response> {
    let model = ModelName::parse(&model)?;
    let id = parse_id(&id)?;
    match model {
        ModelName::Recipe => {
            let recipe = Recipe::get_by_id(&state.db, id)?.ok_or(WebError::NotFound)?;
            RecipeChange {
                user: &user,
                recipe: &recipe,
                data: &recipe_initial(&recipe),
                errors: &FormErrors::default(),
            }
            .render(&state.db)
        }
        ModelName::Ingredient => {
            let ingredient = Ingredient::get_by_id(&state.db, id)?.ok_or(WebError::NotFound)?;
            let initial = ingredient::initial(&ingredient.fields());
            render_ingredient_change(&user, &ingredient, &initial, &FormErrors::default())
        }
    }
}

pub async fn change(
    State(state): State<AppState>,
    StaffRequired(user): StaffRequired,
    Path((model, id)): Path<(String, String)>,
    submission: Submission,
) -> WebResult<Response> {
    let model = ModelName::parse(&model)?;
    let id = parse_id(&id)?;
    match model {
        ModelName::Recipe => {
            let recipe = Recipe::get_by_id(&state.db, id)?.ok_or(WebError::NotFound)?;
            save_recipe(&state.db, &user, &recipe, &submission.form)
        }
        ModelName::Ingredient => {
            let ingredient = Ingredient::get_by_id(&state.db, id)?.ok_or(WebError::NotFound)?;
            match ingredient::clean(&submission.form) {
                Ok(fields) => {
                    Ingredient::update(&state.db, id, &fields)?;
                    tracing::info!("{} changed ingredient {} in admin", user.username, id);
                    Ok(Redirect::to("/admin/ingredient/").into_response())
                }
                Err(errors) => {
                    render_ingredient_change(&user, &ingredient, &submission.form, &errors)
                }
            }
        }
    }
}

fn render_delete<M: AdminModel>(db: &Database, user: &User, id: i64) -> WebResult<Response> {
    let object = M::get(db, id)?.ok_or(WebError::NotFound)?;
    render(
        "confirm_delete.html.jinja",
        Some(user),
        context! {
            object_name => object.label(),
            kind => M::NAME,
            cancel_url => format!("/admin/{}/{}/change/", M::NAME, object.id()),
        },
    )
}

fn delete_object<M: AdminModel>(db: &Database, user: &User, id: i64) -> WebResult<Response> {
    if !M::delete(db, id)? {
        return Err(WebError::NotFound);
    }
    tracing::info!("{} deleted {} {} in admin", user.username, M::NAME, id);
    Ok(Redirect::to(&format!("/admin/{}/", M::NAME)).into_response())
}

pub async fn delete_form(
    State(state): State<AppState>,
    StaffRequired(user): StaffRequired,
    Path((model, id)): Path<(String, String)>,
) -> WebResult<Response> {
    let id = parse_id(&id)?;
    match ModelName::parse(&model)? {
        ModelName::Recipe => render_delete::<Recipe>(&state.db, &user, id),
        ModelName::Ingredient => render_delete::<Ingredient>(&state.db, &user, id),
    }
}

pub async fn delete(
    State(state): State<AppState>,
    StaffRequired(user): StaffRequired,
    Path((model, id)): Path<(String, String)>,
) -> WebResult<Response> {
    let id = parse_id(&id)?;
    match ModelName::parse(&model)? {
        ModelName::Recipe => delete_object::<Recipe>(&state.db, &user, id),
        ModelName::Ingredient => delete_object::<Ingredient>(&state.db, &user, id),
    }
}
