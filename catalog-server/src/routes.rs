use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::services::ServeDir;

use crate::state::AppState;
use crate::{admin, auth, views};

/// Build the whole site around a prepared state.
pub fn create_router(state: AppState) -> Router {
    let media = ServeDir::new(state.media.root());
    let media_url = match state.config.media.url.trim_end_matches('/') {
        "" => "/media".to_string(),
        url => url.to_string(),
    };
    let body_limit = state.config.media.max_upload_bytes;
    Router::new()
        .route("/", get(views::recipes::index))
        .route(
            "/recipe/",
            get(views::recipes::create_form).post(views::recipes::create),
        )
        .route("/recipe/:recipe_id/", get(views::recipes::detail))
        .route(
            "/recipe/:recipe_id/edit/",
            get(views::recipes::edit_form).post(views::recipes::edit),
        )
        .route(
            "/recipe/:recipe_id/delete/",
            get(views::recipes::delete_form).post(views::recipes::delete),
        )
        .route("/ingredients/", get(views::ingredients::list))
        .route(
            "/ingredient/",
            get(views::ingredients::create_form).post(views::ingredients::create),
        )
        .route(
            "/ingredient/:ingredient_id/edit/",
            get(views::ingredients::edit_form).post(views::ingredients::edit),
        )
        .route(
            "/ingredient/:ingredient_id/delete/",
            get(views::ingredients::delete_form).post(views::ingredients::delete),
        )
        .route("/about/", get(views::pages::about))
        .route("/form_user_test/", get(views::pages::form_user_test))
        .route(
            "/auth/login/",
            get(auth::route::login_form).post(auth::route::login),
        )
        .route(
            "/auth/logout/",
            get(auth::route::logout).post(auth::route::logout),
        )
        .route(
            "/auth/password_change/",
            get(auth::route::password_change_form).post(auth::route::password_change),
        )
        .route(
            "/auth/password_change/done/",
            get(auth::route::password_change_done),
        )
        .route("/admin/", get(admin::index))
        .route("/admin/:model/", get(admin::change_list))
        .route(
            "/admin/:model/:object_id/change/",
            get(admin::change_form).post(admin::change),
        )
        .route(
            "/admin/:model/:object_id/delete/",
            get(admin::delete_form).post(admin::delete),
        )
        .route("/health", get(views::pages::health))
        .route("/static/*path", get(views::pages::serve_static))
        .nest_service(&media_url, media)
        .fallback(views::pages::not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            tower_http::compression::CompressionLayer::new()
                .quality(tower_http::CompressionLevel::Fastest),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
