use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use catalog::forms::{user as user_form, BoundForm, FormErrors, RawForm};
use minijinja::context;

use super::render;
use crate::auth::session::CurrentUser;
use crate::errors::{WebError, WebResult};

pub async fn about(CurrentUser(user): CurrentUser) -> WebResult<Response> {
    render("about.html.jinja", user.as_ref(), context! {})
}

/// A form that validates its query string and stores nothing.
pub async fn form_user_test(
    CurrentUser(user): CurrentUser,
    Query(pairs): Query<Vec<(String, String)>>,
) -> WebResult<Response> {
    let data = RawForm::from_pairs(pairs);
    let (errors, details) = if data.is_empty() {
        (FormErrors::default(), None)
    } else {
        match user_form::clean(&data) {
            Ok(details) => (FormErrors::default(), Some(details)),
            Err(errors) => (errors, None),
        }
    };
    render(
        "form_user_test.html.jinja",
        user.as_ref(),
        context! {
            form => BoundForm::new(user_form::FIELDS, &data).with_errors(&errors),
            details => details,
        },
    )
}

// Just reply that everything is okay
pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn not_found() -> WebError {
    WebError::NotFound
}

/// Serve static files from in memory using `include_dir!`
pub async fn serve_static(Path(path): Path<String>) -> WebResult<Response> {
    let dir = include_dir::include_dir!("$CARGO_MANIFEST_DIR/static");
    let bytes = dir.get_file(&path).ok_or(WebError::NotFound)?.contents();
    let header = (
        "Content-Type",
        match path.rsplit('.').next() {
            Some("css") => "text/css",
            Some("js") => "text/javascript",
            Some("png") => "image/png",
            Some("svg") => "image/svg+xml",
            _ => "application/octet-stream",
        },
    );
    Ok(([header], bytes).into_response())
}
