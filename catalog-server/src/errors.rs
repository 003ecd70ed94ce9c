use std::fmt::Display;

use axum::{
    http,
    response::{Html, IntoResponse, Response},
};

use crate::templates;

pub type WebResult<T> = std::result::Result<T, WebError>;

#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Internal Server Error: {0}")]
    Internal(#[from] anyhow::Error),
    #[error("Templating error: {0:#}")]
    Template(#[from] minijinja::Error),
    #[error("Bad request: {0}")]
    BadRequest(String),
    /// The actor is known but not allowed; the message is the whole response body.
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("Not found")]
    NotFound,
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        // In development, we want to return the error message
        // In production, we want to return a generic error message
        let display = |err: &dyn Display| {
            if cfg!(debug_assertions) {
                err.to_string()
            } else {
                "Internal Server Error".into()
            }
        };
        match self {
            WebError::Internal(err) => {
                tracing::error!("{:#}", err);
                (http::StatusCode::INTERNAL_SERVER_ERROR, display(&err)).into_response()
            }
            WebError::Template(err) => {
                tracing::error!("{:#}", err);
                (http::StatusCode::INTERNAL_SERVER_ERROR, display(&err)).into_response()
            }
            WebError::BadRequest(msg) => (http::StatusCode::BAD_REQUEST, msg).into_response(),
            WebError::Forbidden(msg) => (http::StatusCode::FORBIDDEN, msg).into_response(),
            WebError::NotFound => match templates::render_not_found() {
                Ok(page) => (http::StatusCode::NOT_FOUND, Html(page)).into_response(),
                Err(err) => {
                    tracing::error!("Rendering the not found page: {:#}", err);
                    (http::StatusCode::NOT_FOUND, "Not Found").into_response()
                }
            },
        }
    }
}
