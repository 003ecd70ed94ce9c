//! Request handlers for the public site.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Multipart, Path, Request},
    http::{header, request::Parts},
    response::{Html, IntoResponse, Response},
    Form,
};
use catalog::{basic_models::UploadedFile, forms::RawForm};
use minijinja::Value;

use crate::errors::{WebError, WebResult};
use crate::models::User;
use crate::templates;

pub mod ingredients;
pub mod pages;
pub mod recipes;

/// Render a template into a full response.
pub fn render(name: &str, user: Option<&User>, ctx: Value) -> WebResult<Response> {
    Ok(Html(templates::render(name, user, ctx)?).into_response())
}

/// A numeric id taken from the path. Anything that is not a number is simply not found.
pub struct ObjectId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for ObjectId
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| WebError::NotFound)?;
        raw.parse().map(Self).map_err(|_| WebError::NotFound)
    }
}

/// A submitted form, either urlencoded or multipart with file uploads.
#[derive(Debug, Default)]
pub struct Submission {
    pub form: RawForm,
    pub files: Vec<UploadedFile>,
}

#[async_trait]
impl<S> FromRequest<S> for Submission
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));
        if !is_multipart {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| WebError::BadRequest(e.body_text()))?;
            return Ok(Self {
                form: RawForm::from_pairs(pairs),
                files: vec![],
            });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| WebError::BadRequest(e.body_text()))?;
        let mut submission = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| WebError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let content_bytes = field
                        .bytes()
                        .await
                        .map_err(|e| WebError::BadRequest(e.body_text()))?;
                    // Browsers send an empty part for a file input left blank
                    if file_name.is_empty() && content_bytes.is_empty() {
                        continue;
                    }
                    submission.files.push(UploadedFile {
                        field_name: name,
                        file_name,
                        content_type,
                        content_bytes: content_bytes.to_vec(),
                    });
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| WebError::BadRequest(e.body_text()))?;
                    submission.form.push(name, value);
                }
            }
        }
        Ok(submission)
    }
}
