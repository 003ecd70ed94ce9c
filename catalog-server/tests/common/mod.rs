#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use catalog::basic_models::{CookingTime, IngredientFields, RecipeFields};
use catalog_server::{
    auth,
    config::Config,
    models::{Ingredient, Recipe, User},
    routes::create_router,
    state::AppState,
};
use rust_decimal::Decimal;
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub dir: TempDir,
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// A fresh site on a scratch database, after `tweak` adjusts the defaults.
    pub async fn with_config(tweak: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.database.path = dir.path().join("catalog.db").display().to_string();
        config.media.root = dir.path().join("media").display().to_string();
        tweak(&mut config);
        let state = AppState::from_config(config).await.unwrap();
        let router = create_router(state.clone());
        Self { dir, state, router }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, session: Option<&str>) -> Response<Body> {
        let mut request = Request::get(uri);
        if let Some(session) = session {
            request = request.header(header::COOKIE, format!("session_id={session}"));
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(
        &self,
        uri: &str,
        pairs: &[(&str, &str)],
        session: Option<&str>,
    ) -> Response<Body> {
        let mut request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(session) = session {
            request = request.header(header::COOKIE, format!("session_id={session}"));
        }
        self.send(request.body(Body::from(form_body(pairs))).unwrap())
            .await
    }

    /// Create an account and sign it in, returning the user and a session id.
    pub fn sign_in(&self, username: &str, is_staff: bool) -> (User, String) {
        let user = auth::create_user(&self.state.db, username, "kitchen-secret", is_staff).unwrap();
        let session = self.state.sessions.create(user.user_id);
        (user, session)
    }

    pub fn ingredient(&self, name: &str, price: &str) -> i64 {
        Ingredient::push(
            &self.state.db,
            &IngredientFields {
                name: name.into(),
                weight: 10,
                weight_ready: 10,
                price: price.parse::<Decimal>().unwrap(),
            },
        )
        .unwrap()
    }

    pub fn recipe(&self, title: &str, ingredient_ids: Vec<i64>, author: Option<&User>) -> i64 {
        Recipe::push(
            &self.state.db,
            &RecipeFields {
                title: title.into(),
                description: format!("How to make {title}"),
                cooking_time: CookingTime::from_minutes(30),
                ingredient_ids,
            },
            None,
            author.map(|u| u.user_id),
        )
        .unwrap()
    }
}

pub fn form_body(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                url_escape::encode_component(k),
                url_escape::encode_component(v)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}
