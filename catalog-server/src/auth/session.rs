use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, Uri},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    CookieJar,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::database::Database;
use crate::errors::WebError;
use crate::models::User;

pub const SESSION_COOKIE: &str = "session_id";
pub const LOGIN_PATH: &str = "/auth/login/";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: i64,
    pub created_on: DateTime<Utc>,
}

/// Signed-in sessions, keyed by the hex id carried in the session cookie.
#[derive(Serialize, Deserialize, Default)]
pub struct Sessions {
    sessions: DashMap<String, SessionRecord>,
    #[serde(skip)]
    ttl_hours: i64,
}

impl Sessions {
    pub fn new(ttl_hours: i64) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl_hours,
        }
    }

    pub async fn from_config(conf: &AuthConfig) -> Arc<Self> {
        let Some(path) = conf.session_storage_path.clone() else {
            return Arc::new(Self::new(conf.session_ttl_hours));
        };
        // A missing or unreadable file just means nobody is signed in yet
        let session_text = tokio::fs::read_to_string(&path).await.unwrap_or_default();
        let mut sessions: Self = serde_json::from_str(&session_text).unwrap_or_default();
        sessions.ttl_hours = conf.session_ttl_hours;
        tracing::info!("Loaded {} sessions from {}", sessions.sessions.len(), path);

        let sessions_ref = Arc::new(sessions);

        // Save the sessions to disk every 5 minutes
        let sessions_ref2 = sessions_ref.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(std::time::Duration::from_secs(300)).await;
                sessions_ref2.purge_expired();
                let saved = match serde_json::to_string(&*sessions_ref2) {
                    Ok(text) => tokio::fs::write(&path, text).await.map_err(anyhow::Error::from),
                    Err(err) => Err(err.into()),
                };
                if let Err(err) = saved {
                    tracing::error!("Saving sessions to {}: {:#}", path, err);
                }
            }
        });

        sessions_ref
    }

    /// Start a session for a user, returning its id.
    pub fn create(&self, user_id: i64) -> String {
        let session_id = hex::encode(rand::random::<[u8; 32]>());
        self.sessions.insert(
            session_id.clone(),
            SessionRecord {
                user_id,
                created_on: Utc::now(),
            },
        );
        session_id
    }

    /// The user behind a live session. Expired sessions are dropped on sight.
    pub fn user_id(&self, session_id: &str) -> Option<i64> {
        let record = self.sessions.get(session_id)?.value().clone();
        if self.is_expired(&record) {
            self.sessions.remove(session_id);
            return None;
        }
        Some(record.user_id)
    }

    pub fn remove(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    /// Sign a user out everywhere except `keep`.
    pub fn remove_others(&self, user_id: i64, keep: &str) {
        self.sessions
            .retain(|id, record| record.user_id != user_id || id == keep);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn is_expired(&self, record: &SessionRecord) -> bool {
        record.created_on + chrono::Duration::hours(self.ttl_hours) < Utc::now()
    }

    fn purge_expired(&self) {
        self.sessions.retain(|_, record| !self.is_expired(record));
    }
}

pub fn session_cookie(session_id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(secure)
        .build()
}

/// Send a visitor to the login page, coming back to `uri` afterwards.
pub fn login_redirect(uri: &Uri) -> Redirect {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let next = url_escape::encode_component(target).replace("%2F", "/");
    Redirect::to(&format!("{LOGIN_PATH}?next={next}"))
}

/// The id of the session cookie on this request, if any.
pub fn session_id(parts: &Parts) -> Option<String> {
    CookieJar::from_headers(&parts.headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

/// The signed-in user, if there is one.
pub struct CurrentUser(pub Option<User>);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    Database: FromRef<S>,
    Arc<Sessions>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(session_id) = session_id(parts) else {
            return Ok(Self(None));
        };
        let sessions = Arc::<Sessions>::from_ref(state);
        let Some(user_id) = sessions.user_id(&session_id) else {
            return Ok(Self(None));
        };
        let db = Database::from_ref(state);
        let user = User::get_by_id(&db, user_id)?;
        if user.is_none() {
            // The account was deleted out from under the session
            sessions.remove(&session_id);
        }
        Ok(Self(user))
    }
}

/// A signed-in user. Anonymous visitors are redirected to the login page.
pub struct LoginRequired(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for LoginRequired
where
    Database: FromRef<S>,
    Arc<Sessions>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        user.map(Self)
            .ok_or_else(|| login_redirect(&parts.uri).into_response())
    }
}

/// A signed-in staff member, as the admin console requires.
pub struct StaffRequired(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for StaffRequired
where
    Database: FromRef<S>,
    Arc<Sessions>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let LoginRequired(user) = LoginRequired::from_request_parts(parts, state).await?;
        if !user.is_staff {
            tracing::warn!("{} is not staff, refusing admin access", user.username);
            return Err(WebError::Forbidden("Staff access required").into_response());
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_expire_and_can_be_revoked() {
        let sessions = Sessions::new(1);
        let first = sessions.create(7);
        let second = sessions.create(7);
        let other = sessions.create(8);
        assert_eq!(first.len(), 64);
        assert_ne!(first, second);
        assert_eq!(sessions.user_id(&first), Some(7));

        sessions.remove_others(7, &second);
        assert_eq!(sessions.user_id(&first), None);
        assert_eq!(sessions.user_id(&second), Some(7));
        assert_eq!(sessions.user_id(&other), Some(8));

        let stale = Sessions::new(0);
        let id = stale.create(1);
        stale.sessions.alter(&id, |_, mut record| {
            record.created_on -= chrono::Duration::minutes(1);
            record
        });
        assert_eq!(stale.user_id(&id), None);
        assert!(stale.is_empty());
    }

    #[test]
    fn login_redirect_keeps_the_target() {
        let uri: Uri = "/recipe/3/edit/?x=1&y=2".parse().unwrap();
        let response = login_redirect(&uri).into_response();
        assert_eq!(
            response.headers()["location"],
            "/auth/login/?next=/recipe/3/edit/%3Fx%3D1%26y%3D2"
        );
    }
}
