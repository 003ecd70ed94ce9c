use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::session::Sessions;
use crate::config::Config;
use crate::database::Database;
use crate::storage::MediaStorage;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub sessions: Arc<Sessions>,
    pub config: Arc<Config>,
    pub media: MediaStorage,
}

impl AppState {
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let db = Database::connect(&config.database).await?;
        let sessions = Sessions::from_config(&config.auth).await;
        let media = MediaStorage::from_config(&config.media);
        Ok(Self {
            db,
            sessions,
            config: Arc::new(config),
            media,
        })
    }

    /// Session cookies are only marked secure when we serve TLS ourselves.
    pub fn secure_cookies(&self) -> bool {
        self.config.server.tls.is_some()
    }
}

impl FromRef<AppState> for Database {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for Arc<Sessions> {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for Arc<Config> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
