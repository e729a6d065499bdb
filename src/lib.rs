pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod forms;
pub mod seed;
pub mod session;
pub mod store;
pub mod visits;

use std::sync::Arc;

use auth::UserStore;
use config::Config;
use session::SessionStore;
use store::Store;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Store,
    pub users: UserStore,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            sessions: SessionStore::new(config.session_cookie.clone(), config.session_ttl),
            config: Arc::new(config),
            store: Store::new(),
            users: UserStore::new(),
        }
    }
}
