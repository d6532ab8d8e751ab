//! Application state - shared across all handlers.

use std::sync::Arc;

use yatube_core::ports::{GroupRepository, PostRepository, UserRepository};
use yatube_infra::database::{
    InMemoryGroupRepository, InMemoryPostRepository, InMemoryUserRepository,
};

use crate::config::AppConfig;

#[cfg(feature = "postgres")]
use yatube_infra::database::{
    PostgresGroupRepository, PostgresPostRepository, PostgresUserRepository,
};

/// Which store the repositories are backed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Postgres,
    InMemory,
}

impl Storage {
    pub fn as_str(self) -> &'static str {
        match self {
            Storage::Postgres => "postgres",
            Storage::InMemory => "memory",
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub storage: Storage,
    pub login_url: String,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        #[cfg(feature = "postgres")]
        let state = match &config.database {
            Some(db_config) => match yatube_infra::database::connect(db_config).await {
                Ok(conn) => Self {
                    users: Arc::new(PostgresUserRepository::new(conn.clone())),
                    groups: Arc::new(PostgresGroupRepository::new(conn.clone())),
                    posts: Arc::new(PostgresPostRepository::new(conn)),
                    storage: Storage::Postgres,
                    login_url: config.login_url.clone(),
                },
                Err(e) => {
                    tracing::error!(
                        "Failed to connect to database: {}. Using in-memory fallback.",
                        e
                    );
                    Self::in_memory(config.login_url.clone())
                }
            },
            None => {
                tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
                Self::in_memory(config.login_url.clone())
            }
        };

        #[cfg(not(feature = "postgres"))]
        let state = {
            tracing::info!("Running without postgres feature - using in-memory repositories");
            Self::in_memory(config.login_url.clone())
        };

        tracing::info!(storage = state.storage.as_str(), "Application state initialized");
        state
    }

    /// State backed by empty in-memory repositories.
    pub fn in_memory(login_url: String) -> Self {
        Self {
            users: Arc::new(InMemoryUserRepository::new()),
            groups: Arc::new(InMemoryGroupRepository::new()),
            posts: Arc::new(InMemoryPostRepository::new()),
            storage: Storage::InMemory,
            login_url,
        }
    }
}
