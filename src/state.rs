use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::{AppConfig, StoreKind};
use crate::users::{InMemoryUserStore, PgUserStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub config: Arc<AppConfig>,
    /// Present when the store is Postgres-backed; closed on shutdown.
    pub db: Option<PgPool>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        match config.store {
            StoreKind::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL must be set")?;
                let db = PgPoolOptions::new()
                    .max_connections(config.db_max_connections)
                    .connect(url)
                    .await
                    .context("connect to database")?;
                let store = Arc::new(PgUserStore::new(db.clone())) as Arc<dyn UserStore>;
                Ok(Self::from_parts(store, config, Some(db)))
            }
            StoreKind::Memory => {
                tracing::warn!("USER_STORE=memory; users are lost on restart");
                let store = Arc::new(InMemoryUserStore::new()) as Arc<dyn UserStore>;
                Ok(Self::from_parts(store, config, None))
            }
        }
    }

    pub fn from_parts(
        store: Arc<dyn UserStore>,
        config: Arc<AppConfig>,
        db: Option<PgPool>,
    ) -> Self {
        Self { store, config, db }
    }

    /// Releases the connection pool, if any.
    pub async fn close(&self) {
        if let Some(db) = &self.db {
            db.close().await;
            tracing::info!("database pool closed");
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with_store(Arc::new(InMemoryUserStore::new()))
    }

    #[cfg(test)]
    pub fn fake_with_store(store: Arc<dyn UserStore>) -> Self {
        let config = Arc::new(AppConfig {
            store: StoreKind::Memory,
            database_url: None,
            db_max_connections: 1,
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
        });
        Self::from_parts(store, config, None)
    }
}
