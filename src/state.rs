use std::sync::Arc;

use crate::auth::jwt::JwtKeys;
use crate::auth::repo::UserStore;
use crate::config::{AppConfig, StoreBackend};
use crate::db::PgStore;
use crate::memory::MemoryStore;
use crate::progress::repo::ProgressStore;
use crate::tools::repo::ToolStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub keys: JwtKeys,
    pub users: Arc<dyn UserStore>,
    pub progress: Arc<dyn ProgressStore>,
    pub tools: Arc<dyn ToolStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        match &config.store {
            StoreBackend::Postgres {
                database_url,
                max_connections,
            } => {
                let store = PgStore::connect(database_url, *max_connections).await?;
                tracing::info!("using postgres store");
                Ok(Self::with_store(config, store))
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory store; data is lost on restart");
                Ok(Self::with_store(config, MemoryStore::new()))
            }
        }
    }

    /// Wire one backend into all three repository slots.
    pub fn with_store<S>(config: Arc<AppConfig>, store: S) -> Self
    where
        S: UserStore + ProgressStore + ToolStore + Clone + 'static,
    {
        let keys = JwtKeys::from_config(&config.jwt);
        Self {
            config,
            keys,
            users: Arc::new(store.clone()),
            progress: Arc::new(store.clone()),
            tools: Arc::new(store),
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            store: StoreBackend::Memory,
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 60 * 24,
            },
            host: "127.0.0.1".into(),
            port: 0,
        });
        Self::with_store(config, MemoryStore::new())
    }
}
