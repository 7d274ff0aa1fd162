use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Where user, progress and tool records live.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres { database_url: String, max_connections: u32 },
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreBackend,
    pub jwt: JwtConfig,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store = match std::env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".into())
            .as_str()
        {
            "memory" => StoreBackend::Memory,
            "postgres" => StoreBackend::Postgres {
                database_url: std::env::var("DATABASE_URL")?,
                max_connections: std::env::var("DB_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|v| v.parse::<u32>().ok())
                    .unwrap_or(10),
            },
            other => anyhow::bail!("unknown STORE_BACKEND `{other}` (expected postgres or memory)"),
        };
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "pmguide".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "pmguide-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24),
        };
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = std::env::var("APP_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(8080);
        Ok(Self {
            store,
            jwt,
            host,
            port,
        })
    }
}
