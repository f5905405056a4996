use std::sync::Arc;

use crate::auth::jwt::JwtKeys;
use crate::auth::repo::{PgUserRepo, UserRepo};
use crate::config::AppConfig;
use crate::db;
use crate::forum::repo::{ForumRepo, PgForumRepo};
use crate::memory::MemoryStore;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepo>,
    pub forum: Arc<dyn ForumRepo>,
    pub config: Arc<AppConfig>,
    pub keys: JwtKeys,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let Some(database_url) = config.database_url.clone() else {
            tracing::warn!("no database configured; using the in-memory store");
            return Ok(Self::in_memory(config));
        };

        let pool = db::connect(&database_url, config.db_max_connections).await?;
        if let Err(e) = db::migrate(&pool).await {
            tracing::warn!(error = %format!("{e:#}"), "migration failed; continuing");
        }

        let users = Arc::new(PgUserRepo::new(pool.clone())) as Arc<dyn UserRepo>;
        let forum = Arc::new(PgForumRepo::new(pool)) as Arc<dyn ForumRepo>;
        Ok(Self::from_parts(users, forum, config))
    }

    pub fn from_parts(
        users: Arc<dyn UserRepo>,
        forum: Arc<dyn ForumRepo>,
        config: AppConfig,
    ) -> Self {
        let keys = JwtKeys::from_config(&config.jwt);
        Self {
            users,
            forum,
            config: Arc::new(config),
            keys,
        }
    }

    pub fn in_memory(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::default());
        Self::from_parts(
            store.clone() as Arc<dyn UserRepo>,
            store as Arc<dyn ForumRepo>,
            config,
        )
    }

    #[cfg(test)]
    pub(crate) fn fake() -> Self {
        use crate::config::{CookieConfig, JwtConfig, SubjectCheck};

        Self::in_memory(AppConfig {
            database_url: None,
            db_max_connections: 1,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_days: 30,
            },
            cookie: CookieConfig {
                name: "Authorization".into(),
                domain: None,
                secure: true,
            },
            subject_check: SubjectCheck::Lookup,
            cors_allowed_origins: Vec::new(),
            listen_addr: std::net::SocketAddr::from(([127, 0, 0, 1], 0)),
        })
    }
}
