use std::sync::Arc;

use crate::auth::session::{MemorySessionStore, PgSessionStore, SessionStore};
use crate::auth::{LoginRateLimiter, SessionManager, SessionPolicy, SuperadminCredentials};
use crate::config::{AppConfig, SessionStoreKind};

/// Shared handles passed to middleware and handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionManager,
    pub limiter: Arc<LoginRateLimiter>,
    pub superadmin: Arc<SuperadminCredentials>,
}

impl AppState {
    pub fn new(
        sessions: SessionManager,
        limiter: LoginRateLimiter,
        superadmin: SuperadminCredentials,
    ) -> Self {
        Self {
            sessions,
            limiter: Arc::new(limiter),
            superadmin: Arc::new(superadmin),
        }
    }

    /// Session store, limiter and superadmin accounts as configured
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn SessionStore> = match config.session.store {
            SessionStoreKind::Memory => Arc::new(MemorySessionStore::new()),
            SessionStoreKind::Postgres => Arc::new(PgSessionStore::new()),
        };
        let superadmin = SuperadminCredentials::load(&config.superadmin)?;
        if superadmin.is_configured() {
            tracing::info!("Superadmin login enabled ({} account(s))", superadmin.len());
        }
        Ok(Self::new(
            SessionManager::new(store, SessionPolicy::from_config()),
            LoginRateLimiter::from_config(),
            superadmin,
        ))
    }
}
