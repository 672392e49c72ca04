use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub security: SecurityConfig,
    pub monitoring: MonitoringConfig,
    pub superadmin: SuperadminSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStoreKind {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub store: SessionStoreKind,
    pub cookie_name: String,
    pub absolute_timeout_secs: i64,
    pub inactivity_timeout_secs: i64,
    pub purge_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
    pub secure_cookies: bool,
    pub bcrypt_cost: u32,
    pub login_max_attempts: u32,
    pub login_window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub stale_after_hours: i64,
}

/// Where superadmin credentials come from. Env credentials win over the setup file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuperadminSource {
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub setup_file: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(v) = env::var("NETZWAECHTER_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.server.max_request_size_bytes = v.parse().unwrap_or(self.server.max_request_size_bytes);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            if !v.trim().is_empty() {
                self.database.url = Some(v);
            }
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // Session overrides
        if let Ok(v) = env::var("SESSION_STORE") {
            self.session.store = match v.to_ascii_lowercase().as_str() {
                "memory" => SessionStoreKind::Memory,
                "postgres" | "pg" | "database" => SessionStoreKind::Postgres,
                _ => self.session.store,
            };
        }
        if let Ok(v) = env::var("SESSION_COOKIE_NAME") {
            if !v.is_empty() {
                self.session.cookie_name = v;
            }
        }
        if let Ok(v) = env::var("SESSION_ABSOLUTE_TIMEOUT_SECS") {
            self.session.absolute_timeout_secs = v.parse().unwrap_or(self.session.absolute_timeout_secs);
        }
        if let Ok(v) = env::var("SESSION_INACTIVITY_TIMEOUT_SECS") {
            self.session.inactivity_timeout_secs = v.parse().unwrap_or(self.session.inactivity_timeout_secs);
        }
        if let Ok(v) = env::var("SESSION_PURGE_INTERVAL_SECS") {
            self.session.purge_interval_secs = v.parse().unwrap_or(self.session.purge_interval_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("SECURITY_SECURE_COOKIES") {
            self.security.secure_cookies = v.parse().unwrap_or(self.security.secure_cookies);
        }
        if let Ok(v) = env::var("SECURITY_BCRYPT_COST") {
            self.security.bcrypt_cost = v.parse().unwrap_or(self.security.bcrypt_cost);
        }
        if let Ok(v) = env::var("SECURITY_LOGIN_MAX_ATTEMPTS") {
            self.security.login_max_attempts = v.parse().unwrap_or(self.security.login_max_attempts);
        }
        if let Ok(v) = env::var("SECURITY_LOGIN_WINDOW_SECS") {
            self.security.login_window_secs = v.parse().unwrap_or(self.security.login_window_secs);
        }

        // Monitoring overrides
        if let Ok(v) = env::var("MONITORING_STALE_AFTER_HOURS") {
            self.monitoring.stale_after_hours = v.parse().unwrap_or(self.monitoring.stale_after_hours);
        }

        // Superadmin overrides
        if let Ok(v) = env::var("SUPERADMIN_USERNAME") {
            self.superadmin.username = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("SUPERADMIN_PASSWORD") {
            self.superadmin.password = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("SETUP_APP_PATH") {
            self.superadmin.setup_file = v;
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 4004,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 5,
                run_migrations: false,
            },
            session: SessionConfig {
                store: SessionStoreKind::Postgres,
                cookie_name: "sid".to_string(),
                absolute_timeout_secs: 24 * 60 * 60,
                inactivity_timeout_secs: 2 * 60 * 60,
                purge_interval_secs: 15 * 60,
            },
            security: SecurityConfig {
                cors_origins: vec!["http://localhost:5000".to_string(), "http://localhost:5173".to_string()],
                secure_cookies: false,
                bcrypt_cost: 10,
                login_max_attempts: 10,
                login_window_secs: 15 * 60,
            },
            monitoring: MonitoringConfig { stale_after_hours: 24 },
            superadmin: SuperadminSource::default(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 4004,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                run_migrations: true,
            },
            session: SessionConfig {
                store: SessionStoreKind::Postgres,
                cookie_name: "sid".to_string(),
                absolute_timeout_secs: 24 * 60 * 60,
                inactivity_timeout_secs: 2 * 60 * 60,
                purge_interval_secs: 15 * 60,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://staging.netzwaechter.local".to_string()],
                secure_cookies: true,
                bcrypt_cost: 10,
                login_max_attempts: 5,
                login_window_secs: 15 * 60,
            },
            monitoring: MonitoringConfig { stale_after_hours: 24 },
            superadmin: SuperadminSource::default(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 4004,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                run_migrations: true,
            },
            session: SessionConfig {
                store: SessionStoreKind::Postgres,
                cookie_name: "sid".to_string(),
                absolute_timeout_secs: 24 * 60 * 60,
                inactivity_timeout_secs: 2 * 60 * 60,
                purge_interval_secs: 5 * 60,
            },
            security: SecurityConfig {
                cors_origins: Vec::new(),
                secure_cookies: true,
                bcrypt_cost: 12,
                login_max_attempts: 5,
                login_window_secs: 15 * 60,
            },
            monitoring: MonitoringConfig { stale_after_hours: 24 },
            superadmin: SuperadminSource::default(),
        }
    }
}

impl Default for SuperadminSource {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            setup_file: "setup-app.json".to_string(),
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

// Helper macros for common checks
#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
