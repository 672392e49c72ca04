// auth/mod.rs - credentials, sessions and role defaults

pub mod password;
pub mod profile;
pub mod rate_limit;
pub mod session;
pub mod superadmin;

use thiserror::Error;

pub use password::{hash_password, verify_password, verify_password_or_dummy};
pub use profile::{AuthUserResponse, SidebarConfig};
pub use rate_limit::LoginRateLimiter;
pub use session::{
    MemorySessionStore, PgSessionStore, SessionExpiry, SessionManager, SessionPolicy, SessionRecord,
    SessionStore, SessionUser,
};
pub use superadmin::SuperadminCredentials;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("Password task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Failed to read superadmin setup file {path}: {reason}")]
    SetupFile { path: String, reason: String },
}
