pub mod auth;
pub mod response;

pub use auth::{session_auth_middleware, AdminUser, AuthUser, SessionToken, SuperadminUser};
pub use response::{ApiResponse, ApiResult};
