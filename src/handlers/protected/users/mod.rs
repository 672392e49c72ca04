// handlers/protected/users/mod.rs - /api/users and /api/users/profiles

pub mod accounts;
pub mod password;
pub mod profiles;

pub use accounts::{user_delete, user_get, user_patch, user_post, users_get};
pub use password::change_password_post;
pub use profiles::{profile_delete, profile_post, profile_put, profiles_get};
