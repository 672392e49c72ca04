// handlers/public/auth/mod.rs - session acquisition

pub mod login;
pub mod superadmin_login;
pub mod utils;

pub use login::login_post;
pub use superadmin_login::superadmin_login_post;
