// handlers/protected/auth/mod.rs - current session endpoints

pub mod heartbeat;
pub mod logout;
pub mod me;

pub use heartbeat::heartbeat_post;
pub use logout::logout_post;
pub use me::me_get;
