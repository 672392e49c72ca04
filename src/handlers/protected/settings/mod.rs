// handlers/protected/settings/mod.rs - /api/settings

pub mod read;
pub mod transfer;
pub mod write;

pub use read::{setting_by_key_get, setting_get, settings_get, thresholds_get};
pub use transfer::{settings_export_post, settings_import_post};
pub use write::{setting_delete, setting_post, setting_put, settings_clear_delete};
