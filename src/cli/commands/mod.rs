pub mod classify;
pub mod grafana;
pub mod password;
pub mod settings;
pub mod status;
