// handlers/protected/mod.rs - endpoints behind the session middleware
//
// Every handler here runs after session_auth_middleware has put the
// SessionUser into the request extensions. Role checks happen through the
// AuthUser / AdminUser / SuperadminUser extractors.

pub mod auth;
pub mod grafana;
pub mod mandants;
pub mod monitoring;
pub mod object_groups;
pub mod objects;
pub mod settings;
pub mod users;
