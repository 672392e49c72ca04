// handlers/public/mod.rs - endpoints reachable without a session

pub mod auth;
