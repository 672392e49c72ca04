// handlers/mod.rs - two security tiers
//
// Public (no session) -> /api/auth/login, /api/auth/superadmin-login
// Protected (session cookie) -> everything else under /api

pub mod protected;
pub mod public;
