// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition plus read-only profile endpoints.
pub mod profiles;
pub mod session;
pub mod users;
