// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Middleware: `jwt_auth_middleware` resolves the bearer token and inserts
// `AuthUser` before any of these run. Ownership checks happen in the services.
pub mod posts;
pub mod profile;
pub mod session;
