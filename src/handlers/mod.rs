// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) and Protected (JWT auth). Both tiers are mounted under /api;
// protected handlers receive the caller as `Extension<AuthUser>`.
pub mod protected;
pub mod public;
