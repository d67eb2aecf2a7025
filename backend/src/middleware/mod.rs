//! Request middleware

pub mod auth;

pub use auth::{auth_middleware, resolve_farm_id, AuthUser, CurrentUser};
