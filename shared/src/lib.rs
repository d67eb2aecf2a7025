//! Shared types and scoring engine for the Tea Farm Advisor
//!
//! This crate contains the domain models and the deterministic scorers shared
//! between the backend and the dashboard (via WASM). Nothing in here performs
//! I/O: callers hand in parsed readings, surface fractions and price series and
//! get plain structured values back.

pub mod config;
pub mod error;
pub mod models;
pub mod scoring;
pub mod types;
pub mod validation;

pub use config::*;
pub use error::*;
pub use models::*;
pub use scoring::*;
pub use types::*;
pub use validation::*;
