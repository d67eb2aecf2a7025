//! HTTP request handlers

mod action_plan;
mod chat;
mod cultivation;
mod farm;
mod health;
mod leaf_quality;
mod market;
mod strategy;

pub use action_plan::*;
pub use chat::*;
pub use cultivation::*;
pub use farm::*;
pub use health::*;
pub use leaf_quality::*;
pub use market::*;
pub use strategy::*;
