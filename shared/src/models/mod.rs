//! Domain models for the Tea Farm Advisor

mod leaf;
mod market;
mod plan;
mod reading;
mod strategy;

pub use leaf::*;
pub use market::*;
pub use plan::*;
pub use reading::*;
pub use strategy::*;
