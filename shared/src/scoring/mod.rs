//! Deterministic scorers
//!
//! Every function in here is a pure function of its inputs and the injected
//! `ScoringConfig`: no I/O, no clocks, no shared mutable state.

pub mod composite;
pub mod environment;
pub mod leaf;
pub mod market;
pub mod recommendations;
pub mod selling;
pub mod simulator;
pub mod stress;
pub mod surface;

pub use composite::*;
pub use environment::*;
pub use leaf::*;
pub use market::*;
pub use recommendations::*;
pub use selling::*;
pub use simulator::*;
pub use stress::*;
pub use surface::*;
