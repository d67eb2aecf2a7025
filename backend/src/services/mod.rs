//! Business logic services for the Tea Farm Advisor

pub mod action_plan;
pub mod chat;
pub mod cultivation;
pub mod leaf_quality;
pub mod market;
pub mod readings;
pub mod strategy;

pub use action_plan::{ActionPlanService, ActionPlanner};
pub use chat::{ChatAssistant, ChatService};
pub use cultivation::CultivationService;
pub use leaf_quality::{LeafAnalyzer, LeafQualityService};
pub use market::{MarketData, MarketService};
pub use readings::ReadingService;
pub use strategy::StrategyService;
