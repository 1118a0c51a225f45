// Core modules
pub mod broker;
pub mod candles;
pub mod config;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod pipeline;
pub mod risk;
pub mod sim;
pub mod strategy;

// Re-export commonly used types
pub use candles::CandleStore;
pub use config::{ConfigCell, Settings, TradeMode};
pub use models::{Candle, FeedEvent, Side, Signal, Tick, TradeOrder};
pub use pipeline::Pipeline;
pub use strategy::Strategy;
