// Order execution module.
pub mod executor;

pub use executor::{ExecutionOutcome, SkipReason, TradeExecutor, DEBOUNCE_WINDOW_MS};
