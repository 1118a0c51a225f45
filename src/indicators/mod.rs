// Indicator library: pure, stateless functions over closes or candles.
//
// Every function returns a full series aligned with its input, one value per
// input point, with `None` where there is not yet enough history. Crossover
// checks always compare two adjacent points of series built this way.

pub mod crossover;
pub mod macd;
pub mod moving_average;
pub mod rsi;
pub mod stochastic;
pub mod vwap;

pub use crossover::{crossed_down, crossed_up};
pub use macd::{macd, MacdSeries};
pub use moving_average::{ema, sma};
pub use rsi::rsi;
pub use stochastic::stochastic;
pub use vwap::vwap;
