use super::{Detection, StrategiesConfig, Strategy, StrategyContext};
use crate::indicators::{crossed_down, crossed_up, macd};
use crate::models::Side;

const FAST: usize = 12;
const SLOW: usize = 26;
const SIGNAL_PERIOD: usize = 9;

/// MACD line/signal crossover confirmed by the candle's direction.
pub struct MacdCross;

impl Strategy for MacdCross {
    fn id(&self) -> &'static str {
        "macd_cross"
    }

    fn evaluate(&self, ctx: &StrategyContext, _cfg: &StrategiesConfig) -> Option<Detection> {
        if ctx.candles.len() < 2 {
            return None;
        }

        let m = macd(ctx.closes, FAST, SLOW, SIGNAL_PERIOD);
        let i = ctx.closes.len() - 1;
        let candle = ctx.candles.last()?;

        if crossed_up(m.line[i - 1], m.line[i], m.signal[i - 1], m.signal[i])
            && candle.is_bullish()
        {
            return Some(Detection::new(
                Side::Buy,
                0.68,
                "MACD line crossed above its signal on a bullish close",
            ));
        }
        if crossed_down(m.line[i - 1], m.line[i], m.signal[i - 1], m.signal[i])
            && candle.is_bearish()
        {
            return Some(Detection::new(
                Side::Sell,
                0.68,
                "MACD line crossed below its signal on a bearish close",
            ));
        }
        None
    }
}
