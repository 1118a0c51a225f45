use super::{Detection, StrategiesConfig, Strategy, StrategyContext};
use crate::indicators::{crossed_down, crossed_up, ema};
use crate::models::Side;

/// Fast/slow EMA crossover confirmed by the candle's direction.
pub struct EmaCross;

impl Strategy for EmaCross {
    fn id(&self) -> &'static str {
        "ema_cross"
    }

    fn evaluate(&self, ctx: &StrategyContext, cfg: &StrategiesConfig) -> Option<Detection> {
        let params = &cfg.ema_cross;
        if ctx.candles.len() < params.slow + 2 {
            return None;
        }

        let fast = ema(ctx.closes, params.fast);
        let slow = ema(ctx.closes, params.slow);
        let i = ctx.closes.len() - 1;
        let candle = ctx.candles.last()?;

        if crossed_up(fast[i - 1], fast[i], slow[i - 1], slow[i]) && candle.is_bullish() {
            return Some(Detection::new(
                Side::Buy,
                0.75,
                format!(
                    "EMA{} crossed above EMA{} on a bullish close",
                    params.fast, params.slow
                ),
            ));
        }
        if crossed_down(fast[i - 1], fast[i], slow[i - 1], slow[i]) && candle.is_bearish() {
            return Some(Detection::new(
                Side::Sell,
                0.75,
                format!(
                    "EMA{} crossed below EMA{} on a bearish close",
                    params.fast, params.slow
                ),
            ));
        }
        None
    }
}
