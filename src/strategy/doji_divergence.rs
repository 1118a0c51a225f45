use super::{Detection, StrategiesConfig, Strategy, StrategyContext};
use crate::indicators::macd;
use crate::models::Side;

const MIN_CANDLES: usize = 10;
/// Body-to-range ceiling below which a candle counts as a doji.
const DOJI_BODY_RATIO: f64 = 0.15;

/// Doji against the MACD histogram: indecision while momentum disagrees
/// with the last close-to-close move.
pub struct DojiDivergence;

impl Strategy for DojiDivergence {
    fn id(&self) -> &'static str {
        "doji_divergence"
    }

    fn evaluate(&self, ctx: &StrategyContext, _cfg: &StrategiesConfig) -> Option<Detection> {
        let n = ctx.candles.len();
        if n < MIN_CANDLES {
            return None;
        }

        let candle = &ctx.candles[n - 1];
        let range = candle.full_range();
        let range = if range == 0.0 { 1.0 } else { range };
        if candle.body() / range >= DOJI_BODY_RATIO {
            return None;
        }

        let hist = macd(ctx.closes, 12, 26, 9)
            .histogram
            .last()
            .copied()
            .flatten()?;
        let prev_close = ctx.candles[n - 2].close;

        if hist > 0.0 && candle.close < prev_close {
            return Some(Detection::new(
                Side::Buy,
                0.58,
                "Doji dip against a rising MACD histogram",
            ));
        }
        if hist < 0.0 && candle.close > prev_close {
            return Some(Detection::new(
                Side::Sell,
                0.58,
                "Doji pop against a falling MACD histogram",
            ));
        }
        None
    }
}
