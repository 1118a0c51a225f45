use super::{Detection, StrategiesConfig, Strategy, StrategyContext};
use crate::indicators::{rsi, stochastic};
use crate::models::Side;

const OSC_PERIOD: usize = 3;

/// Engulfing pattern faded only from a short-period oscillator extreme.
///
/// A bearish engulfing at RSI(3) > 70 and stochastic(3) > 80 sells the
/// exhaustion; the mirrored bullish case buys it.
pub struct Engulfing;

impl Strategy for Engulfing {
    fn id(&self) -> &'static str {
        "engulfing"
    }

    fn evaluate(&self, ctx: &StrategyContext, _cfg: &StrategiesConfig) -> Option<Detection> {
        let n = ctx.candles.len();
        if n < OSC_PERIOD + 2 {
            return None;
        }

        let prev = &ctx.candles[n - 2];
        let curr = &ctx.candles[n - 1];
        let bullish_engulf = curr.open < prev.close && curr.close > prev.open;
        let bearish_engulf = curr.open > prev.close && curr.close < prev.open;
        if !bullish_engulf && !bearish_engulf {
            return None;
        }

        let r = rsi(ctx.closes, OSC_PERIOD).last().copied().flatten()?;
        let k = stochastic(ctx.candles, OSC_PERIOD).last().copied().flatten()?;

        if bearish_engulf && r > 70.0 && k > 80.0 {
            return Some(Detection::new(
                Side::Sell,
                0.72,
                format!("Bearish engulfing at overbought extreme (RSI {r:.0}, %K {k:.0})"),
            ));
        }
        if bullish_engulf && r < 30.0 && k < 20.0 {
            return Some(Detection::new(
                Side::Buy,
                0.72,
                format!("Bullish engulfing at oversold extreme (RSI {r:.0}, %K {k:.0})"),
            ));
        }
        None
    }
}
