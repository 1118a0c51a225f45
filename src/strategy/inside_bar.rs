use super::{Detection, StrategiesConfig, Strategy, StrategyContext};
use crate::models::Side;

/// Inside-bar breakout confirmed by volume expansion.
///
/// Mother bar, inside bar, then a breakout candle closing beyond the mother
/// bar's range on more volume than the inside bar traded.
pub struct InsideBar;

impl Strategy for InsideBar {
    fn id(&self) -> &'static str {
        "inside_bar"
    }

    fn evaluate(&self, ctx: &StrategyContext, _cfg: &StrategiesConfig) -> Option<Detection> {
        let n = ctx.candles.len();
        if n < 3 {
            return None;
        }

        let mother = &ctx.candles[n - 3];
        let inside = &ctx.candles[n - 2];
        let breakout = &ctx.candles[n - 1];

        let is_inside = inside.high <= mother.high && inside.low >= mother.low;
        if !is_inside || breakout.volume <= inside.volume {
            return None;
        }

        if breakout.close > mother.high {
            return Some(Detection::new(
                Side::Buy,
                0.7,
                "Breakout above the mother bar on expanding volume",
            ));
        }
        if breakout.close < mother.low {
            return Some(Detection::new(
                Side::Sell,
                0.7,
                "Breakdown below the mother bar on expanding volume",
            ));
        }
        None
    }
}
