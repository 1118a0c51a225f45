use super::{Detection, StrategiesConfig, Strategy, StrategyContext};
use crate::models::Side;

/// Floor for doji-like bodies so the wick ratio stays finite.
const BODY_FLOOR: f64 = 1e-5;

/// Pin-bar rejection: a wick at least `wick_to_body` times the body.
///
/// A long lower wick reads as buyers rejecting lower prices, a long upper
/// wick as sellers rejecting higher ones; the lower wick wins ties.
pub struct PinBar;

impl Strategy for PinBar {
    fn id(&self) -> &'static str {
        "pin_bar"
    }

    fn evaluate(&self, ctx: &StrategyContext, cfg: &StrategiesConfig) -> Option<Detection> {
        let candle = ctx.candles.last()?;
        let ratio = cfg.pin_bar.wick_to_body;
        let body = candle.body().max(BODY_FLOOR);

        if candle.lower_wick() >= ratio * body {
            return Some(Detection::new(
                Side::Buy,
                0.6,
                format!(
                    "Lower wick {:.5} rejected at {}x the body",
                    candle.lower_wick(),
                    ratio
                ),
            ));
        }
        if candle.upper_wick() >= ratio * body {
            return Some(Detection::new(
                Side::Sell,
                0.6,
                format!(
                    "Upper wick {:.5} rejected at {}x the body",
                    candle.upper_wick(),
                    ratio
                ),
            ));
        }
        None
    }
}
