use super::{Detection, StrategiesConfig, Strategy, StrategyContext};
use crate::indicators::vwap;
use crate::models::Side;

const WINDOW: usize = 20;
/// Volume multiple over the trailing average that counts as a spike.
const SPIKE_MULTIPLE: f64 = 5.0;

/// Volume-spike exhaustion near VWAP.
///
/// A spike candle that cannot hold its extreme (rejection wick longer than
/// the body) fades back toward VWAP: above it with a long lower wick reads
/// as absorbed selling (buy), below it with a long upper wick as absorbed
/// buying (sell).
pub struct VolumeExhaustion;

impl Strategy for VolumeExhaustion {
    fn id(&self) -> &'static str {
        "volume_exhaustion"
    }

    fn evaluate(&self, ctx: &StrategyContext, _cfg: &StrategiesConfig) -> Option<Detection> {
        let n = ctx.candles.len();
        if n < WINDOW {
            return None;
        }

        let candle = &ctx.candles[n - 1];
        let trailing = &ctx.candles[n - WINDOW..n - 1];
        let avg_volume =
            trailing.iter().map(|c| c.volume as f64).sum::<f64>() / trailing.len() as f64;
        if (candle.volume as f64) < avg_volume * SPIKE_MULTIPLE {
            return None;
        }

        let window_vwap = *vwap(&ctx.candles[n - WINDOW..]).last()?;

        if candle.close < window_vwap && candle.upper_wick() > candle.body() {
            return Some(Detection::new(
                Side::Sell,
                0.66,
                "Volume spike exhausted below VWAP",
            ));
        }
        if candle.close > window_vwap && candle.lower_wick() > candle.body() {
            return Some(Detection::new(
                Side::Buy,
                0.66,
                "Volume spike absorbed above VWAP",
            ));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Candle;
    use std::collections::HashMap;

    fn base_candle(i: usize) -> Candle {
        Candle {
            open_time: i as i64 * 60,
            open: 100.0,
            high: 100.3,
            low: 99.7,
            close: 100.0,
            volume: 10,
            closed: true,
        }
    }

    fn evaluate(candles: &[Candle]) -> Option<Detection> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let all_series = HashMap::from([(60u32, candles.to_vec())]);
        let ctx = StrategyContext {
            instrument: "R_50",
            timeframe: 60,
            candles,
            closes: &closes,
            all_series: &all_series,
        };
        VolumeExhaustion.evaluate(&ctx, &StrategiesConfig::default())
    }

    #[test]
    fn test_spike_rejected_below_vwap_sells() {
        let mut candles: Vec<Candle> = (0..19).map(base_candle).collect();
        // Five times the average volume, long upper wick, close below VWAP.
        candles.push(Candle {
            open_time: 19 * 60,
            open: 99.9,
            high: 101.0,
            low: 99.8,
            close: 99.85,
            volume: 60,
            closed: true,
        });

        let detection = evaluate(&candles).expect("exhaustion should fire");
        assert_eq!(detection.side, Side::Sell);
        assert_eq!(detection.confidence, 0.66);
    }

    #[test]
    fn test_spike_absorbed_above_vwap_buys() {
        let mut candles: Vec<Candle> = (0..19).map(base_candle).collect();
        candles.push(Candle {
            open_time: 19 * 60,
            open: 100.15,
            high: 100.25,
            low: 99.0,
            close: 100.2,
            volume: 60,
            closed: true,
        });

        let detection = evaluate(&candles).expect("absorption should fire");
        assert_eq!(detection.side, Side::Buy);
    }

    #[test]
    fn test_average_volume_stays_quiet() {
        let mut candles: Vec<Candle> = (0..19).map(base_candle).collect();
        candles.push(Candle {
            open_time: 19 * 60,
            open: 99.9,
            high: 101.0,
            low: 99.8,
            close: 99.85,
            volume: 12,
            closed: true,
        });

        assert!(evaluate(&candles).is_none());
    }
}
