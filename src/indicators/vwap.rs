use crate::models::Candle;

/// Volume-weighted average price, cumulative across the given window.
///
/// One value per input candle; the accumulator is not reset mid-window, so
/// `out[i]` weighs every candle up to `i`. Defined from the first point
/// (zero-volume windows fall back to a unit divisor), hence a plain `f64`
/// series rather than an `Option` one.
pub fn vwap(candles: &[Candle]) -> Vec<f64> {
    let mut pv = 0.0;
    let mut volume = 0.0;

    candles
        .iter()
        .map(|c| {
            let typical = (c.high + c.low + c.close) / 3.0;
            pv += typical * c.volume as f64;
            volume += c.volume as f64;
            pv / volume.max(1.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(high: f64, low: f64, close: f64, volume: u64) -> Candle {
        Candle {
            open_time: 0,
            open: close,
            high,
            low,
            close,
            volume,
            closed: true,
        }
    }

    #[test]
    fn test_vwap_single_candle_is_typical_price() {
        let candles = vec![candle(102.0, 98.0, 100.0, 10)];
        let out = vwap(&candles);
        assert!((out[0] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_vwap_weighs_by_volume() {
        let candles = vec![candle(100.0, 100.0, 100.0, 1), candle(110.0, 110.0, 110.0, 9)];
        let out = vwap(&candles);

        // Heavily weighted toward the high-volume candle.
        assert!((out[1] - 109.0).abs() < 1e-9);
    }

    #[test]
    fn test_vwap_zero_volume_does_not_divide_by_zero() {
        let candles = vec![candle(102.0, 98.0, 100.0, 0)];
        let out = vwap(&candles);
        assert_eq!(out[0], 0.0);
    }
}
