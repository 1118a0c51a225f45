use crate::models::Candle;

/// Divide-by-zero floor for a flat high/low range.
const RANGE_FLOOR: f64 = 1e-9;

/// Stochastic %K over the trailing `period` candles, aligned with the input.
///
/// `%K = (close - lowestLow) / (highestHigh - lowestLow) * 100`, within
/// `[0, 100]` for any candle respecting `low <= close <= high`.
pub fn stochastic(candles: &[Candle], period: usize) -> Vec<Option<f64>> {
    candles
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if period == 0 || i + 1 < period {
                return None;
            }
            let window = &candles[i + 1 - period..=i];
            let highest = window.iter().map(|x| x.high).fold(f64::MIN, f64::max);
            let lowest = window.iter().map(|x| x.low).fold(f64::MAX, f64::min);
            Some((c.close - lowest) / (highest - lowest).max(RANGE_FLOOR) * 100.0)
        })
        .collect()
}
