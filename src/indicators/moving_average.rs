/// Simple moving average, aligned with the input.
///
/// `out[i]` is the mean of `values[i + 1 - period ..= i]`, `None` while fewer
/// than `period` points are available.
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    let mut out = Vec::with_capacity(values.len());
    let mut window_sum = 0.0;

    for (i, value) in values.iter().enumerate() {
        window_sum += value;
        if i >= period {
            window_sum -= values[i - period];
        }
        if i + 1 >= period {
            out.push(Some(window_sum / period as f64));
        } else {
            out.push(None);
        }
    }

    out
}

/// Exponential moving average, aligned with the input.
///
/// Seeded with the SMA of the first `period` values at index `period - 1`,
/// then smoothed recursively with `k = 2 / (period + 1)`.
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 || values.len() < period {
        return vec![None; values.len()];
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut out = vec![None; values.len()];

    let mut prev = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(prev);

    for i in period..values.len() {
        prev = values[i] * k + prev * (1.0 - k);
        out[i] = Some(prev);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma_alignment() {
        let prices = vec![100.0, 102.0, 104.0, 106.0, 108.0];
        let out = sma(&prices, 5);

        assert_eq!(out.len(), 5);
        assert_eq!(out[3], None);
        assert_eq!(out[4], Some(104.0));
    }

    #[test]
    fn test_sma_rolls_the_window() {
        let prices = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let out = sma(&prices, 3);

        assert_eq!(out[2], Some(2.0));
        assert_eq!(out[5], Some(5.0));
    }

    #[test]
    fn test_sma_insufficient_data() {
        let prices = vec![100.0, 102.0];
        assert!(sma(&prices, 5).iter().all(Option::is_none));
    }

    #[test]
    fn test_ema_seed_and_smoothing() {
        let prices = vec![100.0, 102.0, 104.0, 106.0, 108.0, 110.0];
        let out = ema(&prices, 5);

        // Seed is the SMA of the first five values.
        assert_eq!(out[4], Some(104.0));
        // 110 * 1/3 + 104 * 2/3
        let next = out[5].unwrap();
        assert!((next - 106.0).abs() < 1e-9);
    }

    #[test]
    fn test_ema_insufficient_data() {
        let prices = vec![100.0, 102.0, 101.0];
        assert!(ema(&prices, 14).iter().all(Option::is_none));
    }
}
