/// Divide-by-zero floor for the average loss.
const LOSS_FLOOR: f64 = 1e-9;

/// Relative Strength Index with Wilder smoothing, aligned with the input.
///
/// The first defined point (index `period`) uses the average gain/loss over
/// the first `period` deltas; every later point smooths with weight
/// `1/period`. Output stays within `[0, 100]`.
pub fn rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = values.len();
    if period == 0 || n <= period {
        return vec![None; n];
    }

    let mut out = vec![None; n];
    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;

    for i in 1..=period {
        let delta = values[i] - values[i - 1];
        if delta >= 0.0 {
            gain_sum += delta;
        } else {
            loss_sum -= delta;
        }
    }

    let mut avg_gain = gain_sum / period as f64;
    let mut avg_loss = loss_sum / period as f64;
    out[period] = Some(rsi_point(avg_gain, avg_loss));

    for i in period + 1..n {
        let delta = values[i] - values[i - 1];
        avg_gain = (avg_gain * (period as f64 - 1.0) + delta.max(0.0)) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + (-delta).max(0.0)) / period as f64;
        out[i] = Some(rsi_point(avg_gain, avg_loss));
    }

    out
}

fn rsi_point(avg_gain: f64, avg_loss: f64) -> f64 {
    let rs = avg_gain / avg_loss.max(LOSS_FLOOR);
    100.0 - 100.0 / (1.0 + rs)
}
