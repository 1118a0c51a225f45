use super::moving_average::ema;

/// MACD line, signal and histogram, all aligned with the input.
#[derive(Debug, Clone)]
pub struct MacdSeries {
    pub line: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

/// Moving Average Convergence/Divergence.
///
/// `line = ema(fast) - ema(slow)`; the signal is an EMA over the defined
/// portion of the line only, re-expanded to input alignment, so the first
/// defined signal point sits at index `slow - 1 + signal_period - 1`.
pub fn macd(values: &[f64], fast: usize, slow: usize, signal_period: usize) -> MacdSeries {
    let fast_ema = ema(values, fast);
    let slow_ema = ema(values, slow);

    let line: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect();

    let defined: Vec<f64> = line.iter().copied().flatten().collect();
    let signal_compact = ema(&defined, signal_period);

    let mut signal = vec![None; line.len()];
    let mut compact_idx = 0;
    for (i, value) in line.iter().enumerate() {
        if value.is_some() {
            signal[i] = signal_compact.get(compact_idx).copied().flatten();
            compact_idx += 1;
        }
    }

    let histogram = line
        .iter()
        .zip(&signal)
        .map(|(l, s)| match (l, s) {
            (Some(l), Some(s)) => Some(l - s),
            _ => None,
        })
        .collect();

    MacdSeries {
        line,
        signal,
        histogram,
    }
}
