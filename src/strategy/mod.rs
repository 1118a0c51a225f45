// Trading strategy module.
//
// Each strategy is a pure function of the closed-candle context and the
// indicator library; the engine owns enablement, dedup and the signal log.
pub mod doji_divergence;
pub mod ema_cross;
pub mod engulfing;
pub mod inside_bar;
pub mod macd_cross;
pub mod pin_bar;
pub mod volume_exhaustion;

pub use doji_divergence::DojiDivergence;
pub use ema_cross::EmaCross;
pub use engulfing::Engulfing;
pub use inside_bar::InsideBar;
pub use macd_cross::MacdCross;
pub use pin_bar::PinBar;
pub use volume_exhaustion::VolumeExhaustion;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::models::{Candle, Side, Signal};

/// Per-strategy toggles and tunables, carried in the configuration snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StrategiesConfig {
    pub ema_cross: EmaCrossParams,
    pub macd_cross: StrategyToggle,
    pub pin_bar: PinBarParams,
    pub engulfing: StrategyToggle,
    pub inside_bar: StrategyToggle,
    pub doji_divergence: StrategyToggle,
    pub volume_exhaustion: StrategyToggle,
}

impl Default for StrategiesConfig {
    fn default() -> Self {
        Self {
            ema_cross: EmaCrossParams::default(),
            macd_cross: StrategyToggle::default(),
            pin_bar: PinBarParams::default(),
            engulfing: StrategyToggle::default(),
            inside_bar: StrategyToggle::default(),
            doji_divergence: StrategyToggle::default(),
            volume_exhaustion: StrategyToggle::default(),
        }
    }
}

impl StrategiesConfig {
    pub fn is_enabled(&self, strategy_id: &str) -> bool {
        match strategy_id {
            "ema_cross" => self.ema_cross.enabled,
            "macd_cross" => self.macd_cross.enabled,
            "pin_bar" => self.pin_bar.enabled,
            "engulfing" => self.engulfing.enabled,
            "inside_bar" => self.inside_bar.enabled,
            "doji_divergence" => self.doji_divergence.enabled,
            "volume_exhaustion" => self.volume_exhaustion.enabled,
            _ => false,
        }
    }

    /// Flip one strategy on or off. Returns false for an unknown id.
    pub fn set_enabled(&mut self, strategy_id: &str, enabled: bool) -> bool {
        match strategy_id {
            "ema_cross" => self.ema_cross.enabled = enabled,
            "macd_cross" => self.macd_cross.enabled = enabled,
            "pin_bar" => self.pin_bar.enabled = enabled,
            "engulfing" => self.engulfing.enabled = enabled,
            "inside_bar" => self.inside_bar.enabled = enabled,
            "doji_divergence" => self.doji_divergence.enabled = enabled,
            "volume_exhaustion" => self.volume_exhaustion.enabled = enabled,
            _ => return false,
        }
        true
    }

    /// Convenience for tests and presets: everything off.
    pub fn all_disabled() -> Self {
        let mut cfg = Self::default();
        for id in [
            "ema_cross",
            "macd_cross",
            "pin_bar",
            "engulfing",
            "inside_bar",
            "doji_divergence",
            "volume_exhaustion",
        ] {
            cfg.set_enabled(id, false);
        }
        cfg
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StrategyToggle {
    pub enabled: bool,
}

impl Default for StrategyToggle {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmaCrossParams {
    pub enabled: bool,
    pub fast: usize,
    pub slow: usize,
}

impl Default for EmaCrossParams {
    fn default() -> Self {
        Self {
            enabled: true,
            fast: 9,
            slow: 29,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PinBarParams {
    pub enabled: bool,
    pub wick_to_body: f64,
}

impl Default for PinBarParams {
    fn default() -> Self {
        Self {
            enabled: true,
            wick_to_body: 2.0,
        }
    }
}

/// Everything a strategy may look at for one closed candle.
///
/// `candles`/`closes` are the triggering timeframe's series with the
/// just-closed candle as the last element; `all_series` carries every
/// configured timeframe (forming candles included) for multi-frame rules.
pub struct StrategyContext<'a> {
    pub instrument: &'a str,
    /// Triggering timeframe in seconds.
    pub timeframe: u32,
    pub candles: &'a [Candle],
    pub closes: &'a [f64],
    pub all_series: &'a HashMap<u32, Vec<Candle>>,
}

/// What a strategy detected on the triggering candle.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub side: Side,
    pub confidence: f64,
    pub rationale: String,
}

impl Detection {
    pub fn new(side: Side, confidence: f64, rationale: impl Into<String>) -> Self {
        Self {
            side,
            confidence,
            rationale: rationale.into(),
        }
    }
}

/// Base trait for all trading strategies.
pub trait Strategy: Send + Sync {
    fn id(&self) -> &'static str;

    /// Pure evaluation of the context; `None` when nothing fires.
    fn evaluate(&self, ctx: &StrategyContext, cfg: &StrategiesConfig) -> Option<Detection>;
}

const SIGNAL_LOG_CAPACITY: usize = 256;

/// Runs every enabled strategy against a closed-candle context.
///
/// A strategy fires at most once per (instrument, timeframe, candle open
/// time): the engine remembers the last fired open time per key triple,
/// which is equivalent to a full key set because open times only grow.
pub struct StrategyEngine {
    strategies: Vec<Box<dyn Strategy>>,
    last_fired: HashMap<(String, String, u32), i64>,
    signal_log: VecDeque<Signal>,
}

impl StrategyEngine {
    /// Engine with the full reference strategy set.
    pub fn with_default_strategies() -> Self {
        Self::new(vec![
            Box::new(EmaCross),
            Box::new(MacdCross),
            Box::new(PinBar),
            Box::new(Engulfing),
            Box::new(InsideBar),
            Box::new(DojiDivergence),
            Box::new(VolumeExhaustion),
        ])
    }

    pub fn new(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self {
            strategies,
            last_fired: HashMap::new(),
            signal_log: VecDeque::new(),
        }
    }

    pub fn evaluate(
        &mut self,
        ctx: &StrategyContext,
        cfg: &StrategiesConfig,
        now_ms: i64,
    ) -> Vec<Signal> {
        let Some(candle) = ctx.candles.last() else {
            return Vec::new();
        };
        let open_time = candle.open_time;
        let mut signals = Vec::new();

        for strategy in &self.strategies {
            if !cfg.is_enabled(strategy.id()) {
                continue;
            }
            let Some(detection) = strategy.evaluate(ctx, cfg) else {
                continue;
            };

            let key = (
                strategy.id().to_string(),
                ctx.instrument.to_string(),
                ctx.timeframe,
            );
            if self.last_fired.get(&key).is_some_and(|&t| t >= open_time) {
                continue;
            }
            self.last_fired.insert(key, open_time);

            let signal = Signal {
                strategy_id: strategy.id().to_string(),
                instrument: ctx.instrument.to_string(),
                timeframe: ctx.timeframe,
                side: detection.side,
                confidence: detection.confidence,
                rationale: detection.rationale,
                epoch_ms: now_ms,
                candle_open_time: open_time,
            };
            tracing::debug!(
                strategy = %signal.strategy_id,
                instrument = %signal.instrument,
                side = %signal.side,
                confidence = signal.confidence,
                "strategy fired"
            );
            self.signal_log.push_back(signal.clone());
            while self.signal_log.len() > SIGNAL_LOG_CAPACITY {
                self.signal_log.pop_front();
            }
            signals.push(signal);
        }

        signals
    }

    /// Recent signals, oldest first, for the presentation layer.
    pub fn signal_log(&self) -> Vec<Signal> {
        self.signal_log.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin_candles() -> Vec<Candle> {
        let mut candles: Vec<Candle> = (0..30)
            .map(|i| Candle {
                open_time: i * 60,
                open: 100.0 + i as f64 * 0.1,
                high: 100.0 + i as f64 * 0.2,
                low: 99.0 + i as f64 * 0.1,
                close: 100.0 + i as f64 * 0.15,
                volume: 12,
                closed: true,
            })
            .collect();
        candles[29] = Candle {
            open_time: 29 * 60,
            open: 110.0,
            high: 110.1,
            low: 107.0,
            close: 110.05,
            volume: 15,
            closed: true,
        };
        candles
    }

    fn pin_only_config() -> StrategiesConfig {
        let mut cfg = StrategiesConfig::all_disabled();
        cfg.set_enabled("pin_bar", true);
        cfg
    }

    #[test]
    fn test_engine_emits_and_deduplicates_same_candle() {
        let candles = pin_candles();
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let all_series = HashMap::from([(60u32, candles.clone())]);
        let ctx = StrategyContext {
            instrument: "R_50",
            timeframe: 60,
            candles: &candles,
            closes: &closes,
            all_series: &all_series,
        };
        let cfg = pin_only_config();
        let mut engine = StrategyEngine::with_default_strategies();

        let first = engine.evaluate(&ctx, &cfg, 1_000);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].strategy_id, "pin_bar");
        assert_eq!(first[0].side, Side::Buy);
        assert_eq!(first[0].candle_open_time, 29 * 60);

        let second = engine.evaluate(&ctx, &cfg, 2_000);
        assert!(second.is_empty());
    }

    #[test]
    fn test_disabled_strategy_never_fires() {
        let candles = pin_candles();
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let all_series = HashMap::from([(60u32, candles.clone())]);
        let ctx = StrategyContext {
            instrument: "R_50",
            timeframe: 60,
            candles: &candles,
            closes: &closes,
            all_series: &all_series,
        };
        let cfg = StrategiesConfig::all_disabled();
        let mut engine = StrategyEngine::with_default_strategies();

        assert!(engine.evaluate(&ctx, &cfg, 1_000).is_empty());
    }

    #[test]
    fn test_dedup_is_scoped_per_timeframe() {
        let candles = pin_candles();
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let all_series = HashMap::from([(60u32, candles.clone()), (180u32, candles.clone())]);
        let cfg = pin_only_config();
        let mut engine = StrategyEngine::with_default_strategies();

        let ctx60 = StrategyContext {
            instrument: "R_50",
            timeframe: 60,
            candles: &candles,
            closes: &closes,
            all_series: &all_series,
        };
        let ctx180 = StrategyContext {
            instrument: "R_50",
            timeframe: 180,
            candles: &candles,
            closes: &closes,
            all_series: &all_series,
        };

        assert_eq!(engine.evaluate(&ctx60, &cfg, 1_000).len(), 1);
        assert_eq!(engine.evaluate(&ctx180, &cfg, 1_000).len(), 1);
    }

    #[test]
    fn test_signal_log_is_bounded() {
        let mut engine = StrategyEngine::with_default_strategies();
        let cfg = pin_only_config();

        for i in 0..(SIGNAL_LOG_CAPACITY + 40) {
            let mut candles = pin_candles();
            for c in &mut candles {
                c.open_time += i as i64 * 30 * 60;
            }
            let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
            let all_series = HashMap::from([(60u32, candles.clone())]);
            let ctx = StrategyContext {
                instrument: "R_50",
                timeframe: 60,
                candles: &candles,
                closes: &closes,
                all_series: &all_series,
            };
            engine.evaluate(&ctx, &cfg, i as i64);
        }

        assert_eq!(engine.signal_log().len(), SIGNAL_LOG_CAPACITY);
    }
}
