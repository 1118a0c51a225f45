// Configuration snapshots.
//
// Components never share a mutable settings object: each call receives an
// immutable `Arc<Settings>` snapshot, and every update goes through one
// validate-then-swap entry point (`ConfigCell::update`).

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use crate::models::DurationUnit;
use crate::risk::{MartingaleConfig, RiskConfig};
use crate::strategy::StrategiesConfig;

/// Timeframes (seconds) the aggregator knows how to bucket.
pub const SUPPORTED_TIMEFRAMES: &[u32] = &[60, 120, 180, 300, 600, 900];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TradeMode {
    Paper,
    Live,
}

/// A configuration-update rejection. Invalid values are refused here, never
/// clamped at execution time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("stake must be a positive finite amount")]
    NonPositiveStake,
    #[error("martingale hard cap {cap} is below the base stake {stake}")]
    MartingaleCapTooLow { cap: f64, stake: f64 },
    #[error("martingale multiplier must be at least 1")]
    MultiplierTooLow,
    #[error("unsupported timeframe {0}s")]
    UnsupportedTimeframe(u32),
    #[error("at least one timeframe is required")]
    NoTimeframes,
    #[error("at least one instrument is required")]
    NoInstruments,
    #[error("candle capacity must be positive")]
    ZeroCapacity,
    #[error("cooldown must not be negative")]
    NegativeCooldown,
    #[error("confidence threshold and focus boost must be within [0, 1]")]
    InvalidConfidence,
    #[error("risk thresholds must be positive")]
    InvalidRiskThresholds,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub mode: TradeMode,
    pub instruments: Vec<String>,
    /// Timeframes in seconds.
    pub timeframes: Vec<u32>,
    /// Candles retained per (instrument, timeframe).
    pub max_candles: usize,
    pub stake: f64,
    /// Dispatches allowed per run.
    pub run_count: u32,
    pub duration_value: u32,
    pub duration_unit: DurationUnit,
    /// Minimum gap between dispatches for one instrument.
    pub cooldown_ms: i64,
    /// A signal executes only when `confidence + boost` clears this.
    pub min_confidence: f64,
    pub focus_instrument: Option<String>,
    pub focus_boost: f64,
    pub risk: RiskConfig,
    pub martingale: MartingaleConfig,
    pub strategies: StrategiesConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: TradeMode::Paper,
            instruments: vec![
                "R_10".to_string(),
                "R_25".to_string(),
                "R_50".to_string(),
                "R_75".to_string(),
                "R_100".to_string(),
                "frxXAUUSD".to_string(),
            ],
            timeframes: vec![60, 180, 300],
            max_candles: 800,
            stake: 1.0,
            run_count: 100,
            duration_value: 1,
            duration_unit: DurationUnit::Minutes,
            cooldown_ms: 5_000,
            min_confidence: 0.72,
            focus_instrument: Some("R_50".to_string()),
            focus_boost: 0.05,
            risk: RiskConfig::default(),
            martingale: MartingaleConfig::default(),
            strategies: StrategiesConfig::default(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.stake.is_finite() || self.stake <= 0.0 {
            return Err(ConfigError::NonPositiveStake);
        }
        if self.instruments.is_empty() {
            return Err(ConfigError::NoInstruments);
        }
        if self.timeframes.is_empty() {
            return Err(ConfigError::NoTimeframes);
        }
        for &timeframe in &self.timeframes {
            if !SUPPORTED_TIMEFRAMES.contains(&timeframe) {
                return Err(ConfigError::UnsupportedTimeframe(timeframe));
            }
        }
        if self.max_candles == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.cooldown_ms < 0 {
            return Err(ConfigError::NegativeCooldown);
        }
        if !(0.0..=1.0).contains(&self.min_confidence) || !(0.0..=1.0).contains(&self.focus_boost)
        {
            return Err(ConfigError::InvalidConfidence);
        }
        if self.martingale.multiplier < 1.0 {
            return Err(ConfigError::MultiplierTooLow);
        }
        if self.martingale.hard_cap < self.stake {
            return Err(ConfigError::MartingaleCapTooLow {
                cap: self.martingale.hard_cap,
                stake: self.stake,
            });
        }
        if self.risk.enabled
            && (self.risk.drawdown_cap <= 0.0
                || self.risk.max_drawdown_pct <= 0.0
                || self.risk.volatility_limit <= 0.0)
        {
            return Err(ConfigError::InvalidRiskThresholds);
        }
        Ok(())
    }

    /// Layer an optional settings file with `TICKBOT__`-prefixed environment
    /// overrides, then validate.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let raw = builder
            .add_source(config::Environment::with_prefix("TICKBOT").separator("__"))
            .build()?;

        let settings: Settings = raw.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Copy-on-write configuration cell.
///
/// Readers take cheap `Arc` snapshots; writers swap the whole snapshot after
/// validation, so a half-applied update can never be observed.
pub struct ConfigCell {
    inner: RwLock<Arc<Settings>>,
}

impl ConfigCell {
    pub fn new(settings: Settings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            inner: RwLock::new(Arc::new(settings)),
        })
    }

    pub fn snapshot(&self) -> Arc<Settings> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update(&self, next: Settings) -> Result<(), ConfigError> {
        next.validate()?;
        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Arc::new(next);
        Ok(())
    }
}
