use serde::{Deserialize, Serialize};
use std::fmt;

/// A single price tick received from the feed collaborator.
///
/// Ticks are transient: the pipeline folds them into candles and keeps only
/// the last-seen price per instrument (for the volatility filter).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tick {
    pub instrument: String,
    pub price: f64,
    /// Feed epoch in seconds, non-decreasing per instrument.
    pub epoch: i64,
}

/// OHLCV summary of all ticks within one timeframe bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    /// Timeframe-aligned bucket start, `floor(epoch / timeframe) * timeframe`.
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub closed: bool,
}

impl Candle {
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn full_range(&self) -> f64 {
        self.high - self.low
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Direction of a signal or order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// A strategy's recommendation, scoped to one instrument/timeframe/candle.
///
/// Immutable once produced. `candle_open_time` is the open time of the candle
/// that triggered the evaluation; together with `strategy_id`, `instrument`
/// and `timeframe` it forms the dedup key that limits every strategy to one
/// signal per closed candle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Signal {
    pub strategy_id: String,
    pub instrument: String,
    /// Timeframe in seconds.
    pub timeframe: u32,
    pub side: Side,
    /// Strategy-specific constant within `[0, 1]`.
    pub confidence: f64,
    pub rationale: String,
    /// Wall-clock milliseconds at evaluation time.
    pub epoch_ms: i64,
    pub candle_open_time: i64,
}

/// Contract duration unit understood by the broker collaborator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Ticks,
    Seconds,
    Minutes,
}

impl DurationUnit {
    /// Single-letter wire code used by the order payload.
    pub fn wire_code(&self) -> &'static str {
        match self {
            DurationUnit::Ticks => "t",
            DurationUnit::Seconds => "s",
            DurationUnit::Minutes => "m",
        }
    }
}

/// An order handed to the order-submission collaborator.
///
/// Constructed fresh per execution attempt, never mutated after dispatch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeOrder {
    pub instrument: String,
    pub side: Side,
    pub stake: f64,
    pub duration_value: u32,
    pub duration_unit: DurationUnit,
    pub basis: String,
}

impl TradeOrder {
    pub fn new(
        instrument: String,
        side: Side,
        stake: f64,
        duration_value: u32,
        duration_unit: DurationUnit,
    ) -> Self {
        Self {
            instrument,
            side,
            stake,
            duration_value,
            duration_unit,
            basis: "stake".to_string(),
        }
    }
}

/// Connection state reported by the transport collaborator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Reconnecting,
}

/// A settled trade as reported by the feed (trade history / trade updates).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeRecord {
    pub instrument: String,
    pub profit: f64,
    pub epoch: i64,
}

/// Typed event payloads consumed from the feed/transport collaborator.
///
/// These replace ad hoc emitter topics: every pipeline input arrives as one
/// of these variants on a single channel, which preserves per-instrument
/// arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Tick(Tick),
    Balance {
        balance: f64,
        currency: String,
    },
    TradeUpdate {
        instrument: String,
        is_closed: bool,
        profit: f64,
    },
    Connection {
        state: ConnectionState,
    },
    TradeHistory(Vec<TradeRecord>),
}
