use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};

use crate::models::Candle;

/// A tick the aggregator refuses to fold into a candle.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TickError {
    #[error("rejected tick for {instrument}: non-finite or non-positive price {price}")]
    BadPrice { instrument: String, price: f64 },
    #[error("rejected tick for {instrument}: epoch {epoch} precedes last seen {last_seen}")]
    StaleEpoch {
        instrument: String,
        epoch: i64,
        last_seen: i64,
    },
}

/// A candle that just became immutable, emitted exactly once per boundary
/// crossing.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedCandle {
    pub instrument: String,
    pub timeframe: u32,
    pub candle: Candle,
}

#[derive(Default)]
struct Book {
    series: HashMap<(String, u32), VecDeque<Candle>>,
    last_epoch: HashMap<String, i64>,
}

/// Thread-safe store of per-(instrument, timeframe) candle series.
///
/// The pipeline is the only writer; presentation-layer readers take cloned
/// snapshots through a cloned handle. Every series is a bounded FIFO capped
/// at `max_candles` — the oldest candle is evicted on overflow.
#[derive(Clone)]
pub struct CandleStore {
    book: Arc<RwLock<Book>>,
    timeframes: Vec<u32>,
    max_candles: usize,
}

impl CandleStore {
    pub fn new(timeframes: Vec<u32>, max_candles: usize) -> Self {
        Self {
            book: Arc::new(RwLock::new(Book::default())),
            timeframes,
            max_candles,
        }
    }

    pub fn timeframes(&self) -> &[u32] {
        &self.timeframes
    }

    /// Fold one tick into every configured timeframe.
    ///
    /// Opens a candle on the first tick of a bucket, mutates the open candle
    /// for subsequent ticks in the same bucket, and closes it when a tick
    /// arrives for a later bucket. Malformed ticks (non-finite price,
    /// per-instrument epoch regression) are rejected without touching any
    /// series.
    pub fn ingest_tick(
        &self,
        instrument: &str,
        epoch: i64,
        price: f64,
        volume: u64,
    ) -> Result<Vec<ClosedCandle>, TickError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(TickError::BadPrice {
                instrument: instrument.to_string(),
                price,
            });
        }

        let mut book = self.book.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(&last_seen) = book.last_epoch.get(instrument) {
            if epoch < last_seen {
                return Err(TickError::StaleEpoch {
                    instrument: instrument.to_string(),
                    epoch,
                    last_seen,
                });
            }
        }
        book.last_epoch.insert(instrument.to_string(), epoch);

        let mut closed = Vec::new();

        for &timeframe in &self.timeframes {
            let open_time = epoch.div_euclid(timeframe as i64) * timeframe as i64;
            let series = book
                .series
                .entry((instrument.to_string(), timeframe))
                .or_default();

            let starts_new_bucket = series.back().map_or(true, |c| c.open_time != open_time);

            if starts_new_bucket {
                if let Some(current) = series.back_mut() {
                    if !current.closed {
                        current.closed = true;
                        closed.push(ClosedCandle {
                            instrument: instrument.to_string(),
                            timeframe,
                            candle: current.clone(),
                        });
                    }
                }
                series.push_back(Candle {
                    open_time,
                    open: price,
                    high: price,
                    low: price,
                    close: price,
                    volume,
                    closed: false,
                });
                while series.len() > self.max_candles {
                    series.pop_front();
                }
            } else if let Some(current) = series.back_mut() {
                current.high = current.high.max(price);
                current.low = current.low.min(price);
                current.close = price;
                current.volume += volume;
            }
        }

        Ok(closed)
    }

    /// Merge externally supplied candles (backfill after a reconnect) into a
    /// series by open time. Already-present open times are never overwritten;
    /// merged candles arrive closed; the series is re-sorted and re-capped.
    pub fn recover_missing(&self, instrument: &str, timeframe: u32, external: Vec<Candle>) {
        let mut book = self.book.write().unwrap_or_else(PoisonError::into_inner);
        let series = book
            .series
            .entry((instrument.to_string(), timeframe))
            .or_default();

        let mut seen: HashSet<i64> = series.iter().map(|c| c.open_time).collect();
        let mut added = 0usize;

        for candle in external {
            if !seen.insert(candle.open_time) {
                continue;
            }
            series.push_back(Candle {
                closed: true,
                ..candle
            });
            added += 1;
        }

        if added > 0 {
            let mut sorted: Vec<Candle> = series.drain(..).collect();
            sorted.sort_by_key(|c| c.open_time);
            series.extend(sorted);
            while series.len() > self.max_candles {
                series.pop_front();
            }
            tracing::info!(instrument, timeframe, added, "merged backfill candles");
        }
    }

    /// Snapshot of the series for one (instrument, timeframe), oldest first.
    pub fn candles(&self, instrument: &str, timeframe: u32) -> Vec<Candle> {
        let book = self.book.read().unwrap_or_else(PoisonError::into_inner);
        book.series
            .get(&(instrument.to_string(), timeframe))
            .map(|series| series.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn candle_count(&self, instrument: &str, timeframe: u32) -> usize {
        let book = self.book.read().unwrap_or_else(PoisonError::into_inner);
        book.series
            .get(&(instrument.to_string(), timeframe))
            .map_or(0, VecDeque::len)
    }
}
