// The decision pipeline: tick aggregation -> strategy evaluation -> risk
// gating -> stake sizing -> dispatch.
//
// One dispatch loop fully finishes handling an event (aggregation, every
// strategy evaluation, every executor call) before taking the next, so the
// non-idempotent gates can never race. Gate denials log at debug, dispatch
// failures at warn; neither stops processing for other instruments.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::sync::mpsc;

use crate::broker::BrokerGateway;
use crate::candles::{CandleStore, ClosedCandle};
use crate::config::{ConfigCell, Settings};
use crate::execution::{ExecutionOutcome, TradeExecutor};
use crate::models::{Candle, FeedEvent, Signal, Tick, TradeRecord};
use crate::risk::{MartingaleManager, RiskManager, RiskSnapshot};
use crate::strategy::{StrategyContext, StrategyEngine};

const TRADE_HISTORY_CAPACITY: usize = 200;

pub struct Pipeline {
    config: Arc<ConfigCell>,
    store: CandleStore,
    strategies: Arc<Mutex<StrategyEngine>>,
    risk: Arc<Mutex<RiskManager>>,
    martingale: Arc<Mutex<MartingaleManager>>,
    executor: tokio::sync::Mutex<TradeExecutor>,
    gateway: Arc<dyn BrokerGateway>,
    trade_history: Mutex<VecDeque<TradeRecord>>,
}

impl Pipeline {
    pub fn new(config: Arc<ConfigCell>, gateway: Arc<dyn BrokerGateway>) -> Self {
        let settings = config.snapshot();
        let store = CandleStore::new(settings.timeframes.clone(), settings.max_candles);
        let risk = Arc::new(Mutex::new(RiskManager::new()));
        let martingale = Arc::new(Mutex::new(MartingaleManager::new()));
        let executor = TradeExecutor::new(gateway.clone(), risk.clone(), martingale.clone());

        Self {
            config,
            store,
            strategies: Arc::new(Mutex::new(StrategyEngine::with_default_strategies())),
            risk,
            martingale,
            executor: tokio::sync::Mutex::new(executor),
            gateway,
            trade_history: Mutex::new(VecDeque::new()),
        }
    }

    /// Subscribe every configured instrument on the feed.
    pub async fn subscribe_all(&self) -> anyhow::Result<()> {
        let settings = self.config.snapshot();
        for instrument in &settings.instruments {
            self.gateway.subscribe(instrument).await?;
        }
        Ok(())
    }

    /// The dispatch loop. Runs until the feed channel closes.
    pub async fn run(&self, mut events: mpsc::Receiver<FeedEvent>) {
        while let Some(event) = events.recv().await {
            self.process(event).await;
        }
        tracing::info!("feed channel closed, pipeline stopped");
    }

    /// Handle one feed event to completion.
    pub async fn process(&self, event: FeedEvent) {
        match event {
            FeedEvent::Tick(tick) => self.handle_tick(tick).await,
            FeedEvent::Balance { balance, currency } => {
                let settings = self.config.snapshot();
                self.risk
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .on_balance(&settings.risk, balance);
                tracing::debug!(balance, currency = %currency, "balance update");
            }
            FeedEvent::TradeUpdate {
                instrument,
                is_closed,
                profit,
            } => {
                if is_closed {
                    self.handle_trade_settled(instrument, profit).await;
                }
            }
            FeedEvent::Connection { state } => {
                tracing::info!(?state, "feed connection status");
            }
            FeedEvent::TradeHistory(records) => {
                let mut history = self
                    .trade_history
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                for record in records {
                    history.push_back(record);
                    while history.len() > TRADE_HISTORY_CAPACITY {
                        history.pop_front();
                    }
                }
            }
        }
    }

    async fn handle_tick(&self, tick: Tick) {
        let settings = self.config.snapshot();

        let closed = match self
            .store
            .ingest_tick(&tick.instrument, tick.epoch, tick.price, 1)
        {
            Ok(closed) => closed,
            Err(err) => {
                tracing::warn!(%err, "dropped malformed tick");
                return;
            }
        };

        // Only accepted ticks feed the volatility filter.
        self.risk
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .observe_tick(&tick.instrument, tick.price);

        for closed_candle in closed {
            self.on_candle_closed(&settings, &closed_candle).await;
        }
    }

    async fn on_candle_closed(&self, settings: &Settings, closed: &ClosedCandle) {
        let mut all_series: HashMap<u32, Vec<Candle>> = HashMap::new();
        for &timeframe in self.store.timeframes() {
            all_series.insert(timeframe, self.store.candles(&closed.instrument, timeframe));
        }
        // The triggering series ends at the candle that just closed; the
        // bucket the boundary tick opened is not visible to strategies.
        if let Some(series) = all_series.get_mut(&closed.timeframe) {
            series.retain(|c| c.open_time <= closed.candle.open_time);
        }

        let trigger = all_series
            .get(&closed.timeframe)
            .cloned()
            .unwrap_or_default();
        if trigger.is_empty() {
            return;
        }
        let closes: Vec<f64> = trigger.iter().map(|c| c.close).collect();

        let signals = {
            let ctx = StrategyContext {
                instrument: &closed.instrument,
                timeframe: closed.timeframe,
                candles: &trigger,
                closes: &closes,
                all_series: &all_series,
            };
            self.strategies
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .evaluate(&ctx, &settings.strategies, Utc::now().timestamp_millis())
        };

        for signal in signals {
            self.dispatch_signal(settings, signal).await;
        }
    }

    async fn dispatch_signal(&self, settings: &Settings, signal: Signal) {
        let boost = if settings.focus_instrument.as_deref() == Some(signal.instrument.as_str()) {
            settings.focus_boost
        } else {
            0.0
        };
        if signal.confidence + boost <= settings.min_confidence {
            tracing::debug!(
                strategy = %signal.strategy_id,
                instrument = %signal.instrument,
                confidence = signal.confidence,
                "signal below confidence floor"
            );
            return;
        }

        let outcome = self.executor.lock().await.execute(&signal, settings).await;
        match outcome {
            ExecutionOutcome::Skipped { reason } => {
                tracing::debug!(
                    strategy = %signal.strategy_id,
                    instrument = %signal.instrument,
                    %reason,
                    "signal skipped"
                );
            }
            ExecutionOutcome::Placed { order, receipt } => {
                tracing::info!(
                    instrument = %order.instrument,
                    side = %order.side,
                    stake = order.stake,
                    order_id = %receipt.order_id,
                    "order dispatched"
                );
            }
            ExecutionOutcome::Failed { order, error } => {
                tracing::warn!(
                    instrument = %order.instrument,
                    %error,
                    "order dispatch failed"
                );
            }
        }
    }

    async fn handle_trade_settled(&self, instrument: String, profit: f64) {
        let settings = self.config.snapshot();
        self.risk
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on_trade_result(&settings.risk, profit);
        self.executor
            .lock()
            .await
            .record_outcome(&instrument, profit >= 0.0);

        {
            let mut history = self
                .trade_history
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            history.push_back(TradeRecord {
                instrument: instrument.clone(),
                profit,
                epoch: Utc::now().timestamp(),
            });
            while history.len() > TRADE_HISTORY_CAPACITY {
                history.pop_front();
            }
        }

        tracing::info!(instrument = %instrument, profit, "trade settled");
    }

    // Presentation accessors.

    pub fn candle_store(&self) -> CandleStore {
        self.store.clone()
    }

    pub fn signal_log(&self) -> Vec<Signal> {
        self.strategies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .signal_log()
    }

    pub fn risk_snapshot(&self) -> RiskSnapshot {
        self.risk
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    pub fn martingale_step(&self) -> u32 {
        self.martingale
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current_step()
    }

    pub fn trade_history(&self) -> Vec<TradeRecord> {
        self.trade_history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn config(&self) -> &ConfigCell {
        &self.config
    }

    /// Flip one strategy through the config cell.
    pub fn set_strategy_enabled(&self, strategy_id: &str, enabled: bool) -> anyhow::Result<()> {
        let mut next = (*self.config.snapshot()).clone();
        if !next.strategies.set_enabled(strategy_id, enabled) {
            anyhow::bail!("unknown strategy id {strategy_id}");
        }
        self.config.update(next)?;
        Ok(())
    }

    /// Operator actions forwarded to the risk manager.
    pub fn set_emergency_stop(&self, stop: bool) {
        self.risk
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_emergency_stop(stop);
    }

    pub fn reset_risk(&self) {
        self.risk
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
        self.martingale
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
    }
}
