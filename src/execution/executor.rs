use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;

use crate::broker::{BrokerError, BrokerGateway, OrderReceipt};
use crate::config::Settings;
use crate::models::{Signal, TradeOrder};
use crate::risk::{MartingaleManager, RiskManager};

/// Identical signals inside this window are dropped as duplicates.
pub const DEBOUNCE_WINDOW_MS: i64 = 1_200;

/// Why a signal was not dispatched. These are expected outcomes of the
/// gating rules, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Cooldown,
    RiskDenied(String),
    RunQuotaReached,
    DuplicateSignal,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Cooldown => write!(f, "cooldown active"),
            SkipReason::RiskDenied(reason) => write!(f, "{reason}"),
            SkipReason::RunQuotaReached => write!(f, "Run count reached"),
            SkipReason::DuplicateSignal => write!(f, "Debounced duplicate signal"),
        }
    }
}

/// Result of one execution attempt.
#[derive(Debug)]
pub enum ExecutionOutcome {
    Skipped {
        reason: SkipReason,
    },
    Placed {
        order: TradeOrder,
        receipt: OrderReceipt,
    },
    Failed {
        order: TradeOrder,
        error: BrokerError,
    },
}

/// Orchestrates the gate chain in front of the broker.
///
/// Check order is fixed: per-instrument cooldown, risk gate, run quota,
/// debounce, then stake sizing and dispatch. The cooldown is stamped on
/// every dispatch attempt, successful or not, to throttle retries.
pub struct TradeExecutor {
    gateway: Arc<dyn BrokerGateway>,
    risk: Arc<Mutex<RiskManager>>,
    martingale: Arc<Mutex<MartingaleManager>>,
    cooldown_until: HashMap<String, i64>,
    executed_trades: u32,
    last_signal_key: Option<String>,
    last_signal_at_ms: i64,
    last_outcome: HashMap<String, bool>,
}

impl TradeExecutor {
    pub fn new(
        gateway: Arc<dyn BrokerGateway>,
        risk: Arc<Mutex<RiskManager>>,
        martingale: Arc<Mutex<MartingaleManager>>,
    ) -> Self {
        Self {
            gateway,
            risk,
            martingale,
            cooldown_until: HashMap::new(),
            executed_trades: 0,
            last_signal_key: None,
            last_signal_at_ms: 0,
            last_outcome: HashMap::new(),
        }
    }

    pub async fn execute(&mut self, signal: &Signal, settings: &Settings) -> ExecutionOutcome {
        self.execute_at(signal, settings, Utc::now().timestamp_millis())
            .await
    }

    /// Execution with an explicit clock, for deterministic tests.
    pub async fn execute_at(
        &mut self,
        signal: &Signal,
        settings: &Settings,
        now_ms: i64,
    ) -> ExecutionOutcome {
        if let Some(&until) = self.cooldown_until.get(&signal.instrument) {
            if now_ms < until {
                return ExecutionOutcome::Skipped {
                    reason: SkipReason::Cooldown,
                };
            }
        }

        {
            let mut risk = self.risk.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(reason) = risk.can_trade(&settings.risk, &signal.instrument) {
                return ExecutionOutcome::Skipped {
                    reason: SkipReason::RiskDenied(reason.to_string()),
                };
            }
        }

        if self.executed_trades >= settings.run_count {
            return ExecutionOutcome::Skipped {
                reason: SkipReason::RunQuotaReached,
            };
        }

        let signal_key = format!(
            "{}:{}:{}:{}",
            signal.strategy_id,
            signal.instrument,
            signal.side,
            signal.epoch_ms / 1000
        );
        if self.last_signal_key.as_deref() == Some(signal_key.as_str())
            && now_ms - self.last_signal_at_ms < DEBOUNCE_WINDOW_MS
        {
            return ExecutionOutcome::Skipped {
                reason: SkipReason::DuplicateSignal,
            };
        }
        self.last_signal_key = Some(signal_key);
        self.last_signal_at_ms = now_ms;

        let won_last = self
            .last_outcome
            .get(&signal.instrument)
            .copied()
            .unwrap_or(true);
        let stake = {
            let mut martingale = self
                .martingale
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            martingale.next_stake(&settings.martingale, settings.stake, won_last)
        };

        let order = TradeOrder::new(
            signal.instrument.clone(),
            signal.side,
            stake,
            settings.duration_value,
            settings.duration_unit,
        );

        let result = self.gateway.place_order(&order).await;

        // Throttle follow-up attempts whether or not the dispatch succeeded.
        self.cooldown_until
            .insert(signal.instrument.clone(), now_ms + settings.cooldown_ms);

        match result {
            Ok(receipt) => {
                self.executed_trades += 1;
                self.risk
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .on_trade_opened();
                ExecutionOutcome::Placed { order, receipt }
            }
            Err(error) => ExecutionOutcome::Failed { order, error },
        }
    }

    /// Remember the latest settled outcome per instrument for stake sizing.
    pub fn record_outcome(&mut self, instrument: &str, won: bool) {
        self.last_outcome.insert(instrument.to_string(), won);
    }

    pub fn executed_trades(&self) -> u32 {
        self.executed_trades
    }

    /// Clear transient run state (quota, debounce, cooldowns).
    pub fn reset(&mut self) {
        self.cooldown_until.clear();
        self.executed_trades = 0;
        self.last_signal_key = None;
        self.last_signal_at_ms = 0;
    }
}
