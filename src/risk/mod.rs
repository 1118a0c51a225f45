// Risk management: the stateful gate consulted before every dispatch.
pub mod martingale;

pub use martingale::{MartingaleConfig, MartingaleManager};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Risk gate thresholds, carried in the configuration snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskConfig {
    pub enabled: bool,
    pub paused: bool,
    /// Absolute session-PnL loss at which trading halts.
    pub drawdown_cap: f64,
    /// Percent decline from the peak balance at which trading halts.
    pub max_drawdown_pct: f64,
    /// Balance at or below which trading halts.
    pub balance_floor: f64,
    pub max_consecutive_losses: u32,
    pub max_open_trades: u32,
    /// Cap on instantaneous tick-to-tick volatility per instrument.
    pub volatility_limit: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            paused: false,
            drawdown_cap: 100.0,
            max_drawdown_pct: 20.0,
            balance_floor: 0.0,
            max_consecutive_losses: 4,
            max_open_trades: 2,
            volatility_limit: 0.03,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RiskState {
    Armed,
    Halted,
}

/// Why the gate said no. Gate denials are expected outcomes, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    Paused,
    Halted,
    DrawdownCap,
    DrawdownFromPeak,
    BalanceFloor,
    ConsecutiveLosses,
    MaxOpenTrades,
    Volatility,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DenyReason::Paused => "Paused by safety controls",
            DenyReason::Halted => "Risk halt active",
            DenyReason::DrawdownCap => "Drawdown cap reached",
            DenyReason::DrawdownFromPeak => "Max drawdown from peak reached",
            DenyReason::BalanceFloor => "Balance floor reached",
            DenyReason::ConsecutiveLosses => "Consecutive loss cap reached",
            DenyReason::MaxOpenTrades => "Max open trades reached",
            DenyReason::Volatility => "Volatility filter active",
        };
        write!(f, "{text}")
    }
}

/// Read-only view of the risk state for the presentation layer.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RiskSnapshot {
    pub state: RiskState,
    pub consecutive_losses: u32,
    pub peak_balance: f64,
    pub session_pnl: f64,
    pub open_trades: u32,
}

/// State machine `{Armed, Halted}` gating every dispatch.
///
/// Account-health breaches (session drawdown cap, drawdown from peak, balance
/// floor, consecutive-loss cap) latch `Halted` until an explicit operator
/// `reset`; a winning trade resets the loss counter but never the latch.
/// Operator flags and market/occupancy gates (pause, emergency stop, open
/// trades, volatility) deny only while their condition holds.
#[derive(Debug, Default)]
pub struct RiskManager {
    halted: Option<DenyReason>,
    consecutive_losses: u32,
    peak_balance: f64,
    session_pnl: f64,
    open_trades: u32,
    emergency_stop: bool,
    volatility: HashMap<String, f64>,
    last_price: HashMap<String, f64>,
}

impl RiskManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track instantaneous volatility `|p_t - p_{t-1}| / p_{t-1}`.
    pub fn observe_tick(&mut self, instrument: &str, price: f64) {
        if let Some(&last) = self.last_price.get(instrument) {
            if last > 0.0 {
                self.volatility
                    .insert(instrument.to_string(), ((price - last) / last).abs());
            }
        }
        self.last_price.insert(instrument.to_string(), price);
    }

    pub fn can_trade(&mut self, cfg: &RiskConfig, instrument: &str) -> Result<(), DenyReason> {
        if !cfg.enabled {
            return Ok(());
        }
        if self.emergency_stop || cfg.paused {
            return Err(DenyReason::Paused);
        }
        if let Some(reason) = &self.halted {
            return Err(reason.clone());
        }
        if self.session_pnl <= -cfg.drawdown_cap.abs() {
            return Err(self.halt(DenyReason::DrawdownCap));
        }
        if self.consecutive_losses >= cfg.max_consecutive_losses {
            return Err(self.halt(DenyReason::ConsecutiveLosses));
        }
        if self.open_trades >= cfg.max_open_trades {
            return Err(DenyReason::MaxOpenTrades);
        }
        if let Some(&vol) = self.volatility.get(instrument) {
            if vol > cfg.volatility_limit {
                return Err(DenyReason::Volatility);
            }
        }
        Ok(())
    }

    /// Balance update from the feed: tracks the peak and halts on drawdown
    /// percent, balance floor, or an already-breached loss cap.
    pub fn on_balance(&mut self, cfg: &RiskConfig, balance: f64) {
        if balance > self.peak_balance {
            self.peak_balance = balance;
        }
        if !cfg.enabled {
            return;
        }

        let drawdown_pct = if self.peak_balance > 0.0 {
            (self.peak_balance - balance) / self.peak_balance * 100.0
        } else {
            0.0
        };

        if drawdown_pct >= cfg.max_drawdown_pct {
            self.halt(DenyReason::DrawdownFromPeak);
        } else if balance <= cfg.balance_floor {
            self.halt(DenyReason::BalanceFloor);
        } else if self.consecutive_losses >= cfg.max_consecutive_losses {
            self.halt(DenyReason::ConsecutiveLosses);
        }
    }

    /// Outcome of a settled trade. Latches breached caps here as well, so a
    /// breach that is never observed by `can_trade` still sticks.
    pub fn on_trade_result(&mut self, cfg: &RiskConfig, profit: f64) {
        if profit < 0.0 {
            self.consecutive_losses += 1;
        } else {
            self.consecutive_losses = 0;
        }
        self.session_pnl += profit;
        self.open_trades = self.open_trades.saturating_sub(1);

        if !cfg.enabled {
            return;
        }
        if self.session_pnl <= -cfg.drawdown_cap.abs() {
            self.halt(DenyReason::DrawdownCap);
        }
        if self.consecutive_losses >= cfg.max_consecutive_losses {
            self.halt(DenyReason::ConsecutiveLosses);
        }
    }

    pub fn on_trade_opened(&mut self) {
        self.open_trades += 1;
    }

    pub fn set_emergency_stop(&mut self, stop: bool) {
        self.emergency_stop = stop;
    }

    /// Explicit operator reset: the only way out of `Halted`.
    pub fn reset(&mut self) {
        self.halted = None;
        self.consecutive_losses = 0;
        self.session_pnl = 0.0;
        self.emergency_stop = false;
    }

    pub fn state(&self) -> RiskState {
        if self.halted.is_some() {
            RiskState::Halted
        } else {
            RiskState::Armed
        }
    }

    pub fn snapshot(&self) -> RiskSnapshot {
        RiskSnapshot {
            state: self.state(),
            consecutive_losses: self.consecutive_losses,
            peak_balance: self.peak_balance,
            session_pnl: self.session_pnl,
            open_trades: self.open_trades,
        }
    }

    fn halt(&mut self, reason: DenyReason) -> DenyReason {
        if self.halted.is_none() {
            tracing::warn!(%reason, "risk manager halted");
            self.halted = Some(reason.clone());
        }
        reason
    }
}
