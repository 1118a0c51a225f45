use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{BrokerError, BrokerGateway, OrderReceipt};
use crate::models::TradeOrder;

/// A synthetic open position recorded by the paper gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperPosition {
    pub id: Uuid,
    pub order: TradeOrder,
    pub opened_at_ms: i64,
}

#[derive(Default)]
struct PaperBook {
    open: VecDeque<PaperPosition>,
    subscriptions: Vec<String>,
    total_placed: u64,
}

/// In-memory gateway: records positions locally and returns immediately.
///
/// Settlement is driven from outside (`settle_oldest`), which lets the
/// binary and the tests decide outcomes and feed them back as trade updates.
#[derive(Clone, Default)]
pub struct PaperBroker {
    book: Arc<Mutex<PaperBook>>,
}

impl PaperBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_positions(&self) -> Vec<PaperPosition> {
        let book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        book.open.iter().cloned().collect()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        let book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        book.subscriptions.clone()
    }

    pub fn total_placed(&self) -> u64 {
        let book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        book.total_placed
    }

    /// Pop the oldest open position for settlement.
    pub fn settle_oldest(&self) -> Option<PaperPosition> {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        book.open.pop_front()
    }
}

#[async_trait]
impl BrokerGateway for PaperBroker {
    async fn subscribe(&self, instrument: &str) -> Result<(), BrokerError> {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        if !book.subscriptions.iter().any(|s| s == instrument) {
            book.subscriptions.push(instrument.to_string());
        }
        tracing::debug!(instrument, "paper subscription");
        Ok(())
    }

    async fn send_raw(&self, request: serde_json::Value) -> Result<serde_json::Value, BrokerError> {
        Ok(serde_json::json!({ "echo": request }))
    }

    async fn place_order(&self, order: &TradeOrder) -> Result<OrderReceipt, BrokerError> {
        let receipt = OrderReceipt {
            order_id: Uuid::new_v4(),
            instrument: order.instrument.clone(),
            stake: order.stake,
            placed_at_ms: Utc::now().timestamp_millis(),
        };

        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        book.open.push_back(PaperPosition {
            id: receipt.order_id,
            order: order.clone(),
            opened_at_ms: receipt.placed_at_ms,
        });
        book.total_placed += 1;

        tracing::info!(
            instrument = %order.instrument,
            side = %order.side,
            stake = order.stake,
            "paper order recorded"
        );
        Ok(receipt)
    }
}
