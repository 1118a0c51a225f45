// Order-submission collaborator seam.
//
// The core never owns a wire protocol: transports implement `BrokerGateway`
// and the pipeline talks to the trait. The paper gateway ships in-crate.
pub mod paper;

pub use paper::{PaperBroker, PaperPosition};

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::models::TradeOrder;

/// Failure surfaced by the transport collaborator. Timeouts belong to the
/// transport; they surface here as a dispatch failure rather than stalling
/// the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("order rejected: {0}")]
    Rejected(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("order submission timed out")]
    Timeout,
}

/// Acknowledgement returned by a successful dispatch.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrderReceipt {
    pub order_id: Uuid,
    pub instrument: String,
    pub stake: f64,
    pub placed_at_ms: i64,
}

/// Operations the core calls on the feed/broker transport.
#[async_trait]
pub trait BrokerGateway: Send + Sync {
    /// Ask the feed to stream ticks for an instrument.
    async fn subscribe(&self, instrument: &str) -> Result<(), BrokerError>;

    /// Pass-through for raw requests the core does not model.
    async fn send_raw(&self, request: serde_json::Value) -> Result<serde_json::Value, BrokerError>;

    /// Submit an order; resolves with the receipt or the broker's refusal.
    async fn place_order(&self, order: &TradeOrder) -> Result<OrderReceipt, BrokerError>;
}
