use std::sync::Arc;

use tickbot::broker::PaperBroker;
use tickbot::config::{ConfigCell, Settings};
use tickbot::models::{FeedEvent, Tick};
use tickbot::pipeline::Pipeline;
use tickbot::risk::RiskState;
use tickbot::strategy::StrategiesConfig;

const T0: i64 = 1_700_000_000 - (1_700_000_000 % 60);

fn pin_bar_settings() -> Settings {
    let mut settings = Settings::default();
    settings.instruments = vec!["R_50".to_string()];
    settings.timeframes = vec![60];
    settings.stake = 10.0;
    settings.martingale.hard_cap = 100.0;
    settings.min_confidence = 0.5;
    settings.focus_instrument = None;
    settings.strategies = StrategiesConfig::all_disabled();
    settings.strategies.set_enabled("pin_bar", true);
    settings
}

fn pipeline_with(settings: Settings) -> (Arc<Pipeline>, Arc<PaperBroker>) {
    let config = Arc::new(ConfigCell::new(settings).unwrap());
    let broker = Arc::new(PaperBroker::new());
    let pipeline = Arc::new(Pipeline::new(config, broker.clone()));
    (pipeline, broker)
}

async fn send_tick(pipeline: &Pipeline, epoch: i64, price: f64) {
    pipeline
        .process(FeedEvent::Tick(Tick {
            instrument: "R_50".to_string(),
            price,
            epoch,
        }))
        .await;
}

async fn settle(pipeline: &Pipeline, profit: f64) {
    pipeline
        .process(FeedEvent::TradeUpdate {
            instrument: "R_50".to_string(),
            is_closed: true,
            profit,
        })
        .await;
}

/// Ticks forming a bullish pin bar (body 0.05, lower wick 1.0) in the bucket
/// starting at `base`; the candle closes when the next bucket's tick lands.
async fn feed_buy_pin_bucket(pipeline: &Pipeline, base: i64) {
    send_tick(pipeline, base, 100.0).await;
    send_tick(pipeline, base + 10, 99.0).await;
    send_tick(pipeline, base + 20, 100.05).await;
}

/// Ticks forming a bearish pin bar (upper wick) in the bucket at `base`.
async fn feed_sell_pin_bucket(pipeline: &Pipeline, base: i64) {
    send_tick(pipeline, base + 10, 101.0).await;
    send_tick(pipeline, base + 20, 99.95).await;
}

#[tokio::test]
async fn test_ticks_aggregate_into_one_closed_candle() {
    let (pipeline, _broker) = pipeline_with(pin_bar_settings());

    send_tick(&pipeline, T0, 100.0).await;
    send_tick(&pipeline, T0 + 30, 100.2).await;
    send_tick(&pipeline, T0 + 65, 99.8).await;

    let series = pipeline.candle_store().candles("R_50", 60);
    assert_eq!(series.len(), 2);

    let closed = &series[0];
    assert!(closed.closed);
    assert_eq!(closed.open, 100.0);
    assert_eq!(closed.high, 100.2);
    assert_eq!(closed.low, 100.0);
    assert_eq!(closed.close, 100.2);
    assert_eq!(closed.volume, 2);

    assert!(!series[1].closed);
}

#[tokio::test]
async fn test_pin_bar_close_dispatches_one_order() {
    let (pipeline, broker) = pipeline_with(pin_bar_settings());

    feed_buy_pin_bucket(&pipeline, T0).await;
    // Boundary tick closes the pin candle and triggers evaluation.
    send_tick(&pipeline, T0 + 60, 100.0).await;

    let signals = pipeline.signal_log();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].strategy_id, "pin_bar");
    assert_eq!(signals[0].confidence, 0.6);

    assert_eq!(broker.total_placed(), 1);
    let open = broker.open_positions();
    assert_eq!(open[0].order.instrument, "R_50");
    assert_eq!(open[0].order.stake, 10.0);
    assert_eq!(open[0].order.basis, "stake");
}

#[tokio::test]
async fn test_cooldown_suppresses_back_to_back_signals() {
    let mut settings = pin_bar_settings();
    settings.cooldown_ms = 60_000;
    let (pipeline, broker) = pipeline_with(settings);

    feed_buy_pin_bucket(&pipeline, T0).await;
    send_tick(&pipeline, T0 + 60, 100.0).await;
    // A second pin bar lands within the cooldown window.
    feed_sell_pin_bucket(&pipeline, T0 + 60).await;
    send_tick(&pipeline, T0 + 120, 100.0).await;

    assert_eq!(pipeline.signal_log().len(), 2);
    assert_eq!(broker.total_placed(), 1);
}

#[tokio::test]
async fn test_martingale_steps_stake_after_a_loss() {
    let mut settings = pin_bar_settings();
    settings.cooldown_ms = 0;
    settings.martingale.enabled = true;
    let (pipeline, broker) = pipeline_with(settings);

    feed_buy_pin_bucket(&pipeline, T0).await;
    send_tick(&pipeline, T0 + 60, 100.0).await;
    assert_eq!(broker.total_placed(), 1);

    // The first trade settles as a loss before the next signal.
    broker.settle_oldest().unwrap();
    settle(&pipeline, -10.0).await;

    feed_sell_pin_bucket(&pipeline, T0 + 60).await;
    send_tick(&pipeline, T0 + 120, 100.0).await;

    let open = broker.open_positions();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].order.stake, 20.0);
    assert_eq!(pipeline.martingale_step(), 1);

    // A winning settlement resets the progression.
    broker.settle_oldest().unwrap();
    settle(&pipeline, 19.0).await;
    feed_buy_pin_bucket(&pipeline, T0 + 120).await;
    send_tick(&pipeline, T0 + 180, 100.0).await;

    let open = broker.open_positions();
    assert_eq!(open[0].order.stake, 10.0);
    assert_eq!(pipeline.martingale_step(), 0);
}

#[tokio::test]
async fn test_consecutive_losses_halt_dispatch() {
    let mut settings = pin_bar_settings();
    settings.risk.max_consecutive_losses = 2;
    let (pipeline, broker) = pipeline_with(settings);

    settle(&pipeline, -1.0).await;
    settle(&pipeline, -1.0).await;
    assert_eq!(pipeline.risk_snapshot().state, RiskState::Halted);

    feed_buy_pin_bucket(&pipeline, T0).await;
    send_tick(&pipeline, T0 + 60, 100.0).await;

    // The signal fired but the risk gate refused it.
    assert_eq!(pipeline.signal_log().len(), 1);
    assert_eq!(broker.total_placed(), 0);
}

#[tokio::test]
async fn test_drawdown_halt_sticks_through_profits() {
    let mut settings = pin_bar_settings();
    settings.risk.drawdown_cap = 50.0;
    let (pipeline, broker) = pipeline_with(settings);

    settle(&pipeline, -60.0).await;
    assert_eq!(pipeline.risk_snapshot().state, RiskState::Halted);

    // Winning the session back does not re-arm the gate.
    settle(&pipeline, 100.0).await;
    let snapshot = pipeline.risk_snapshot();
    assert!(snapshot.session_pnl > -50.0);
    assert_eq!(snapshot.state, RiskState::Halted);

    feed_buy_pin_bucket(&pipeline, T0).await;
    send_tick(&pipeline, T0 + 60, 100.0).await;
    assert_eq!(broker.total_placed(), 0);

    // An explicit operator reset re-arms it.
    pipeline.reset_risk();
    assert_eq!(pipeline.risk_snapshot().state, RiskState::Armed);
}

#[tokio::test]
async fn test_malformed_ticks_are_dropped_without_stalling() {
    let (pipeline, broker) = pipeline_with(pin_bar_settings());

    send_tick(&pipeline, T0, f64::NAN).await;
    feed_buy_pin_bucket(&pipeline, T0).await;
    // Out-of-order tick is dropped, then the boundary tick closes as usual.
    send_tick(&pipeline, T0 - 100, 100.0).await;
    send_tick(&pipeline, T0 + 60, 100.0).await;

    assert_eq!(pipeline.signal_log().len(), 1);
    assert_eq!(broker.total_placed(), 1);
}

#[tokio::test]
async fn test_balance_feed_drives_peak_drawdown_halt() {
    let mut settings = pin_bar_settings();
    settings.risk.max_drawdown_pct = 10.0;
    let (pipeline, _broker) = pipeline_with(settings);

    pipeline
        .process(FeedEvent::Balance {
            balance: 1_000.0,
            currency: "USD".to_string(),
        })
        .await;
    pipeline
        .process(FeedEvent::Balance {
            balance: 880.0,
            currency: "USD".to_string(),
        })
        .await;

    let snapshot = pipeline.risk_snapshot();
    assert_eq!(snapshot.state, RiskState::Halted);
    assert_eq!(snapshot.peak_balance, 1_000.0);
}

#[tokio::test]
async fn test_trade_history_is_retained_for_presentation() {
    let (pipeline, _broker) = pipeline_with(pin_bar_settings());

    pipeline
        .process(FeedEvent::TradeHistory(vec![
            tickbot::models::TradeRecord {
                instrument: "R_50".to_string(),
                profit: 1.5,
                epoch: T0,
            },
            tickbot::models::TradeRecord {
                instrument: "R_50".to_string(),
                profit: -1.0,
                epoch: T0 + 60,
            },
        ]))
        .await;

    let history = pipeline.trade_history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].profit, 1.5);
}
