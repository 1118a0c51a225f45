use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use tickbot::broker::PaperBroker;
use tickbot::config::{ConfigCell, Settings, TradeMode};
use tickbot::models::FeedEvent;
use tickbot::pipeline::Pipeline;
use tickbot::sim::SyntheticTickFeed;

/// Every Nth feed round, settle the oldest paper position.
const SETTLE_EVERY_ROUNDS: u32 = 30;

#[derive(Parser, Debug)]
#[command(name = "tickbot", about = "Tick-to-order decision pipeline")]
struct Cli {
    /// Settings file, layered with TICKBOT__-prefixed environment variables
    #[arg(long)]
    config: Option<PathBuf>,

    /// Trading mode override
    #[arg(long, value_enum)]
    mode: Option<TradeMode>,

    /// Seed for the synthetic paper feed
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Synthetic feed rounds to run before exiting
    #[arg(long, default_value_t = 1_800)]
    rounds: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(mode) = cli.mode {
        settings.mode = mode;
    }
    if settings.mode == TradeMode::Live {
        anyhow::bail!("live mode needs an external transport; this binary ships the paper gateway only");
    }

    tracing::info!(
        instruments = settings.instruments.len(),
        timeframes = ?settings.timeframes,
        "tickbot starting in paper mode"
    );

    let config = Arc::new(ConfigCell::new(settings)?);
    let broker = Arc::new(PaperBroker::new());
    let pipeline = Arc::new(Pipeline::new(config.clone(), broker.clone()));
    pipeline.subscribe_all().await?;

    let (events_tx, events_rx) = mpsc::channel(1024);
    let runner = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.run(events_rx).await })
    };

    let snapshot = config.snapshot();
    let mut feed = SyntheticTickFeed::new(
        &snapshot.instruments,
        cli.seed,
        chrono::Utc::now().timestamp(),
    );
    let mut settle_rng = StdRng::seed_from_u64(cli.seed.wrapping_add(1));

    events_tx
        .send(FeedEvent::Balance {
            balance: 1_000.0,
            currency: "USD".to_string(),
        })
        .await
        .context("pipeline stopped before the run began")?;

    for round in 0..cli.rounds {
        for tick in feed.next_round() {
            events_tx
                .send(FeedEvent::Tick(tick))
                .await
                .context("pipeline stopped mid-run")?;
        }

        if round % SETTLE_EVERY_ROUNDS == SETTLE_EVERY_ROUNDS - 1 {
            if let Some(position) = broker.settle_oldest() {
                let stake = position.order.stake;
                let profit = if settle_rng.gen_bool(0.5) {
                    stake * 0.95
                } else {
                    -stake
                };
                events_tx
                    .send(FeedEvent::TradeUpdate {
                        instrument: position.order.instrument.clone(),
                        is_closed: true,
                        profit,
                    })
                    .await
                    .context("pipeline stopped mid-run")?;
            }
        }
    }

    drop(events_tx);
    runner.await.context("pipeline task panicked")?;

    let risk = pipeline.risk_snapshot();
    tracing::info!(
        signals = pipeline.signal_log().len(),
        orders = broker.total_placed(),
        open_positions = broker.open_positions().len(),
        session_pnl = risk.session_pnl,
        risk_state = ?risk.state,
        martingale_step = pipeline.martingale_step(),
        "paper run complete"
    );

    Ok(())
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "tickbot=info".to_string()))
        .init();
}
