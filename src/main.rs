mod config;
mod ethereal;
mod events;
mod execution;
mod market;
mod quoting;
mod risk;
mod types;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use dotenvy::dotenv;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::config::QuoterConfig;
use crate::ethereal::client::EtherealClient;
use crate::ethereal::config::EtherealConfig;
use crate::ethereal::event_stream::EtherealEventStream;
use crate::ethereal::price_feed::EtherealPriceFeed;
use crate::events::{FillEvent, OrderStatusEvent, Tick};
use crate::execution::dry_run::DryRunAdapter;
use crate::execution::ExchangeAdapter;
use crate::market::oracle_source::OracleSource;
use crate::market::projection::MarketProjection;
use crate::quoting::engine::QuotingEngine;
use crate::quoting::SnapshotObserver;
use crate::types::instrument_config::InstrumentConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum VenueKind {
    Ethereal,
    #[clap(name = "dry-run")]
    DryRun,
}

#[derive(Debug, Clone, Parser)]
struct Args {
    #[arg(long, value_enum, default_value = "ethereal")]
    pub venue: VenueKind,
}

struct LogSnapshotObserver;

impl SnapshotObserver for LogSnapshotObserver {
    fn on_cycle(&self, tick: &Tick, projection: &MarketProjection) {
        debug!(
            instrument = %tick.instrument,
            mid = projection.mid,
            bid_target = projection.bid_target,
            ask_target = projection.ask_target,
            max_dev_abs = projection.max_dev_abs,
            "cycle snapshot"
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("quoter=debug".parse().unwrap()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();
    let quoter_config = QuoterConfig::from_env()?;
    let ethereal_config = EtherealConfig::from_env()?;

    let adapter: Arc<dyn ExchangeAdapter> = match args.venue {
        VenueKind::Ethereal => Arc::new(EtherealClient::new(&ethereal_config)?),
        VenueKind::DryRun => Arc::new(DryRunAdapter::new(&quoter_config.tickers)),
    };

    let instruments = load_instruments(&quoter_config, adapter.as_ref()).await?;

    let engine = Arc::new(
        QuotingEngine::new(
            adapter,
            instruments,
            ethereal_config.subaccount.clone(),
            ethereal_config.subaccount_id.clone(),
        )
        .with_observer(Box::new(LogSnapshotObserver)),
    );

    engine.sweep_open_orders().await;
    engine
        .warm_up_positions()
        .await
        .context("position warmup failed")?;

    let (tick_tx, mut tick_rx) = mpsc::channel::<Tick>(10_000);
    let feed_task = tokio::spawn({
        let tickers = quoter_config.tickers.clone();
        let feed = EtherealPriceFeed::new(ethereal_config.ws_url.clone());
        async move {
            loop {
                if let Err(error) = feed.subscribe(&tickers, tick_tx.clone()).await {
                    error!("oracle feed stopped with error: {error:?}");
                }

                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    });

    let (status_tx, mut status_rx) = mpsc::channel::<OrderStatusEvent>(10_000);
    let (fill_tx, mut fill_rx) = mpsc::channel::<FillEvent>(10_000);
    let event_stream = match args.venue {
        VenueKind::Ethereal => Some(EtherealEventStream::spawn(
            &ethereal_config.ws_url,
            &ethereal_config.subaccount_id,
            status_tx,
            fill_tx,
        )),
        VenueKind::DryRun => None,
    };

    let tick_ingest = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move {
            while let Some(tick) = tick_rx.recv().await {
                engine.on_tick(tick);
            }
        }
    });

    let status_ingest = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move {
            while let Some(event) = status_rx.recv().await {
                engine.reconcile(&event);
            }
        }
    });

    let fill_ingest = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move {
            while let Some(fill) = fill_rx.recv().await {
                engine.on_fill(&fill);
            }
        }
    });

    let mut cadence = tokio::time::interval(quoter_config.refresh_cycle);
    cadence.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cadence.tick() => engine.run_cycle().await,
            _ = shutdown_signal() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    engine.shutdown().await;

    feed_task.abort();
    if let Some(stream) = &event_stream {
        stream.disconnect();
    }
    tick_ingest.abort();
    status_ingest.abort();
    fill_ingest.abort();

    info!("clean shutdown complete");
    Ok(())
}

async fn load_instruments(
    config: &QuoterConfig,
    adapter: &dyn ExchangeAdapter,
) -> Result<HashMap<String, InstrumentConfig>> {
    let products = adapter
        .products()
        .await
        .context("product catalog lookup failed")?;

    let mut instruments = HashMap::with_capacity(config.tickers.len());
    for ticker in &config.tickers {
        let params = config
            .params_for(ticker)
            .ok_or_else(|| anyhow!("missing quoting params for {ticker}"))?;
        let product = products
            .iter()
            .find(|product| product.ticker == *ticker)
            .ok_or_else(|| anyhow!("venue catalog has no product for {ticker}"))?;

        let instrument = InstrumentConfig::assemble(params, product)?;
        info!(
            ticker = %instrument.ticker,
            product_id = %instrument.product_id,
            tick_size = instrument.tick_size,
            spread_bp = instrument.spread_bp,
            order_size = instrument.order_size,
            max_deviation_pct = instrument.max_deviation_pct,
            "instrument configured"
        );
        instruments.insert(ticker.clone(), instrument);
    }

    Ok(instruments)
}

async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt =
        signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut terminate =
        signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut quit = signal(SignalKind::quit()).expect("failed to install SIGQUIT handler");

    tokio::select! {
        _ = interrupt.recv() => {}
        _ = terminate.recv() => {}
        _ = quit.recv() => {}
    }
}
